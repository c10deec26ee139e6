//! Engine configuration and path helpers.
//!
//! [`EngineConfig`] is an explicit value handed to constructors. For binaries,
//! [`EngineConfig::load`] layers `chunkdb.toml` + `chunkdb.<env>.toml` +
//! `CHUNKDB_*` env vars with Figment (nested keys use `__`, e.g.
//! `CHUNKDB_SEARCH__DEFAULT_K=5`).

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Directory holding the three index files.
    pub workspace: PathBuf,
    pub files: IndexFiles,
    pub segmenter: SegmenterConfig,
    pub embedder: EmbedderConfig,
    pub search: SearchConfig,
    /// Threads used to process the documents of one batch; 1 is sequential.
    pub workers: usize,
    /// Persist all indexes at the end of every index/delete batch.
    pub flush_on_write: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            workspace: PathBuf::from("./workspace"),
            files: IndexFiles::default(),
            segmenter: SegmenterConfig::default(),
            embedder: EmbedderConfig::default(),
            search: SearchConfig::default(),
            workers: 1,
            flush_on_write: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexFiles {
    pub document: String,
    pub chunk: String,
    pub vector: String,
}

impl Default for IndexFiles {
    fn default() -> Self {
        Self {
            document: "docidx.json".to_string(),
            chunk: "chunkidx.json".to_string(),
            vector: "vecidx.json".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmenterConfig {
    pub delimiter: String,
    /// Strip surrounding whitespace from every segment before use.
    pub trim: bool,
    /// Segments shorter than this many characters are dropped.
    pub min_chars: usize,
}

impl Default for SegmenterConfig {
    fn default() -> Self {
        Self { delimiter: ",".to_string(), trim: true, min_chars: 1 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmbedderKind {
    Hashing,
    Model,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbedderConfig {
    pub kind: EmbedderKind,
    pub dim: usize,
    /// Only read by the model-backed embedder.
    pub model_dir: Option<PathBuf>,
    pub max_len: usize,
}

impl Default for EmbedderConfig {
    fn default() -> Self {
        Self { kind: EmbedderKind::Hashing, dim: 256, model_dir: None, max_len: 256 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub default_k: usize,
    pub max_k: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self { default_k: 10, max_k: 1000 }
    }
}

impl EngineConfig {
    /// A default configuration rooted at `workspace`.
    pub fn with_workspace(workspace: impl Into<PathBuf>) -> Self {
        Self { workspace: workspace.into(), ..Self::default() }
    }

    pub fn load() -> Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());
        Self::from_figment(Self::figment(&env_name))
    }

    pub fn figment(env_name: &str) -> Figment {
        let mut figment = Figment::new().merge(Toml::file("chunkdb.toml"));
        match env_name {
            "dev" | "development" => figment = figment.merge(Toml::file("chunkdb.dev.toml")),
            "prod" | "production" => figment = figment.merge(Toml::file("chunkdb.prod.toml")),
            "test" | "testing" => figment = figment.merge(Toml::file("chunkdb.test.toml")),
            _ => {}
        }
        figment.merge(Env::prefixed("CHUNKDB_").split("__"))
    }

    pub fn from_figment(figment: Figment) -> Result<Self> {
        let mut config: EngineConfig = figment
            .extract()
            .map_err(|e| Error::InvalidConfig(e.to_string()))?;
        config.workspace = expand_path(config.workspace.to_string_lossy());
        if let Some(dir) = config.embedder.model_dir.take() {
            config.embedder.model_dir = Some(expand_path(dir.to_string_lossy()));
        }
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.segmenter.delimiter.is_empty() {
            return Err(Error::InvalidConfig("segmenter.delimiter must not be empty".into()));
        }
        if self.embedder.dim == 0 || self.embedder.dim % 2 != 0 {
            return Err(Error::InvalidConfig(format!("embedder.dim must be a positive even number, got {}", self.embedder.dim)));
        }
        if self.workers == 0 {
            return Err(Error::InvalidConfig("workers must be at least 1".into()));
        }
        if self.search.default_k == 0 || self.search.default_k > self.search.max_k {
            return Err(Error::InvalidConfig(format!(
                "search.default_k ({}) must be in 1..=search.max_k ({})",
                self.search.default_k, self.search.max_k
            )));
        }
        let names = [&self.files.document, &self.files.chunk, &self.files.vector];
        if names.iter().any(|n| n.is_empty()) || names[0] == names[1] || names[1] == names[2] || names[0] == names[2] {
            return Err(Error::InvalidConfig("index file names must be non-empty and distinct".into()));
        }
        Ok(())
    }

    pub fn document_path(&self) -> PathBuf { self.workspace.join(&self.files.document) }
    pub fn chunk_path(&self) -> PathBuf { self.workspace.join(&self.files.chunk) }
    pub fn vector_path(&self) -> PathBuf { self.workspace.join(&self.files.vector) }
}

/// `~` and `$VAR` / `${VAR}` expansion for configured paths. Unknown
/// variables leave the input as written; the result is not canonicalized.
pub fn expand_path(raw: impl AsRef<str>) -> PathBuf {
    let raw = raw.as_ref();
    match shellexpand::full(raw) {
        Ok(expanded) => PathBuf::from(expanded.as_ref()),
        Err(_) => PathBuf::from(shellexpand::tilde(raw).as_ref()),
    }
}
