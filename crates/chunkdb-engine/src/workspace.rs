use rayon::ThreadPool;

use chunkdb_core::{BatchReport, Document, Embedder, EngineConfig, Error, Result, Segmenter};
use chunkdb_embed::embedder_from_config;

use crate::indexer::{DeleteResponse, IndexResponse, Indexer};
use crate::indexes::{IndexStats, Indexes};
use crate::searcher::{SearchOptions, Searcher};

/// Owns the indexes of one workspace directory and runs index, delete and
/// search against them.
///
/// Dropping a workspace flushes pending writes; use [`Workspace::close`] to
/// see flush errors.
pub struct Workspace {
    config: EngineConfig,
    indexes: Indexes,
    embedder: Box<dyn Embedder>,
    segmenter: Segmenter,
    pool: Option<ThreadPool>,
}

impl Workspace {
    /// Open (or create) the workspace described by `config` with the embedder
    /// it names.
    pub fn open(config: EngineConfig) -> Result<Self> {
        let embedder = embedder_from_config(&config.embedder)?;
        Self::with_embedder(config, embedder)
    }

    pub fn with_embedder(config: EngineConfig, embedder: Box<dyn Embedder>) -> Result<Self> {
        config.validate()?;
        if embedder.dim() != config.embedder.dim {
            return Err(Error::InvalidConfig(format!(
                "embedder {} produces {} dimensions, embedder.dim is {}",
                embedder.id(),
                embedder.dim(),
                config.embedder.dim
            )));
        }
        std::fs::create_dir_all(&config.workspace).map_err(|e| Error::io(&config.workspace, e))?;
        let indexes = Indexes::open(&config)?;
        if indexes.reconcile() > 0 {
            indexes.flush()?;
        }
        let pool = if config.workers > 1 {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(config.workers)
                .thread_name(|i| format!("chunkdb-worker-{i}"))
                .build()
                .map_err(|e| Error::InvalidConfig(format!("cannot start {} workers: {e}", config.workers)))?;
            Some(pool)
        } else {
            None
        };
        tracing::info!(
            workspace = %config.workspace.display(),
            embedder = %embedder.id(),
            workers = config.workers,
            stats = %indexes.stats(),
            "opened workspace"
        );
        Ok(Self { segmenter: Segmenter::new(config.segmenter.clone()), config, indexes, embedder, pool })
    }

    pub fn config(&self) -> &EngineConfig { &self.config }

    pub fn indexes(&self) -> &Indexes { &self.indexes }

    pub fn stats(&self) -> IndexStats { self.indexes.stats() }

    pub fn indexer(&self) -> Indexer<'_> {
        let indexer = Indexer::new(&self.indexes, &*self.embedder, &self.segmenter);
        match &self.pool {
            Some(pool) => indexer.with_pool(pool),
            None => indexer,
        }
    }

    pub fn searcher(&self) -> Searcher<'_> {
        let searcher = Searcher::new(&self.indexes, &*self.embedder);
        match &self.pool {
            Some(pool) => searcher.with_pool(pool),
            None => searcher,
        }
    }

    /// Index a batch. The outer error is a failed flush; per-document
    /// failures are inside the report.
    pub fn index(&self, documents: &[Document]) -> Result<BatchReport<IndexResponse>> {
        let report = self.indexer().index(documents);
        self.flush_if_configured()?;
        Ok(report)
    }

    /// Delete a batch; every document must carry the chunk ids to remove.
    pub fn delete(&self, documents: &[Document]) -> Result<BatchReport<DeleteResponse>> {
        let report = self.indexer().delete(documents);
        self.flush_if_configured()?;
        Ok(report)
    }

    pub fn search(&self, queries: &[Document], options: &SearchOptions) -> BatchReport<Document> {
        self.searcher().search(queries, &self.clamp(options))
    }

    pub fn search_one(&self, query: &Document, options: &SearchOptions) -> Result<Document> {
        self.searcher().search_one(query, &self.clamp(options))
    }

    pub fn default_search_options(&self) -> SearchOptions { SearchOptions::top_k(self.config.search.default_k) }

    pub fn flush(&self) -> Result<()> { self.indexes.flush() }

    pub fn close(self) -> Result<()> { self.indexes.flush() }

    fn flush_if_configured(&self) -> Result<()> {
        if self.config.flush_on_write { self.indexes.flush() } else { Ok(()) }
    }

    fn clamp(&self, options: &SearchOptions) -> SearchOptions {
        if options.k > self.config.search.max_k {
            tracing::debug!(requested = options.k, max_k = self.config.search.max_k, "clamping k");
            return SearchOptions::top_k(self.config.search.max_k);
        }
        *options
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        if let Err(e) = self.indexes.flush() {
            tracing::error!(workspace = %self.config.workspace.display(), error = %e, "flush on drop failed");
        }
    }
}
