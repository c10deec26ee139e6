//! chunkdb command line: ingest text files, delete documents, run queries.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use walkdir::WalkDir;

use chunkdb_core::config::expand_path;
use chunkdb_core::{BatchReport, Document, EngineConfig, Error};
use chunkdb_engine::{load_index, IndexResponse, Indexer, SearchOptions, Workspace};

#[derive(Parser, Debug)]
#[command(name = "chunkdb")]
#[command(about = "Index documents as chunks and search them", long_about = None)]
struct Args {
    /// Workspace directory (overrides `workspace` from chunkdb.toml / CHUNKDB_WORKSPACE)
    #[arg(short, long)]
    workspace: Option<String>,

    /// Number of worker threads per batch
    #[arg(long)]
    workers: Option<usize>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Index every .txt file under a directory (or a single file); the file stem is the document id
    Ingest { path: PathBuf },
    /// Delete a document and the given chunk ids (without chunk ids only the document id goes)
    Delete { doc_id: String, chunk_ids: Vec<String> },
    /// Search chunk-level matches for a query
    Query {
        text: String,
        #[arg(short, long)]
        k: Option<usize>,
    },
    /// Print the size of each index file
    Stats,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "warn,chunkdb=info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();
    let mut config = EngineConfig::load().context("loading configuration")?;
    if let Some(workspace) = &args.workspace {
        config.workspace = std::env::current_dir()?.join(expand_path(workspace));
    }
    if let Some(workers) = args.workers {
        config.workers = workers;
    }
    tracing::debug!(?config, "configuration");

    match args.command {
        Command::Ingest { path } => ingest(config, &path),
        Command::Delete { doc_id, chunk_ids } => {
            let workspace = Workspace::open(config)?;
            let chunks = chunk_ids.into_iter().map(|id| Document::new(id, "")).collect();
            let report = workspace.delete(&[Document::with_chunks(doc_id, chunks)])?;
            println!("{}", serde_json::to_string_pretty(&report)?);
            workspace.close()?;
            Ok(())
        }
        Command::Query { text, k } => {
            let workspace = Workspace::open(config)?;
            let options = k.map(SearchOptions::top_k).unwrap_or_else(|| workspace.default_search_options());
            let response = workspace.search_one(&Document::new("query", text), &options)?;
            println!("{}", serde_json::to_string_pretty(&response)?);
            Ok(())
        }
        Command::Stats => stats(&config),
    }
}

fn ingest(mut config: EngineConfig, path: &Path) -> anyhow::Result<()> {
    let files = collect_text_files(path)?;
    if files.is_empty() {
        bail!("no .txt files under {}", path.display());
    }
    config.flush_on_write = false;
    let workspace = Workspace::open(config)?;

    let pb = ProgressBar::new(files.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files {msg}")?
            .progress_chars("#>-"),
    );
    let report = index_files(&workspace.indexer(), &files, &pb);
    pb.finish_with_message("done");

    workspace.flush()?;
    for item in &report.items {
        match &item.outcome {
            Ok(response) => {
                let chunk_ids: Vec<&str> = response.document.chunk_ids().collect();
                println!("{}\t{}", item.id, chunk_ids.join(" "));
                for failed in &response.failed_chunks {
                    eprintln!("{}\tchunk {} skipped: {}", item.id, failed.chunk_id, failed.failure.message);
                }
            }
            Err(failure) => eprintln!("{}\tfailed: {}", item.id, failure.message),
        }
    }
    eprintln!("{} documents, {} failed; {}", report.len(), report.failed().count(), workspace.stats());
    workspace.close()?;
    Ok(())
}

/// One document per file; a file that cannot be read becomes a failed item.
fn index_files(indexer: &Indexer<'_>, files: &[PathBuf], pb: &ProgressBar) -> BatchReport<IndexResponse> {
    let mut report = BatchReport::default();
    for file in files {
        let id = file.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default();
        pb.set_message(id.clone());
        match std::fs::read_to_string(file) {
            Ok(text) => report.items.extend(indexer.index(&[Document::new(id, text)]).items),
            Err(e) => {
                tracing::warn!(file = %file.display(), error = %e, "skipping unreadable file");
                report.push(id, Err(Error::io(file, e)));
            }
        }
        pb.inc(1);
    }
    report
}

fn collect_text_files(path: &Path) -> anyhow::Result<Vec<PathBuf>> {
    if path.is_file() {
        return Ok(vec![path.to_path_buf()]);
    }
    let mut files = Vec::new();
    for entry in WalkDir::new(path).sort_by_file_name() {
        let entry = entry?;
        if entry.file_type().is_file() && entry.path().extension().and_then(|s| s.to_str()) == Some("txt") {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

fn stats(config: &EngineConfig) -> anyhow::Result<()> {
    for path in [config.document_path(), config.chunk_path(), config.vector_path()] {
        match load_index(&path) {
            Ok(index) => println!("{:<8} {:>8}  {}", index.kind(), index.size(), path.display()),
            Err(e) => println!("{:<8} {:>8}  {} ({e})", "-", "-", path.display()),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chunkdb_core::ErrorKind;

    #[test]
    fn unreadable_file_does_not_stop_ingest() {
        let tmp = tempfile::tempdir().unwrap();
        let data = tmp.path().join("data");
        std::fs::create_dir_all(&data).unwrap();
        std::fs::write(data.join("alpha.txt"), "one,two").unwrap();
        std::fs::write(data.join("notes.md"), "ignored").unwrap();
        let mut files = collect_text_files(&data).unwrap();
        assert_eq!(files.len(), 1);
        files.insert(0, data.join("gone.txt"));

        let workspace = Workspace::open(EngineConfig::with_workspace(tmp.path().join("ws"))).unwrap();
        let report = index_files(&workspace.indexer(), &files, &ProgressBar::hidden());

        assert_eq!(report.len(), 2);
        let failed: Vec<_> = report.failed().map(|(id, f)| (id.to_string(), f.kind)).collect();
        assert_eq!(failed, [("gone".to_string(), ErrorKind::StorageFailure)]);
        let (id, response) = report.succeeded().next().unwrap();
        assert_eq!(id, "alpha");
        assert_eq!(response.document.chunks.len(), 2);
    }

    #[test]
    fn delete_accepts_a_bare_document_id() {
        let args = Args::try_parse_from(["chunkdb", "delete", "doc-1"]).unwrap();
        match args.command {
            Command::Delete { doc_id, chunk_ids } => {
                assert_eq!(doc_id, "doc-1");
                assert!(chunk_ids.is_empty());
            }
            other => panic!("parsed as {other:?}"),
        }
        let args = Args::try_parse_from(["chunkdb", "delete", "doc-1", "c1", "c2"]).unwrap();
        assert!(matches!(args.command, Command::Delete { chunk_ids, .. } if chunk_ids == ["c1", "c2"]));
    }
}
