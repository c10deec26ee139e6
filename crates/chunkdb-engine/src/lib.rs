//! chunkdb-engine
//!
//! Coordinates the segmenter, the embedder and the three indexes:
//!
//! - [`Indexer`]: segment → embed → write chunk payloads, vectors and the
//!   document id; delete a document and the chunk ids it carries
//! - [`Searcher`]: embed a query chunk → nearest chunks → roll up to parents
//! - [`Workspace`]: owns the indexes of one directory and flushes them
//! - [`load_index`]: reopen any single index file by its kind tag

pub mod indexer;
pub mod indexes;
pub mod loader;
pub mod searcher;
pub mod workspace;
mod writeset;

pub use indexer::{ChunkFailure, DeleteResponse, IndexResponse, Indexer};
pub use indexes::{IndexStats, Indexes};
pub use loader::{load_index, AnyIndex};
pub use searcher::{SearchOptions, Searcher};
pub use workspace::Workspace;
