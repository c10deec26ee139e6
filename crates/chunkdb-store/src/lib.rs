//! chunkdb-store
//!
//! Key-value indexes persisted as one JSON file each: the document index
//! (existence of top-level ids) and the chunk index (payload per chunk id).
//! The [`persist`] envelope is shared with the vector index.

use std::path::Path;

use chunkdb_core::{IndexKind, Result};

pub mod chunk;
pub mod document;
pub mod persist;

pub use chunk::ChunkIndex;
pub use document::DocumentIndex;

/// Common surface of every on-disk index.
pub trait PersistentIndex: Send + Sync {
    fn kind(&self) -> IndexKind;
    fn size(&self) -> usize;
    /// `None` for purely in-memory indexes.
    fn path(&self) -> Option<&Path>;
    /// Write the current state to disk atomically; a no-op when nothing
    /// changed since the last flush and the file already exists.
    fn flush(&self) -> Result<()>;

    fn is_empty(&self) -> bool { self.size() == 0 }
}
