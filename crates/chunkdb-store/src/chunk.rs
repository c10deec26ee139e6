use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::RwLock;

use chunkdb_core::{ChunkPayload, Error, IndexKind, Result};

use crate::{persist, PersistentIndex};

/// Chunk id → payload (chunk text, parent id, parent text, granularity).
#[derive(Debug, Default)]
pub struct ChunkIndex {
    path: Option<PathBuf>,
    chunks: RwLock<BTreeMap<String, ChunkPayload>>,
    dirty: AtomicBool,
}

impl ChunkIndex {
    pub fn in_memory() -> Self { Self::default() }

    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let chunks: BTreeMap<String, ChunkPayload> = persist::read(&path, IndexKind::Chunk)?.unwrap_or_default();
        tracing::debug!(path = %path.display(), size = chunks.len(), "opened chunk index");
        Ok(Self { path: Some(path), chunks: RwLock::new(chunks), dirty: AtomicBool::new(false) })
    }

    /// Insert or overwrite; hands back the payload that was replaced.
    pub fn put(&self, chunk_id: &str, payload: ChunkPayload) -> Option<ChunkPayload> {
        let previous = self.chunks.write().insert(chunk_id.to_string(), payload);
        self.dirty.store(true, Ordering::Release);
        previous
    }

    pub fn remove(&self, chunk_id: &str) -> Option<ChunkPayload> {
        let removed = self.chunks.write().remove(chunk_id);
        if removed.is_some() { self.dirty.store(true, Ordering::Release); }
        removed
    }

    /// Fails with `NotFound` for an unknown id.
    pub fn get(&self, chunk_id: &str) -> Result<ChunkPayload> {
        self.chunks
            .read()
            .get(chunk_id)
            .cloned()
            .ok_or_else(|| Error::not_found(format!("chunk {chunk_id}")))
    }

    pub fn contains(&self, chunk_id: &str) -> bool { self.chunks.read().contains_key(chunk_id) }

    pub fn ids(&self) -> Vec<String> { self.chunks.read().keys().cloned().collect() }
}

impl PersistentIndex for ChunkIndex {
    fn kind(&self) -> IndexKind { IndexKind::Chunk }

    fn size(&self) -> usize { self.chunks.read().len() }

    fn path(&self) -> Option<&Path> { self.path.as_deref() }

    fn flush(&self) -> Result<()> {
        let Some(path) = &self.path else { return Ok(()) };
        if !self.dirty.load(Ordering::Acquire) && path.exists() { return Ok(()); }
        let chunks = self.chunks.read();
        persist::write_atomic(path, IndexKind::Chunk, &*chunks)?;
        self.dirty.store(false, Ordering::Release);
        tracing::debug!(path = %path.display(), size = chunks.len(), "flushed chunk index");
        Ok(())
    }
}
