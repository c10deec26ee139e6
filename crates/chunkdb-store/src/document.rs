use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::RwLock;

use chunkdb_core::{IndexKind, Result};

use crate::{persist, PersistentIndex};

/// Existence set of top-level document ids.
#[derive(Debug, Default)]
pub struct DocumentIndex {
    path: Option<PathBuf>,
    ids: RwLock<BTreeSet<String>>,
    dirty: AtomicBool,
}

impl DocumentIndex {
    pub fn in_memory() -> Self { Self::default() }

    /// Open the index stored at `path`; a missing file means an empty index.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let ids: BTreeSet<String> = persist::read(&path, IndexKind::Document)?.unwrap_or_default();
        tracing::debug!(path = %path.display(), size = ids.len(), "opened document index");
        Ok(Self { path: Some(path), ids: RwLock::new(ids), dirty: AtomicBool::new(false) })
    }

    /// Returns `true` if the id was not present before.
    pub fn put(&self, doc_id: &str) -> bool {
        let added = self.ids.write().insert(doc_id.to_string());
        if added { self.dirty.store(true, Ordering::Release); }
        added
    }

    /// Returns `true` if the id was present.
    pub fn remove(&self, doc_id: &str) -> bool {
        let removed = self.ids.write().remove(doc_id);
        if removed { self.dirty.store(true, Ordering::Release); }
        removed
    }

    pub fn contains(&self, doc_id: &str) -> bool { self.ids.read().contains(doc_id) }

    pub fn ids(&self) -> Vec<String> { self.ids.read().iter().cloned().collect() }
}

impl PersistentIndex for DocumentIndex {
    fn kind(&self) -> IndexKind { IndexKind::Document }

    fn size(&self) -> usize { self.ids.read().len() }

    fn path(&self) -> Option<&Path> { self.path.as_deref() }

    fn flush(&self) -> Result<()> {
        let Some(path) = &self.path else { return Ok(()) };
        if !self.dirty.load(Ordering::Acquire) && path.exists() { return Ok(()); }
        let ids = self.ids.read();
        persist::write_atomic(path, IndexKind::Document, &*ids)?;
        self.dirty.store(false, Ordering::Release);
        tracing::debug!(path = %path.display(), size = ids.len(), "flushed document index");
        Ok(())
    }
}
