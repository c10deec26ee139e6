//! chunkdb-vector
//!
//! Exact nearest-neighbour index over chunk embeddings, persisted through the
//! shared [`chunkdb_store::persist`] envelope.
//!
//! The metric is cosine similarity for every index: scores are in `[-1, 1]`
//! and higher is better. Equal scores are ordered by insertion, earliest
//! first; overwriting a key keeps its original position.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use chunkdb_core::{Error, IndexKind, Result, SearchHit};
use chunkdb_store::{persist, PersistentIndex};

#[derive(Debug, Clone)]
struct Slot {
    seq: u64,
    vector: Vec<f32>,
    norm: f32,
}

#[derive(Debug, Default)]
struct Inner {
    next_seq: u64,
    slots: HashMap<String, Slot>,
}

#[derive(Serialize, Deserialize)]
struct StoredEntry {
    id: String,
    seq: u64,
    vector: Vec<f32>,
}

#[derive(Serialize, Deserialize)]
struct StoredState {
    dim: usize,
    next_seq: u64,
    entries: Vec<StoredEntry>,
}

pub struct VectorIndex {
    path: Option<PathBuf>,
    dim: usize,
    inner: RwLock<Inner>,
    dirty: AtomicBool,
}

fn norm(v: &[f32]) -> f32 { v.iter().map(|x| x * x).sum::<f32>().sqrt() }

impl VectorIndex {
    pub fn in_memory(dim: usize) -> Self {
        Self { path: None, dim, inner: RwLock::new(Inner::default()), dirty: AtomicBool::new(false) }
    }

    /// Open the index at `path` for vectors of size `dim`. A missing file
    /// yields an empty index; a file written with another dimension is refused.
    pub fn open(path: impl Into<PathBuf>, dim: usize) -> Result<Self> {
        let path = path.into();
        match persist::read::<StoredState>(&path, IndexKind::Vector)? {
            Some(state) if state.dim != dim => Err(Error::storage(format!(
                "{} stores {}-dimensional vectors, expected {}",
                path.display(),
                state.dim,
                dim
            ))),
            Some(state) => Ok(Self::from_state(Some(path), state)),
            None => Ok(Self { path: Some(path), ..Self::in_memory(dim) }),
        }
    }

    /// Open an existing index file, taking the dimension from the file.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let state = persist::read::<StoredState>(&path, IndexKind::Vector)?
            .ok_or_else(|| Error::not_found(path.display().to_string()))?;
        Ok(Self::from_state(Some(path), state))
    }

    fn from_state(path: Option<PathBuf>, state: StoredState) -> Self {
        let slots = state
            .entries
            .into_iter()
            .map(|e| {
                let norm = norm(&e.vector);
                (e.id, Slot { seq: e.seq, vector: e.vector, norm })
            })
            .collect::<HashMap<_, _>>();
        tracing::debug!(size = slots.len(), dim = state.dim, "loaded vector index");
        Self {
            path,
            dim: state.dim,
            inner: RwLock::new(Inner { next_seq: state.next_seq, slots }),
            dirty: AtomicBool::new(false),
        }
    }

    pub fn dim(&self) -> usize { self.dim }

    /// Insert or overwrite; hands back the vector that was replaced.
    pub fn put(&self, chunk_id: &str, vector: Vec<f32>) -> Result<Option<Vec<f32>>> {
        if vector.len() != self.dim {
            return Err(Error::storage(format!(
                "vector for {chunk_id} has {} dimensions, index expects {}",
                vector.len(),
                self.dim
            )));
        }
        if vector.iter().any(|x| !x.is_finite()) {
            return Err(Error::storage(format!("vector for {chunk_id} has non-finite components")));
        }
        let norm = norm(&vector);
        let mut inner = self.inner.write();
        let previous = match inner.slots.get_mut(chunk_id) {
            Some(slot) => {
                slot.norm = norm;
                Some(std::mem::replace(&mut slot.vector, vector))
            }
            None => {
                let seq = inner.next_seq;
                inner.next_seq += 1;
                inner.slots.insert(chunk_id.to_string(), Slot { seq, vector, norm });
                None
            }
        };
        self.dirty.store(true, Ordering::Release);
        Ok(previous)
    }

    pub fn remove(&self, chunk_id: &str) -> Option<Vec<f32>> {
        let removed = self.inner.write().slots.remove(chunk_id).map(|s| s.vector);
        if removed.is_some() { self.dirty.store(true, Ordering::Release); }
        removed
    }

    pub fn get(&self, chunk_id: &str) -> Option<Vec<f32>> {
        self.inner.read().slots.get(chunk_id).map(|s| s.vector.clone())
    }

    pub fn contains(&self, chunk_id: &str) -> bool { self.inner.read().slots.contains_key(chunk_id) }

    /// Stored ids in insertion order.
    pub fn ids(&self) -> Vec<String> {
        let inner = self.inner.read();
        let mut ids: Vec<(&String, u64)> = inner.slots.iter().map(|(id, slot)| (id, slot.seq)).collect();
        ids.sort_by_key(|(_, seq)| *seq);
        ids.into_iter().map(|(id, _)| id.clone()).collect()
    }

    /// Up to `k` stored vectors closest to `query`, best first.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchHit>> {
        if query.len() != self.dim {
            return Err(Error::storage(format!("query has {} dimensions, index expects {}", query.len(), self.dim)));
        }
        if k == 0 {
            return Ok(Vec::new());
        }
        let query_norm = norm(query);
        let inner = self.inner.read();
        let mut scored: Vec<(f32, u64, &str)> = inner
            .slots
            .iter()
            .map(|(id, slot)| {
                let denom = query_norm * slot.norm;
                let score = if denom > 0.0 {
                    query.iter().zip(&slot.vector).map(|(a, b)| a * b).sum::<f32>() / denom
                } else {
                    0.0
                };
                (score, slot.seq, id.as_str())
            })
            .collect();
        scored.sort_by(|a, b| b.0.total_cmp(&a.0).then(a.1.cmp(&b.1)));
        scored.truncate(k);
        Ok(scored.into_iter().map(|(score, _, id)| SearchHit { id: id.to_string(), score }).collect())
    }

    fn to_state(inner: &Inner, dim: usize) -> StoredState {
        let mut entries: Vec<StoredEntry> = inner
            .slots
            .iter()
            .map(|(id, slot)| StoredEntry { id: id.clone(), seq: slot.seq, vector: slot.vector.clone() })
            .collect();
        entries.sort_by_key(|e| e.seq);
        StoredState { dim, next_seq: inner.next_seq, entries }
    }
}

impl PersistentIndex for VectorIndex {
    fn kind(&self) -> IndexKind { IndexKind::Vector }

    fn size(&self) -> usize { self.inner.read().slots.len() }

    fn path(&self) -> Option<&Path> { self.path.as_deref() }

    fn flush(&self) -> Result<()> {
        let Some(path) = &self.path else { return Ok(()) };
        if !self.dirty.load(Ordering::Acquire) && path.exists() { return Ok(()); }
        let inner = self.inner.read();
        let state = Self::to_state(&inner, self.dim);
        persist::write_atomic(path, IndexKind::Vector, &state)?;
        self.dirty.store(false, Ordering::Release);
        tracing::debug!(path = %path.display(), size = state.entries.len(), "flushed vector index");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ties_go_to_the_earliest_insert() {
        let index = VectorIndex::in_memory(2);
        index.put("late", vec![1.0, 0.0]).unwrap();
        index.put("early", vec![2.0, 0.0]).unwrap();
        index.put("other", vec![0.0, 1.0]).unwrap();
        let hits = index.search(&[1.0, 0.0], 3).unwrap();
        let ids: Vec<&str> = hits.iter().map(|h| h.id.as_str()).collect();
        assert_eq!(ids, ["late", "early", "other"]);
    }

    #[test]
    fn overwrite_keeps_insertion_position() {
        let index = VectorIndex::in_memory(2);
        index.put("a", vec![1.0, 0.0]).unwrap();
        index.put("b", vec![1.0, 0.0]).unwrap();
        let previous = index.put("a", vec![3.0, 0.0]).unwrap();
        assert_eq!(previous, Some(vec![1.0, 0.0]));
        let hits = index.search(&[1.0, 0.0], 2).unwrap();
        assert_eq!(hits[0].id, "a");
        assert_eq!(index.size(), 2);
    }
}
