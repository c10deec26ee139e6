use chunkdb_core::{ChunkPayload, Result};

use crate::indexes::Indexes;

enum Undo {
    DocumentAdded(String),
    DocumentRemoved(String),
    Chunk { id: String, previous: Option<ChunkPayload> },
    Vector { id: String, previous: Option<Vec<f32>> },
}

/// Mutations applied for one top-level document, undoable as a unit.
///
/// Every write records how to revert it; [`WriteSet::rollback`] replays those
/// records newest first so the indexes end up as they were before the set.
pub(crate) struct WriteSet<'a> {
    indexes: &'a Indexes,
    undo: Vec<Undo>,
}

impl<'a> WriteSet<'a> {
    pub(crate) fn new(indexes: &'a Indexes) -> Self { Self { indexes, undo: Vec::new() } }

    pub(crate) fn put_document(&mut self, doc_id: &str) {
        if self.indexes.documents.put(doc_id) {
            self.undo.push(Undo::DocumentAdded(doc_id.to_string()));
        }
    }

    pub(crate) fn remove_document(&mut self, doc_id: &str) -> bool {
        let removed = self.indexes.documents.remove(doc_id);
        if removed {
            self.undo.push(Undo::DocumentRemoved(doc_id.to_string()));
        }
        removed
    }

    pub(crate) fn put_chunk(&mut self, chunk_id: &str, payload: ChunkPayload) {
        let previous = self.indexes.chunks.put(chunk_id, payload);
        self.undo.push(Undo::Chunk { id: chunk_id.to_string(), previous });
    }

    pub(crate) fn put_vector(&mut self, chunk_id: &str, vector: Vec<f32>) -> Result<()> {
        let previous = self.indexes.vectors.put(chunk_id, vector)?;
        self.undo.push(Undo::Vector { id: chunk_id.to_string(), previous });
        Ok(())
    }

    /// Removes the chunk from both chunk-level indexes, vector first, so a
    /// concurrent reader never sees a vector without its payload. `true` if
    /// it was there.
    pub(crate) fn remove_chunk(&mut self, chunk_id: &str) -> bool {
        let vector = self.indexes.vectors.remove(chunk_id);
        if let Some(previous) = &vector {
            self.undo.push(Undo::Vector { id: chunk_id.to_string(), previous: Some(previous.clone()) });
        }
        let payload = self.indexes.chunks.remove(chunk_id);
        let removed = payload.is_some() || vector.is_some();
        if let Some(previous) = payload {
            self.undo.push(Undo::Chunk { id: chunk_id.to_string(), previous: Some(previous) });
        }
        removed
    }

    pub(crate) fn len(&self) -> usize { self.undo.len() }

    pub(crate) fn commit(self) {}

    pub(crate) fn rollback(self) {
        let reverted = self.undo.len();
        for step in self.undo.into_iter().rev() {
            match step {
                Undo::DocumentAdded(id) => { self.indexes.documents.remove(&id); }
                Undo::DocumentRemoved(id) => { self.indexes.documents.put(&id); }
                Undo::Chunk { id, previous: None } => { self.indexes.chunks.remove(&id); }
                Undo::Chunk { id, previous: Some(payload) } => { self.indexes.chunks.put(&id, payload); }
                Undo::Vector { id, previous: None } => { self.indexes.vectors.remove(&id); }
                Undo::Vector { id, previous: Some(vector) } => {
                    if let Err(e) = self.indexes.vectors.put(&id, vector) {
                        tracing::error!(chunk_id = %id, error = %e, "could not restore vector during rollback");
                    }
                }
            }
        }
        tracing::warn!(reverted, stats = %self.indexes.stats(), "rolled back document writes");
    }
}
