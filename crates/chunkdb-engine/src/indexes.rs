use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use chunkdb_core::{EngineConfig, Error, Result};
use chunkdb_store::{ChunkIndex, DocumentIndex, PersistentIndex};
use chunkdb_vector::VectorIndex;

/// The three indexes of one workspace.
pub struct Indexes {
    pub documents: DocumentIndex,
    pub chunks: ChunkIndex,
    pub vectors: VectorIndex,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexStats {
    pub documents: usize,
    pub chunks: usize,
    pub vectors: usize,
}

impl std::fmt::Display for IndexStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "documents={} chunks={} vectors={}", self.documents, self.chunks, self.vectors)
    }
}

impl Indexes {
    pub fn open(config: &EngineConfig) -> Result<Self> {
        Ok(Self {
            documents: DocumentIndex::open(config.document_path())?,
            chunks: ChunkIndex::open(config.chunk_path())?,
            vectors: VectorIndex::open(config.vector_path(), config.embedder.dim)?,
        })
    }

    pub fn in_memory(dim: usize) -> Self {
        Self { documents: DocumentIndex::in_memory(), chunks: ChunkIndex::in_memory(), vectors: VectorIndex::in_memory(dim) }
    }

    pub fn stats(&self) -> IndexStats {
        IndexStats { documents: self.documents.size(), chunks: self.chunks.size(), vectors: self.vectors.size() }
    }

    pub fn flush(&self) -> Result<()> {
        self.vectors.flush()?;
        self.chunks.flush()?;
        self.documents.flush()?;
        tracing::info!(stats = %self.stats(), "flushed indexes");
        Ok(())
    }

    /// Drop chunk payloads without a vector and vectors without a payload.
    ///
    /// Files are flushed one after another (vectors, chunks, documents), so an
    /// interrupted flush can leave the vector file ahead of the chunk file.
    /// Entries present in only one of the two are removed; returns how many.
    pub fn reconcile(&self) -> usize {
        let chunk_ids: BTreeSet<String> = self.chunks.ids().into_iter().collect();
        let vector_ids: BTreeSet<String> = self.vectors.ids().into_iter().collect();
        let mut repaired = 0;
        for id in chunk_ids.difference(&vector_ids) {
            self.chunks.remove(id);
            repaired += 1;
        }
        for id in vector_ids.difference(&chunk_ids) {
            self.vectors.remove(id);
            repaired += 1;
        }
        if repaired > 0 {
            tracing::warn!(repaired, stats = %self.stats(), "dropped chunk entries missing from one of the chunk and vector indexes");
        }
        repaired
    }

    /// Every chunk payload has a vector and vice versa.
    pub fn check_consistency(&self) -> Result<()> {
        let chunk_ids: BTreeSet<String> = self.chunks.ids().into_iter().collect();
        let vector_ids: BTreeSet<String> = self.vectors.ids().into_iter().collect();
        if let Some(id) = chunk_ids.symmetric_difference(&vector_ids).next() {
            return Err(Error::storage(format!(
                "chunk {id} is present in only one of the chunk and vector indexes ({} vs {})",
                chunk_ids.len(),
                vector_ids.len()
            )));
        }
        Ok(())
    }
}
