use rayon::prelude::*;
use rayon::ThreadPool;
use serde::{Deserialize, Serialize};

use chunkdb_core::{BatchReport, ChunkPayload, Document, Embedder, ItemFailure, Result, Segmenter};

use crate::indexes::Indexes;
use crate::writeset::WriteSet;

/// Result of indexing one top-level document.
///
/// `document.chunks` lists the chunks that made it into the indexes; keep
/// their ids around, a later delete needs them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexResponse {
    pub document: Document,
    pub failed_chunks: Vec<ChunkFailure>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkFailure {
    pub chunk_id: String,
    pub text: String,
    pub failure: ItemFailure,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteResponse {
    pub document_removed: bool,
    pub chunks_removed: usize,
    /// Supplied chunk ids that were not indexed (already deleted or unknown).
    pub chunks_missing: usize,
}

/// Writes documents and their chunks into the three indexes.
pub struct Indexer<'a> {
    indexes: &'a Indexes,
    embedder: &'a dyn Embedder,
    segmenter: &'a Segmenter,
    pool: Option<&'a ThreadPool>,
}

impl<'a> Indexer<'a> {
    pub fn new(indexes: &'a Indexes, embedder: &'a dyn Embedder, segmenter: &'a Segmenter) -> Self {
        Self { indexes, embedder, segmenter, pool: None }
    }

    /// Process the documents of a batch on `pool` instead of the caller's thread.
    pub fn with_pool(mut self, pool: &'a ThreadPool) -> Self {
        self.pool = Some(pool);
        self
    }

    pub fn index(&self, documents: &[Document]) -> BatchReport<IndexResponse> {
        let report = self.run(documents, |doc| self.index_one(doc));
        let chunks: usize = report.succeeded().map(|(_, r)| r.document.chunks.len()).sum();
        let chunk_failures: usize = report.succeeded().map(|(_, r)| r.failed_chunks.len()).sum();
        tracing::info!(
            documents = report.len(),
            failed_documents = report.failed().count(),
            chunks,
            chunk_failures,
            stats = %self.indexes.stats(),
            "indexed batch"
        );
        report
    }

    pub fn delete(&self, documents: &[Document]) -> BatchReport<DeleteResponse> {
        let report = self.run(documents, |doc| self.delete_one(doc));
        tracing::info!(documents = report.len(), stats = %self.indexes.stats(), "deleted batch");
        report
    }

    fn run<T, F>(&self, documents: &[Document], op: F) -> BatchReport<T>
    where
        T: Send,
        F: Fn(&Document) -> Result<T> + Sync,
    {
        let outcomes: Vec<Result<T>> = match self.pool {
            Some(pool) => pool.install(|| documents.par_iter().map(&op).collect()),
            None => documents.iter().map(&op).collect(),
        };
        let mut report = BatchReport::default();
        for (doc, outcome) in documents.iter().zip(outcomes) {
            if let Err(e) = &outcome {
                tracing::warn!(doc_id = %doc.id, error = %e, "document failed");
            }
            report.push(doc.id.clone(), outcome);
        }
        report
    }

    /// Segment, embed and write one document; all of its writes land or none do.
    pub fn index_one(&self, doc: &Document) -> Result<IndexResponse> {
        let mut embedded = Vec::new();
        let mut failed_chunks = Vec::new();
        for chunk in self.segmenter.segment(doc) {
            match self.embedder.embed(&chunk.text) {
                Ok(vector) => embedded.push((chunk, vector)),
                Err(e) => {
                    tracing::warn!(doc_id = %doc.id, chunk_id = %chunk.id, error = %e, "chunk not indexed");
                    failed_chunks.push(ChunkFailure { chunk_id: chunk.id, text: chunk.text, failure: ItemFailure::from(e) });
                }
            }
        }

        let mut writes = WriteSet::new(self.indexes);
        let mut chunks = Vec::with_capacity(embedded.len());
        for (chunk, vector) in embedded {
            let payload = ChunkPayload {
                text: chunk.text.clone(),
                parent_id: doc.id.clone(),
                parent_text: doc.text.clone(),
                granularity: chunk.granularity,
            };
            writes.put_chunk(&chunk.id, payload);
            if let Err(e) = writes.put_vector(&chunk.id, vector) {
                writes.rollback();
                return Err(e);
            }
            chunks.push(chunk);
        }
        writes.put_document(&doc.id);
        tracing::debug!(doc_id = %doc.id, chunks = chunks.len(), writes = writes.len(), "indexed document");
        writes.commit();

        let document = Document { id: doc.id.clone(), text: doc.text.clone(), granularity: doc.granularity, chunks, ..Document::default() };
        Ok(IndexResponse { document, failed_chunks })
    }

    /// Remove the document id and exactly the chunk ids it carries.
    pub fn delete_one(&self, doc: &Document) -> Result<DeleteResponse> {
        let mut writes = WriteSet::new(self.indexes);
        let mut response = DeleteResponse { document_removed: writes.remove_document(&doc.id), ..DeleteResponse::default() };
        for chunk_id in doc.chunk_ids() {
            if writes.remove_chunk(chunk_id) {
                response.chunks_removed += 1;
            } else {
                response.chunks_missing += 1;
            }
        }
        tracing::debug!(doc_id = %doc.id, ?response, "deleted document");
        writes.commit();
        Ok(response)
    }
}
