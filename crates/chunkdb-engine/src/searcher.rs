use rayon::prelude::*;
use rayon::ThreadPool;
use serde::{Deserialize, Serialize};

use chunkdb_core::{BatchReport, ChunkPayload, Document, Embedder, ErrorKind, Result, SearchHit};

use crate::indexes::Indexes;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchOptions {
    /// Maximum number of matches per query.
    pub k: usize,
}

impl SearchOptions {
    pub fn top_k(k: usize) -> Self { Self { k } }
}

/// Answers chunk-level queries with matches rolled up to their parent documents.
pub struct Searcher<'a> {
    indexes: &'a Indexes,
    embedder: &'a dyn Embedder,
    pool: Option<&'a ThreadPool>,
}

impl<'a> Searcher<'a> {
    pub fn new(indexes: &'a Indexes, embedder: &'a dyn Embedder) -> Self {
        Self { indexes, embedder, pool: None }
    }

    pub fn with_pool(mut self, pool: &'a ThreadPool) -> Self {
        self.pool = Some(pool);
        self
    }

    /// One response per query, in input order.
    pub fn search(&self, queries: &[Document], options: &SearchOptions) -> BatchReport<Document> {
        let outcomes: Vec<Result<Document>> = match self.pool {
            Some(pool) => pool.install(|| queries.par_iter().map(|q| self.search_one(q, options)).collect()),
            None => queries.iter().map(|q| self.search_one(q, options)).collect(),
        };
        let mut report = BatchReport::default();
        for (query, outcome) in queries.iter().zip(outcomes) {
            if let Err(e) = &outcome {
                tracing::warn!(query_id = %query.id, error = %e, "query failed");
            }
            report.push(query.id.clone(), outcome);
        }
        report
    }

    /// Queries are taken as already chunk-sized and are not segmented.
    ///
    /// Each match carries the parent's id and full text, the similarity score
    /// and, as its only chunk, the chunk that matched. A hit whose payload is
    /// missing while its vector is still stored is reported as `NotFound`; a
    /// hit whose vector vanished too was deleted after the scan and is skipped.
    pub fn search_one(&self, query: &Document, options: &SearchOptions) -> Result<Document> {
        let embedding = self.embedder.embed(&query.text)?;
        let mut fetch = options.k;
        let matches = loop {
            let hits = self.indexes.vectors.search(&embedding, fetch)?;
            let exhausted = hits.len() < fetch;
            let mut matches = Vec::with_capacity(hits.len());
            let mut vanished = 0;
            for hit in hits {
                match self.indexes.chunks.get(&hit.id) {
                    Ok(payload) => matches.push(to_match(query, hit, payload)),
                    Err(e) if e.kind() == ErrorKind::NotFound && !self.indexes.vectors.contains(&hit.id) => {
                        tracing::debug!(query_id = %query.id, chunk_id = %hit.id, "hit deleted during search");
                        vanished += 1;
                    }
                    Err(e) => return Err(e),
                }
            }
            if vanished == 0 || exhausted || matches.len() >= options.k {
                matches.truncate(options.k);
                break matches;
            }
            fetch += vanished;
        };
        tracing::debug!(query_id = %query.id, k = options.k, matches = matches.len(), "searched");
        Ok(Document { id: query.id.clone(), text: query.text.clone(), granularity: 0, matches, ..Document::default() })
    }
}

fn to_match(query: &Document, hit: SearchHit, payload: ChunkPayload) -> Document {
    let chunk = Document {
        id: hit.id,
        text: payload.text,
        granularity: payload.granularity,
        parent_id: Some(payload.parent_id.clone()),
        score: Some(hit.score),
        ..Document::default()
    };
    Document {
        id: payload.parent_id,
        text: payload.parent_text,
        granularity: query.granularity,
        chunks: vec![chunk],
        score: Some(hit.score),
        ..Document::default()
    }
}
