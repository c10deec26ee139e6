//! Domain types shared by the segmenter, the indexes and the coordinators.

use serde::{Deserialize, Serialize};

use crate::error::{Error, ErrorKind};

pub type DocId = String;
pub type ChunkId = String;

/// A document flowing through the engine.
///
/// - `id`: externally assigned for top-level documents, derived for chunks
/// - `text`: the payload; may be empty for query-time documents
/// - `chunks`: sub-documents produced by segmentation (empty for leaves)
/// - `granularity`: depth in the parent/chunk hierarchy
/// - `matches`: ranked best-first, only populated on search responses
/// - `parent_id`: back-reference set on chunks
/// - `score`: similarity to the query, set on matches
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: DocId,
    pub text: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub chunks: Vec<Document>,
    #[serde(default)]
    pub granularity: u32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub matches: Vec<Document>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<DocId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f32>,
}

impl Document {
    pub fn new(id: impl Into<DocId>, text: impl Into<String>) -> Self {
        Self { id: id.into(), text: text.into(), ..Self::default() }
    }

    /// A bare document carrying only the chunk ids needed for a delete.
    pub fn with_chunks(id: impl Into<DocId>, chunks: Vec<Document>) -> Self {
        Self { id: id.into(), chunks, ..Self::default() }
    }

    pub fn chunk_ids(&self) -> impl Iterator<Item = &str> {
        self.chunks.iter().map(|c| c.id.as_str())
    }
}

/// What the chunk index stores per chunk id.
///
/// `parent_text` is captured at insert time so search roll-up never needs to
/// consult the document index, which only tracks existence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkPayload {
    pub text: String,
    pub parent_id: DocId,
    pub parent_text: String,
    pub granularity: u32,
}

/// A raw nearest-neighbour hit: `score` is cosine similarity, higher is better.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub id: ChunkId,
    pub score: f32,
}

/// Closed set of persisted index kinds; written as a tag into every index file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexKind {
    Document,
    Chunk,
    Vector,
}

impl std::fmt::Display for IndexKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            IndexKind::Document => "document",
            IndexKind::Chunk => "chunk",
            IndexKind::Vector => "vector",
        };
        f.pad(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemFailure {
    pub kind: ErrorKind,
    pub message: String,
}

impl From<&Error> for ItemFailure {
    fn from(err: &Error) -> Self {
        Self { kind: err.kind(), message: err.to_string() }
    }
}

impl From<Error> for ItemFailure {
    fn from(err: Error) -> Self {
        Self::from(&err)
    }
}

/// Outcome of one item of a batch, keyed by the item's document id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemReport<T> {
    pub id: DocId,
    pub outcome: std::result::Result<T, ItemFailure>,
}

/// Per-item results of a batch, in input order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchReport<T> {
    pub items: Vec<ItemReport<T>>,
}

impl<T> Default for BatchReport<T> {
    fn default() -> Self {
        Self { items: Vec::new() }
    }
}

impl<T> BatchReport<T> {
    pub fn push(&mut self, id: impl Into<DocId>, outcome: crate::error::Result<T>) {
        self.items.push(ItemReport { id: id.into(), outcome: outcome.map_err(ItemFailure::from) });
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn succeeded(&self) -> impl Iterator<Item = (&str, &T)> {
        self.items.iter().filter_map(|r| r.outcome.as_ref().ok().map(|v| (r.id.as_str(), v)))
    }

    pub fn failed(&self) -> impl Iterator<Item = (&str, &ItemFailure)> {
        self.items.iter().filter_map(|r| r.outcome.as_ref().err().map(|e| (r.id.as_str(), e)))
    }

    pub fn all_succeeded(&self) -> bool {
        self.items.iter().all(|r| r.outcome.is_ok())
    }

    /// Successful values in input order; failed items are skipped.
    pub fn into_values(self) -> Vec<T> {
        self.items.into_iter().filter_map(|r| r.outcome.ok()).collect()
    }
}
