use std::hash::Hasher;

use twox_hash::XxHash64;

use crate::config::SegmenterConfig;
use crate::types::{ChunkId, Document};

/// Splits a document's text into ordered chunk documents.
#[derive(Debug, Clone, Default)]
pub struct Segmenter {
    config: SegmenterConfig,
}

impl Segmenter {
    pub fn new(config: SegmenterConfig) -> Self { Self { config } }

    pub fn config(&self) -> &SegmenterConfig { &self.config }

    /// Produce the chunks of `parent` without touching it.
    ///
    /// Each chunk sits one level below its parent and points back at it.
    /// Empty text yields no chunks.
    pub fn segment(&self, parent: &Document) -> Vec<Document> {
        let mut chunks = Vec::new();
        for raw in parent.text.split(self.config.delimiter.as_str()) {
            let segment = if self.config.trim { raw.trim() } else { raw };
            if segment.is_empty() || segment.chars().count() < self.config.min_chars { continue; }
            let position = chunks.len();
            chunks.push(Document {
                id: chunk_id(&parent.id, position, segment),
                text: segment.to_string(),
                granularity: parent.granularity + 1,
                parent_id: Some(parent.id.clone()),
                ..Document::default()
            });
        }
        chunks
    }
}

/// Chunk identity: xxHash64 over parent id, position and content.
pub fn chunk_id(parent_id: &str, position: usize, text: &str) -> ChunkId {
    let mut hasher = XxHash64::with_seed(0);
    hasher.write(parent_id.as_bytes());
    hasher.write_u8(0);
    hasher.write_u64(position as u64);
    hasher.write(text.as_bytes());
    format!("{:016x}", hasher.finish())
}
