use std::path::Path;

use chunkdb_core::{IndexKind, Result};
use chunkdb_store::{persist, ChunkIndex, DocumentIndex, PersistentIndex};
use chunkdb_vector::VectorIndex;

/// Any of the persisted index kinds, as reopened by [`load_index`].
pub enum AnyIndex {
    Document(DocumentIndex),
    Chunk(ChunkIndex),
    Vector(VectorIndex),
}

impl AnyIndex {
    pub fn as_index(&self) -> &dyn PersistentIndex {
        match self {
            AnyIndex::Document(index) => index,
            AnyIndex::Chunk(index) => index,
            AnyIndex::Vector(index) => index,
        }
    }

    pub fn kind(&self) -> IndexKind { self.as_index().kind() }

    pub fn size(&self) -> usize { self.as_index().size() }
}

/// Reopen an index file, picking the index type from the file's kind tag.
pub fn load_index(path: impl AsRef<Path>) -> Result<AnyIndex> {
    let path = path.as_ref();
    let index = match persist::read_kind(path)? {
        IndexKind::Document => AnyIndex::Document(DocumentIndex::open(path)?),
        IndexKind::Chunk => AnyIndex::Chunk(ChunkIndex::open(path)?),
        IndexKind::Vector => AnyIndex::Vector(VectorIndex::load(path)?),
    };
    tracing::debug!(path = %path.display(), kind = %index.kind(), size = index.size(), "loaded index");
    Ok(index)
}
