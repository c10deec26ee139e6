//! chunkdb-core
//!
//! Shared vocabulary of the workspace: documents and chunk payloads, the error
//! taxonomy, the [`traits::Embedder`] seam, configuration and the segmenter.

#![deny(warnings)]
#![deny(dead_code)]
#![deny(unused_variables)]
#![deny(unused_imports)]

pub mod config;
pub mod error;
pub mod segmenter;
pub mod traits;
pub mod types;

pub use config::EngineConfig;
pub use error::{Error, ErrorKind, Result};
pub use segmenter::Segmenter;
pub use traits::Embedder;
pub use types::{BatchReport, ChunkPayload, Document, IndexKind, ItemFailure, SearchHit};
