//! Embedders for chunkdb.
//!
//! [`HashingEmbedder`] is the default: deterministic character features, no
//! model files needed. With the `model` feature a local BGE-M3 checkpoint can
//! be loaded through candle instead.

use chunkdb_core::config::{EmbedderConfig, EmbedderKind};
use chunkdb_core::{Embedder, Result};

pub mod hashing;
#[cfg(feature = "model")]
pub mod model;

pub use hashing::HashingEmbedder;
#[cfg(feature = "model")]
pub use model::ModelEmbedder;

pub fn embedder_from_config(config: &EmbedderConfig) -> Result<Box<dyn Embedder>> {
    match config.kind {
        EmbedderKind::Hashing => {
            tracing::debug!(dim = config.dim, "using hashing embedder");
            Ok(Box::new(HashingEmbedder::new(config.dim)?))
        }
        #[cfg(feature = "model")]
        EmbedderKind::Model => Ok(Box::new(ModelEmbedder::load(config)?)),
        #[cfg(not(feature = "model"))]
        EmbedderKind::Model => Err(chunkdb_core::Error::InvalidConfig(
            "embedder.kind = \"model\" requires chunkdb-embed to be built with the `model` feature".into(),
        )),
    }
}

/// Scale `v` to unit length; an all-zero vector is left untouched.
pub fn l2_normalize(v: &mut [f32]) {
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in v.iter_mut() { *x /= norm; }
    }
}

pub(crate) fn preview(text: &str) -> String {
    let mut out: String = text.chars().take(32).collect();
    if text.chars().count() > 32 { out.push('…'); }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chunkdb_core::Error;

    #[test]
    fn model_kind_needs_feature() {
        let config = EmbedderConfig { kind: EmbedderKind::Model, ..EmbedderConfig::default() };
        let result = embedder_from_config(&config);
        if cfg!(feature = "model") {
            // no model directory configured in tests
            assert!(result.is_err());
        } else {
            assert!(matches!(result, Err(Error::InvalidConfig(_))));
        }
    }
}
