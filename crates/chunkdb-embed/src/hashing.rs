use std::hash::Hasher;

use twox_hash::XxHash64;

use chunkdb_core::{Embedder, Error, Result};

use crate::{l2_normalize, preview};

/// Deterministic character-feature embedder.
///
/// The first half of the vector counts non-whitespace characters, bucketed by
/// code point, so ASCII characters never collide once `dim >= 256`. The second
/// half holds xxHash64-bucketed character bigrams taken within whitespace
/// tokens at half weight. The result is L2-normalised.
#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    dim: usize,
}

const BIGRAM_WEIGHT: f32 = 0.5;

impl HashingEmbedder {
    pub fn new(dim: usize) -> Result<Self> {
        if dim < 2 || dim % 2 != 0 {
            return Err(Error::InvalidConfig(format!("hashing embedder needs a positive even dim, got {dim}")));
        }
        Ok(Self { dim })
    }

    fn bigram_bucket(&self, a: char, b: char) -> usize {
        let mut hasher = XxHash64::with_seed(0);
        hasher.write_u32(a as u32);
        hasher.write_u32(b as u32);
        let half = self.dim / 2;
        half + (hasher.finish() % half as u64) as usize
    }
}

impl Embedder for HashingEmbedder {
    fn dim(&self) -> usize { self.dim }

    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let half = self.dim / 2;
        let mut v = vec![0f32; self.dim];
        let mut features = 0usize;
        for token in text.split_whitespace() {
            let chars: Vec<char> = token.chars().collect();
            for c in &chars {
                v[*c as usize % half] += 1.0;
                features += 1;
            }
            for pair in chars.windows(2) {
                v[self.bigram_bucket(pair[0], pair[1])] += BIGRAM_WEIGHT;
            }
        }
        if features == 0 {
            return Err(Error::embedding(preview(text), "text has no embeddable characters"));
        }
        l2_normalize(&mut v);
        Ok(v)
    }

    fn id(&self) -> String { format!("hashing:d{}", self.dim) }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cosine(a: &[f32], b: &[f32]) -> f32 { a.iter().zip(b).map(|(x, y)| x * y).sum() }

    #[test]
    fn shared_characters_score_higher() {
        let e = HashingEmbedder::new(256).unwrap();
        let q = e.embed("m").unwrap();
        let hit = e.embed("w mno").unwrap();
        let miss = e.embed("c jk").unwrap();
        assert!(cosine(&q, &hit) > 0.4);
        assert_eq!(cosine(&q, &miss), 0.0);
    }

    #[test]
    fn rejects_odd_dims() {
        assert!(HashingEmbedder::new(0).is_err());
        assert!(HashingEmbedder::new(255).is_err());
    }
}
