//! BGE-M3 (XLM-RoBERTa) embeddings through candle.
//!
//! Expects `tokenizer.json`, `config.json` and `pytorch_model.bin` in the
//! configured model directory (or `$CHUNKDB_MODEL_DIR`, or `models/bge-m3`).

use std::path::{Path, PathBuf};
use std::time::Instant;

use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::xlm_roberta::{Config as XLMRobertaConfig, XLMRobertaModel};
use tokenizers::Tokenizer;

use chunkdb_core::config::EmbedderConfig;
use chunkdb_core::{Embedder, Error, Result};

use crate::preview;

pub struct ModelEmbedder {
    model: XLMRobertaModel,
    tokenizer: Tokenizer,
    device: Device,
    dim: usize,
    max_len: usize,
}

fn load_err(what: &str, e: impl std::fmt::Display) -> Error {
    Error::InvalidConfig(format!("failed to load {what}: {e}"))
}

impl ModelEmbedder {
    pub fn load(config: &EmbedderConfig) -> Result<Self> {
        let device = select_device();
        let model_dir = resolve_model_dir(config.model_dir.as_deref())?;
        tracing::info!(dir = %model_dir.display(), "loading BGE-M3 model");

        let tokenizer_path = model_dir.join("tokenizer.json");
        let tokenizer = Tokenizer::from_file(&tokenizer_path).map_err(|e| load_err("tokenizer", e))?;

        let config_path = model_dir.join("config.json");
        let raw = std::fs::read_to_string(&config_path).map_err(|e| Error::io(&config_path, e))?;
        let model_config: XLMRobertaConfig = serde_json::from_str(&raw)?;
        if model_config.hidden_size != config.dim {
            return Err(Error::InvalidConfig(format!(
                "embedder.dim is {} but the model produces {}",
                config.dim, model_config.hidden_size
            )));
        }

        let weights = candle_core::pickle::read_all(model_dir.join("pytorch_model.bin")).map_err(|e| load_err("weights", e))?;
        let weights: std::collections::HashMap<String, Tensor> = weights.into_iter().collect();
        let vb = VarBuilder::from_tensors(weights, DType::F32, &device);
        let model = XLMRobertaModel::new(&model_config, vb).map_err(|e| load_err("model", e))?;
        tracing::info!(dim = config.dim, "BGE-M3 model loaded");
        Ok(Self { model, tokenizer, device, dim: config.dim, max_len: config.max_len })
    }

    fn forward(&self, text: &str) -> candle_core::Result<Vec<f32>> {
        let (input_ids, attention_mask) = tokenize_on_device(&self.tokenizer, text, self.max_len, &self.device)?;
        let token_type_ids = Tensor::zeros((1, self.max_len), DType::I64, &self.device)?;
        let hidden = self.model.forward(&input_ids, &attention_mask, &token_type_ids, None, None, None)?;
        let pooled = masked_mean_l2(&hidden, &attention_mask)?;
        pooled.to_device(&Device::Cpu)?.squeeze(0)?.to_vec1()
    }
}

impl Embedder for ModelEmbedder {
    fn dim(&self) -> usize { self.dim }

    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        if text.trim().is_empty() {
            return Err(Error::embedding(preview(text), "empty text"));
        }
        let start = Instant::now();
        let v = self.forward(text).map_err(|e| Error::embedding(preview(text), e.to_string()))?;
        tracing::trace!(elapsed_ms = start.elapsed().as_millis() as u64, "embedded chunk");
        Ok(v)
    }

    fn id(&self) -> String { format!("bge-m3:d{}", self.dim) }
}

fn select_device() -> Device {
    #[cfg(feature = "metal")]
    {
        if let Ok(dev) = Device::new_metal(0) {
            tracing::info!("device: Metal (MPS)");
            return dev;
        }
    }
    tracing::info!("device: CPU");
    Device::Cpu
}

fn tokenize_on_device(tokenizer: &Tokenizer, text: &str, max_len: usize, device: &Device) -> candle_core::Result<(Tensor, Tensor)> {
    let enc = tokenizer.encode(text, true).map_err(|e| candle_core::Error::Msg(format!("tokenization failed: {e}")))?;
    let mut ids = enc.get_ids().to_vec();
    let mut mask = enc.get_attention_mask().to_vec();
    ids.truncate(max_len);
    mask.truncate(max_len);
    if ids.len() < max_len {
        let pad = max_len - ids.len();
        ids.extend(std::iter::repeat(1).take(pad));
        mask.extend(std::iter::repeat(0).take(pad));
    }
    let input_ids = Tensor::from_iter(ids, device)?.reshape((1, max_len))?;
    let attention_mask = Tensor::from_iter(mask, device)?.reshape((1, max_len))?;
    Ok((input_ids, attention_mask))
}

/// Mean over unmasked tokens of `[B,T,H]`, then L2 normalisation per row.
pub fn masked_mean_l2(hidden: &Tensor, attention_mask: &Tensor) -> candle_core::Result<Tensor> {
    let hidden_dim = hidden.dims()[2];
    let mask = attention_mask.to_device(hidden.device())?.to_dtype(hidden.dtype())?;
    let mask_3d = mask.unsqueeze(2)?;
    let mask_broadcast = match mask_3d.broadcast_as(hidden.shape()) {
        Ok(m) => m,
        Err(_) => mask_3d.repeat((1, 1, hidden_dim))?,
    };
    let sum = (hidden * &mask_broadcast)?.sum(1)?;
    let lengths = mask.sum(1)?.unsqueeze(1)?.to_dtype(sum.dtype())?;
    let mean = sum.broadcast_div(&lengths)?;
    let eps_val = match hidden.dtype() { DType::F16 => 1e-6f32, _ => 1e-12f32 };
    let eps = Tensor::new(&[eps_val], hidden.device())?.to_dtype(hidden.dtype())?.unsqueeze(0)?;
    let norm = mean.sqr()?.sum_keepdim(1)?.sqrt()?.broadcast_add(&eps)?;
    mean.broadcast_div(&norm)
}

fn resolve_model_dir(configured: Option<&Path>) -> Result<PathBuf> {
    let candidates = configured
        .map(Path::to_path_buf)
        .into_iter()
        .chain(std::env::var("CHUNKDB_MODEL_DIR").ok().map(PathBuf::from))
        .chain([PathBuf::from("models/bge-m3"), PathBuf::from("../models/bge-m3")]);
    for dir in candidates {
        if dir.exists() { return Ok(dir); }
        tracing::debug!(dir = %dir.display(), "model dir not found");
    }
    Err(Error::InvalidConfig("could not locate the BGE-M3 model directory".into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn masked_mean_l2_ignores_padding() {
        let dev = Device::Cpu;
        let h = Tensor::from_slice(&[1.0f32, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0], (1, 2, 4), &dev).unwrap();
        let mask = Tensor::from_slice(&[1f32, 0f32], (1, 2), &dev).unwrap();
        let out: Vec<Vec<f32>> = masked_mean_l2(&h, &mask).unwrap().to_vec2().unwrap();
        let norm = 30f32.sqrt();
        for (a, b) in out[0].iter().zip([1.0 / norm, 2.0 / norm, 3.0 / norm, 4.0 / norm]) {
            assert!((a - b).abs() < 1e-5, "a={a} b={b}");
        }
    }
}
