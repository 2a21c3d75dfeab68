//! BGE bi-encoder on candle's BERT.

use anyhow::{anyhow, Result};
use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config as BertConfig};
use std::path::{Path, PathBuf};
use tokenizers::Tokenizer;

use slope_core::error::Error;
use slope_core::traits::Embedder;

use crate::lazy::LazyModel;
use crate::pool::Pooling;
use crate::tokenize::{encode_texts, load_tokenizer, to_batch};

const BATCH_SIZE: usize = 16;
const MAX_LEN: usize = 512;

struct Loaded {
    model: BertModel,
    tokenizer: Tokenizer,
    pad_id: u32,
}

pub struct BgeEmbedder {
    dim: usize,
    max_len: usize,
    instruction: String,
    pooling: Pooling,
    device: Device,
    handle: LazyModel<Loaded>,
}

impl BgeEmbedder {
    /// Validates the model directory eagerly; weights load on first embed.
    pub fn new(model_dir: &Path, instruction: impl Into<String>, device: Device) -> Result<Self> {
        let config_path = model_dir.join("config.json");
        let tokenizer_path = model_dir.join("tokenizer.json");
        for p in [&config_path, &tokenizer_path] {
            if !p.exists() {
                return Err(Error::NotFound(format!("embedding model artifact {}", p.display())).into());
            }
        }
        let config: BertConfig = serde_json::from_str(&std::fs::read_to_string(&config_path)?)?;
        let max_len = config.max_position_embeddings.min(MAX_LEN);
        let dim = config.hidden_size;
        let pooling = Pooling::from_model_dir(model_dir);
        let dir = model_dir.to_path_buf();
        let dev = device.clone();
        let handle = LazyModel::new("embedder", move || load(&dir, &config, &tokenizer_path, &dev));
        Ok(Self { dim, max_len, instruction: instruction.into(), pooling, device, handle })
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let loaded = self.handle.get()?;
        let encodings = encode_texts(&loaded.tokenizer, texts)?;
        let batch = to_batch(&encodings, self.max_len, loaded.pad_id, &self.device)?;
        let hidden = loaded.model.forward(&batch.input_ids, &batch.type_ids, Some(&batch.attention_mask))?;
        let pooled = self.pooling.apply(&hidden, &batch.attention_mask)?;
        Ok(pooled.to_dtype(DType::F32)?.to_device(&Device::Cpu)?.to_vec2()?)
    }
}

fn load(dir: &Path, config: &BertConfig, tokenizer_path: &PathBuf, device: &Device) -> Result<Loaded> {
    let tokenizer = load_tokenizer(tokenizer_path)?;
    let pad_id = tokenizer.get_padding().map(|p| p.pad_id).unwrap_or(0);
    let vb = var_builder(dir, device)?;
    let model = BertModel::load(vb, config)?;
    Ok(Loaded { model, tokenizer, pad_id })
}

/// Prefer `model.safetensors`; fall back to a pickled `pytorch_model.bin`.
pub(crate) fn var_builder(dir: &Path, device: &Device) -> Result<VarBuilder<'static>> {
    let safetensors = dir.join("model.safetensors");
    if safetensors.exists() {
        // SAFETY: the weights file is not modified while mapped.
        let vb = unsafe { VarBuilder::from_mmaped_safetensors(&[safetensors], DType::F32, device)? };
        return Ok(vb);
    }
    let bin = dir.join("pytorch_model.bin");
    if !bin.exists() {
        return Err(anyhow!("no model weights in {}", dir.display()));
    }
    let weights = candle_core::pickle::read_all(&bin)?;
    let weights_map: std::collections::HashMap<String, Tensor> = weights.into_iter().collect();
    Ok(VarBuilder::from_tensors(weights_map, DType::F32, device))
}

impl Embedder for BgeEmbedder {
    fn dim(&self) -> usize { self.dim }

    fn max_len(&self) -> usize { self.max_len }

    fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut out = Vec::with_capacity(texts.len());
        for batch in texts.chunks(BATCH_SIZE) {
            out.extend(self.embed_batch(batch)?);
        }
        Ok(out)
    }

    fn embed_query(&self, query: &str) -> Result<Vec<f32>> {
        let text = format!("{}{}", self.instruction, query);
        self.embed_batch(&[text])?.pop().ok_or_else(|| anyhow!("empty embedding batch"))
    }
}
