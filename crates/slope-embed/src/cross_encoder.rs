//! bge-reranker style cross-encoder on candle's XLM-RoBERTa.

use anyhow::Result;
use candle_core::{DType, Device};
use candle_transformers::models::xlm_roberta::{Config as XLMRobertaConfig, XLMRobertaForSequenceClassification};
use std::path::{Path, PathBuf};
use tokenizers::Tokenizer;

use slope_core::error::Error;
use slope_core::traits::RelevanceScorer;

use crate::bert::var_builder;
use crate::lazy::LazyModel;
use crate::tokenize::{encode_pairs, load_tokenizer, to_batch};

const BATCH_SIZE: usize = 8;
const MAX_LEN: usize = 512;

struct Loaded {
    model: XLMRobertaForSequenceClassification,
    tokenizer: Tokenizer,
    pad_id: u32,
}

pub struct CrossEncoderScorer {
    device: Device,
    handle: LazyModel<Loaded>,
}

impl CrossEncoderScorer {
    pub fn new(model_dir: &Path, device: Device) -> Result<Self> {
        let config_path = model_dir.join("config.json");
        let tokenizer_path = model_dir.join("tokenizer.json");
        for p in [&config_path, &tokenizer_path] {
            if !p.exists() {
                return Err(Error::NotFound(format!("reranker model artifact {}", p.display())).into());
            }
        }
        let config: XLMRobertaConfig = serde_json::from_str(&std::fs::read_to_string(&config_path)?)?;
        let dir = model_dir.to_path_buf();
        let dev = device.clone();
        let handle = LazyModel::new("reranker", move || load(&dir, &config, &tokenizer_path, &dev));
        Ok(Self { device, handle })
    }
}

fn load(dir: &Path, config: &XLMRobertaConfig, tokenizer_path: &PathBuf, device: &Device) -> Result<Loaded> {
    let tokenizer = load_tokenizer(tokenizer_path)?;
    let pad_id = tokenizer.get_padding().map(|p| p.pad_id).unwrap_or(1);
    let model = XLMRobertaForSequenceClassification::new(1, config, var_builder(dir, device)?)?;
    Ok(Loaded { model, tokenizer, pad_id })
}

impl RelevanceScorer for CrossEncoderScorer {
    fn score(&self, query: &str, passages: &[String]) -> Result<Vec<f32>> {
        let loaded = self.handle.get()?;
        let mut scores = Vec::with_capacity(passages.len());
        for batch in passages.chunks(BATCH_SIZE) {
            let encodings = encode_pairs(&loaded.tokenizer, query, batch)?;
            let inputs = to_batch(&encodings, MAX_LEN, loaded.pad_id, &self.device)?;
            let logits = loaded.model.forward(&inputs.input_ids, &inputs.attention_mask, &inputs.type_ids)?;
            let logits: Vec<f32> = logits.flatten_all()?.to_dtype(DType::F32)?.to_vec1()?;
            scores.extend(logits);
        }
        Ok(scores)
    }
}
