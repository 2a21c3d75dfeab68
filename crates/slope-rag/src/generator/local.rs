//! Local greedy decoding with a Qwen2 checkpoint on candle.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::generation::LogitsProcessor;
use candle_transformers::models::qwen2::{Config as Qwen2Config, ModelForCausalLM};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokenizers::Tokenizer;

use slope_core::error::Error;
use slope_embed::tokenize::load_tokenizer;
use slope_embed::{select_device, LazyModel};

use super::Generator;
use crate::prompt::GroundingPrompt;

const STOP_TOKENS: [&str; 2] = ["<|im_end|>", "<|endoftext|>"];

struct Loaded {
    model: Mutex<ModelForCausalLM>,
    tokenizer: Tokenizer,
    stop_ids: Vec<u32>,
}

struct Inner {
    device: Device,
    max_input_tokens: usize,
    max_output_tokens: usize,
    handle: LazyModel<Loaded>,
}

pub struct LocalGenerator {
    inner: Arc<Inner>,
}

impl LocalGenerator {
    pub fn new(model_dir: &Path, device: &str, max_input_tokens: usize, max_output_tokens: usize) -> Result<Self> {
        let config_path = model_dir.join("config.json");
        let tokenizer_path = model_dir.join("tokenizer.json");
        for p in [&config_path, &tokenizer_path] {
            if !p.exists() {
                return Err(Error::InvalidConfig(format!(
                    "no generation backend: local model artifact {} missing and no OpenAI-compatible endpoint configured",
                    p.display()
                ))
                .into());
            }
        }
        let config: Qwen2Config = serde_json::from_str(&std::fs::read_to_string(&config_path)?)?;
        let device = select_device(device)?;
        let dir = model_dir.to_path_buf();
        let dev = device.clone();
        let handle = LazyModel::new("generator", move || load(&dir, &config, &tokenizer_path, &dev));
        Ok(Self { inner: Arc::new(Inner { device, max_input_tokens, max_output_tokens, handle }) })
    }
}

fn weight_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let index = dir.join("model.safetensors.index.json");
    if index.exists() {
        let v: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&index)?)?;
        let map = v.get("weight_map").and_then(|m| m.as_object()).ok_or_else(|| anyhow!("weight_map missing in {}", index.display()))?;
        let mut files: Vec<PathBuf> = map.values().filter_map(|f| f.as_str()).map(|f| dir.join(f)).collect();
        files.sort();
        files.dedup();
        return Ok(files);
    }
    let single = dir.join("model.safetensors");
    if single.exists() {
        return Ok(vec![single]);
    }
    Err(anyhow!("no safetensors weights in {}", dir.display()))
}

fn load(dir: &Path, config: &Qwen2Config, tokenizer_path: &Path, device: &Device) -> Result<Loaded> {
    let tokenizer = load_tokenizer(tokenizer_path)?;
    let stop_ids = STOP_TOKENS.iter().filter_map(|t| tokenizer.token_to_id(t)).collect();
    let dtype = if device.is_cpu() { DType::F32 } else { DType::F16 };
    // SAFETY: the weight files are not modified while mapped.
    let vb = unsafe { VarBuilder::from_mmaped_safetensors(&weight_files(dir)?, dtype, device)? };
    let model = ModelForCausalLM::new(config, vb)?;
    Ok(Loaded { model: Mutex::new(model), tokenizer, stop_ids })
}

impl Inner {
    fn generate_blocking(&self, prompt: &str) -> Result<String> {
        let loaded = self.handle.get()?;
        let encoding = loaded.tokenizer.encode(prompt, false).map_err(|e| anyhow!("Tokenization failed: {}", e))?;
        let ids = encoding.get_ids();
        // keep the tail: the open assistant turn is at the end of the prompt
        let mut tokens: Vec<u32> = ids[ids.len().saturating_sub(self.max_input_tokens)..].to_vec();
        let prompt_len = tokens.len();
        if prompt_len == 0 {
            return Ok(String::new());
        }

        let mut model = loaded.model.lock().map_err(|_| anyhow!("generator model lock poisoned"))?;
        model.clear_kv_cache();
        let mut sampler = LogitsProcessor::new(0, None, None);
        let mut offset = 0usize;
        let mut input: Vec<u32> = tokens.clone();
        for _ in 0..self.max_output_tokens {
            let input_ids = Tensor::new(input.as_slice(), &self.device)?.unsqueeze(0)?;
            let logits = model.forward(&input_ids, offset)?;
            let logits = logits.squeeze(0)?.squeeze(0)?.to_dtype(DType::F32)?;
            offset += input.len();
            let next = sampler.sample(&logits)?;
            if loaded.stop_ids.contains(&next) {
                break;
            }
            tokens.push(next);
            input = vec![next];
        }
        let output = loaded.tokenizer.decode(&tokens[prompt_len..], true).map_err(|e| anyhow!("Detokenization failed: {}", e))?;
        tracing::info!(prompt_tokens = prompt_len, generated = tokens.len() - prompt_len, "Local generation finished");
        Ok(output)
    }
}

#[async_trait]
impl Generator for LocalGenerator {
    fn name(&self) -> &'static str { "local" }

    async fn generate(&self, prompt: &GroundingPrompt) -> Result<String> {
        let inner = self.inner.clone();
        let text = prompt.to_chatml();
        tokio::task::spawn_blocking(move || inner.generate_blocking(&text)).await?
    }
}
