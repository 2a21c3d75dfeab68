use anyhow::{anyhow, Result};
use candle_core::{Device, Tensor};
use tokenizers::{Encoding, Tokenizer};

/// Model inputs for one padded batch, all shaped `[B, T]`.
pub struct Batch {
    pub input_ids: Tensor,
    pub type_ids: Tensor,
    pub attention_mask: Tensor,
}

pub fn load_tokenizer(path: &std::path::Path) -> Result<Tokenizer> {
    Tokenizer::from_file(path).map_err(|e| anyhow!("Failed to load tokenizer from {}: {}", path.display(), e))
}

pub fn encode_texts(tokenizer: &Tokenizer, texts: &[String]) -> Result<Vec<Encoding>> {
    texts
        .iter()
        .map(|t| tokenizer.encode(t.as_str(), true).map_err(|e| anyhow!("Tokenization failed: {}", e)))
        .collect()
}

/// Encode `(query, passage)` pairs with the tokenizer's pair template.
pub fn encode_pairs(tokenizer: &Tokenizer, query: &str, passages: &[String]) -> Result<Vec<Encoding>> {
    passages
        .iter()
        .map(|p| tokenizer.encode((query, p.as_str()), true).map_err(|e| anyhow!("Tokenization failed: {}", e)))
        .collect()
}

/// Truncate to `max_len`, right-pad to the longest sequence with `pad_id`.
pub fn to_batch(encodings: &[Encoding], max_len: usize, pad_id: u32, device: &Device) -> Result<Batch> {
    let seq_len = encodings.iter().map(|e| e.get_ids().len().min(max_len)).max().unwrap_or(0).max(1);
    let rows = encodings.len();
    let mut ids = Vec::with_capacity(rows * seq_len);
    let mut types = Vec::with_capacity(rows * seq_len);
    let mut mask = Vec::with_capacity(rows * seq_len);
    for enc in encodings {
        let n = enc.get_ids().len().min(max_len);
        ids.extend_from_slice(&enc.get_ids()[..n]);
        types.extend_from_slice(&enc.get_type_ids()[..n]);
        mask.extend_from_slice(&enc.get_attention_mask()[..n]);
        let pad = seq_len - n;
        ids.extend(std::iter::repeat(pad_id).take(pad));
        types.extend(std::iter::repeat(0).take(pad));
        mask.extend(std::iter::repeat(0).take(pad));
    }
    Ok(Batch {
        input_ids: Tensor::from_vec(ids, (rows, seq_len), device)?,
        type_ids: Tensor::from_vec(types, (rows, seq_len), device)?,
        attention_mask: Tensor::from_vec(mask, (rows, seq_len), device)?,
    })
}
