//! Deterministic stand-ins for the model services, used by tests and by
//! `use_fake_models = true`.

use anyhow::Result;
use std::collections::HashSet;
use std::hash::{Hash, Hasher};
use twox_hash::XxHash64;

use slope_core::traits::{Embedder, RelevanceScorer};

use crate::pool::l2_normalize_vec;

pub const FAKE_DIM: usize = 1024;

/// Lower-cased ASCII word runs; every other alphanumeric char is its own term.
pub fn terms(text: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut word = String::new();
    for c in text.chars() {
        if c.is_ascii_alphanumeric() {
            word.push(c.to_ascii_lowercase());
            continue;
        }
        if !word.is_empty() {
            out.push(std::mem::take(&mut word));
        }
        if c.is_alphanumeric() {
            out.push(c.to_string());
        }
    }
    if !word.is_empty() {
        out.push(word);
    }
    out
}

/// Hashed bag-of-terms; texts sharing terms land close together.
pub struct HashEmbedder {
    dim: usize,
}

impl HashEmbedder {
    pub fn new(dim: usize) -> Self { Self { dim: dim.max(1) } }

    fn embed(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0f32; self.dim];
        for (i, token) in terms(text).iter().enumerate() {
            let mut hasher = XxHash64::with_seed(0);
            token.hash(&mut hasher);
            let h = hasher.finish();
            let idx = (h as usize) % self.dim;
            let val = 0.5 + (((h >> 32) as u32) as f32) / (u32::MAX as f32);
            v[idx] += val + (i as f32 % 3.0) * 0.01;
        }
        l2_normalize_vec(&mut v);
        v
    }
}

impl Default for HashEmbedder {
    fn default() -> Self { Self::new(FAKE_DIM) }
}

impl Embedder for HashEmbedder {
    fn dim(&self) -> usize { self.dim }

    fn max_len(&self) -> usize { usize::MAX }

    fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed(t)).collect())
    }

    fn embed_query(&self, query: &str) -> Result<Vec<f32>> {
        Ok(self.embed(query))
    }
}

/// Fraction of distinct query terms present in the passage.
#[derive(Default)]
pub struct TermOverlapScorer;

impl RelevanceScorer for TermOverlapScorer {
    fn score(&self, query: &str, passages: &[String]) -> Result<Vec<f32>> {
        let q: HashSet<String> = terms(query).into_iter().collect();
        if q.is_empty() {
            return Ok(vec![0.0; passages.len()]);
        }
        Ok(passages
            .iter()
            .map(|p| {
                let p: HashSet<String> = terms(p).into_iter().collect();
                q.intersection(&p).count() as f32 / q.len() as f32
            })
            .collect())
    }
}
