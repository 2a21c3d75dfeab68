use anyhow::{bail, Result};
use candle_core::{DType, IndexOp, Tensor};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pooling {
    /// First token's hidden state (BGE models).
    Cls,
    /// Mean over unmasked tokens.
    Mean,
}

impl Pooling {
    /// Read `1_Pooling/config.json` when the model ships one; CLS otherwise.
    pub fn from_model_dir(dir: &std::path::Path) -> Self {
        let path = dir.join("1_Pooling").join("config.json");
        let Ok(raw) = std::fs::read_to_string(&path) else { return Pooling::Cls };
        let Ok(v) = serde_json::from_str::<serde_json::Value>(&raw) else { return Pooling::Cls };
        if v.get("pooling_mode_mean_tokens").and_then(|b| b.as_bool()).unwrap_or(false) {
            Pooling::Mean
        } else {
            Pooling::Cls
        }
    }

    pub fn apply(self, hidden: &Tensor, attention_mask: &Tensor) -> Result<Tensor> {
        match self {
            Pooling::Cls => cls_l2(hidden),
            Pooling::Mean => masked_mean_l2(hidden, attention_mask),
        }
    }
}

fn check_rank(hidden: &Tensor) -> Result<(usize, usize)> {
    let dims = hidden.dims();
    if dims.len() != 3 {
        bail!("hidden shape must be [B,T,H], got {:?}", dims);
    }
    Ok((dims[0], dims[2]))
}

pub fn cls_l2(hidden: &Tensor) -> Result<Tensor> {
    check_rank(hidden)?;
    let cls = hidden.i((.., 0))?.contiguous()?;
    l2_normalize(&cls)
}

pub fn masked_mean_l2(hidden: &Tensor, attention_mask: &Tensor) -> Result<Tensor> {
    let (batch, hidden_dim) = check_rank(hidden)?;
    let mask = attention_mask.to_device(hidden.device())?.to_dtype(hidden.dtype())?;
    let mask_broadcast = mask.unsqueeze(2)?.broadcast_as(hidden.shape())?;
    let sum = (hidden * &mask_broadcast)?.sum(1)?;
    let lengths = mask.sum(1)?.unsqueeze(1)?.to_dtype(sum.dtype())?;
    let mean = sum.broadcast_div(&lengths)?;
    let out = l2_normalize(&mean)?;
    if out.dims() != [batch, hidden_dim] {
        bail!("pooled shape {:?} != [{}, {}]", out.dims(), batch, hidden_dim);
    }
    Ok(out)
}

pub fn l2_normalize(v: &Tensor) -> Result<Tensor> {
    let eps_val = match v.dtype() { DType::F16 => 1e-6f32, _ => 1e-12f32 };
    let eps = Tensor::new(&[eps_val], v.device())?.to_dtype(v.dtype())?.unsqueeze(0)?;
    let norm = v.sqr()?.sum_keepdim(1)?.sqrt()?.broadcast_add(&eps)?;
    Ok(v.broadcast_div(&norm)?)
}

/// Re-normalise a plain vector in place; zero vectors stay zero.
pub fn l2_normalize_vec(v: &mut [f32]) {
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
}
