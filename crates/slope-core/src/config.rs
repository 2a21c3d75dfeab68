//! Typed settings.
//!
//! Figment layers built-in defaults, `config.toml`, `config.<env>.toml` and
//! `APP_*` environment variables, in that order. Path-valued settings go
//! through [`expand_path`] when read.

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::chunker::ChunkingConfig;
use crate::error::{Error, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    // models
    pub sft_model_id: String,
    pub embedding_model_id: String,
    pub reranker_model_id: String,
    pub query_instruction: String,
    pub use_fake_models: bool,
    pub device: String,

    // OpenAI-compatible generation endpoint; absent => local model
    pub openai_base_url: Option<String>,
    pub openai_api_key: Option<String>,
    pub openai_model: String,

    // remote lexical backend; absent => local BM25
    pub elasticsearch_url: Option<String>,

    pub weather_api_url: String,
    pub weather_api_key: String,

    pub max_input_tokens: usize,
    pub max_output_tokens: usize,
    pub max_ctx_tokens: usize,

    pub retrieve_k: usize,
    pub rerank_top_n: usize,
    pub chunk_size: usize,
    pub chunk_overlap: usize,

    pub data_dir: String,
    pub index_dir: String,

    pub embed_timeout_secs: u64,
    pub rerank_timeout_secs: u64,
    pub generation_timeout_secs: u64,
    pub search_timeout_secs: u64,
    pub tool_timeout_secs: u64,

    pub host: String,
    pub port: u16,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            sft_model_id: "./models/sft_model".to_string(),
            embedding_model_id: "./models/bge-large-zh-v1.5".to_string(),
            reranker_model_id: "./models/bge-reranker-large".to_string(),
            query_instruction: "为这个句子生成表示以用于检索相关文章：".to_string(),
            use_fake_models: false,
            device: "cpu".to_string(),
            openai_base_url: None,
            openai_api_key: None,
            openai_model: "default".to_string(),
            elasticsearch_url: None,
            weather_api_url: "https://api.weatherapi.com/v1".to_string(),
            weather_api_key: "mock_key".to_string(),
            max_input_tokens: 2048,
            max_output_tokens: 1024,
            max_ctx_tokens: 1500,
            retrieve_k: 50,
            rerank_top_n: 5,
            chunk_size: 512,
            chunk_overlap: 50,
            data_dir: "data/sample_docs".to_string(),
            index_dir: "data/index".to_string(),
            embed_timeout_secs: 60,
            rerank_timeout_secs: 60,
            generation_timeout_secs: 180,
            search_timeout_secs: 10,
            tool_timeout_secs: 10,
            host: "0.0.0.0".to_string(),
            port: 8000,
        }
    }
}

impl Settings {
    /// Load settings for the environment named by `RUST_ENV` (default `dev`).
    pub fn load() -> anyhow::Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());
        Self::extract(figment_for_env(&env_name))
    }

    pub fn extract(figment: Figment) -> anyhow::Result<Self> {
        let settings: Settings = figment
            .extract()
            .map_err(|e| anyhow::anyhow!("Failed to load settings: {}", e))?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        self.chunking().validate()?;
        if self.retrieve_k == 0 {
            return Err(Error::InvalidConfig("retrieve_k must be > 0".to_string()));
        }
        if self.rerank_top_n == 0 {
            return Err(Error::InvalidConfig("rerank_top_n must be > 0".to_string()));
        }
        if self.openai_base_url.is_some() != self.openai_api_key.is_some() {
            tracing::warn!("openai_base_url and openai_api_key must both be set; the remote generator stays disabled");
        }
        Ok(())
    }

    pub fn chunking(&self) -> ChunkingConfig {
        ChunkingConfig { chunk_size: self.chunk_size, chunk_overlap: self.chunk_overlap }
    }

    /// Remote generation is used only when both the URL and key are present.
    pub fn openai_endpoint(&self) -> Option<(&str, &str)> {
        match (&self.openai_base_url, &self.openai_api_key) {
            (Some(url), Some(key)) if !url.is_empty() && !key.is_empty() => Some((url.as_str(), key.as_str())),
            _ => None,
        }
    }

    pub fn data_dir(&self) -> PathBuf { expand_path(&self.data_dir) }
    pub fn index_dir(&self) -> PathBuf { expand_path(&self.index_dir) }
    pub fn embedding_model_dir(&self) -> PathBuf { expand_path(&self.embedding_model_id) }
    pub fn reranker_model_dir(&self) -> PathBuf { expand_path(&self.reranker_model_id) }
    pub fn sft_model_dir(&self) -> PathBuf { expand_path(&self.sft_model_id) }

    pub fn embed_timeout(&self) -> Duration { Duration::from_secs(self.embed_timeout_secs) }
    pub fn rerank_timeout(&self) -> Duration { Duration::from_secs(self.rerank_timeout_secs) }
    pub fn generation_timeout(&self) -> Duration { Duration::from_secs(self.generation_timeout_secs) }
    pub fn search_timeout(&self) -> Duration { Duration::from_secs(self.search_timeout_secs) }
    pub fn tool_timeout(&self) -> Duration { Duration::from_secs(self.tool_timeout_secs) }
}

/// Defaults, then `config.toml`, then the per-environment file, then `APP_*`.
pub fn figment_for_env(env_name: &str) -> Figment {
    let mut figment = Figment::from(Serialized::defaults(Settings::default())).merge(Toml::file("config.toml"));
    match env_name {
        "dev" | "development" => figment = figment.merge(Toml::file("config.dev.toml")),
        "prod" | "production" => figment = figment.merge(Toml::file("config.prod.toml")),
        "test" | "testing" => figment = figment.merge(Toml::file("config.test.toml")),
        _ => {}
    }
    figment.merge(Env::prefixed("APP_"))
}

/// `~` and `${VAR}` / `$VAR` expansion for configured paths. Unknown
/// variables leave the input untouched; nothing is canonicalised.
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}
