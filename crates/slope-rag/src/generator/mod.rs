//! Answer generation backends.
//!
//! An OpenAI-compatible HTTP endpoint is used when both its URL and key are
//! configured; otherwise the local fine-tuned model is loaded. Having neither
//! is a startup error.

pub mod local;
pub mod openai;
pub mod scripted;

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;

use slope_core::config::Settings;

use crate::prompt::GroundingPrompt;

pub use local::LocalGenerator;
pub use openai::OpenAiGenerator;
pub use scripted::ScriptedGenerator;

#[async_trait]
pub trait Generator: Send + Sync {
    fn name(&self) -> &'static str;
    async fn generate(&self, prompt: &GroundingPrompt) -> Result<String>;
}

pub fn build_generator(settings: &Settings) -> Result<Arc<dyn Generator>> {
    if let Some((base_url, api_key)) = settings.openai_endpoint() {
        tracing::info!(url = base_url, "Using OpenAI compatible API");
        return Ok(Arc::new(OpenAiGenerator::new(base_url, api_key, &settings.openai_model, settings.max_output_tokens)?));
    }
    let dir = settings.sft_model_dir();
    tracing::info!(model = %dir.display(), "Using local generation model");
    Ok(Arc::new(LocalGenerator::new(&dir, &settings.device, settings.max_input_tokens, settings.max_output_tokens)?))
}
