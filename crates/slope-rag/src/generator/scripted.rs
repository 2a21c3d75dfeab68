use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::sync::Mutex;
use std::time::Duration;

use super::Generator;
use crate::prompt::GroundingPrompt;

/// Replays canned outputs and records the prompts it was given.
pub struct ScriptedGenerator {
    replies: Vec<Result<String, String>>,
    delay: Option<Duration>,
    prompts: Mutex<Vec<GroundingPrompt>>,
}

impl ScriptedGenerator {
    /// Always answers with `reply`.
    pub fn new(reply: impl Into<String>) -> Self {
        Self { replies: vec![Ok(reply.into())], delay: None, prompts: Mutex::new(vec![]) }
    }

    /// Always fails with `message`.
    pub fn failing(message: impl Into<String>) -> Self {
        Self { replies: vec![Err(message.into())], delay: None, prompts: Mutex::new(vec![]) }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn prompts(&self) -> Vec<GroundingPrompt> {
        self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().map(|p| p.len()).unwrap_or(0)
    }
}

#[async_trait]
impl Generator for ScriptedGenerator {
    fn name(&self) -> &'static str { "scripted" }

    async fn generate(&self, prompt: &GroundingPrompt) -> Result<String> {
        let n = {
            let mut prompts = self.prompts.lock().map_err(|_| anyhow!("prompt log poisoned"))?;
            prompts.push(prompt.clone());
            prompts.len() - 1
        };
        if let Some(d) = self.delay {
            tokio::time::sleep(d).await;
        }
        let reply = &self.replies[n.min(self.replies.len() - 1)];
        reply.clone().map_err(|e| anyhow!(e))
    }
}
