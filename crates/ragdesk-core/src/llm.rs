//! Generative text provider trait and types

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::timeout;

use crate::Result;

/// Configuration for text generation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    pub model_id: String,
    pub max_tokens: u32,
    pub temperature: Option<f32>,
    pub timeout: Duration,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            model_id: "gpt-3.5-turbo".to_string(),
            max_tokens: 500,
            temperature: Some(0.3),
            timeout: Duration::from_secs(60),
        }
    }
}

/// Result of a text generation request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationResult {
    pub text: String,
    pub model_id: String,
    pub tokens_used: Option<u32>,
}

/// Typed outcome of a bounded generation call
#[derive(Debug, Clone, PartialEq)]
pub enum GenerationOutcome {
    Completed(String),
    TimedOut(Duration),
    Failed(String),
}

impl GenerationOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, GenerationOutcome::Completed(_))
    }
}

/// Trait for generative text providers (OpenAI-compatible chat APIs and the like)
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Generate a reply to a single prompt
    async fn generate(&self, prompt: &str, config: &GenerationConfig) -> Result<GenerationResult>;

    /// Model used when the caller does not pick one
    fn model_id(&self) -> &str;
}

/// Run one generation under `config.timeout`, folding every failure into the outcome
pub async fn generate_with_timeout(
    generator: &dyn TextGenerator,
    prompt: &str,
    config: &GenerationConfig,
) -> GenerationOutcome {
    match timeout(config.timeout, generator.generate(prompt, config)).await {
        Ok(Ok(result)) => GenerationOutcome::Completed(result.text),
        Ok(Err(e)) => GenerationOutcome::Failed(e.to_string()),
        Err(_) => GenerationOutcome::TimedOut(config.timeout),
    }
}
