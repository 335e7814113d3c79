//! Chat completions client

use async_trait::async_trait;
use reqwest::Client;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tokio::time::timeout;
use tracing::debug;

use ragdesk_core::{Error, GenerationConfig, GenerationResult, Result, TextGenerator};

use crate::config::OpenAiConfig;

/// Text generator backed by an OpenAI-compatible `/chat/completions` endpoint
pub struct OpenAiChatClient {
    config: OpenAiConfig,
    client: Client,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    total_tokens: u32,
}

impl OpenAiChatClient {
    /// Create a new chat client from configuration
    pub fn new(config: OpenAiConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| Error::Network(e.to_string()))?;

        Ok(Self { config, client })
    }

    /// Create a new chat client from environment variables
    pub fn from_env() -> Result<Self> {
        Self::new(OpenAiConfig::from_env()?)
    }

    fn request_body<'a>(prompt: &'a str, config: &'a GenerationConfig) -> ChatRequest<'a> {
        ChatRequest {
            model: &config.model_id,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        }
    }

    async fn perform_generation(&self, prompt: &str, config: &GenerationConfig) -> Result<GenerationResult> {
        let url = self.config.endpoint("chat/completions");
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&Self::request_body(prompt, config))
            .send()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;

        if !status.is_success() {
            return Err(status_error(status, &body));
        }

        let (text, tokens_used) = parse_chat_response(&body)?;
        debug!(model = %config.model_id, tokens = ?tokens_used, "chat completion received");
        Ok(GenerationResult {
            text,
            model_id: config.model_id.clone(),
            tokens_used,
        })
    }
}

/// Map a failed HTTP status to the matching error kind
pub(crate) fn status_error(status: StatusCode, body: &str) -> Error {
    let message = format!("OpenAI API request failed with status {}: {}", status, body);
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Error::Authentication(message),
        _ => Error::Generation(message),
    }
}

fn parse_chat_response(body: &str) -> Result<(String, Option<u32>)> {
    let parsed: ChatResponse = serde_json::from_str(body)?;
    let text = parsed
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .filter(|content| !content.trim().is_empty())
        .ok_or_else(|| Error::Generation("empty response from chat completions".to_string()))?;

    Ok((text, parsed.usage.map(|usage| usage.total_tokens)))
}

#[async_trait]
impl TextGenerator for OpenAiChatClient {
    async fn generate(&self, prompt: &str, config: &GenerationConfig) -> Result<GenerationResult> {
        timeout(config.timeout, self.perform_generation(prompt, config))
            .await
            .map_err(|_| Error::Timeout(format!("chat completion exceeded {:?}", config.timeout)))?
    }

    fn model_id(&self) -> &str {
        &self.config.chat_model
    }
}
