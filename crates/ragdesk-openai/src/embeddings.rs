//! Embeddings client

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use ragdesk_core::{EmbeddingModel, EmbeddingProvider, EmbeddingVector, Error, Result};

use crate::chat::status_error;
use crate::config::OpenAiConfig;

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
    #[serde(skip_serializing_if = "Option::is_none")]
    dimensions: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    index: usize,
}

/// Provider for OpenAI-compatible `/embeddings` models
///
/// Loading validates the key and measures the vector size with one request.
pub struct OpenAiEmbeddingProvider {
    config: OpenAiConfig,
}

impl OpenAiEmbeddingProvider {
    pub fn new(config: OpenAiConfig) -> Self {
        Self { config }
    }

    pub fn from_env() -> Result<Self> {
        Ok(Self::new(OpenAiConfig::from_env()?))
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiEmbeddingProvider {
    fn name(&self) -> &str {
        "openai"
    }

    async fn load(&self) -> Result<Arc<dyn EmbeddingModel>> {
        if self.config.api_key.trim().is_empty() {
            return Err(Error::ModelLoad("missing OpenAI API key".to_string()));
        }

        let client = Client::builder()
            .timeout(self.config.request_timeout)
            .build()
            .map_err(|e| Error::ModelLoad(e.to_string()))?;

        let mut model = OpenAiEmbeddingModel {
            client,
            endpoint: self.config.endpoint("embeddings"),
            api_key: self.config.api_key.clone(),
            model: self.config.embedding_model.clone(),
            requested_dimensions: self.config.embedding_dimensions,
            dimension: 0,
        };

        let sample = model
            .request(&["dimension check".to_string()])
            .await
            .map_err(|e| Error::ModelLoad(e.to_string()))?;
        model.dimension = sample
            .first()
            .map(|v| v.len())
            .filter(|len| *len > 0)
            .ok_or_else(|| Error::ModelLoad("dimension check returned no embedding".to_string()))?;

        info!(model = %model.model, dimension = model.dimension, "OpenAI embedding model ready");
        Ok(Arc::new(model))
    }
}

/// A remote embedding model with a measured dimension
pub struct OpenAiEmbeddingModel {
    client: Client,
    endpoint: String,
    api_key: String,
    model: String,
    requested_dimensions: Option<usize>,
    dimension: usize,
}

impl OpenAiEmbeddingModel {
    async fn request(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>> {
        let body = EmbeddingRequest {
            model: &self.model,
            input: inputs,
            dimensions: self.requested_dimensions,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;
        if !status.is_success() {
            return Err(match status_error(status, &text) {
                Error::Generation(message) => Error::Embedding(message),
                other => other,
            });
        }

        parse_embedding_response(&text, inputs.len())
    }
}

fn parse_embedding_response(body: &str, expected: usize) -> Result<Vec<Vec<f32>>> {
    let mut parsed: EmbeddingResponse = serde_json::from_str(body)?;
    parsed.data.sort_by_key(|entry| entry.index);
    if parsed.data.len() != expected {
        return Err(Error::Embedding(format!(
            "OpenAI returned {} embeddings for {} inputs",
            parsed.data.len(),
            expected
        )));
    }
    Ok(parsed.data.into_iter().map(|entry| entry.embedding).collect())
}

#[async_trait]
impl EmbeddingModel for OpenAiEmbeddingModel {
    fn model_id(&self) -> &str {
        &self.model
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<EmbeddingVector>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let vectors = self.request(texts).await?;
        Ok(vectors.into_iter().map(EmbeddingVector::new).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_sorts_by_index() {
        let body = r#"{"data": [
            {"object": "embedding", "index": 1, "embedding": [0.0, 1.0]},
            {"object": "embedding", "index": 0, "embedding": [1.0, 0.0]}
        ], "model": "text-embedding-3-small"}"#;

        let vectors = parse_embedding_response(body, 2).unwrap();
        assert_eq!(vectors, vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
    }

    #[test]
    fn test_parse_count_mismatch() {
        let body = r#"{"data": [{"index": 0, "embedding": [1.0]}]}"#;
        let err = parse_embedding_response(body, 3).unwrap_err();
        assert!(matches!(err, Error::Embedding(_)));
    }

    #[test]
    fn test_request_omits_unset_dimensions() {
        let inputs = vec!["hello".to_string()];
        let body = serde_json::to_value(EmbeddingRequest {
            model: "text-embedding-3-small",
            input: &inputs,
            dimensions: None,
        })
        .unwrap();
        assert_eq!(body["input"][0], "hello");
        assert!(body.get("dimensions").is_none());
    }

    #[tokio::test]
    async fn test_load_without_key_fails() {
        let provider = OpenAiEmbeddingProvider::new(OpenAiConfig::new("  "));
        let err = provider.load().await.err().unwrap();
        assert!(matches!(err, Error::ModelLoad(_)));
    }
}
