//! Pipeline configuration

use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use ragdesk_core::{AnswerStrategy, Error, Result};

use crate::chunker::ChunkerConfig;
use crate::onnx::DEFAULT_ONNX_MODEL;

pub const DEFAULT_COLLECTION: &str = "company_info";

/// Which embedding provider backs the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbedderKind {
    /// Pretrained sentence encoder run locally from ONNX weights
    Onnx,
    /// Offline feature-hashing encoder
    Hashing,
    /// OpenAI-compatible embeddings endpoint
    OpenAi,
}

impl FromStr for EmbedderKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "onnx" | "local" | "minilm" => Ok(EmbedderKind::Onnx),
            "hashing" => Ok(EmbedderKind::Hashing),
            "openai" => Ok(EmbedderKind::OpenAi),
            other => Err(Error::Configuration(format!(
                "unknown embedder '{}', expected 'onnx', 'hashing' or 'openai'",
                other
            ))),
        }
    }
}

/// Configuration for the whole retrieval pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub chunk_size: usize,
    pub min_chunk_chars: usize,
    pub top_k: usize,
    pub min_similarity: f32,
    pub strategy: AnswerStrategy,
    pub structured: bool,
    pub embedder: EmbedderKind,
    /// Directory holding the ONNX weights and tokenizer
    pub model_dir: PathBuf,
    pub embed_batch_size: usize,
    pub data_dir: Option<PathBuf>,
    pub collection: String,
    pub generation_timeout: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            chunk_size: 500,
            min_chunk_chars: 50,
            top_k: 5,
            min_similarity: 0.1,
            strategy: AnswerStrategy::Template,
            structured: true,
            embedder: EmbedderKind::Onnx,
            model_dir: PathBuf::from("models").join(DEFAULT_ONNX_MODEL),
            embed_batch_size: 32,
            data_dir: None,
            collection: DEFAULT_COLLECTION.to_string(),
            generation_timeout: Duration::from_secs(60),
        }
    }
}

impl PipelineConfig {
    /// Create configuration from `RAGDESK_*` environment variables
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Create configuration from an arbitrary key lookup; unset keys keep defaults
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let config = Self {
            chunk_size: parse_or(get("RAGDESK_CHUNK_SIZE"), "RAGDESK_CHUNK_SIZE", defaults.chunk_size)?,
            min_chunk_chars: parse_or(
                get("RAGDESK_MIN_CHUNK_CHARS"),
                "RAGDESK_MIN_CHUNK_CHARS",
                defaults.min_chunk_chars,
            )?,
            top_k: parse_or(get("RAGDESK_TOP_K"), "RAGDESK_TOP_K", defaults.top_k)?,
            min_similarity: parse_or(
                get("RAGDESK_MIN_SIMILARITY"),
                "RAGDESK_MIN_SIMILARITY",
                defaults.min_similarity,
            )?,
            strategy: match get("RAGDESK_STRATEGY") {
                Some(v) => v.parse()?,
                None => defaults.strategy,
            },
            structured: match get("RAGDESK_STRUCTURED") {
                Some(v) => parse_bool(&v, "RAGDESK_STRUCTURED")?,
                None => defaults.structured,
            },
            embedder: match get("RAGDESK_EMBEDDER") {
                Some(v) => v.parse()?,
                None => defaults.embedder,
            },
            model_dir: get("RAGDESK_MODEL_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.model_dir),
            embed_batch_size: parse_or(
                get("RAGDESK_EMBED_BATCH_SIZE"),
                "RAGDESK_EMBED_BATCH_SIZE",
                defaults.embed_batch_size,
            )?,
            data_dir: get("RAGDESK_DATA_DIR").map(PathBuf::from),
            collection: get("RAGDESK_COLLECTION").unwrap_or(defaults.collection),
            generation_timeout: Duration::from_secs(parse_or(
                get("RAGDESK_GENERATION_TIMEOUT_SECS"),
                "RAGDESK_GENERATION_TIMEOUT_SECS",
                defaults.generation_timeout.as_secs(),
            )?),
        };

        config.validate()?;
        Ok(config)
    }

    /// Reject values the pipeline cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(Error::Configuration("chunk size must be greater than zero".to_string()));
        }
        if self.top_k == 0 {
            return Err(Error::Configuration("top-k must be greater than zero".to_string()));
        }
        if self.embed_batch_size == 0 {
            return Err(Error::Configuration(
                "embedding batch size must be greater than zero".to_string(),
            ));
        }
        if !(-1.0..=1.0).contains(&self.min_similarity) {
            return Err(Error::Configuration(format!(
                "similarity threshold {} is outside [-1, 1]",
                self.min_similarity
            )));
        }
        if self.collection.trim().is_empty() {
            return Err(Error::Configuration("collection name must not be empty".to_string()));
        }
        if self.generation_timeout.is_zero() {
            return Err(Error::Configuration("generation timeout must be positive".to_string()));
        }
        Ok(())
    }

    pub fn chunker_config(&self) -> ChunkerConfig {
        ChunkerConfig {
            max_chunk_chars: self.chunk_size,
            min_chunk_chars: self.min_chunk_chars,
            structured: self.structured,
        }
    }
}

fn parse_or<T: FromStr>(value: Option<String>, key: &str, default: T) -> Result<T> {
    match value {
        Some(raw) => raw
            .parse()
            .map_err(|_| Error::Configuration(format!("{} has an invalid value '{}'", key, raw))),
        None => Ok(default),
    }
}

fn parse_bool(raw: &str, key: &str) -> Result<bool> {
    match raw.to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(Error::Configuration(format!("{} has an invalid value '{}'", key, raw))),
    }
}
