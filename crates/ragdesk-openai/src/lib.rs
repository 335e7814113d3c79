//! OpenAI-compatible providers for ragdesk
//!
//! A chat completions client implementing `TextGenerator` and an embeddings
//! provider implementing `EmbeddingProvider`.

mod chat;
mod config;
mod embeddings;

pub use chat::OpenAiChatClient;
pub use config::{DEFAULT_BASE_URL, DEFAULT_CHAT_MODEL, DEFAULT_EMBEDDING_MODEL, OpenAiConfig};
pub use embeddings::{OpenAiEmbeddingModel, OpenAiEmbeddingProvider};

// Re-export core types for convenience
pub use ragdesk_core::{
    EmbeddingModel, EmbeddingProvider, Error, GenerationConfig, GenerationResult, Result,
    TextGenerator,
};
