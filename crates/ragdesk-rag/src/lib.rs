//! Retrieval pipeline for ragdesk
//!
//! This crate provides the chunker, the embedder service with its local ONNX
//! sentence encoder and offline hashing model, the local vector index, both
//! answer assemblers, file text extraction and the `RagPipeline` that ties
//! them together.

mod chunker;
mod config;
mod embedder;
mod engine;
mod extractor;
mod generative;
mod onnx;
mod template;
mod vector_store;

#[cfg(test)]
mod test_support;
#[cfg(test)]
mod tests;

pub use chunker::{Chunker, ChunkerConfig, pack_units, split_sentences};
pub use config::{DEFAULT_COLLECTION, EmbedderKind, PipelineConfig};
pub use embedder::{Embedder, HashingEmbeddingModel, HashingEmbeddingProvider};
pub use engine::{IngestReport, RagPipeline};
pub use extractor::FileTextExtractor;
pub use generative::{GENERAL_KNOWLEDGE_DISCLAIMER, GenerativeAssembler};
pub use onnx::{DEFAULT_ONNX_MODEL, OnnxEmbeddingModel, OnnxEmbeddingProvider};
pub use template::{
    NO_MATCH_ANSWER, TemplateAssembler, TemplateCategory, TemplateRule, credential_lines,
    default_rules,
};
pub use vector_store::{IndexConfig, LocalVectorIndex};

// Re-export core types for convenience
pub use ragdesk_core::{
    Answer, AnswerAssembler, AnswerStrategy, Chunk, ChunkKind, EmbeddingProvider, Error,
    IndexStats, Result, SearchResult, SourceDocument, TextGenerator, VectorIndex,
};
