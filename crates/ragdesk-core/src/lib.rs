//! Core traits and types for ragdesk
//!
//! This crate defines the domain types of the retrieval pipeline (chunks,
//! vectors, index entries, transcripts) and the capability-facing traits for
//! every external collaborator: embedding providers, vector indexes,
//! generative text providers, answer assemblers and text extractors.

pub mod document;
pub mod embedding;
pub mod error;
pub mod llm;
pub mod rag;
pub mod types;
pub mod vector_store;

pub use document::{DocumentKind, SourceDocument, TextExtractor};
pub use embedding::{EmbeddingModel, EmbeddingProvider, EmbeddingVector, cosine_similarity};
pub use error::{Error, Result};
pub use llm::{
    GenerationConfig, GenerationOutcome, GenerationResult, TextGenerator, generate_with_timeout,
};
pub use rag::{Answer, AnswerAssembler, AnswerStrategy};
pub use types::*;
pub use vector_store::{IndexEntry, IndexStats, SearchHit, SearchResult, VectorIndex};
