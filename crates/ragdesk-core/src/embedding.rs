//! Embedding provider traits and the vector type they produce

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::Result;

/// Fixed-dimension dense vector produced by an embedding model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EmbeddingVector(Vec<f32>);

impl EmbeddingVector {
    pub fn new(values: Vec<f32>) -> Self {
        Self(values)
    }

    pub fn dimension(&self) -> usize {
        self.0.len()
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    pub fn into_inner(self) -> Vec<f32> {
        self.0
    }

    /// Cosine similarity in [-1, 1]; zero when either side has no magnitude
    pub fn cosine_similarity(&self, other: &EmbeddingVector) -> f32 {
        cosine_similarity(&self.0, &other.0)
    }
}

impl From<Vec<f32>> for EmbeddingVector {
    fn from(values: Vec<f32>) -> Self {
        Self(values)
    }
}

/// Cosine similarity between two slices; mismatched lengths score zero
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    (dot_product / (norm_a * norm_b)).clamp(-1.0, 1.0)
}

/// A loaded sentence-embedding model
///
/// Implementations must be deterministic: the same text always maps to the
/// same vector for a given `model_id`.
#[async_trait]
pub trait EmbeddingModel: Send + Sync {
    /// Identifier of the model version; vectors from different ids never mix
    fn model_id(&self) -> &str;

    /// Length of every vector this model produces
    fn dimension(&self) -> usize;

    /// Embed a batch of texts, one vector per input, in input order
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<EmbeddingVector>>;
}

/// Source of an embedding model
///
/// `load` is the expensive step (weights, handshake with a remote service).
/// Callers are expected to invoke it once and reuse the returned model.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Human-readable provider name
    fn name(&self) -> &str;

    /// Load the model; failures are fatal for whatever needed it
    async fn load(&self) -> Result<Arc<dyn EmbeddingModel>>;
}
