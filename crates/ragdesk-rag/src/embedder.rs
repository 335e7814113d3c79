//! Embedder service and the offline hashing model

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{debug, info};

use ragdesk_core::{EmbeddingModel, EmbeddingProvider, EmbeddingVector, Error, Result};

/// Owns one embedding provider and the model it loads
///
/// The model is loaded on first use and shared afterwards. A failed load
/// leaves the cell empty, so the next call tries again.
pub struct Embedder {
    provider: Arc<dyn EmbeddingProvider>,
    model: OnceCell<Arc<dyn EmbeddingModel>>,
    batch_size: usize,
}

impl Embedder {
    pub fn new(provider: Arc<dyn EmbeddingProvider>, batch_size: usize) -> Self {
        Self {
            provider,
            model: OnceCell::new(),
            batch_size: batch_size.max(1),
        }
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    pub fn is_loaded(&self) -> bool {
        self.model.initialized()
    }

    /// Model id once loaded
    pub fn model_id(&self) -> Option<String> {
        self.model.get().map(|m| m.model_id().to_string())
    }

    /// Vector length once loaded
    pub fn dimension(&self) -> Option<usize> {
        self.model.get().map(|m| m.dimension())
    }

    async fn model(&self) -> Result<Arc<dyn EmbeddingModel>> {
        let model = self
            .model
            .get_or_try_init(|| async {
                info!(provider = self.provider.name(), "loading embedding model");
                let model = self.provider.load().await.map_err(|e| match e {
                    Error::ModelLoad(_) => e,
                    other => Error::ModelLoad(other.to_string()),
                })?;
                info!(
                    model = model.model_id(),
                    dimension = model.dimension(),
                    "embedding model ready"
                );
                Ok::<_, Error>(model)
            })
            .await?;
        Ok(Arc::clone(model))
    }

    /// Load the model if needed and return its id
    pub async fn ensure_loaded(&self) -> Result<String> {
        Ok(self.model().await?.model_id().to_string())
    }

    /// Embed one text
    pub async fn embed(&self, text: &str) -> Result<EmbeddingVector> {
        let mut vectors = self.embed_batch(&[text.to_string()]).await?;
        vectors
            .pop()
            .ok_or_else(|| Error::Embedding("model returned no vector".to_string()))
    }

    /// Embed texts in order, one vector per input
    pub async fn embed_batch(&self, texts: &[String]) -> Result<Vec<EmbeddingVector>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let model = self.model().await?;
        let dimension = model.dimension();
        let mut vectors = Vec::with_capacity(texts.len());

        for batch in texts.chunks(self.batch_size) {
            let embedded = model.embed_batch(batch).await?;
            if embedded.len() != batch.len() {
                return Err(Error::Embedding(format!(
                    "model returned {} vectors for {} inputs",
                    embedded.len(),
                    batch.len()
                )));
            }
            if let Some(bad) = embedded.iter().find(|v| v.dimension() != dimension) {
                return Err(Error::DimensionMismatch {
                    expected: dimension,
                    actual: bad.dimension(),
                });
            }
            vectors.extend(embedded);
        }

        debug!(count = vectors.len(), "embedded texts");
        Ok(vectors)
    }
}

/// Provider for the offline feature-hashing model
#[derive(Debug, Clone)]
pub struct HashingEmbeddingProvider {
    dimension: usize,
}

impl HashingEmbeddingProvider {
    pub const DEFAULT_DIMENSION: usize = 384;

    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }
}

impl Default for HashingEmbeddingProvider {
    fn default() -> Self {
        Self::new(Self::DEFAULT_DIMENSION)
    }
}

#[async_trait]
impl EmbeddingProvider for HashingEmbeddingProvider {
    fn name(&self) -> &str {
        "hashing"
    }

    async fn load(&self) -> Result<Arc<dyn EmbeddingModel>> {
        if self.dimension == 0 {
            return Err(Error::ModelLoad(
                "hashing model needs a positive dimension".to_string(),
            ));
        }
        Ok(Arc::new(HashingEmbeddingModel::new(self.dimension)))
    }
}

/// Deterministic sentence encoder built from hashed n-gram features
///
/// Lower-cased word unigrams, word bigrams and padded character trigrams are
/// hashed with MD5 into a fixed number of buckets, then L2-normalised.
#[derive(Debug, Clone)]
pub struct HashingEmbeddingModel {
    dimension: usize,
    model_id: String,
}

const UNIGRAM_WEIGHT: f32 = 1.0;
const BIGRAM_WEIGHT: f32 = 0.5;
const TRIGRAM_WEIGHT: f32 = 0.3;

impl HashingEmbeddingModel {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            model_id: format!("hashing-md5-{}-v1", dimension),
        }
    }

    /// Encode one text
    pub fn encode(&self, text: &str) -> EmbeddingVector {
        let mut values = vec![0.0f32; self.dimension];
        let lowered = text.to_lowercase();
        let tokens: Vec<&str> = lowered
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
            .collect();

        for token in &tokens {
            values[self.bucket(token)] += UNIGRAM_WEIGHT;

            let padded: Vec<char> = format!("^{}$", token).chars().collect();
            for window in padded.windows(3) {
                let trigram: String = window.iter().collect();
                values[self.bucket(&format!("#{}", trigram))] += TRIGRAM_WEIGHT;
            }
        }

        for pair in tokens.windows(2) {
            values[self.bucket(&format!("{} {}", pair[0], pair[1]))] += BIGRAM_WEIGHT;
        }

        let norm = values.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in values.iter_mut() {
                *v /= norm;
            }
        }
        EmbeddingVector::new(values)
    }

    fn bucket(&self, feature: &str) -> usize {
        let digest = md5::compute(feature.as_bytes());
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&digest.0[..8]);
        (u64::from_le_bytes(bytes) % self.dimension as u64) as usize
    }
}

#[async_trait]
impl EmbeddingModel for HashingEmbeddingModel {
    fn model_id(&self) -> &str {
        &self.model_id
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<EmbeddingVector>> {
        Ok(texts.iter().map(|t| self.encode(t)).collect())
    }
}
