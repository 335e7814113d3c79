//! Local vector index

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use tokio::sync::Mutex;
use tracing::{debug, info};

use ragdesk_core::{
    EmbeddingVector, Error, IndexEntry, IndexStats, Result, SearchHit, SearchResult, VectorIndex,
};

use crate::config::DEFAULT_COLLECTION;

/// Configuration for the local index
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexConfig {
    pub collection: String,
    /// Hits scoring below this are dropped
    pub min_similarity: f32,
    /// Persist generations under this directory when set
    pub data_dir: Option<PathBuf>,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            collection: DEFAULT_COLLECTION.to_string(),
            min_similarity: 0.1,
            data_dir: None,
        }
    }
}

/// One immutable set of entries
#[derive(Debug, Default, Serialize, Deserialize)]
struct Generation {
    number: u64,
    dimension: Option<usize>,
    #[serde(default)]
    model_id: Option<String>,
    entries: Vec<IndexEntry>,
}

impl Generation {
    fn build(number: u64, model_id: Option<String>, entries: Vec<IndexEntry>) -> Result<Self> {
        let mut seen = HashSet::with_capacity(entries.len());
        let mut dimension = None;

        for entry in &entries {
            if !seen.insert(entry.id.as_str()) {
                return Err(Error::VectorIndex(format!("duplicate entry id '{}'", entry.id)));
            }
            let actual = entry.vector.dimension();
            if actual == 0 {
                return Err(Error::VectorIndex(format!("entry '{}' has an empty vector", entry.id)));
            }
            match dimension {
                None => dimension = Some(actual),
                Some(expected) if expected != actual => {
                    return Err(Error::DimensionMismatch { expected, actual });
                }
                Some(_) => {}
            }
        }

        Ok(Self {
            number,
            dimension,
            model_id: if entries.is_empty() { None } else { model_id },
            entries,
        })
    }
}

/// In-process vector index with optional JSON persistence
///
/// Writers build a complete generation off to the side and swap it in under a
/// short write lock; readers clone the current `Arc` and search it unlocked.
pub struct LocalVectorIndex {
    config: IndexConfig,
    current: RwLock<Arc<Generation>>,
    writer: Mutex<()>,
}

impl LocalVectorIndex {
    pub fn new(config: IndexConfig) -> Self {
        Self {
            config,
            current: RwLock::new(Arc::new(Generation::default())),
            writer: Mutex::new(()),
        }
    }

    /// Non-durable index with the given threshold
    pub fn in_memory(min_similarity: f32) -> Self {
        Self::new(IndexConfig {
            min_similarity,
            ..Default::default()
        })
    }

    /// Create an index, loading the persisted collection if there is one
    pub async fn open(config: IndexConfig) -> Result<Self> {
        let index = Self::new(config);
        if let Some(path) = index.collection_path() {
            if tokio::fs::try_exists(&path).await? {
                let raw = tokio::fs::read(&path).await?;
                let stored: Generation = serde_json::from_slice(&raw).map_err(|e| {
                    Error::VectorIndex(format!("corrupt collection {}: {}", path.display(), e))
                })?;
                let generation = Generation::build(stored.number, stored.model_id, stored.entries)?;
                info!(
                    collection = %index.config.collection,
                    entries = generation.entries.len(),
                    model = generation.model_id.as_deref().unwrap_or("unknown"),
                    "loaded persisted collection"
                );
                index.swap(generation)?;
            }
        }
        Ok(index)
    }

    pub fn config(&self) -> &IndexConfig {
        &self.config
    }

    /// Location of the persisted collection in durable mode
    pub fn collection_path(&self) -> Option<PathBuf> {
        self.config
            .data_dir
            .as_ref()
            .map(|dir| dir.join(format!("{}.json", self.config.collection)))
    }

    fn snapshot(&self) -> Result<Arc<Generation>> {
        let current = self
            .current
            .read()
            .map_err(|e| Error::VectorIndex(format!("Lock error: {}", e)))?;
        Ok(Arc::clone(&current))
    }

    fn swap(&self, generation: Generation) -> Result<()> {
        let mut current = self
            .current
            .write()
            .map_err(|e| Error::VectorIndex(format!("Lock error: {}", e)))?;
        *current = Arc::new(generation);
        Ok(())
    }

    fn stats_for(&self, generation: &Generation) -> IndexStats {
        IndexStats {
            collection: self.config.collection.clone(),
            entries: generation.entries.len(),
            dimension: generation.dimension,
            generation: generation.number,
            durable: self.config.data_dir.is_some(),
            model_id: generation.model_id.clone(),
        }
    }

    async fn persist(&self, path: &Path, generation: &Generation) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let body = serde_json::to_vec(generation)?;
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, body).await?;
        tokio::fs::rename(&tmp, path).await?;
        Ok(())
    }

    async fn replace(&self, model_id: Option<&str>, entries: Vec<IndexEntry>) -> Result<IndexStats> {
        let _writer = self.writer.lock().await;

        let number = self.snapshot()?.number + 1;
        let generation = Generation::build(number, model_id.map(str::to_string), entries)?;

        if let Some(path) = self.collection_path() {
            self.persist(&path, &generation).await?;
        }

        let stats = self.stats_for(&generation);
        self.swap(generation)?;
        info!(
            collection = %stats.collection,
            entries = stats.entries,
            generation = stats.generation,
            "rebuilt vector index"
        );
        Ok(stats)
    }
}

#[async_trait]
impl VectorIndex for LocalVectorIndex {
    async fn rebuild(&self, model_id: &str, entries: Vec<IndexEntry>) -> Result<IndexStats> {
        self.replace(Some(model_id), entries).await
    }

    async fn search(&self, query: &EmbeddingVector, k: usize) -> Result<SearchResult> {
        let generation = self.snapshot()?;
        let Some(dimension) = generation.dimension else {
            return Ok(SearchResult::empty());
        };
        if k == 0 {
            return Ok(SearchResult::empty());
        }
        if query.dimension() != dimension {
            return Err(Error::DimensionMismatch {
                expected: dimension,
                actual: query.dimension(),
            });
        }

        let mut scored: Vec<(usize, f32)> = generation
            .entries
            .iter()
            .enumerate()
            .map(|(position, entry)| (position, query.cosine_similarity(&entry.vector)))
            .filter(|(_, score)| *score >= self.config.min_similarity)
            .collect();

        scored.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
        scored.truncate(k);

        let hits: Vec<SearchHit> = scored
            .into_iter()
            .map(|(position, score)| {
                let entry = &generation.entries[position];
                SearchHit {
                    id: entry.id.clone(),
                    text: entry.text.clone(),
                    metadata: entry.metadata.clone(),
                    score,
                }
            })
            .collect();

        debug!(
            k,
            hits = hits.len(),
            top_score = hits.first().map(|h| h.score),
            "searched vector index"
        );
        Ok(SearchResult { hits })
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.snapshot()?.entries.len())
    }

    async fn clear(&self) -> Result<()> {
        self.replace(None, Vec::new()).await.map(|_| ())
    }

    async fn stats(&self) -> Result<IndexStats> {
        let generation = self.snapshot()?;
        Ok(self.stats_for(&generation))
    }
}
