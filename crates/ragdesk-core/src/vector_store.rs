//! Vector index trait and types

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{Chunk, ChunkKind, ChunkMetadata, EmbeddingVector, Result};

/// The unit stored by a vector index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexEntry {
    pub id: String,
    pub vector: EmbeddingVector,
    pub text: String,
    pub metadata: ChunkMetadata,
}

impl IndexEntry {
    pub fn from_chunk(chunk: &Chunk, vector: EmbeddingVector) -> Self {
        Self {
            id: chunk.id.clone(),
            vector,
            text: chunk.text.clone(),
            metadata: chunk.metadata(),
        }
    }
}

/// One ranked match
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub id: String,
    pub text: String,
    pub metadata: ChunkMetadata,
    pub score: f32,
}

impl SearchHit {
    pub fn kind(&self) -> ChunkKind {
        self.metadata.kind
    }
}

/// Hits for one query, best first
///
/// Scores are only comparable within a single result.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub hits: Vec<SearchHit>,
}

impl SearchResult {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.hits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    pub fn top(&self) -> Option<&SearchHit> {
        self.hits.first()
    }

    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.hits.iter().map(|hit| hit.text.as_str())
    }
}

/// Snapshot of what an index currently holds
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndexStats {
    pub collection: String,
    pub entries: usize,
    pub dimension: Option<usize>,
    pub generation: u64,
    pub durable: bool,
    /// Embedding model that produced the stored vectors
    #[serde(default)]
    pub model_id: Option<String>,
}

/// Trait for vector indexes
///
/// A rebuild replaces the whole stored set. Readers running concurrently with
/// a rebuild observe either the previous set or the new one, never a mix.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Replace every stored entry with `entries`, all embedded by `model_id`
    async fn rebuild(&self, model_id: &str, entries: Vec<IndexEntry>) -> Result<IndexStats>;

    /// Up to `k` entries by descending cosine similarity, ties in insertion order
    async fn search(&self, query: &EmbeddingVector, k: usize) -> Result<SearchResult>;

    /// Number of stored entries
    async fn count(&self) -> Result<usize>;

    /// Drop every stored entry
    async fn clear(&self) -> Result<()>;

    /// Current collection statistics
    async fn stats(&self) -> Result<IndexStats>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_from_chunk() {
        let chunk = Chunk {
            id: "doc-0000".to_string(),
            text: "Printer IP: 192.168.1.50".to_string(),
            section_title: None,
            source_filename: "printers.txt".to_string(),
            sequence_index: 0,
            kind: ChunkKind::Fragment,
        };

        let entry = IndexEntry::from_chunk(&chunk, EmbeddingVector::new(vec![1.0, 0.0]));
        assert_eq!(entry.id, "doc-0000");
        assert_eq!(entry.text, chunk.text);
        assert_eq!(entry.metadata.source_filename, "printers.txt");
        assert_eq!(entry.vector.dimension(), 2);
    }

    #[test]
    fn test_empty_result() {
        let result = SearchResult::empty();
        assert!(result.is_empty());
        assert!(result.top().is_none());
        assert_eq!(result.texts().count(), 0);
    }
}
