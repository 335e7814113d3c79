//! Retrieval pipeline
//!
//! Ties the chunker, embedder, vector index and answer assembler together.
//! Every collaborator is constructed by the caller and shared by `Arc`.

use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

use ragdesk_core::{
    Answer, AnswerAssembler, AnswerStrategy, EmbeddingProvider, Error, GenerationConfig,
    IndexEntry, IndexStats, Result, SearchResult, SourceDocument, TextExtractor, TextGenerator,
    VectorIndex,
};

use crate::chunker::Chunker;
use crate::config::PipelineConfig;
use crate::embedder::Embedder;
use crate::extractor::FileTextExtractor;
use crate::generative::GenerativeAssembler;
use crate::template::TemplateAssembler;
use crate::vector_store::{IndexConfig, LocalVectorIndex};

/// Outcome of one ingestion batch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestReport {
    pub documents_indexed: usize,
    pub documents_failed: usize,
    pub chunks_indexed: usize,
    /// One line per file that could not be read
    pub errors: Vec<String>,
    pub index: IndexStats,
}

impl IngestReport {
    pub fn is_success(&self) -> bool {
        self.documents_failed == 0
    }
}

/// The retrieval-augmented answering pipeline
pub struct RagPipeline {
    chunker: Chunker,
    embedder: Arc<Embedder>,
    index: Arc<dyn VectorIndex>,
    assembler: Arc<dyn AnswerAssembler>,
    extractor: Arc<dyn TextExtractor>,
    top_k: usize,
}

impl RagPipeline {
    pub fn new(
        chunker: Chunker,
        embedder: Arc<Embedder>,
        index: Arc<dyn VectorIndex>,
        assembler: Arc<dyn AnswerAssembler>,
    ) -> Self {
        Self {
            chunker,
            embedder,
            index,
            assembler,
            extractor: Arc::new(FileTextExtractor::new()),
            top_k: 5,
        }
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    pub fn with_extractor(mut self, extractor: Arc<dyn TextExtractor>) -> Self {
        self.extractor = extractor;
        self
    }

    /// Build a pipeline from configuration
    ///
    /// The generative strategy needs a `generator`; the template strategy
    /// ignores it.
    pub async fn from_config(
        config: &PipelineConfig,
        provider: Arc<dyn EmbeddingProvider>,
        generator: Option<Arc<dyn TextGenerator>>,
    ) -> Result<Self> {
        config.validate()?;

        let chunker = Chunker::new(config.chunker_config())?;
        let embedder = Arc::new(Embedder::new(provider, config.embed_batch_size));
        let index = LocalVectorIndex::open(IndexConfig {
            collection: config.collection.clone(),
            min_similarity: config.min_similarity,
            data_dir: config.data_dir.clone(),
        })
        .await?;

        let assembler: Arc<dyn AnswerAssembler> = match config.strategy {
            AnswerStrategy::Template => Arc::new(TemplateAssembler::new()),
            AnswerStrategy::Generative => {
                let generator = generator.ok_or_else(|| {
                    Error::Configuration(
                        "the generative strategy needs a text generator".to_string(),
                    )
                })?;
                let generation = GenerationConfig {
                    model_id: generator.model_id().to_string(),
                    timeout: config.generation_timeout,
                    ..Default::default()
                };
                Arc::new(GenerativeAssembler::new(generator, generation))
            }
        };

        Ok(Self::new(chunker, embedder, Arc::new(index), assembler).with_top_k(config.top_k))
    }

    pub fn strategy(&self) -> AnswerStrategy {
        self.assembler.strategy()
    }

    pub fn embedder(&self) -> &Arc<Embedder> {
        &self.embedder
    }

    pub fn index(&self) -> &Arc<dyn VectorIndex> {
        &self.index
    }

    /// Replace the index contents with chunks of `documents`
    pub async fn ingest(&self, documents: &[SourceDocument]) -> Result<IngestReport> {
        let mut seen = HashSet::new();
        let chunks: Vec<_> = documents
            .iter()
            .flat_map(|document| self.chunker.chunk_document(document))
            .filter(|chunk| seen.insert(chunk.id.clone()))
            .collect();

        let model_id = self.embedder.ensure_loaded().await?;
        let texts: Vec<String> = chunks.iter().map(|chunk| chunk.text.clone()).collect();
        let vectors = self.embedder.embed_batch(&texts).await?;

        let entries: Vec<IndexEntry> = chunks
            .iter()
            .zip(vectors)
            .map(|(chunk, vector)| IndexEntry::from_chunk(chunk, vector))
            .collect();
        let chunks_indexed = entries.len();
        let index = self.index.rebuild(&model_id, entries).await?;

        info!(
            documents = documents.len(),
            chunks = chunks_indexed,
            "ingested documents"
        );
        Ok(IngestReport {
            documents_indexed: documents.len(),
            documents_failed: 0,
            chunks_indexed,
            errors: Vec::new(),
            index,
        })
    }

    /// Extract, chunk and index files; unreadable files are reported, not fatal
    ///
    /// When no file could be read the current index is left untouched.
    pub async fn ingest_files<P: AsRef<Path>>(&self, paths: &[P]) -> Result<IngestReport> {
        let mut documents = Vec::new();
        let mut errors = Vec::new();

        for path in paths {
            let path = path.as_ref();
            match self.extractor.extract(path) {
                Ok(document) => documents.push(document),
                Err(e) => {
                    warn!(file = %path.display(), error = %e, "skipping document");
                    errors.push(e.to_string());
                }
            }
        }

        let mut report = if documents.is_empty() {
            IngestReport {
                documents_indexed: 0,
                documents_failed: 0,
                chunks_indexed: 0,
                errors: Vec::new(),
                index: self.index.stats().await?,
            }
        } else {
            self.ingest(&documents).await?
        };

        report.documents_failed = errors.len();
        report.errors = errors;
        Ok(report)
    }

    /// Top hits for a question
    ///
    /// Embedding failures and a collection built by another embedding model
    /// are returned; other index failures count as no results.
    pub async fn retrieve(&self, question: &str, k: usize) -> Result<SearchResult> {
        let query = self.embedder.embed(question).await?;

        let stats = match self.index.stats().await {
            Ok(stats) => stats,
            Err(e) => {
                warn!(error = %e, "vector index unavailable, answering without context");
                return Ok(SearchResult::empty());
            }
        };
        self.check_model(&stats)?;

        match self.index.search(&query, k).await {
            Ok(results) => Ok(results),
            Err(e) => {
                warn!(error = %e, "vector search failed, answering without context");
                Ok(SearchResult::empty())
            }
        }
    }

    /// Vectors from different embedding models must never be compared
    fn check_model(&self, stats: &IndexStats) -> Result<()> {
        if stats.entries == 0 {
            return Ok(());
        }
        let current = self.embedder.model_id();
        match (stats.model_id.as_deref(), current.as_deref()) {
            (Some(stored), Some(current)) if stored != current => Err(Error::VectorIndex(format!(
                "collection '{}' was built with embedding model '{}' but queries use '{}'; re-ingest the documents",
                stats.collection, stored, current
            ))),
            _ => Ok(()),
        }
    }

    /// Answer a question with the configured result count
    pub async fn ask(&self, question: &str) -> Result<Answer> {
        self.ask_with_k(question, self.top_k).await
    }

    /// Answer a question using up to `k` retrieved chunks
    pub async fn ask_with_k(&self, question: &str, k: usize) -> Result<Answer> {
        let question = question.trim();
        if question.is_empty() {
            return Err(Error::InvalidInput("question must not be empty".to_string()));
        }

        let sources = self.retrieve(question, k).await?;
        let text = self.assembler.assemble(question, &sources).await;
        Ok(Answer { text, sources })
    }

    /// Drop every indexed chunk
    pub async fn clear(&self) -> Result<()> {
        self.index.clear().await
    }

    /// Pipeline statistics as JSON
    pub async fn stats(&self) -> Result<serde_json::Value> {
        let index = self.index.stats().await?;
        let chunker = self.chunker.config();

        Ok(json!({
            "index": index,
            "embedder": {
                "provider": self.embedder.provider_name(),
                "model": self.embedder.model_id(),
                "dimension": self.embedder.dimension(),
                "loaded": self.embedder.is_loaded(),
            },
            "strategy": self.strategy().as_str(),
            "top_k": self.top_k,
            "chunker": {
                "max_chunk_chars": chunker.max_chunk_chars,
                "min_chunk_chars": chunker.min_chunk_chars,
                "structured": chunker.structured,
            },
        }))
    }
}
