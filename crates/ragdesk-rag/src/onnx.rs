//! Local pretrained sentence encoder
//!
//! Runs a BERT-style ONNX export (all-MiniLM-L6-v2 by default) with tract and
//! the HuggingFace tokenizer shipped next to it. Token embeddings are mean
//! pooled over the attention mask and L2-normalised, which is how
//! sentence-transformers produces its vectors.
//!
//! A model directory holds `tokenizer.json` and either `model.onnx` or
//! `onnx/model.onnx`.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokenizers::Tokenizer;
use tract_onnx::prelude::*;
use tracing::{debug, info};

use ragdesk_core::{EmbeddingModel, EmbeddingProvider, EmbeddingVector, Error, Result};

pub const DEFAULT_ONNX_MODEL: &str = "all-MiniLM-L6-v2";

/// Longest token sequence fed to the model
const MAX_TOKENS: usize = 256;

const MODEL_FILES: [&str; 2] = ["model.onnx", "onnx/model.onnx"];
const TOKENIZER_FILE: &str = "tokenizer.json";

type TractPlan = SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

/// Loads a sentence-embedding model from a local directory
#[derive(Debug, Clone)]
pub struct OnnxEmbeddingProvider {
    model_dir: PathBuf,
    max_tokens: usize,
}

impl OnnxEmbeddingProvider {
    pub fn new(model_dir: impl Into<PathBuf>) -> Self {
        Self {
            model_dir: model_dir.into(),
            max_tokens: MAX_TOKENS,
        }
    }

    pub fn model_dir(&self) -> &Path {
        &self.model_dir
    }

    /// Model name taken from the directory, e.g. `all-MiniLM-L6-v2`
    pub fn model_name(&self) -> String {
        self.model_dir
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| DEFAULT_ONNX_MODEL.to_string())
    }

    /// Whether both the weights and the tokenizer are on disk
    pub fn is_available(&self) -> bool {
        self.model_file().is_some() && self.tokenizer_file().is_file()
    }

    fn model_file(&self) -> Option<PathBuf> {
        MODEL_FILES
            .iter()
            .map(|candidate| self.model_dir.join(candidate))
            .find(|path| path.is_file())
    }

    fn tokenizer_file(&self) -> PathBuf {
        self.model_dir.join(TOKENIZER_FILE)
    }
}

#[async_trait]
impl EmbeddingProvider for OnnxEmbeddingProvider {
    fn name(&self) -> &str {
        "onnx"
    }

    async fn load(&self) -> Result<Arc<dyn EmbeddingModel>> {
        let provider = self.clone();
        let model = tokio::task::spawn_blocking(move || OnnxEmbeddingModel::load(&provider))
            .await
            .map_err(|e| Error::ModelLoad(format!("model loading task failed: {}", e)))??;
        Ok(Arc::new(model))
    }
}

struct Session {
    plan: TractPlan,
    tokenizer: Tokenizer,
    max_tokens: usize,
}

impl Session {
    fn encode(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let encodings = texts
            .iter()
            .map(|text| {
                self.tokenizer
                    .encode(text.as_str(), true)
                    .map_err(|e| Error::Embedding(format!("tokenization failed: {}", e)))
            })
            .collect::<Result<Vec<_>>>()?;

        let batch = encodings.len();
        let seq_len = encodings
            .iter()
            .map(|encoding| encoding.get_ids().len().min(self.max_tokens))
            .max()
            .unwrap_or(0)
            .max(1);

        let mut input_ids = vec![0i64; batch * seq_len];
        let mut attention_mask = vec![0i64; batch * seq_len];
        let mut token_type_ids = vec![0i64; batch * seq_len];

        for (row, encoding) in encodings.iter().enumerate() {
            let ids = encoding.get_ids();
            let mask = encoding.get_attention_mask();
            let types = encoding.get_type_ids();
            for col in 0..ids.len().min(self.max_tokens) {
                let at = row * seq_len + col;
                input_ids[at] = i64::from(ids[col]);
                attention_mask[at] = i64::from(mask[col]);
                token_type_ids[at] = i64::from(types[col]);
            }
        }

        let tensor = |data: &[i64]| {
            Tensor::from_shape(&[batch, seq_len], data)
                .map_err(|e| Error::Embedding(format!("invalid input shape: {}", e)))
        };
        let inputs: TVec<TValue> = tvec![
            tensor(&input_ids)?.into(),
            tensor(&attention_mask)?.into(),
            tensor(&token_type_ids)?.into(),
        ];

        let outputs = self
            .plan
            .run(inputs)
            .map_err(|e| Error::Embedding(format!("inference failed: {}", e)))?;
        let output = outputs
            .first()
            .ok_or_else(|| Error::Embedding("model produced no output".to_string()))?;

        let shape = output.shape();
        if shape.len() != 3 || shape[0] != batch || shape[1] != seq_len {
            return Err(Error::Embedding(format!(
                "unexpected output shape {:?} for {} inputs of {} tokens",
                shape, batch, seq_len
            )));
        }
        let hidden = shape[2];
        let values = output
            .as_slice::<f32>()
            .map_err(|e| Error::Embedding(format!("unexpected output type: {}", e)))?;

        debug!(batch, seq_len, hidden, "ran sentence encoder");
        Ok((0..batch)
            .map(|row| {
                let tokens = &values[row * seq_len * hidden..(row + 1) * seq_len * hidden];
                let mask = &attention_mask[row * seq_len..(row + 1) * seq_len];
                mean_pool(tokens, mask, hidden)
            })
            .collect())
    }
}

/// Pretrained sentence encoder running in-process
pub struct OnnxEmbeddingModel {
    session: Arc<Session>,
    model_id: String,
    dimension: usize,
}

impl OnnxEmbeddingModel {
    fn load(provider: &OnnxEmbeddingProvider) -> Result<Self> {
        let dir = provider.model_dir();
        let model_path = provider.model_file().ok_or_else(|| {
            Error::ModelLoad(format!("no model.onnx found under {}", dir.display()))
        })?;
        let load_error = |e: TractError| {
            Error::ModelLoad(format!("onnx model {}: {}", model_path.display(), e))
        };
        let plan = tract_onnx::onnx()
            .model_for_path(&model_path)
            .map_err(load_error)?
            .into_optimized()
            .map_err(load_error)?
            .into_runnable()
            .map_err(load_error)?;

        let tokenizer_path = provider.tokenizer_file();
        if !tokenizer_path.is_file() {
            return Err(Error::ModelLoad(format!(
                "no {} found under {}",
                TOKENIZER_FILE,
                dir.display()
            )));
        }
        let tokenizer = Tokenizer::from_file(&tokenizer_path).map_err(|e| {
            Error::ModelLoad(format!("tokenizer {}: {}", tokenizer_path.display(), e))
        })?;

        let session = Session {
            plan,
            tokenizer,
            max_tokens: provider.max_tokens,
        };

        // the hidden size is only known once the graph has run
        let dimension = session
            .encode(&["dimension check".to_string()])
            .map_err(|e| Error::ModelLoad(e.to_string()))?
            .first()
            .map(Vec::len)
            .filter(|len| *len > 0)
            .ok_or_else(|| Error::ModelLoad("model produced an empty vector".to_string()))?;

        let model_id = format!("onnx-{}", provider.model_name());
        info!(model = %model_id, dimension, path = %model_path.display(), "loaded onnx model");
        Ok(Self {
            session: Arc::new(session),
            model_id,
            dimension,
        })
    }
}

#[async_trait]
impl EmbeddingModel for OnnxEmbeddingModel {
    fn model_id(&self) -> &str {
        &self.model_id
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<EmbeddingVector>> {
        let session = Arc::clone(&self.session);
        let texts = texts.to_vec();
        let vectors = tokio::task::spawn_blocking(move || session.encode(&texts))
            .await
            .map_err(|e| Error::Embedding(format!("inference task failed: {}", e)))??;
        Ok(vectors.into_iter().map(EmbeddingVector::new).collect())
    }
}

/// Mean of the unmasked token rows, L2-normalised
fn mean_pool(tokens: &[f32], mask: &[i64], hidden: usize) -> Vec<f32> {
    let mut sum = vec![0.0f32; hidden];
    let mut count = 0.0f32;

    for (row, &m) in tokens.chunks(hidden).zip(mask) {
        if m > 0 {
            for (acc, value) in sum.iter_mut().zip(row) {
                *acc += value;
            }
            count += 1.0;
        }
    }

    if count > 0.0 {
        sum.iter_mut().for_each(|v| *v /= count);
    }

    let norm = sum.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 0.0 {
        sum.iter_mut().for_each(|v| *v /= norm);
    }
    sum
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_mean_pool_skips_padding() {
        // two real tokens and one padded position
        let tokens = [3.0, 0.0, 3.0, 8.0, 100.0, 100.0];
        let pooled = mean_pool(&tokens, &[1, 1, 0], 2);

        assert!((pooled[0] - 0.6).abs() < 1e-5);
        assert!((pooled[1] - 0.8).abs() < 1e-5);
    }

    #[test]
    fn test_mean_pool_all_masked_is_zero() {
        let pooled = mean_pool(&[1.0, 2.0], &[0], 2);
        assert_eq!(pooled, vec![0.0, 0.0]);
    }

    #[test]
    fn test_model_name_and_files() {
        let dir = TempDir::new().unwrap();
        let model_dir = dir.path().join(DEFAULT_ONNX_MODEL);
        std::fs::create_dir_all(model_dir.join("onnx")).unwrap();

        let provider = OnnxEmbeddingProvider::new(&model_dir);
        assert_eq!(provider.model_name(), "all-MiniLM-L6-v2");
        assert!(!provider.is_available());

        std::fs::write(model_dir.join("onnx/model.onnx"), b"weights").unwrap();
        std::fs::write(model_dir.join("tokenizer.json"), b"{}").unwrap();
        assert!(provider.is_available());
        assert_eq!(provider.model_file(), Some(model_dir.join("onnx/model.onnx")));
    }

    #[tokio::test]
    async fn test_missing_model_is_a_load_error() {
        let dir = TempDir::new().unwrap();
        let provider = OnnxEmbeddingProvider::new(dir.path().join("absent"));

        let err = provider.load().await.err().unwrap();
        assert!(matches!(err, Error::ModelLoad(_)));
        assert!(err.to_string().contains("model.onnx"));
    }

    #[tokio::test]
    async fn test_unreadable_weights_are_a_load_error() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("model.onnx"), b"not an onnx graph").unwrap();
        std::fs::write(dir.path().join("tokenizer.json"), b"{}").unwrap();

        let err = OnnxEmbeddingProvider::new(dir.path()).load().await.err().unwrap();
        assert!(matches!(err, Error::ModelLoad(_)));
        assert!(err.to_string().contains("onnx model"));
    }
}
