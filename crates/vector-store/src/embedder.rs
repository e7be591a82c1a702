use std::path::Path;

use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::value::Tensor;
use tokenizers::Tokenizer;
use tokio::sync::Mutex;

use crate::error::{Result, VectorStoreError};
use crate::model_registry::ModelPrefixes;

/// Longest token sequence handed to the model; inputs are truncated, never
/// rejected, since a chunk payload is already capped by the chunker's
/// `MAX_CHUNK_TOKENS`.
const MAX_SEQUENCE_LENGTH: usize = 512;

/// Wraps a single ONNX Runtime session plus its tokenizer. Inference calls
/// are serialized behind a `tokio::sync::Mutex`: `ort::Session::run` is
/// `&mut self` and the runtime is not meant to be shared across threads
/// without external synchronization, so one embedder handles one request
/// at a time rather than pooling sessions.
pub struct LocalEmbedder {
    model_id: String,
    dimensions: usize,
    prefixes: ModelPrefixes,
    inner: Mutex<Inner>,
}

struct Inner {
    session: Session,
    tokenizer: Tokenizer,
}

impl LocalEmbedder {
    /// Load an ONNX model and its tokenizer from a model directory
    /// containing `model.onnx` and `tokenizer.json`.
    pub fn load(model_dir: &Path, model_id: impl Into<String>, dimensions: usize, prefixes: ModelPrefixes) -> Result<Self> {
        let onnx_path = model_dir.join("model.onnx");
        let tokenizer_path = model_dir.join("tokenizer.json");

        let session = Session::builder()
            .map_err(|e| VectorStoreError::Onnx(e.to_string()))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| VectorStoreError::Onnx(e.to_string()))?
            .with_intra_threads(1)
            .map_err(|e| VectorStoreError::Onnx(e.to_string()))?
            .commit_from_file(&onnx_path)
            .map_err(|e| VectorStoreError::Onnx(e.to_string()))?;

        let tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| VectorStoreError::Tokenizer(e.to_string()))?;

        Ok(Self {
            model_id: model_id.into(),
            dimensions,
            prefixes,
            inner: Mutex::new(Inner { session, tokenizer }),
        })
    }

    #[must_use]
    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    #[must_use]
    pub const fn dimensions(&self) -> usize {
        self.dimensions
    }

    pub async fn embed_document(&self, text: &str) -> Result<Vec<f32>> {
        let prefixed = format!("{}{text}", self.prefixes.doc_prefix);
        self.embed_one(&prefixed).await
    }

    pub async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        let prefixed = format!("{}{text}", self.prefixes.query_prefix);
        self.embed_one(&prefixed).await
    }

    async fn embed_one(&self, text: &str) -> Result<Vec<f32>> {
        let mut batch = self.embed_batch(std::slice::from_ref(&text.to_string())).await?;
        Ok(batch.remove(0))
    }

    /// Embed a batch of already-prefixed texts, preserving input order in
    /// the output. Batching is a fixed-size pass over `texts`; callers that
    /// need document vs. query prefixing call `embed_document`/`embed_query`
    /// instead, which delegate here for a single item.
    pub async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let mut guard = self.inner.lock().await;
        let Inner { session, tokenizer } = &mut *guard;

        let encodings = tokenizer
            .encode_batch(texts.to_vec(), true)
            .map_err(|e| VectorStoreError::Tokenizer(e.to_string()))?;

        let batch_size = encodings.len();
        let seq_len = encodings
            .iter()
            .map(|e| e.get_ids().len().min(MAX_SEQUENCE_LENGTH))
            .max()
            .unwrap_or(1)
            .max(1);

        let mut input_ids = vec![0i64; batch_size * seq_len];
        let mut attention_mask = vec![0i64; batch_size * seq_len];
        let token_type_ids = vec![0i64; batch_size * seq_len];

        for (row, encoding) in encodings.iter().enumerate() {
            let ids = encoding.get_ids();
            let mask = encoding.get_attention_mask();
            let len = ids.len().min(seq_len);
            for col in 0..len {
                input_ids[row * seq_len + col] = i64::from(ids[col]);
                attention_mask[row * seq_len + col] = i64::from(mask[col]);
            }
        }

        let input_ids_tensor = Tensor::from_array(([batch_size, seq_len], input_ids))
            .map_err(|e| VectorStoreError::Onnx(e.to_string()))?;
        let attention_mask_tensor = Tensor::from_array(([batch_size, seq_len], attention_mask.clone()))
            .map_err(|e| VectorStoreError::Onnx(e.to_string()))?;
        let token_type_ids_tensor = Tensor::from_array(([batch_size, seq_len], token_type_ids))
            .map_err(|e| VectorStoreError::Onnx(e.to_string()))?;

        let outputs = session
            .run(ort::inputs![
                "input_ids" => input_ids_tensor,
                "attention_mask" => attention_mask_tensor,
                "token_type_ids" => token_type_ids_tensor,
            ])
            .map_err(|e| VectorStoreError::Onnx(e.to_string()))?;

        let (shape, data) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| VectorStoreError::Onnx(e.to_string()))?;

        let hidden = *shape.last().ok_or_else(|| VectorStoreError::Onnx("empty output shape".into()))? as usize;
        if hidden < self.dimensions {
            return Err(VectorStoreError::DimensionMismatch {
                expected: self.dimensions,
                actual: hidden,
            });
        }

        let mut vectors = Vec::with_capacity(batch_size);
        for row in 0..batch_size {
            let pooled = mean_pool(data, row, seq_len, hidden, &attention_mask);
            let truncated = &pooled[..self.dimensions];
            vectors.push(normalize(truncated));
        }

        Ok(vectors)
    }
}

/// Mean-pool token embeddings over non-padding positions for one row of a
/// `[batch, seq_len, hidden]` last_hidden_state output.
fn mean_pool(data: &[f32], row: usize, seq_len: usize, hidden: usize, attention_mask: &[i64]) -> Vec<f32> {
    let mut sum = vec![0f32; hidden];
    let mut count = 0f32;
    for col in 0..seq_len {
        if attention_mask[row * seq_len + col] == 0 {
            continue;
        }
        let base = (row * seq_len + col) * hidden;
        for h in 0..hidden {
            sum[h] += data[base + h];
        }
        count += 1.0;
    }
    let count = count.max(1.0);
    for v in &mut sum {
        *v /= count;
    }
    sum
}

/// Re-normalize after Matryoshka-style truncation so the stored vector has
/// unit L2 norm and cosine distance stays well-defined.
fn normalize(vec: &[f32]) -> Vec<f32> {
    let norm: f32 = vec.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm == 0.0 {
        return vec.to_vec();
    }
    vec.iter().map(|v| v / norm).collect()
}
