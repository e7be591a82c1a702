use thiserror::Error;

pub type Result<T> = std::result::Result<T, VectorStoreError>;

#[derive(Debug, Error)]
pub enum VectorStoreError {
    #[error("embedder called before model load")]
    ModelNotReady,

    #[error("model output dimension {actual} is smaller than configured D={expected}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("vector has length {actual}, expected D={expected}")]
    VectorLengthMismatch { expected: usize, actual: usize },

    #[error("onnx runtime error: {0}")]
    Onnx(String),

    #[error("tokenizer error: {0}")]
    Tokenizer(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("operation cancelled")]
    Cancelled,
}
