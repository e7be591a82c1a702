use thiserror::Error;

pub type Result<T> = std::result::Result<T, KeywordIndexError>;

#[derive(Debug, Error)]
pub enum KeywordIndexError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("operation cancelled")]
    Cancelled,
}
