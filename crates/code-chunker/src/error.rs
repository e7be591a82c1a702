use thiserror::Error;

pub type Result<T> = std::result::Result<T, ChunkerError>;

#[derive(Debug, Error)]
pub enum ChunkerError {
    #[error("unsupported language: {0}")]
    UnsupportedLanguage(String),

    #[error("failed to parse {path}: {message}")]
    ParseFailed { path: String, message: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("operation cancelled")]
    Cancelled,
}

impl ChunkerError {
    #[must_use]
    pub fn unsupported_language(lang: impl Into<String>) -> Self {
        Self::UnsupportedLanguage(lang.into())
    }

    #[must_use]
    pub fn parse_failed(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ParseFailed {
            path: path.into(),
            message: message.into(),
        }
    }
}
