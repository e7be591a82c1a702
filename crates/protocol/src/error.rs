use serde::{Deserialize, Serialize};

/// Coarse error classification shared across every tool response.
///
/// Kept deliberately small and stable: clients branch on `kind`, not on the
/// free-form `message`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The request itself was malformed (bad path, bad arguments).
    InvalidRequest,
    /// The project has never been indexed, or the index is missing files.
    NotIndexed,
    /// A dependency the request needs isn't available (embedding model,
    /// git binary, etc).
    Unavailable,
    /// Reading or writing persisted state failed.
    StoreIo,
    /// The operation was cancelled before it completed.
    Cancelled,
    /// The operation exceeded its deadline.
    Timeout,
    /// Anything else.
    Internal,
}

/// Uniform error payload returned by every tool on failure.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct ErrorEnvelope {
    pub kind: ErrorKind,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ErrorEnvelope {
    #[must_use]
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            details: None,
        }
    }

    #[must_use]
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }
}
