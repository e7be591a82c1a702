use thiserror::Error;

pub type Result<T> = std::result::Result<T, GraphError>;

#[derive(Debug, Error)]
pub enum GraphError {
    #[error("failed to build graph: {0}")]
    BuildError(String),

    #[error("node not found: {0}")]
    NodeNotFound(String),

    #[error("operation cancelled")]
    Cancelled,
}
