use thiserror::Error;

pub type Result<T> = std::result::Result<T, SearchError>;

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("query engine is not ready: {0}")]
    NotReady(String),

    #[error("vector store error: {0}")]
    VectorStore(#[from] context_vector_store::VectorStoreError),

    #[error("keyword index error: {0}")]
    KeywordIndex(#[from] context_keyword_index::KeywordIndexError),

    #[error("indexer error: {0}")]
    Indexer(#[from] context_indexer::IndexerError),

    #[error("graph error: {0}")]
    Graph(#[from] context_graph::GraphError),

    #[error("operation cancelled")]
    Cancelled,

    #[error("operation timed out")]
    Timeout,

    #[error("{0}")]
    Internal(String),
}
