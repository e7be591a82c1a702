//! # Context Indexer
//!
//! Project indexing for semantic code search.
//!
//! ## Pipeline
//!
//! ```text
//! Directory
//!     │
//!     ├──> File Scanner (.gitignore aware)
//!     │      └─> Source files
//!     │
//!     ├──> Change Planner (git diff / hash diff / full)
//!     │      └─> Files to index, files to remove
//!     │
//!     ├──> Chunker (AST-aware)
//!     │      └─> Code chunks
//!     │
//!     └──> Vector store + keyword index (batch embed, BM25)
//!            └─> Searchable index
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use context_indexer::ProjectIndexer;
//! use context_vector_store::{LocalEmbedder, ModelRegistry};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn run(embedder: Arc<LocalEmbedder>) -> anyhow::Result<()> {
//! let indexer = ProjectIndexer::new("/path/to/project", embedder).await?;
//! let stats = indexer.index(false, CancellationToken::new()).await?;
//! println!("indexed {} files, {} chunks", stats.files_indexed, stats.chunks_indexed);
//! # Ok(())
//! # }
//! ```

mod error;
mod index_state;
mod indexer;
mod planner;
mod scanner;
mod stats;

pub use error::{IndexerError, Result};
pub use index_state::{StateFile, INDEX_STATE_SCHEMA_VERSION};
pub use indexer::ProjectIndexer;
pub use planner::{ChangePlanner, FileHashes, FileRef, Plan, ProjectConfig};
pub use scanner::FileScanner;
pub use stats::IndexStats;
