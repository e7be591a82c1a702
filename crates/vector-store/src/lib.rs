//! Local embedding inference and the flat vector store that indexes its
//! output.
//!
//! The teacher repo has no embedding crate at all (it ranks with fuzzy
//! string matching); this crate is new, grounded on the teacher's
//! `tokio::sync::Mutex`-serialized-access idiom and the embedding payload
//! format the chunk data model specifies.

mod corpus;
mod embedder;
mod error;
mod model_registry;
mod payload;
mod store;

pub use corpus::ChunkCorpus;
pub use embedder::LocalEmbedder;
pub use error::{Result, VectorStoreError};
pub use model_registry::{default_prefixes_for, ModelPrefixes, ModelRegistry};
pub use payload::render_document_payload;
pub use store::{VectorRecord, VectorStore};
