//! Parses source files and splits them into semantically meaningful code
//! units ("chunks") with the metadata the embedder and indexes need.

mod chunk;
mod chunker;
mod error;
mod language;

pub use chunk::{
    estimate_tokens, make_chunk_id, ChunkKind, ChunkMetadata, ChunkType, CodeChunk,
    CHUNK_OVERLAP_RATIO, GROUNDING_LINES, MAX_CHUNK_TOKENS, MIN_CHUNK_LINES,
};
pub use chunker::Chunker;
pub use error::{ChunkerError, Result};
pub use language::{Language, LanguageSizeLimits};
