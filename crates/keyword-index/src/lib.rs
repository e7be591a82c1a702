//! Text inverted index and BM25 ranking over chunk text.
//!
//! The teacher repo has no inverted-index implementation of its own (it
//! substitutes fuzzy matching via `nucleo-matcher`); this crate is grounded
//! on its tokenization idiom instead, extended to the camelCase/snake_case
//! splitting and BM25 formula the data model requires.

mod error;
mod index;
mod tokenize;

pub use error::{KeywordIndexError, Result};
pub use index::{DocumentMetadata, KeywordIndex, Posting};
pub use tokenize::tokenize;
