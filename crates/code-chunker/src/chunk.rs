use serde::{Deserialize, Serialize};

use crate::language::Language;

/// Maximum whitespace/punctuation-split tokens a single chunk may hold
/// before it gets split into overlapping sub-chunks.
pub const MAX_CHUNK_TOKENS: usize = 512;

/// Units with fewer lines than this are merged upward rather than kept as
/// their own chunk, to avoid index pollution from one-line accessors.
pub const MIN_CHUNK_LINES: usize = 5;

/// Fraction of a split window's lines that overlap with its neighbor.
pub const CHUNK_OVERLAP_RATIO: f32 = 0.25;

/// Minimum leading context carried into every split window.
pub const GROUNDING_LINES: usize = 3;

/// The closed set of chunk kinds named by the data model. Every chunk
/// persisted to the index carries exactly one of these, even though the
/// language-specific `ChunkType` below tracks a few more specific flavors
/// internally (e.g. `Struct`) for the graph/symbol-resolution crates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ChunkKind {
    Function,
    Method,
    Class,
    Interface,
    Module,
    Block,
}

impl ChunkKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Function => "function",
            Self::Method => "method",
            Self::Class => "class",
            Self::Interface => "interface",
            Self::Module => "module",
            Self::Block => "block",
        }
    }
}

/// Internal symbol-flavor tag, a superset of `ChunkKind` used by the graph
/// and search crates when they need to distinguish e.g. a struct from a
/// class. Maps down onto `ChunkKind` when a chunk is persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ChunkType {
    Function,
    Method,
    Class,
    Struct,
    Interface,
    Module,
    Variable,
    Block,
}

impl ChunkType {
    #[must_use]
    pub const fn as_chunk_kind(self) -> ChunkKind {
        match self {
            Self::Function => ChunkKind::Function,
            Self::Method => ChunkKind::Method,
            Self::Class | Self::Struct => ChunkKind::Class,
            Self::Interface => ChunkKind::Interface,
            Self::Module => ChunkKind::Module,
            Self::Variable | Self::Block => ChunkKind::Block,
        }
    }
}

/// Metadata attached to a chunk beyond its raw span and text.
#[derive(Debug, Clone, Default, Serialize, Deserialize, schemars::JsonSchema)]
pub struct ChunkMetadata {
    pub symbol_name: Option<String>,
    pub qualified_name: Option<String>,
    pub scope: Option<String>,
    pub chunk_type: Option<ChunkType>,
    pub docstring: Option<String>,
}

impl ChunkMetadata {
    #[must_use]
    pub fn symbol_name(mut self, name: impl Into<String>) -> Self {
        self.symbol_name = Some(name.into());
        self
    }

    #[must_use]
    pub fn qualified_name(mut self, name: impl Into<String>) -> Self {
        self.qualified_name = Some(name.into());
        self
    }

    #[must_use]
    pub fn scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = Some(scope.into());
        self
    }

    #[must_use]
    pub fn chunk_type(mut self, kind: ChunkType) -> Self {
        self.chunk_type = Some(kind);
        self
    }

    #[must_use]
    pub fn docstring(mut self, doc: impl Into<String>) -> Self {
        self.docstring = Some(doc.into());
        self
    }
}

/// The atomic indexed unit: a contiguous span of source with metadata.
///
/// This is the data model's `Chunk`; it's named `CodeChunk` in code to keep
/// call sites unambiguous against `context_vector_store`'s `VectorRecord`
/// and `context_keyword_index`'s `Posting`, which both key off `chunk_id`.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct CodeChunk {
    pub id: String,
    pub file_path: String,
    pub language: Language,
    pub start_line: usize,
    pub end_line: usize,
    pub content: String,
    pub metadata: ChunkMetadata,
    pub token_estimate: usize,
    pub last_updated: i64,
}

impl CodeChunk {
    /// Construct a chunk, deriving `id`, `language`, and `token_estimate`
    /// from the other fields. `last_updated` is left at 0; callers that
    /// care (the indexer, at embed time) set it explicitly.
    #[must_use]
    pub fn new(
        file_path: String,
        start_line: usize,
        end_line: usize,
        content: String,
        metadata: ChunkMetadata,
    ) -> Self {
        let language = Language::from_path(&file_path);
        let token_estimate = estimate_tokens(&content);
        let kind = metadata
            .chunk_type
            .map_or(ChunkKind::Block, ChunkType::as_chunk_kind);
        let id = make_chunk_id(
            &file_path,
            kind,
            metadata.symbol_name.as_deref(),
            start_line,
            None,
        );
        Self {
            id,
            file_path,
            language,
            start_line,
            end_line,
            content,
            metadata,
            token_estimate,
            last_updated: 0,
        }
    }

    #[must_use]
    pub fn with_part(mut self, part: usize) -> Self {
        let kind = self
            .metadata
            .chunk_type
            .map_or(ChunkKind::Block, ChunkType::as_chunk_kind);
        self.id = make_chunk_id(
            &self.file_path,
            kind,
            self.metadata.symbol_name.as_deref(),
            self.start_line,
            Some(part),
        );
        self
    }

    #[must_use]
    pub fn touch(mut self, last_updated: i64) -> Self {
        self.last_updated = last_updated;
        self
    }

    #[must_use]
    pub const fn line_count(&self) -> usize {
        self.end_line.saturating_sub(self.start_line) + 1
    }

    #[must_use]
    pub const fn kind(&self) -> ChunkKind {
        match self.metadata.chunk_type {
            Some(t) => t.as_chunk_kind(),
            None => ChunkKind::Block,
        }
    }
}

/// `"{relative_path}#{kind}:{name_or_anon}:{start_line}[:part{N}]"`, bit-exact.
#[must_use]
pub fn make_chunk_id(
    relative_path: &str,
    kind: ChunkKind,
    name: Option<&str>,
    start_line: usize,
    part: Option<usize>,
) -> String {
    let name = name.unwrap_or("anon");
    let mut id = format!("{relative_path}#{}:{name}:{start_line}", kind.as_str());
    if let Some(n) = part {
        id.push_str(&format!(":part{n}"));
    }
    id
}

/// Count of whitespace/punctuation-split tokens, used for chunk-size
/// control. Not a tokenizer-model call: that would conflate chunking with
/// embedding.
#[must_use]
pub fn estimate_tokens(text: &str) -> usize {
    text.split(|c: char| c.is_whitespace() || (c.is_ascii_punctuation() && c != '_'))
        .filter(|s| !s.is_empty())
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_id_matches_bit_exact_format() {
        let id = make_chunk_id("src/a.rs", ChunkKind::Function, Some("foo"), 10, None);
        assert_eq!(id, "src/a.rs#function:foo:10");
    }

    #[test]
    fn chunk_id_anon_name_and_part_suffix() {
        let id = make_chunk_id("src/a.rs", ChunkKind::Block, None, 1, Some(2));
        assert_eq!(id, "src/a.rs#block:anon:1:part2");
    }

    #[test]
    fn token_estimate_splits_on_whitespace_and_punctuation() {
        assert_eq!(estimate_tokens("fn foo(a, b) { a + b }"), 9);
        assert_eq!(estimate_tokens("get_user_by_id"), 1);
    }

    #[test]
    fn new_derives_language_and_id() {
        let chunk = CodeChunk::new(
            "src/lib.rs".to_string(),
            3,
            5,
            "fn foo() {}".to_string(),
            ChunkMetadata::default()
                .symbol_name("foo")
                .chunk_type(ChunkType::Function),
        );
        assert_eq!(chunk.language, Language::Rust);
        assert_eq!(chunk.id, "src/lib.rs#function:foo:3");
        assert_eq!(chunk.line_count(), 3);
    }
}
