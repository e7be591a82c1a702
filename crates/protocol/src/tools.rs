use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{ErrorEnvelope, Location};

#[derive(Debug, Default, Deserialize, schemars::JsonSchema)]
pub struct IndexCodebaseRequest {
    /// Force a full reindex regardless of what the change planner would
    /// otherwise decide.
    #[schemars(description = "Force a full reindex")]
    pub force: Option<bool>,

    /// Mix dirty working-copy content into the plan alongside committed
    /// state.
    #[schemars(description = "Include uncommitted working-copy changes")]
    pub include_uncommitted: Option<bool>,

    /// Cancel the run and report `ErrorKind::Timeout` if it hasn't finished
    /// within this many milliseconds.
    #[schemars(description = "Cancel and report a timeout after this many milliseconds")]
    pub timeout_ms: Option<u64>,
}

#[derive(Debug, Serialize, schemars::JsonSchema)]
pub struct IndexCodebaseResult {
    pub files_processed: usize,
    pub chunks_created: usize,
    pub files_skipped: usize,
    pub files_updated: usize,
    pub files_deleted: usize,
    pub languages: BTreeMap<String, usize>,
    pub duration_ms: u64,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorEnvelope>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub files_failed: Vec<String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct SearchCodeRequest {
    /// Natural-language or literal search query.
    #[schemars(description = "Search query")]
    pub query: String,

    /// Maximum number of results to return.
    #[schemars(description = "Maximum number of results")]
    pub k: Option<usize>,

    /// Restrict results to a single language tag.
    #[schemars(description = "Restrict results to this language")]
    pub language_filter: Option<String>,

    /// Fusion strategy: weighted ("hybrid", default) or reciprocal rank
    /// fusion ("rrf").
    #[schemars(description = "Fusion mode: \"hybrid\" or \"rrf\"")]
    pub mode: Option<String>,

    /// Weight given to the semantic branch under "hybrid" mode, default 0.7.
    #[schemars(description = "Semantic-branch weight under hybrid mode")]
    pub alpha: Option<f32>,

    /// Cancel the search and report `ErrorKind::Timeout` if it hasn't
    /// finished within this many milliseconds.
    #[schemars(description = "Cancel and report a timeout after this many milliseconds")]
    pub timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, Serialize, schemars::JsonSchema)]
pub struct SearchHit {
    pub chunk_id: String,
    pub relative_path: String,
    pub start_line: usize,
    pub end_line: usize,
    pub code: String,
    pub sem_score: f32,
    pub kw_score: f32,
    pub combined_score: f32,
}

#[derive(Debug, Serialize, schemars::JsonSchema)]
pub struct SearchCodeResult {
    pub results: Vec<SearchHit>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorEnvelope>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct FindSymbolRequest {
    #[schemars(description = "Symbol name to resolve")]
    pub symbol_name: String,

    /// Restrict the tree-sitter fallback scan to the transitive closure of
    /// these entry-point files, instead of the whole index.
    #[schemars(description = "Entry-point files to scope the fallback scan to")]
    pub entry_points: Option<Vec<String>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum SymbolSource {
    Lsp,
    Treesitter,
}

#[derive(Debug, Serialize, schemars::JsonSchema)]
pub struct FindSymbolResult {
    pub symbol_name: String,
    pub definitions: Vec<Location>,
    pub references: Vec<Location>,
    pub source: SymbolSource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorEnvelope>,
}

#[derive(Debug, Default, Deserialize, schemars::JsonSchema)]
pub struct GetStatsRequest {}

#[derive(Debug, Serialize, schemars::JsonSchema)]
pub struct GetStatsResult {
    pub total_chunks: usize,
    pub languages: BTreeMap<String, usize>,
    pub types: BTreeMap<String, usize>,
    pub last_indexed_commit: Option<String>,
    pub last_indexed_at: Option<String>,
}
