use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

pub const INDEX_STATE_SCHEMA_VERSION: u32 = 1;

/// The persisted `state.json` record, bit-exact to the data model's key
/// list: `last_indexed_commit`, `last_indexed_at`, `branch`,
/// `total_chunks`, `total_files`, `includes_uncommitted`,
/// `embedding_model_id`, `embedding_dimensions`, `schema_version`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct StateFile {
    pub last_indexed_commit: Option<String>,
    pub last_indexed_at: String,
    pub branch: Option<String>,
    pub total_chunks: usize,
    pub total_files: usize,
    pub includes_uncommitted: bool,
    pub embedding_model_id: String,
    pub embedding_dimensions: usize,
    pub schema_version: u32,
}
