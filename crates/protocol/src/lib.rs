//! Shared wire types for the code-intel tool-call surface.
//!
//! These types are the contract between `context-search`/`context-indexer`
//! and the MCP tool handlers in `context-finder-mcp`. They derive
//! `schemars::JsonSchema` so the MCP server can generate tool schemas
//! straight from the types that also get serialized to disk and over the
//! wire.

mod error;
mod location;
mod tools;

pub use error::{ErrorEnvelope, ErrorKind};
pub use location::Location;
pub use tools::{
    FindSymbolRequest, FindSymbolResult, GetStatsRequest, GetStatsResult, IndexCodebaseRequest,
    IndexCodebaseResult, SearchCodeRequest, SearchCodeResult, SearchHit, SymbolSource,
};

/// Serialize a value to a pretty JSON string, falling back to compact form
/// only if pretty-printing somehow fails (it never does for our types).
pub fn serialize_json<T: serde::Serialize>(value: &T) -> anyhow::Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}
