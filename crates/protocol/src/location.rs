use serde::{Deserialize, Serialize};

/// A single point of reference to a symbol: where it's defined, or where
/// it's used.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct Location {
    pub relative_path: String,
    pub line: u32,
    pub column: u32,
    pub kind: String,
}
