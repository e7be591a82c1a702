//! # Context Graph
//!
//! Code intelligence through graph analysis of relationships and dependencies.
//!
//! ## Features
//!
//! - **Call graph analysis** - understand function/method call chains
//! - **Dependency tracking** - track imports and type usages
//! - **Relationship mapping** - parent-child, caller-callee relationships
//!
//! ## Architecture
//!
//! ```text
//! CodeChunk[]
//!     │
//!     ├──> Graph Builder (AST analysis)
//!     │      ├─ Extract function calls
//!     │      ├─ Extract type references
//!     │      ├─ Extract imports
//!     │      └─ Build edges (relationships)
//!     │
//!     └──> Code Graph (petgraph)
//!            ├─ Nodes: Symbols (functions, classes, methods)
//!            └─ Edges: Relationships (calls, uses, extends)
//! ```

mod builder;
mod error;
mod graph;
mod types;

pub use builder::{GraphBuilder, GraphLanguage};
pub use error::{GraphError, Result};
pub use types::{CodeGraph, GraphEdge, GraphNode, RelationshipType, Symbol, SymbolType};
