use context_code_chunker::CodeChunk;
use petgraph::graph::NodeIndex;
use petgraph::stable_graph::StableGraph;
use serde::{Deserialize, Serialize};

/// A symbol extracted from a chunk: the unit a graph node wraps.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Symbol {
    pub name: String,
    pub qualified_name: Option<String>,
    pub file_path: String,
    pub start_line: usize,
    pub end_line: usize,
    pub symbol_type: SymbolType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SymbolType {
    Function,
    Method,
    Class,
    Struct,
    Enum,
    Interface,
    Variable,
    Constant,
    Module,
}

/// One graph node: a symbol plus the chunk it came from, keyed by
/// `chunk_id` (`"{file_path}:{start_line}:{end_line}"`).
#[derive(Debug, Clone)]
pub struct GraphNode {
    pub symbol: Symbol,
    pub chunk_id: String,
    pub chunk: Option<CodeChunk>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RelationshipType {
    Calls,
    Uses,
    Contains,
    Extends,
    Imports,
    TestedBy,
}

#[derive(Debug, Clone, Copy)]
pub struct GraphEdge {
    pub relationship: RelationshipType,
    pub weight: f32,
}

/// Call/dependency graph over a codebase's chunks.
pub struct CodeGraph {
    pub(crate) graph: StableGraph<GraphNode, GraphEdge>,
}

impl Default for CodeGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl CodeGraph {
    #[must_use]
    pub fn new() -> Self {
        Self {
            graph: StableGraph::new(),
        }
    }

    pub fn add_node(&mut self, node: GraphNode) -> NodeIndex {
        self.graph.add_node(node)
    }

    pub fn add_edge(&mut self, from: NodeIndex, to: NodeIndex, edge: GraphEdge) {
        self.graph.add_edge(from, to, edge);
    }

    #[must_use]
    pub fn get_node(&self, idx: NodeIndex) -> Option<&GraphNode> {
        self.graph.node_weight(idx)
    }

    #[must_use]
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Find the first node whose symbol name or qualified name matches
    /// `name` exactly. Qualified names are checked first so `Foo::bar`
    /// style lookups resolve before a looser bare-name match.
    #[must_use]
    pub fn find_node(&self, name: &str) -> Option<NodeIndex> {
        self.graph
            .node_indices()
            .find(|&idx| {
                self.graph[idx]
                    .symbol
                    .qualified_name
                    .as_deref()
                    .is_some_and(|q| q == name)
            })
            .or_else(|| {
                self.graph
                    .node_indices()
                    .find(|&idx| self.graph[idx].symbol.name == name)
            })
    }

    #[must_use]
    pub fn find_nodes_by_chunk(&self, chunk_id: &str) -> Vec<NodeIndex> {
        self.graph
            .node_indices()
            .filter(|&idx| self.graph[idx].chunk_id == chunk_id)
            .collect()
    }

    /// All `(NodeIndex, &GraphNode)` pairs, in arena order (not sorted).
    pub fn nodes(&self) -> impl Iterator<Item = (NodeIndex, &GraphNode)> {
        self.graph.node_indices().map(move |idx| (idx, &self.graph[idx]))
    }
}
