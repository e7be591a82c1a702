//! Symbol resolution: definitions and references for a name, preferring an
//! LSP backend when one is wired in and otherwise falling back to a
//! tree-sitter scan of the indexed chunks (§4.5.2).

use std::collections::{HashMap, HashSet};

use context_code_chunker::CodeChunk;
use context_graph::{GraphBuilder, GraphLanguage};
use context_protocol::{Location, SymbolSource};
use petgraph::graph::NodeIndex;

use crate::error::Result;

/// A pluggable definition/reference provider, e.g. a language server. No
/// concrete implementation ships with this crate; wiring one in is left to
/// the embedding application.
pub trait LspBackend: Send + Sync {
    fn definitions(&self, symbol_name: &str) -> Vec<Location>;
    fn references(&self, symbol_name: &str) -> Vec<Location>;
}

pub struct SymbolResolver {
    lsp: Option<Box<dyn LspBackend>>,
}

impl Default for SymbolResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl SymbolResolver {
    #[must_use]
    pub fn new() -> Self {
        Self { lsp: None }
    }

    #[must_use]
    pub fn with_lsp_backend(lsp: Box<dyn LspBackend>) -> Self {
        Self { lsp: Some(lsp) }
    }

    /// Resolve a symbol name to its definitions and references. When
    /// `entry_points` is given, the tree-sitter fallback restricts its
    /// search to the transitive closure of those files instead of the whole
    /// indexed corpus.
    pub fn find_symbol(
        &self,
        symbol_name: &str,
        chunks: &[CodeChunk],
        entry_points: Option<&[String]>,
    ) -> Result<(Vec<Location>, Vec<Location>, SymbolSource)> {
        if let Some(lsp) = &self.lsp {
            let mut definitions = lsp.definitions(symbol_name);
            let mut references = lsp.references(symbol_name);
            if !definitions.is_empty() || !references.is_empty() {
                dedup_locations(&mut definitions);
                dedup_locations(&mut references);
                return Ok((definitions, references, SymbolSource::Lsp));
            }
        }

        let (mut definitions, mut references) = self.scan_with_tree_sitter(symbol_name, chunks, entry_points)?;
        dedup_locations(&mut definitions);
        dedup_locations(&mut references);
        Ok((definitions, references, SymbolSource::Treesitter))
    }

    fn scan_with_tree_sitter(
        &self,
        symbol_name: &str,
        chunks: &[CodeChunk],
        entry_points: Option<&[String]>,
    ) -> Result<(Vec<Location>, Vec<Location>)> {
        let mut definitions = Vec::new();
        let mut references = Vec::new();

        for (language, bucket) in group_by_graph_language(chunks) {
            let mut builder = GraphBuilder::new(language)?;
            let graph = builder.build(&bucket)?;

            let allowed: Option<HashSet<NodeIndex>> = entry_points.map(|entries| {
                let entry_set: HashSet<&str> = entries.iter().map(String::as_str).collect();
                let mut reachable = HashSet::new();
                for (idx, node) in graph.nodes() {
                    if entry_set.contains(node.symbol.file_path.as_str()) {
                        reachable.insert(idx);
                        for (related, _, _) in graph.get_related_nodes(idx, bucket.len().max(1)) {
                            reachable.insert(related);
                        }
                    }
                }
                reachable
            });

            let Some(node) = graph.find_node(symbol_name) else {
                continue;
            };
            if allowed.as_ref().is_some_and(|set| !set.contains(&node)) {
                continue;
            }

            if let Some(data) = graph.get_node(node) {
                definitions.push(location_from_symbol(&data.symbol, "definition"));
            }
            for (user, _relationship) in graph.get_all_usages(node) {
                if allowed.as_ref().is_some_and(|set| !set.contains(&user)) {
                    continue;
                }
                if let Some(data) = graph.get_node(user) {
                    references.push(location_from_symbol(&data.symbol, "reference"));
                }
            }
        }

        Ok((definitions, references))
    }
}

fn location_from_symbol(symbol: &context_graph::Symbol, kind: &str) -> Location {
    Location {
        relative_path: symbol.file_path.clone(),
        line: symbol.start_line as u32,
        column: 0,
        kind: kind.to_string(),
    }
}

fn dedup_locations(locations: &mut Vec<Location>) {
    let mut seen = HashSet::new();
    locations.retain(|loc| seen.insert((loc.relative_path.clone(), loc.line, loc.column)));
}

fn to_graph_language(language: context_code_chunker::Language) -> Option<GraphLanguage> {
    match language {
        context_code_chunker::Language::Rust => Some(GraphLanguage::Rust),
        context_code_chunker::Language::Python => Some(GraphLanguage::Python),
        context_code_chunker::Language::JavaScript => Some(GraphLanguage::JavaScript),
        context_code_chunker::Language::TypeScript => Some(GraphLanguage::TypeScript),
        _ => None,
    }
}

fn group_by_graph_language(chunks: &[CodeChunk]) -> Vec<(GraphLanguage, Vec<CodeChunk>)> {
    let mut buckets: HashMap<&'static str, (GraphLanguage, Vec<CodeChunk>)> = HashMap::new();
    for chunk in chunks {
        let Some(graph_language) = to_graph_language(chunk.language) else {
            continue;
        };
        buckets
            .entry(chunk.language.as_str())
            .or_insert_with(|| (graph_language, Vec::new()))
            .1
            .push(chunk.clone());
    }
    buckets.into_values().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dedup_drops_duplicate_path_line_column() {
        let mut locations = vec![
            Location { relative_path: "a.rs".to_string(), line: 1, column: 0, kind: "reference".to_string() },
            Location { relative_path: "a.rs".to_string(), line: 1, column: 0, kind: "reference".to_string() },
            Location { relative_path: "a.rs".to_string(), line: 2, column: 0, kind: "reference".to_string() },
        ];
        dedup_locations(&mut locations);
        assert_eq!(locations.len(), 2);
    }

    #[test]
    fn unsupported_languages_are_skipped_not_errored() {
        assert!(to_graph_language(context_code_chunker::Language::Go).is_none());
        assert!(to_graph_language(context_code_chunker::Language::Rust).is_some());
    }
}
