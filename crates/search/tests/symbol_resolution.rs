//! Finds a symbol's definition and its callers across a small multi-file
//! Rust corpus, exercising the tree-sitter fallback path end to end (no
//! embedder or LSP backend involved).

use context_code_chunker::{ChunkMetadata, ChunkType, CodeChunk};
use context_protocol::SymbolSource;
use context_search::SymbolResolver;

fn chunk(file: &str, name: &str, content: &str, start_line: usize) -> CodeChunk {
    let metadata = ChunkMetadata::default().symbol_name(name).chunk_type(ChunkType::Function);
    CodeChunk::new(file.to_string(), start_line, start_line + 2, content.to_string(), metadata)
}

#[test]
fn finds_definition_and_caller_across_files() {
    let chunks = vec![
        chunk("lib.rs", "helper", "fn helper() -> i32 {\n    42\n}", 1),
        chunk("main.rs", "main", "fn main() {\n    helper();\n}", 1),
    ];

    let resolver = SymbolResolver::new();
    let (definitions, references, source) = resolver.find_symbol("helper", &chunks, None).unwrap();

    assert_eq!(source, SymbolSource::Treesitter);
    assert_eq!(definitions.len(), 1);
    assert_eq!(definitions[0].relative_path, "lib.rs");
    assert_eq!(references.len(), 1);
    assert_eq!(references[0].relative_path, "main.rs");
}

#[test]
fn entry_points_restrict_the_search_to_their_closure() {
    let chunks = vec![
        chunk("lib.rs", "helper", "fn helper() -> i32 {\n    42\n}", 1),
        chunk("main.rs", "main", "fn main() {\n    helper();\n}", 1),
        chunk("unrelated.rs", "other", "fn other() {\n    1;\n}", 1),
    ];

    let resolver = SymbolResolver::new();
    let entry_points = vec!["unrelated.rs".to_string()];
    let (definitions, references, _source) = resolver.find_symbol("helper", &chunks, Some(&entry_points)).unwrap();

    assert!(definitions.is_empty());
    assert!(references.is_empty());
}

#[test]
fn unknown_symbol_returns_no_locations_without_erroring() {
    let chunks = vec![chunk("lib.rs", "helper", "fn helper() {}", 1)];

    let resolver = SymbolResolver::new();
    let (definitions, references, _source) = resolver.find_symbol("does_not_exist", &chunks, None).unwrap();

    assert!(definitions.is_empty());
    assert!(references.is_empty());
}
