use std::collections::HashMap;

use tree_sitter::{Node, Parser};

use crate::chunk::{
    estimate_tokens, CodeChunk, ChunkMetadata, ChunkType, CHUNK_OVERLAP_RATIO, GROUNDING_LINES,
    MAX_CHUNK_TOKENS, MIN_CHUNK_LINES,
};
use crate::error::{ChunkerError, Result};
use crate::language::Language;

/// Splits parsed files into semantically meaningful code units.
///
/// Stateless given a parser adapter per the design notes: the only mutable
/// state is a small per-language `tree_sitter::Parser` cache, which exists
/// purely to avoid re-initializing the grammar on every call.
pub struct Chunker {
    parsers: HashMap<Language, Parser>,
}

impl Default for Chunker {
    fn default() -> Self {
        Self::new()
    }
}

impl Chunker {
    #[must_use]
    pub fn new() -> Self {
        Self {
            parsers: HashMap::new(),
        }
    }

    /// Chunk a single file's content. Returns an empty vec (with a logged
    /// warning) for a language with neither an AST adapter nor fallback
    /// eligibility; callers are expected to have already applied
    /// change-planner-level filters (ignore globs, supported-language set).
    pub fn chunk_file(&mut self, relative_path: &str, content: &str) -> Result<Vec<CodeChunk>> {
        let language = Language::from_path(relative_path);
        if language == Language::Unknown {
            log::warn!("no chunking adapter for {relative_path}, skipping");
            return Ok(Vec::new());
        }

        let chunks = if language.supports_ast() {
            match self.chunk_with_ast(language, relative_path, content) {
                Ok(chunks) => chunks,
                Err(err) => {
                    log::warn!(
                        "ast parse failed for {relative_path} ({err}), falling back to line grouping"
                    );
                    Self::chunk_fallback(relative_path, content)
                }
            }
        } else {
            Self::chunk_fallback(relative_path, content)
        };

        Ok(merge_undersize(split_oversize(chunks)))
    }

    fn chunk_with_ast(
        &mut self,
        language: Language,
        relative_path: &str,
        content: &str,
    ) -> Result<Vec<CodeChunk>> {
        let ts_lang = language.tree_sitter_language()?;
        let parser = self.parsers.entry(language).or_insert_with(Parser::new);
        parser
            .set_language(&ts_lang)
            .map_err(|e| ChunkerError::parse_failed(relative_path, e.to_string()))?;

        let tree = parser
            .parse(content, None)
            .ok_or_else(|| ChunkerError::parse_failed(relative_path, "no parse tree produced"))?;

        let mut units = Vec::new();
        let mut leftover: Vec<(usize, usize)> = Vec::new();
        let root = tree.root_node();
        let mut cursor = root.walk();
        for child in root.children(&mut cursor) {
            walk_node(
                language, child, content, &[], false, true, &mut units, &mut leftover,
            );
        }

        let mut chunks: Vec<CodeChunk> = units
            .into_iter()
            .map(|unit| unit.into_chunk(relative_path))
            .collect();

        chunks.extend(materialize_leftover(relative_path, content, &leftover));
        chunks.sort_by_key(|c| c.start_line);
        Ok(chunks)
    }

    fn chunk_fallback(relative_path: &str, content: &str) -> Vec<CodeChunk> {
        let lines: Vec<&str> = content.lines().collect();
        if lines.is_empty() {
            return Vec::new();
        }

        let mut chunks = Vec::new();
        let mut start = 0usize;
        while start < lines.len() {
            let mut end = start;
            let mut tokens = 0usize;
            while end < lines.len() {
                let line_tokens = estimate_tokens(lines[end]);
                if tokens > 0 && tokens + line_tokens > MAX_CHUNK_TOKENS {
                    break;
                }
                tokens += line_tokens;
                end += 1;
            }
            if end == start {
                end = start + 1;
            }

            let code = lines[start..end].join("\n");
            chunks.push(CodeChunk::new(
                relative_path.to_string(),
                start + 1,
                end,
                code,
                ChunkMetadata::default().chunk_type(ChunkType::Block),
            ));
            start = end;
        }
        chunks
    }
}

struct RawUnit {
    chunk_type: ChunkType,
    name: Option<String>,
    scope: Option<String>,
    docstring: Option<String>,
    start_line: usize,
    end_line: usize,
    code: String,
}

impl RawUnit {
    fn into_chunk(self, relative_path: &str) -> CodeChunk {
        let mut metadata = ChunkMetadata::default().chunk_type(self.chunk_type);
        if let Some(name) = &self.name {
            metadata = metadata.symbol_name(name.clone());
            let qualified = match &self.scope {
                Some(scope) => format!("{scope}.{name}"),
                None => name.clone(),
            };
            metadata = metadata.qualified_name(qualified);
        }
        if let Some(scope) = self.scope {
            metadata = metadata.scope(scope);
        }
        if let Some(doc) = self.docstring {
            metadata = metadata.docstring(doc);
        }
        CodeChunk::new(
            relative_path.to_string(),
            self.start_line,
            self.end_line,
            self.code,
            metadata,
        )
    }
}

/// Grammar node kinds that count as a "named unit" for a language, paired
/// with the `ChunkType` they produce. `is_method` is decided by whether the
/// unit is lexically nested inside a class/struct/impl/trait scope.
fn named_unit_kind(language: Language, node_kind: &str, nested_in_type: bool) -> Option<ChunkType> {
    match language {
        Language::Rust => match node_kind {
            "function_item" => Some(if nested_in_type {
                ChunkType::Method
            } else {
                ChunkType::Function
            }),
            "struct_item" => Some(ChunkType::Struct),
            "enum_item" => Some(ChunkType::Class),
            "trait_item" => Some(ChunkType::Interface),
            "mod_item" => Some(ChunkType::Module),
            _ => None,
        },
        Language::Python => match node_kind {
            "function_definition" => Some(if nested_in_type {
                ChunkType::Method
            } else {
                ChunkType::Function
            }),
            "class_definition" => Some(ChunkType::Class),
            _ => None,
        },
        Language::JavaScript | Language::TypeScript => match node_kind {
            "function_declaration" | "generator_function_declaration" => {
                Some(ChunkType::Function)
            }
            "method_definition" => Some(ChunkType::Method),
            "class_declaration" => Some(ChunkType::Class),
            "interface_declaration" => Some(ChunkType::Interface),
            _ => None,
        },
        _ => None,
    }
}

fn is_type_container(chunk_type: ChunkType) -> bool {
    matches!(
        chunk_type,
        ChunkType::Class | ChunkType::Struct | ChunkType::Interface
    )
}

/// Container node kinds worth descending into when looking for nested
/// units (e.g. a method tucked inside an `impl` block, which is itself not
/// a named unit). Anything else that doesn't match `named_unit_kind` is
/// treated as an atomic leaf for leftover-grouping purposes.
fn is_transparent_container(kind: &str) -> bool {
    matches!(
        kind,
        "impl_item" | "declaration_list" | "class_body" | "export_statement" | "program"
    )
}

/// Depth-first walk that emits a `RawUnit` at every node matching
/// `named_unit_kind`, recursing into its body to find further nested units,
/// and collects the byte span of every top-level node that matched nothing
/// into `leftover` for later block-grouping.
fn walk_node(
    language: Language,
    node: Node,
    content: &str,
    scope_stack: &[String],
    nested_in_type: bool,
    at_top_level: bool,
    units: &mut Vec<RawUnit>,
    leftover: &mut Vec<(usize, usize)>,
) {
    if let Some(chunk_type) = named_unit_kind(language, node.kind(), nested_in_type) {
        let name = node
            .child_by_field_name("name")
            .map(|n| text_of(n, content).to_string());
        let scope = if scope_stack.is_empty() {
            None
        } else {
            Some(scope_stack.join("."))
        };
        let docstring = leading_comment_block(node, content);
        let start_line = node.start_position().row + 1;
        let end_line = node.end_position().row + 1;
        let code = text_of(node, content).to_string();

        units.push(RawUnit {
            chunk_type,
            name: name.clone(),
            scope,
            docstring,
            start_line,
            end_line,
            code,
        });

        let mut child_scope = scope_stack.to_vec();
        let child_nested_in_type = is_type_container(chunk_type);
        if child_nested_in_type {
            child_scope.push(name.unwrap_or_else(|| "anon".to_string()));
        }

        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            walk_node(
                language,
                child,
                content,
                &child_scope,
                child_nested_in_type,
                false,
                units,
                leftover,
            );
        }
        return;
    }

    if is_transparent_container(node.kind()) {
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            walk_node(
                language,
                child,
                content,
                scope_stack,
                nested_in_type,
                at_top_level,
                units,
                leftover,
            );
        }
        return;
    }

    if at_top_level && !is_comment(node.kind()) && node.end_byte() > node.start_byte() {
        leftover.push((node.start_byte(), node.end_byte()));
    }
}

fn text_of<'a>(node: Node, content: &'a str) -> &'a str {
    &content[node.start_byte()..node.end_byte()]
}

fn is_comment(kind: &str) -> bool {
    kind.contains("comment")
}

/// Comment tokens whose end-line is exactly `start_line - 1`, walking
/// backward through preceding siblings and stopping at the first
/// non-contiguous or non-comment sibling.
fn leading_comment_block(node: Node, content: &str) -> Option<String> {
    let mut lines = Vec::new();
    let mut current = node.prev_sibling();
    let mut expected_end_line = node.start_position().row;

    while let Some(sibling) = current {
        if !is_comment(sibling.kind()) {
            break;
        }
        if sibling.end_position().row + 1 != expected_end_line {
            break;
        }
        lines.push(text_of(sibling, content).trim().to_string());
        expected_end_line = sibling.start_position().row;
        current = sibling.prev_sibling();
    }

    if lines.is_empty() {
        None
    } else {
        lines.reverse();
        Some(lines.join("\n"))
    }
}

fn materialize_leftover(relative_path: &str, content: &str, spans: &[(usize, usize)]) -> Vec<CodeChunk> {
    if spans.is_empty() {
        return Vec::new();
    }

    let mut spans = spans.to_vec();
    spans.sort_by_key(|s| s.0);

    let mut chunks = Vec::new();
    let mut group_start: Option<usize> = None;
    let mut group_end = 0usize;
    let mut group_tokens = 0usize;

    let flush = |chunks: &mut Vec<CodeChunk>, start: usize, end: usize| {
        let code = &content[start..end];
        let start_line = byte_to_line(content, start);
        let end_line = byte_to_line(content, end.saturating_sub(1).max(start));
        chunks.push(CodeChunk::new(
            relative_path.to_string(),
            start_line,
            end_line,
            code.to_string(),
            ChunkMetadata::default().chunk_type(ChunkType::Block),
        ));
    };

    for (start, end) in spans {
        let tokens = estimate_tokens(&content[start..end]);
        match group_start {
            None => {
                group_start = Some(start);
                group_end = end;
                group_tokens = tokens;
            }
            Some(gs) => {
                if group_tokens + tokens > MAX_CHUNK_TOKENS {
                    flush(&mut chunks, gs, group_end);
                    group_start = Some(start);
                    group_end = end;
                    group_tokens = tokens;
                } else {
                    group_end = end;
                    group_tokens += tokens;
                }
            }
        }
    }

    if let Some(gs) = group_start {
        flush(&mut chunks, gs, group_end);
    }

    chunks
}

fn byte_to_line(content: &str, byte_offset: usize) -> usize {
    content[..byte_offset.min(content.len())].matches('\n').count() + 1
}

/// Split any chunk whose `token_estimate` exceeds `MAX_CHUNK_TOKENS` into
/// overlapping windows, each carrying at least `GROUNDING_LINES` of leading
/// context. Sub-chunk ids get a `:part{N}` suffix.
fn split_oversize(chunks: Vec<CodeChunk>) -> Vec<CodeChunk> {
    let mut out = Vec::with_capacity(chunks.len());
    for chunk in chunks {
        if chunk.token_estimate <= MAX_CHUNK_TOKENS {
            out.push(chunk);
            continue;
        }

        let lines: Vec<&str> = chunk.content.lines().collect();
        if lines.len() <= 1 {
            out.push(chunk);
            continue;
        }

        // Pick a window size in lines that keeps each window under budget,
        // estimated from the chunk's overall tokens-per-line ratio.
        let tokens_per_line = (chunk.token_estimate as f32 / lines.len() as f32).max(1.0);
        let window_lines = ((MAX_CHUNK_TOKENS as f32 / tokens_per_line).floor() as usize).max(
            GROUNDING_LINES + 1,
        );
        let overlap_lines = ((window_lines as f32) * CHUNK_OVERLAP_RATIO)
            .round()
            .max(GROUNDING_LINES as f32) as usize;
        let stride = window_lines.saturating_sub(overlap_lines).max(1);

        let mut part = 0usize;
        let mut start = 0usize;
        while start < lines.len() {
            let end = (start + window_lines).min(lines.len());
            let window = &lines[start..end];
            let code = window.join("\n");
            let start_line = chunk.start_line + start;
            let end_line = chunk.start_line + end - 1;
            out.push(
                CodeChunk::new(
                    chunk.file_path.clone(),
                    start_line,
                    end_line,
                    code,
                    chunk.metadata.clone(),
                )
                .with_part(part),
            );
            part += 1;
            if end == lines.len() {
                break;
            }
            start += stride;
        }
    }
    out
}

/// Merge chunks with fewer than `MIN_CHUNK_LINES` lines into the
/// immediately preceding chunk, to avoid index pollution from single-line
/// accessors. If there's no preceding chunk to merge into, it's kept as-is
/// (a file consisting entirely of tiny top-level chunks still needs to be
/// searchable).
fn merge_undersize(chunks: Vec<CodeChunk>) -> Vec<CodeChunk> {
    let mut out: Vec<CodeChunk> = Vec::with_capacity(chunks.len());
    for chunk in chunks {
        if chunk.line_count() < MIN_CHUNK_LINES {
            if let Some(prev) = out.last_mut() {
                if prev.end_line < chunk.start_line {
                    prev.end_line = chunk.end_line;
                    prev.content.push('\n');
                    prev.content.push_str(&chunk.content);
                    prev.token_estimate = estimate_tokens(&prev.content);
                    continue;
                }
            }
        }
        out.push(chunk);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunks_rust_function() {
        let mut chunker = Chunker::new();
        let source = "fn foo() {\n    1 + 1;\n    2 + 2;\n    3 + 3;\n}\n";
        let chunks = chunker.chunk_file("src/lib.rs", source).unwrap();
        assert!(chunks.iter().any(|c| c.metadata.symbol_name.as_deref() == Some("foo")));
    }

    #[test]
    fn chunks_rust_struct_and_impl_methods() {
        let mut chunker = Chunker::new();
        let source = r"
struct Widget {
    id: u32,
}

impl Widget {
    fn new(id: u32) -> Self {
        Self { id }
    }

    fn id(&self) -> u32 {
        self.id
    }
}
";
        let chunks = chunker.chunk_file("src/widget.rs", source).unwrap();
        let names: Vec<_> = chunks
            .iter()
            .filter_map(|c| c.metadata.symbol_name.clone())
            .collect();
        assert!(names.contains(&"Widget".to_string()));
        assert!(names.contains(&"new".to_string()));
    }

    #[test]
    fn fallback_chunker_handles_unsupported_language() {
        let mut chunker = Chunker::new();
        let source = (0..20)
            .map(|i| format!("line {i}"))
            .collect::<Vec<_>>()
            .join("\n");
        let chunks = chunker.chunk_file("README.md", &source).unwrap();
        assert!(!chunks.is_empty());
        assert!(chunks.iter().all(|c| c.start_line <= c.end_line));
    }

    #[test]
    fn unknown_language_produces_no_chunks() {
        let mut chunker = Chunker::new();
        let chunks = chunker.chunk_file("data.bin", "\0\0\0").unwrap();
        assert!(chunks.is_empty());
    }

    #[test]
    fn oversize_unit_is_split_with_overlap() {
        let mut chunker = Chunker::new();
        let body: String = (0..400).map(|i| format!("    let x{i} = {i};\n")).collect();
        let source = format!("fn huge() {{\n{body}}}\n");
        let chunks = chunker.chunk_file("src/huge.rs", &source).unwrap();
        let parts: Vec<_> = chunks
            .iter()
            .filter(|c| c.metadata.symbol_name.as_deref() == Some("huge"))
            .collect();
        assert!(parts.len() >= 2, "expected split into multiple parts, got {}", parts.len());
    }

    #[test]
    fn tiny_units_are_merged_upward() {
        let mut chunker = Chunker::new();
        let source = "fn a() { 1; }\nfn b() {\n    2;\n    3;\n    4;\n    5;\n    6;\n}\n";
        let chunks = chunker.chunk_file("src/tiny.rs", source).unwrap();
        assert!(chunks.iter().all(|c| c.line_count() >= MIN_CHUNK_LINES || chunks.len() == 1));
    }
}
