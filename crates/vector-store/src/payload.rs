use context_code_chunker::CodeChunk;

/// The chunk payload fed to the embedder is structured, not raw code, so
/// document and query embeddings share a consistent space:
/// `"<language> <kind> <scope>.<name>\n<docstring>\n<code>"`.
#[must_use]
pub fn render_document_payload(chunk: &CodeChunk) -> String {
    let language = chunk.language.as_str();
    let kind = chunk.kind().as_str();
    let name = chunk.metadata.symbol_name.as_deref().unwrap_or("anon");
    let scope_name = match chunk.metadata.scope.as_deref() {
        Some(scope) => format!("{scope}.{name}"),
        None => name.to_string(),
    };
    let docstring = chunk.metadata.docstring.as_deref().unwrap_or("");

    format!("{language} {kind} {scope_name}\n{docstring}\n{}", chunk.content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use context_code_chunker::{ChunkMetadata, ChunkType};

    #[test]
    fn renders_the_exact_spec_format() {
        let chunk = CodeChunk::new(
            "src/a.rs".to_string(),
            1,
            3,
            "fn foo() {}".to_string(),
            ChunkMetadata::default()
                .symbol_name("foo")
                .scope("ClassA")
                .chunk_type(ChunkType::Method)
                .docstring("Does a thing."),
        );

        let payload = render_document_payload(&chunk);
        assert_eq!(payload, "rust method ClassA.foo\nDoes a thing.\nfn foo() {}");
    }
}
