use std::collections::HashMap;
use std::path::Path;

use context_code_chunker::CodeChunk;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// A `relative_path -> chunks` map the indexer consults when applying an
/// incremental plan: deleting or re-chunking a path only touches the rows
/// that path previously contributed, without a full corpus rescan.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ChunkCorpus {
    by_path: HashMap<String, Vec<CodeChunk>>,
}

impl ChunkCorpus {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_chunks(&mut self, relative_path: impl Into<String>, chunks: Vec<CodeChunk>) {
        self.by_path.insert(relative_path.into(), chunks);
    }

    pub fn remove_path(&mut self, relative_path: &str) -> Vec<CodeChunk> {
        self.by_path.remove(relative_path).unwrap_or_default()
    }

    #[must_use]
    pub fn chunks_for(&self, relative_path: &str) -> &[CodeChunk] {
        self.by_path.get(relative_path).map_or(&[], Vec::as_slice)
    }

    #[must_use]
    pub fn contains(&self, relative_path: &str) -> bool {
        self.by_path.contains_key(relative_path)
    }

    #[must_use]
    pub fn total_chunks(&self) -> usize {
        self.by_path.values().map(Vec::len).sum()
    }

    #[must_use]
    pub fn tracked_paths(&self) -> usize {
        self.by_path.len()
    }

    #[must_use]
    pub fn paths(&self) -> Vec<String> {
        self.by_path.keys().cloned().collect()
    }

    /// Look up a chunk by its `id` across every tracked path. Keyword-search
    /// hits only carry a chunk id; this is how a hit is turned back into the
    /// chunk's code and location.
    #[must_use]
    pub fn find_by_id(&self, chunk_id: &str) -> Option<&CodeChunk> {
        self.by_path.values().flatten().find(|c| c.id == chunk_id)
    }

    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_vec_pretty(self)?;
        let tmp_path = path.with_extension("json.tmp");
        std::fs::write(&tmp_path, json)?;
        std::fs::rename(&tmp_path, path)?;
        Ok(())
    }

    pub fn load_from_file(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use context_code_chunker::ChunkMetadata;

    fn chunk(path: &str) -> CodeChunk {
        CodeChunk::new(path.to_string(), 1, 2, "fn a() {}".to_string(), ChunkMetadata::default())
    }

    #[test]
    fn remove_path_returns_and_clears_its_chunks() {
        let mut corpus = ChunkCorpus::new();
        corpus.set_chunks("a.rs", vec![chunk("a.rs")]);
        assert_eq!(corpus.total_chunks(), 1);

        let removed = corpus.remove_path("a.rs");
        assert_eq!(removed.len(), 1);
        assert_eq!(corpus.total_chunks(), 0);
        assert!(!corpus.contains("a.rs"));
    }

    #[test]
    fn roundtrip_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("corpus.json");

        let mut corpus = ChunkCorpus::new();
        corpus.set_chunks("a.rs", vec![chunk("a.rs")]);
        corpus.save_to_file(&path).unwrap();

        let reloaded = ChunkCorpus::load_from_file(&path).unwrap();
        assert_eq!(reloaded.total_chunks(), 1);
    }
}
