use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Running totals for one indexing run, and the shape `get_stats` reports.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IndexStats {
    pub files_indexed: usize,
    pub files_removed: usize,
    pub files_skipped: usize,
    pub chunks_indexed: usize,
    pub lines_indexed: usize,
    pub languages: HashMap<String, usize>,
    pub chunk_types: HashMap<String, usize>,
    pub errors: Vec<String>,
}

impl IndexStats {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_file(&mut self, language: &str, lines: usize) {
        self.files_indexed += 1;
        self.lines_indexed += lines;
        *self.languages.entry(language.to_string()).or_insert(0) += 1;
    }

    /// A file that was planned for indexing but produced zero chunks (e.g.
    /// empty, or entirely comments/whitespace after chunking).
    pub fn add_skipped_file(&mut self) {
        self.files_skipped += 1;
    }

    pub fn add_chunks(&mut self, kinds: impl IntoIterator<Item = &'static str>) {
        for kind in kinds {
            self.chunks_indexed += 1;
            *self.chunk_types.entry(kind.to_string()).or_insert(0) += 1;
        }
    }

    pub fn add_error(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracks_per_language_file_counts() {
        let mut stats = IndexStats::new();
        stats.add_file("rust", 10);
        stats.add_file("rust", 5);
        stats.add_file("python", 3);

        assert_eq!(stats.files_indexed, 3);
        assert_eq!(stats.lines_indexed, 18);
        assert_eq!(stats.languages["rust"], 2);
        assert_eq!(stats.languages["python"], 1);
    }

    #[test]
    fn tracks_chunk_type_counts() {
        let mut stats = IndexStats::new();
        stats.add_chunks(["function", "function", "method"]);
        assert_eq!(stats.chunks_indexed, 3);
        assert_eq!(stats.chunk_types["function"], 2);
        assert_eq!(stats.chunk_types["method"], 1);
    }
}
