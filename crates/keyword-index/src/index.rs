use std::collections::{HashMap, HashSet};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::tokenize::tokenize;

const DEFAULT_K1: f32 = 1.2;
const DEFAULT_B: f32 = 0.75;

/// `(term, chunk_id, term_freq_in_chunk)`, grouped by term in
/// `KeywordIndex::postings`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Posting {
    pub chunk_id: String,
    pub term_freq: u32,
}

/// Sidecar fields carried per document for predicate filters at query time
/// (e.g. restricting a search to one language).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub language: Option<String>,
}

/// BM25 inverted index: `term -> posting list`, plus per-document length
/// and corpus statistics needed for the ranking formula.
#[derive(Debug, Serialize, Deserialize)]
pub struct KeywordIndex {
    postings: HashMap<String, Vec<Posting>>,
    doc_lengths: HashMap<String, usize>,
    doc_terms: HashMap<String, Vec<String>>,
    doc_metadata: HashMap<String, DocumentMetadata>,
    total_length: u64,
    k1: f32,
    b: f32,
}

impl Default for KeywordIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl KeywordIndex {
    #[must_use]
    pub fn new() -> Self {
        Self::with_params(DEFAULT_K1, DEFAULT_B)
    }

    #[must_use]
    pub fn with_params(k1: f32, b: f32) -> Self {
        Self {
            postings: HashMap::new(),
            doc_lengths: HashMap::new(),
            doc_terms: HashMap::new(),
            doc_metadata: HashMap::new(),
            total_length: 0,
            k1,
            b,
        }
    }

    #[must_use]
    pub fn total_docs(&self) -> usize {
        self.doc_lengths.len()
    }

    #[must_use]
    pub fn avg_doc_length(&self) -> f32 {
        if self.doc_lengths.is_empty() {
            0.0
        } else {
            self.total_length as f32 / self.doc_lengths.len() as f32
        }
    }

    /// Index (or re-index) a document. Adding a document that already
    /// exists first removes it, so the corpus stats never double-count.
    pub fn add_document(&mut self, id: &str, text: &str, metadata: DocumentMetadata) {
        if self.doc_lengths.contains_key(id) {
            self.remove_document(id);
        }

        let tokens = tokenize(text);
        let length = tokens.len();

        let mut term_freq: HashMap<String, u32> = HashMap::new();
        for token in &tokens {
            *term_freq.entry(token.clone()).or_insert(0) += 1;
        }

        let terms: Vec<String> = term_freq.keys().cloned().collect();
        for (term, tf) in term_freq {
            self.postings.entry(term).or_default().push(Posting {
                chunk_id: id.to_string(),
                term_freq: tf,
            });
        }

        self.doc_lengths.insert(id.to_string(), length);
        self.doc_terms.insert(id.to_string(), terms);
        self.doc_metadata.insert(id.to_string(), metadata);
        self.total_length += length as u64;
    }

    /// Remove a document. Decrements `total_length`, drops any posting
    /// list that becomes empty, and clears the document's stats.
    pub fn remove_document(&mut self, id: &str) {
        let Some(length) = self.doc_lengths.remove(id) else {
            return;
        };
        self.total_length = self.total_length.saturating_sub(length as u64);

        if let Some(terms) = self.doc_terms.remove(id) {
            let unique: HashSet<String> = terms.into_iter().collect();
            for term in unique {
                if let Some(list) = self.postings.get_mut(&term) {
                    list.retain(|p| p.chunk_id != id);
                    if list.is_empty() {
                        self.postings.remove(&term);
                    }
                }
            }
        }
        self.doc_metadata.remove(id);
    }

    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.doc_lengths.contains_key(id)
    }

    pub fn clear(&mut self) {
        self.postings.clear();
        self.doc_lengths.clear();
        self.doc_terms.clear();
        self.doc_metadata.clear();
        self.total_length = 0;
    }

    /// BM25-ranked search, optionally restricted to documents whose stored
    /// language metadata matches `language_filter`. Empty query returns an
    /// empty result without error.
    #[must_use]
    pub fn search(&self, query: &str, k: usize, language_filter: Option<&str>) -> Vec<(String, f32)> {
        if self.doc_lengths.is_empty() {
            return Vec::new();
        }

        let query_terms = tokenize(query);
        if query_terms.is_empty() {
            return Vec::new();
        }

        let n = self.doc_lengths.len() as f32;
        let avgdl = self.avg_doc_length().max(1.0);
        let mut scores: HashMap<String, f32> = HashMap::new();

        for term in &query_terms {
            let Some(list) = self.postings.get(term) else {
                continue;
            };
            let n_t = list.len() as f32;
            let idf = (((n - n_t + 0.5) / (n_t + 0.5)) + 1.0).ln();

            for posting in list {
                if let Some(lang) = language_filter {
                    let matches = self
                        .doc_metadata
                        .get(&posting.chunk_id)
                        .and_then(|m| m.language.as_deref())
                        == Some(lang);
                    if !matches {
                        continue;
                    }
                }

                let dl = self
                    .doc_lengths
                    .get(&posting.chunk_id)
                    .copied()
                    .unwrap_or(0) as f32;
                let tf = posting.term_freq as f32;
                let score =
                    idf * tf * (self.k1 + 1.0) / (tf + self.k1 * (1.0 - self.b + self.b * dl / avgdl));
                *scores.entry(posting.chunk_id.clone()).or_insert(0.0) += score;
            }
        }

        let mut ranked: Vec<(String, f32)> = scores.into_iter().collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        ranked.truncate(k);
        ranked
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

    #[test]
    fn search_ranks_literal_match_over_unrelated_doc() {
        let mut idx = KeywordIndex::new();
        idx.add_document("a", "fn get_user_by_id() {}", DocumentMetadata::default());
        idx.add_document("b", "fn totally_unrelated() {}", DocumentMetadata::default());

        let results = idx.search("getUserById", 5, None);
        assert_eq!(results[0].0, "a");
    }

    #[test]
    fn remove_document_decrements_length_and_drops_empty_postings() {
        let mut idx = KeywordIndex::new();
        idx.add_document("a", "unique_token_here", DocumentMetadata::default());
        assert_eq!(idx.total_docs(), 1);
        idx.remove_document("a");
        assert_eq!(idx.total_docs(), 0);
        assert_eq!(idx.avg_doc_length(), 0.0);
        assert!(idx.search("unique_token_here", 5, None).is_empty());
    }

    #[test]
    fn adding_existing_document_does_not_double_count() {
        let mut idx = KeywordIndex::new();
        idx.add_document("a", "alpha beta", DocumentMetadata::default());
        idx.add_document("a", "alpha beta gamma", DocumentMetadata::default());
        assert_eq!(idx.total_docs(), 1);
        assert_eq!(idx.avg_doc_length(), 3.0);
    }

    #[test]
    fn empty_query_returns_empty_without_error() {
        let mut idx = KeywordIndex::new();
        idx.add_document("a", "alpha beta", DocumentMetadata::default());
        assert!(idx.search("", 5, None).is_empty());
    }

    #[test]
    fn language_filter_excludes_other_languages() {
        let mut idx = KeywordIndex::new();
        idx.add_document(
            "a",
            "parse widget",
            DocumentMetadata {
                language: Some("rust".to_string()),
            },
        );
        idx.add_document(
            "b",
            "parse widget",
            DocumentMetadata {
                language: Some("python".to_string()),
            },
        );

        let results = idx.search("parse widget", 5, Some("python"));
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].0, "b");
    }

    #[test]
    fn roundtrip_serialize_preserves_search_results() {
        let mut idx = KeywordIndex::new();
        idx.add_document("a", "fn get_user_by_id() {}", DocumentMetadata::default());
        idx.add_document("b", "fn totally_unrelated() {}", DocumentMetadata::default());

        let json = serde_json::to_vec(&idx).unwrap();
        let restored: KeywordIndex = serde_json::from_slice(&json).unwrap();

        assert_eq!(idx.search("getUserById", 5, None), restored.search("getUserById", 5, None));
    }
}
