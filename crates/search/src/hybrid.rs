//! Hybrid search: fuses a semantic (vector) ranking with a keyword (BM25)
//! ranking over one project's index, per §4.5.1's fusion algorithm.

use std::collections::HashMap;
use std::sync::Arc;

use context_code_chunker::CodeChunk;
use context_indexer::ProjectIndexer;
use context_protocol::SearchHit;
use tokio_util::sync::CancellationToken;

use crate::error::{Result, SearchError};
use crate::fusion::{fuse, FusionMode};

pub use crate::fusion::DEFAULT_ALPHA;

/// Combines `VectorStore::nearest` and `KeywordIndex::search` over the same
/// project, fusing the two ranked lists into one.
pub struct HybridSearcher {
    indexer: Arc<ProjectIndexer>,
}

impl HybridSearcher {
    #[must_use]
    pub fn new(indexer: Arc<ProjectIndexer>) -> Self {
        Self { indexer }
    }

    /// Run both branches concurrently, fuse, and return the top `k` hits.
    /// `candidate_k` (at least `2 * k`) governs how deep each branch searches
    /// before fusion narrows back down to `k`.
    pub async fn search(
        &self,
        query: &str,
        k: usize,
        language_filter: Option<&str>,
        mode: FusionMode,
        alpha: f32,
        cancel: &CancellationToken,
    ) -> Result<Vec<SearchHit>> {
        if query.trim().is_empty() {
            return Err(SearchError::Internal("search query must not be empty".to_string()));
        }
        if cancel.is_cancelled() {
            return Err(SearchError::Cancelled);
        }
        let k = k.max(1);
        let candidate_k = k.saturating_mul(2).max(k);

        let query_vector = self.indexer.embedder().embed_query(query).await?;
        if cancel.is_cancelled() {
            return Err(SearchError::Cancelled);
        }

        let filter_owned = language_filter.map(|lang| {
            let lang = lang.to_string();
            move |chunk: &CodeChunk| chunk.language.as_str() == lang
        });
        let filter: Option<&dyn Fn(&CodeChunk) -> bool> =
            filter_owned.as_ref().map(|f| f as &dyn Fn(&CodeChunk) -> bool);

        let (vector_hits, keyword_hits) = tokio::join!(
            self.indexer.vector_store().nearest(&query_vector, candidate_k, filter),
            self.indexer.search_keyword(query, candidate_k, language_filter),
        );
        let vector_hits = vector_hits?;

        let mut chunk_cache: HashMap<String, CodeChunk> =
            vector_hits.iter().map(|(chunk, _)| (chunk.id.clone(), chunk.clone())).collect();

        // `nearest` returns `1 - cosine_similarity` as its distance, ranging
        // over `[0, 2]`; fold that back into the `[0, 1]` similarity range
        // the fusion formula expects via `1 - distance / 2`.
        let semantic: Vec<(String, f32)> = vector_hits
            .iter()
            .map(|(chunk, distance)| (chunk.id.clone(), (1.0 - distance / 2.0).clamp(0.0, 1.0)))
            .collect();

        let fused = fuse(&semantic, &keyword_hits, mode, alpha);

        let mut hits = Vec::with_capacity(k);
        for row in fused {
            if hits.len() >= k {
                break;
            }
            let chunk = if let Some(chunk) = chunk_cache.get(&row.chunk_id) {
                chunk.clone()
            } else if let Some(chunk) = self.indexer.chunk_by_id(&row.chunk_id).await {
                chunk_cache.insert(row.chunk_id.clone(), chunk.clone());
                chunk
            } else {
                continue;
            };

            hits.push(SearchHit {
                chunk_id: row.chunk_id,
                relative_path: chunk.file_path.clone(),
                start_line: chunk.start_line,
                end_line: chunk.end_line,
                code: chunk.content.clone(),
                sem_score: row.sem_score,
                kw_score: row.kw_score,
                combined_score: row.combined_score,
            });
        }

        Ok(hits)
    }
}
