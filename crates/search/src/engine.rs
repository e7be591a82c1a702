//! Query engine state machine (§4.5.3) wrapping the indexer, hybrid
//! searcher, and symbol resolver behind the four MCP tool operations.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use context_indexer::ProjectIndexer;
use context_protocol::{
    ErrorEnvelope, ErrorKind, FindSymbolRequest, FindSymbolResult, GetStatsResult, IndexCodebaseRequest,
    IndexCodebaseResult, SearchCodeRequest, SearchCodeResult,
};
use context_vector_store::LocalEmbedder;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

use crate::error::{Result, SearchError};
use crate::fusion::{FusionMode, DEFAULT_ALPHA};
use crate::hybrid::HybridSearcher;
use crate::symbol_resolver::SymbolResolver;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Uninitialized,
    Ready,
    Indexing,
    Degraded,
}

/// Owns one project's indexer, hybrid searcher, and symbol resolver, and
/// tracks the `{Uninitialized, Ready, Indexing, Degraded}` lifecycle that
/// gates which operations are currently valid.
pub struct QueryEngine {
    state: RwLock<EngineState>,
    indexer: Arc<ProjectIndexer>,
    searcher: HybridSearcher,
    resolver: SymbolResolver,
    degraded: AtomicBool,
}

impl QueryEngine {
    /// `Uninitialized → Ready`: opens the project's indexer (which loads the
    /// embedder-backed vector store and the keyword index).
    pub async fn initialize(root: impl AsRef<Path>, embedder: Arc<LocalEmbedder>) -> Result<Self> {
        let indexer = Arc::new(ProjectIndexer::new(root, embedder).await?);
        let searcher = HybridSearcher::new(Arc::clone(&indexer));
        Ok(Self {
            state: RwLock::new(EngineState::Ready),
            indexer,
            searcher,
            resolver: SymbolResolver::new(),
            degraded: AtomicBool::new(false),
        })
    }

    pub async fn state(&self) -> EngineState {
        *self.state.read().await
    }

    /// Any state → `Uninitialized`.
    pub async fn shutdown(&self) {
        *self.state.write().await = EngineState::Uninitialized;
    }

    /// `Ready → Indexing` for the duration of the apply, then back to
    /// `Ready` (or `Degraded` if the vector side reported an I/O failure
    /// during apply — the keyword side stays usable, so the engine runs
    /// hybrid search at `alpha = 0` rather than failing outright).
    pub async fn index_codebase(&self, request: &IndexCodebaseRequest) -> IndexCodebaseResult {
        let start = Instant::now();
        *self.state.write().await = EngineState::Indexing;

        let include_uncommitted = request.include_uncommitted.unwrap_or(false);
        let cancel = CancellationToken::new();
        let (outcome, timed_out) = match request.timeout_ms {
            Some(millis) => {
                let deadline = std::time::Duration::from_millis(millis);
                match tokio::time::timeout(deadline, self.indexer.index(include_uncommitted, cancel.clone())).await {
                    Ok(result) => (result, false),
                    Err(_) => {
                        cancel.cancel();
                        (Err(context_indexer::IndexerError::Cancelled), true)
                    }
                }
            }
            None => (self.indexer.index(include_uncommitted, cancel).await, false),
        };

        match outcome {
            Ok(stats) => {
                *self.state.write().await = EngineState::Ready;
                IndexCodebaseResult {
                    files_processed: stats.files_indexed + stats.files_removed,
                    chunks_created: stats.chunks_indexed,
                    files_skipped: stats.files_skipped,
                    files_updated: stats.files_indexed,
                    files_deleted: stats.files_removed,
                    languages: stats.languages.into_iter().collect(),
                    duration_ms: start.elapsed().as_millis() as u64,
                    success: stats.errors.is_empty(),
                    error: None,
                    files_failed: stats.errors,
                }
            }
            Err(context_indexer::IndexerError::Cancelled) => {
                *self.state.write().await = EngineState::Ready;
                let kind = if timed_out { ErrorKind::Timeout } else { ErrorKind::Cancelled };
                let message = if timed_out { "indexing timed out" } else { "indexing was cancelled" };
                IndexCodebaseResult {
                    files_processed: 0,
                    chunks_created: 0,
                    files_skipped: 0,
                    files_updated: 0,
                    files_deleted: 0,
                    languages: BTreeMap::new(),
                    duration_ms: start.elapsed().as_millis() as u64,
                    success: false,
                    error: Some(ErrorEnvelope::new(kind, message)),
                    files_failed: Vec::new(),
                }
            }
            Err(err) => {
                self.degraded.store(true, Ordering::SeqCst);
                *self.state.write().await = EngineState::Degraded;
                IndexCodebaseResult {
                    files_processed: 0,
                    chunks_created: 0,
                    files_skipped: 0,
                    files_updated: 0,
                    files_deleted: 0,
                    languages: BTreeMap::new(),
                    duration_ms: start.elapsed().as_millis() as u64,
                    success: false,
                    error: Some(ErrorEnvelope::new(ErrorKind::StoreIo, err.to_string())),
                    files_failed: Vec::new(),
                }
            }
        }
    }

    /// Fuses semantic and keyword search. Forced to `alpha = 0` (keyword
    /// only) while the engine is `Degraded`.
    pub async fn search_code(&self, request: &SearchCodeRequest) -> SearchCodeResult {
        if *self.state.read().await == EngineState::Uninitialized {
            return SearchCodeResult {
                results: Vec::new(),
                error: Some(to_error_envelope(&SearchError::NotReady("engine is shut down".to_string()))),
            };
        }

        let k = request.k.unwrap_or(10);
        let mode = FusionMode::from_str_opt(request.mode.as_deref());
        let alpha = if self.degraded.load(Ordering::SeqCst) {
            0.0
        } else {
            request.alpha.unwrap_or(DEFAULT_ALPHA)
        };

        let cancel = CancellationToken::new();
        let search_future =
            self.searcher.search(&request.query, k, request.language_filter.as_deref(), mode, alpha, &cancel);

        let outcome = match request.timeout_ms {
            Some(millis) => {
                let deadline = std::time::Duration::from_millis(millis);
                match tokio::time::timeout(deadline, search_future).await {
                    Ok(result) => result,
                    Err(_) => {
                        cancel.cancel();
                        Err(SearchError::Timeout)
                    }
                }
            }
            None => search_future.await,
        };

        match outcome {
            Ok(results) => SearchCodeResult { results, error: None },
            Err(err) => SearchCodeResult { results: Vec::new(), error: Some(to_error_envelope(&err)) },
        }
    }

    pub async fn find_symbol(&self, request: &FindSymbolRequest) -> FindSymbolResult {
        let chunks = self.indexer.all_chunks().await;
        let entry_points = request.entry_points.as_deref();

        match self.resolver.find_symbol(&request.symbol_name, &chunks, entry_points) {
            Ok((definitions, references, source)) => FindSymbolResult {
                symbol_name: request.symbol_name.clone(),
                definitions,
                references,
                source,
                error: None,
            },
            Err(err) => FindSymbolResult {
                symbol_name: request.symbol_name.clone(),
                definitions: Vec::new(),
                references: Vec::new(),
                source: context_protocol::SymbolSource::Treesitter,
                error: Some(to_error_envelope(&err)),
            },
        }
    }

    pub async fn get_stats(&self) -> GetStatsResult {
        let chunks = self.indexer.all_chunks().await;
        let mut languages: BTreeMap<String, usize> = BTreeMap::new();
        let mut types: BTreeMap<String, usize> = BTreeMap::new();
        for chunk in &chunks {
            *languages.entry(chunk.language.as_str().to_string()).or_insert(0) += 1;
            *types.entry(chunk.kind().as_str().to_string()).or_insert(0) += 1;
        }

        let state = self.indexer.state().await.ok().flatten();
        GetStatsResult {
            total_chunks: chunks.len(),
            languages,
            types,
            last_indexed_commit: state.as_ref().and_then(|s| s.last_indexed_commit.clone()),
            last_indexed_at: state.map(|s| s.last_indexed_at),
        }
    }
}

fn to_error_envelope(err: &SearchError) -> ErrorEnvelope {
    let kind = match err {
        SearchError::NotReady(_) => ErrorKind::NotIndexed,
        SearchError::VectorStore(_) | SearchError::KeywordIndex(_) | SearchError::Graph(_) => ErrorKind::StoreIo,
        SearchError::Indexer(_) => ErrorKind::Unavailable,
        SearchError::Cancelled => ErrorKind::Cancelled,
        SearchError::Timeout => ErrorKind::Timeout,
        SearchError::Internal(_) => ErrorKind::Internal,
    };
    ErrorEnvelope::new(kind, err.to_string())
}
