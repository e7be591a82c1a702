use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use context_code_chunker::Chunker;
use context_keyword_index::{DocumentMetadata, KeywordIndex};
use context_vector_store::{render_document_payload, ChunkCorpus, LocalEmbedder, VectorRecord, VectorStore};
use tokio_util::sync::CancellationToken;

use crate::error::{IndexerError, Result};
use crate::index_state::StateFile;
use crate::planner::{ChangePlanner, FileHashes, Plan, ProjectConfig};
use crate::stats::IndexStats;

const STATE_DIR: &str = ".context-finder";

/// Scans, chunks, embeds, and indexes a project directory. Ties together
/// the change planner (§4.1), chunker (§4.2), embedder (§4.3), and the dual
/// vector/keyword index (§4.4) into the single `index()` apply flow.
pub struct ProjectIndexer {
    root: PathBuf,
    state_dir: PathBuf,
    embedder: Arc<LocalEmbedder>,
    vector_store: Arc<VectorStore>,
    keyword_index: tokio::sync::RwLock<KeywordIndex>,
    corpus: tokio::sync::Mutex<ChunkCorpus>,
}

impl ProjectIndexer {
    pub async fn new(root: impl AsRef<Path>, embedder: Arc<LocalEmbedder>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        if !root.exists() {
            return Err(IndexerError::InvalidPath(format!("path does not exist: {}", root.display())));
        }

        let state_dir = root.join(STATE_DIR);
        tokio::fs::create_dir_all(&state_dir).await?;

        let vector_store = Arc::new(VectorStore::open(
            &state_dir.join("vectors.json"),
            embedder.dimensions(),
        )?);

        let keyword_index = if state_dir.join("keyword_index.json").exists() {
            KeywordIndex::load_from_file(&state_dir.join("keyword_index.json"))?
        } else {
            KeywordIndex::new()
        };

        let corpus = if state_dir.join("corpus.json").exists() {
            ChunkCorpus::load_from_file(&state_dir.join("corpus.json"))?
        } else {
            ChunkCorpus::new()
        };

        Ok(Self {
            root,
            state_dir,
            embedder,
            vector_store,
            keyword_index: tokio::sync::RwLock::new(keyword_index),
            corpus: tokio::sync::Mutex::new(corpus),
        })
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn vector_store(&self) -> &Arc<VectorStore> {
        &self.vector_store
    }

    #[must_use]
    pub fn embedder(&self) -> &Arc<LocalEmbedder> {
        &self.embedder
    }

    /// BM25 search over the keyword side of the index.
    pub async fn search_keyword(&self, query: &str, k: usize, language_filter: Option<&str>) -> Vec<(String, f32)> {
        self.keyword_index.read().await.search(query, k, language_filter)
    }

    /// Resolve a chunk id (as returned by `search_keyword` or carried on a
    /// vector hit) back to its full chunk.
    pub async fn chunk_by_id(&self, chunk_id: &str) -> Option<context_code_chunker::CodeChunk> {
        self.corpus.lock().await.find_by_id(chunk_id).cloned()
    }

    /// Every currently indexed chunk, across all tracked files. Used by the
    /// symbol resolver's tree-sitter fallback and by `get_stats`.
    pub async fn all_chunks(&self) -> Vec<context_code_chunker::CodeChunk> {
        let corpus = self.corpus.lock().await;
        corpus.paths().iter().flat_map(|p| corpus.chunks_for(p).to_vec()).collect()
    }

    /// The last successfully persisted `state.json`, if one exists.
    pub async fn state(&self) -> Result<Option<StateFile>> {
        self.load_state().await
    }

    fn state_file_path(&self) -> PathBuf {
        self.state_dir.join("state.json")
    }

    fn file_hashes_path(&self) -> PathBuf {
        self.state_dir.join("file_hashes.json")
    }

    /// Plan, apply, and advance state. State only advances if every file in
    /// the plan applies successfully; a crash or error mid-plan leaves
    /// `state.json` at its prior value so the next run re-plans the
    /// remaining work (idempotent per §4.1's crash-safety note).
    pub async fn index(&self, include_uncommitted: bool, cancel: CancellationToken) -> Result<IndexStats> {
        let start = Instant::now();
        let prior_state = self.load_state().await?;

        let config = ProjectConfig {
            root: self.root.clone(),
            include_uncommitted,
            embedding_model_id: self.embedder.model_id().to_string(),
            embedding_dimensions: self.embedder.dimensions(),
        };

        let plan = ChangePlanner::plan(&config, prior_state.as_ref(), &self.file_hashes_path()).await?;
        log::info!(
            "index plan: {} to index, {} to remove, full={} ({})",
            plan.files_to_index.len(),
            plan.files_to_remove.len(),
            plan.is_full,
            plan.reason
        );

        let mut stats = IndexStats::new();
        self.apply(&plan, &mut stats, &cancel).await?;
        self.advance_state(&stats, prior_state.as_ref(), include_uncommitted).await?;

        log::info!(
            "indexed {} files ({} chunks) in {:?}",
            stats.files_indexed,
            stats.chunks_indexed,
            start.elapsed()
        );
        Ok(stats)
    }

    async fn load_state(&self) -> Result<Option<StateFile>> {
        let path = self.state_file_path();
        if !path.exists() {
            return Ok(None);
        }
        let bytes = tokio::fs::read(&path).await?;
        match serde_json::from_slice(&bytes) {
            Ok(state) => Ok(Some(state)),
            Err(err) => {
                log::warn!("state.json is corrupt ({err}); treating as missing");
                Ok(None)
            }
        }
    }

    /// Per-file apply is the atomic unit: delete the path's existing
    /// chunks, then re-chunk/embed/upsert, retrying the embed-and-upsert
    /// step once on a store I/O error before giving up on that file.
    /// Checked for cancellation between files, so a cancelled run stops
    /// promptly instead of running the whole plan to completion.
    async fn apply(&self, plan: &Plan, stats: &mut IndexStats, cancel: &CancellationToken) -> Result<()> {
        for relative_path in &plan.files_to_remove {
            if cancel.is_cancelled() {
                return Err(IndexerError::Cancelled);
            }
            self.remove_path(relative_path).await?;
            stats.files_removed += 1;
        }

        for file_ref in &plan.files_to_index {
            if cancel.is_cancelled() {
                return Err(IndexerError::Cancelled);
            }
            self.remove_path(&file_ref.relative_path).await?;

            let attempt = self.apply_one_file(&file_ref.relative_path, &file_ref.absolute_path, stats).await;
            if let Err(err) = attempt {
                log::warn!("retrying {} after error: {err}", file_ref.relative_path);
                if let Err(err) = self.apply_one_file(&file_ref.relative_path, &file_ref.absolute_path, stats).await {
                    stats.add_error(format!("{}: {err}", file_ref.relative_path));
                }
            }
        }

        self.persist_side_indexes().await
    }

    async fn apply_one_file(&self, relative_path: &str, absolute_path: &Path, stats: &mut IndexStats) -> Result<()> {
        let content = tokio::fs::read_to_string(absolute_path).await?;
        let lines = content.lines().count();
        let relative_path_owned = relative_path.to_string();

        let chunks = tokio::task::spawn_blocking(move || {
            let mut chunker = Chunker::new();
            chunker.chunk_file(&relative_path_owned, &content)
        })
        .await
        .map_err(|e| IndexerError::Other(format!("chunking task panicked: {e}")))??;

        if chunks.is_empty() {
            stats.add_skipped_file();
            return Ok(());
        }

        let language = chunks[0].language.as_str().to_string();
        stats.add_file(&language, lines);
        stats.add_chunks(chunks.iter().map(|c| c.kind().as_str()));

        let payloads: Vec<String> = chunks.iter().map(render_document_payload).collect();
        let vectors = self.embedder.embed_batch(&payloads).await?;

        let records: Vec<VectorRecord> = chunks
            .iter()
            .cloned()
            .zip(vectors)
            .map(|(chunk, vector)| VectorRecord { chunk, vector })
            .collect();
        self.vector_store.upsert(records).await?;

        {
            let mut keyword_index = self.keyword_index.write().await;
            for chunk in &chunks {
                keyword_index.add_document(
                    &chunk.id,
                    &chunk.content,
                    DocumentMetadata { language: Some(language.clone()) },
                );
            }
        }

        {
            let mut corpus = self.corpus.lock().await;
            corpus.set_chunks(relative_path.to_string(), chunks);
        }

        Ok(())
    }

    async fn remove_path(&self, relative_path: &str) -> Result<()> {
        self.vector_store.delete_by_path(relative_path).await?;

        let removed_chunks = {
            let mut corpus = self.corpus.lock().await;
            corpus.remove_path(relative_path)
        };

        let mut keyword_index = self.keyword_index.write().await;
        for chunk in removed_chunks {
            keyword_index.remove_document(&chunk.id);
        }

        Ok(())
    }

    async fn persist_side_indexes(&self) -> Result<()> {
        let keyword_index = self.keyword_index.read().await;
        keyword_index.save_to_file(&self.state_dir.join("keyword_index.json"))?;
        drop(keyword_index);

        let corpus = self.corpus.lock().await;
        corpus.save_to_file(&self.state_dir.join("corpus.json"))?;
        drop(corpus);

        Ok(())
    }

    async fn advance_state(
        &self,
        stats: &IndexStats,
        prior_state: Option<&StateFile>,
        include_uncommitted: bool,
    ) -> Result<()> {
        let git_head = current_git_head(&self.root).await;
        let branch = current_git_branch(&self.root).await;

        let (total_chunks, total_files) = {
            let corpus = self.corpus.lock().await;
            (corpus.total_chunks(), corpus.tracked_paths())
        };

        let state = StateFile {
            last_indexed_commit: git_head.or_else(|| prior_state.and_then(|s| s.last_indexed_commit.clone())),
            last_indexed_at: iso8601_now(),
            branch,
            total_chunks,
            total_files,
            includes_uncommitted: include_uncommitted,
            embedding_model_id: self.embedder.model_id().to_string(),
            embedding_dimensions: self.embedder.dimensions(),
            schema_version: crate::index_state::INDEX_STATE_SCHEMA_VERSION,
        };

        let json = serde_json::to_vec_pretty(&state)?;
        let tmp = self.state_file_path().with_extension("json.tmp");
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, self.state_file_path()).await?;

        self.persist_file_hashes(stats).await
    }

    async fn persist_file_hashes(&self, _stats: &IndexStats) -> Result<()> {
        let paths = self.corpus.lock().await.paths();
        let mut hashes = FileHashes::default();
        for relative_path in paths {
            let absolute = self.root.join(&relative_path);
            if let Ok(bytes) = std::fs::read(&absolute) {
                hashes.hashes.insert(relative_path, blake3::hash(&bytes).to_hex().to_string());
            }
        }
        hashes.save_to_file(&self.file_hashes_path())
    }
}

async fn current_git_head(root: &Path) -> Option<String> {
    let output = tokio::process::Command::new("git")
        .arg("-C")
        .arg(root)
        .arg("rev-parse")
        .arg("HEAD")
        .output()
        .await
        .ok()?;
    if !output.status.success() {
        return None;
    }
    let head = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if head.is_empty() {
        None
    } else {
        Some(head)
    }
}

async fn current_git_branch(root: &Path) -> Option<String> {
    let output = tokio::process::Command::new("git")
        .arg("-C")
        .arg(root)
        .arg("rev-parse")
        .arg("--abbrev-ref")
        .arg("HEAD")
        .output()
        .await
        .ok()?;
    if !output.status.success() {
        return None;
    }
    let branch = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if branch.is_empty() || branch == "HEAD" {
        None
    } else {
        Some(branch)
    }
}

fn iso8601_now() -> String {
    let duration = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default();
    let secs = duration.as_secs();
    let millis = duration.subsec_millis();
    format_unix_seconds(secs, millis)
}

/// Minimal UTC ISO-8601 formatter (`YYYY-MM-DDTHH:MM:SS.mmmZ`) so the crate
/// doesn't pull in a dedicated datetime dependency for one call site.
fn format_unix_seconds(secs: u64, millis: u32) -> String {
    const DAYS_PER_400_YEARS: i64 = 146_097;
    let days = (secs / 86_400) as i64;
    let time_of_day = secs % 86_400;
    let (hour, minute, second) = (time_of_day / 3600, (time_of_day % 3600) / 60, time_of_day % 60);

    let mut z = days + 719_468;
    let era = if z >= 0 { z } else { z - DAYS_PER_400_YEARS + 1 } / DAYS_PER_400_YEARS;
    z -= era * DAYS_PER_400_YEARS;
    let yoe = (z - z / 1460 + z / 36524 - z / 146_096) / 365;
    let year = yoe + era * 400;
    let doy = z - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = doy - (153 * mp + 2) / 5 + 1;
    let month = if mp < 10 { mp + 3 } else { mp - 9 };
    let year = if month <= 2 { year + 1 } else { year };

    format!("{year:04}-{month:02}-{day:02}T{hour:02}:{minute:02}:{second:02}.{millis:03}Z")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_epoch_as_iso8601() {
        assert_eq!(format_unix_seconds(0, 0), "1970-01-01T00:00:00.000Z");
    }

    #[test]
    fn formats_a_known_timestamp() {
        // 2024-01-15T08:30:00Z
        assert_eq!(format_unix_seconds(1_705_307_400, 0), "2024-01-15T08:30:00.000Z");
    }
}
