use std::collections::HashMap;
use std::path::{Path, PathBuf};

use context_code_chunker::CodeChunk;
use ndarray::ArrayView1;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::error::{Result, VectorStoreError};

/// One stored chunk: its vector alongside the chunk it was embedded from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorRecord {
    pub chunk: CodeChunk,
    pub vector: Vec<f32>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreSnapshot {
    records: Vec<VectorRecord>,
}

/// Flat in-memory vector store, persisted as a single JSON snapshot file.
/// Writes are serialized behind a `tokio::sync::RwLock` so `upsert` and
/// `delete_by_path` never interleave, matching the single-writer/many-reader
/// contract the indexer relies on when it applies a plan file-by-file.
pub struct VectorStore {
    dimensions: usize,
    path: Option<PathBuf>,
    records: RwLock<HashMap<String, VectorRecord>>,
}

impl VectorStore {
    #[must_use]
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions,
            path: None,
            records: RwLock::new(HashMap::new()),
        }
    }

    pub fn open(path: &Path, dimensions: usize) -> Result<Self> {
        let records = if path.exists() {
            let bytes = std::fs::read(path)?;
            let snapshot: StoreSnapshot = serde_json::from_slice(&bytes)?;
            snapshot
                .records
                .into_iter()
                .map(|r| (r.chunk.id.clone(), r))
                .collect()
        } else {
            HashMap::new()
        };

        Ok(Self {
            dimensions,
            path: Some(path.to_path_buf()),
            records: RwLock::new(records),
        })
    }

    #[must_use]
    pub const fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Bulk insert or replace. Idempotent: re-upserting a chunk with the
    /// same `id` overwrites its prior vector rather than duplicating it.
    pub async fn upsert(&self, records: Vec<VectorRecord>) -> Result<()> {
        for record in &records {
            if record.vector.len() != self.dimensions {
                return Err(VectorStoreError::VectorLengthMismatch {
                    expected: self.dimensions,
                    actual: record.vector.len(),
                });
            }
        }

        let mut guard = self.records.write().await;
        for record in records {
            guard.insert(record.chunk.id.clone(), record);
        }
        drop(guard);
        self.persist().await
    }

    /// Remove every record whose chunk came from `relative_path`.
    pub async fn delete_by_path(&self, relative_path: &str) -> Result<usize> {
        let mut guard = self.records.write().await;
        let before = guard.len();
        guard.retain(|_, record| record.chunk.file_path != relative_path);
        let removed = before - guard.len();
        drop(guard);
        if removed > 0 {
            self.persist().await?;
        }
        Ok(removed)
    }

    #[must_use]
    pub async fn count_rows(&self) -> usize {
        self.records.read().await.len()
    }

    /// Cosine-similarity nearest-neighbor search. `filter` restricts the
    /// candidate set to chunks whose `CodeChunk` satisfies the predicate
    /// before ranking, e.g. to scope a search to one language or path.
    pub async fn nearest(
        &self,
        query: &[f32],
        k: usize,
        filter: Option<&dyn Fn(&CodeChunk) -> bool>,
    ) -> Result<Vec<(CodeChunk, f32)>> {
        if query.len() != self.dimensions {
            return Err(VectorStoreError::VectorLengthMismatch {
                expected: self.dimensions,
                actual: query.len(),
            });
        }

        let guard = self.records.read().await;
        let mut scored: Vec<(CodeChunk, f32)> = guard
            .values()
            .filter(|record| filter.map_or(true, |f| f(&record.chunk)))
            .map(|record| {
                let distance = cosine_distance(query, &record.vector);
                (record.chunk.clone(), distance)
            })
            .collect();
        drop(guard);

        scored.sort_by(|a, b| a.1.total_cmp(&b.1).then_with(|| a.0.id.cmp(&b.0.id)));
        scored.truncate(k);
        Ok(scored)
    }

    /// Iterate every stored chunk, e.g. to rebuild a sibling index.
    pub async fn iterate(&self, mut visit: impl FnMut(&CodeChunk, &[f32])) {
        let guard = self.records.read().await;
        for record in guard.values() {
            visit(&record.chunk, &record.vector);
        }
    }

    async fn persist(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let guard = self.records.read().await;
        let snapshot = StoreSnapshot {
            records: guard.values().cloned().collect(),
        };
        drop(guard);

        let json = serde_json::to_vec_pretty(&snapshot)?;
        let tmp_path = path.with_extension("json.tmp");
        std::fs::write(&tmp_path, json)?;
        std::fs::rename(&tmp_path, path)?;
        Ok(())
    }
}

/// `1 - cosine_similarity`, so a distance of 0 is an exact match. Vectors
/// are expected to already be unit-normalized by the embedder.
fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    let a = ArrayView1::from(a);
    let b = ArrayView1::from(b);
    let norm_a = a.dot(&a).sqrt();
    let norm_b = b.dot(&b).sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 1.0;
    }
    1.0 - (a.dot(&b) / (norm_a * norm_b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use context_code_chunker::ChunkMetadata;

    fn chunk(path: &str) -> CodeChunk {
        CodeChunk::new(path.to_string(), 1, 2, "fn a() {}".to_string(), ChunkMetadata::default())
    }

    #[tokio::test]
    async fn upsert_is_idempotent_by_chunk_id() {
        let store = VectorStore::new(2);
        let record = VectorRecord {
            chunk: chunk("a.rs"),
            vector: vec![1.0, 0.0],
        };
        store.upsert(vec![record.clone()]).await.unwrap();
        store.upsert(vec![record]).await.unwrap();
        assert_eq!(store.count_rows().await, 1);
    }

    #[tokio::test]
    async fn nearest_orders_by_cosine_distance() {
        let store = VectorStore::new(2);
        store
            .upsert(vec![
                VectorRecord { chunk: chunk("near.rs"), vector: vec![1.0, 0.0] },
                VectorRecord { chunk: chunk("far.rs"), vector: vec![0.0, 1.0] },
            ])
            .await
            .unwrap();

        let results = store.nearest(&[1.0, 0.0], 2, None).await.unwrap();
        assert_eq!(results[0].0.file_path, "near.rs");
        assert!(results[0].1 < results[1].1);
    }

    #[tokio::test]
    async fn delete_by_path_removes_only_matching_chunks() {
        let store = VectorStore::new(2);
        store
            .upsert(vec![
                VectorRecord { chunk: chunk("a.rs"), vector: vec![1.0, 0.0] },
                VectorRecord { chunk: chunk("b.rs"), vector: vec![0.0, 1.0] },
            ])
            .await
            .unwrap();

        let removed = store.delete_by_path("a.rs").await.unwrap();
        assert_eq!(removed, 1);
        assert_eq!(store.count_rows().await, 1);
    }

    #[tokio::test]
    async fn wrong_dimension_vector_is_rejected() {
        let store = VectorStore::new(3);
        let record = VectorRecord { chunk: chunk("a.rs"), vector: vec![1.0, 0.0] };
        assert!(matches!(
            store.upsert(vec![record]).await,
            Err(VectorStoreError::VectorLengthMismatch { expected: 3, actual: 2 })
        ));
    }

    #[tokio::test]
    async fn persists_and_reloads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        {
            let store = VectorStore::open(&path, 2).unwrap();
            store
                .upsert(vec![VectorRecord { chunk: chunk("a.rs"), vector: vec![1.0, 0.0] }])
                .await
                .unwrap();
        }

        let reopened = VectorStore::open(&path, 2).unwrap();
        assert_eq!(reopened.count_rows().await, 1);
    }
}
