//! Combines a semantic (vector) ranking and a keyword (BM25) ranking into
//! one ordered result list, keyed by chunk id.
//!
//! Two fusion modes:
//!
//! - `Weighted`: semantic scores already sit in `[0, 1]` (`1 - cosine
//!   distance`); keyword scores are min-max normalized across the batch
//!   (`0.0` for every score if the batch is uniform) before being blended as
//!   `alpha * sem + (1 - alpha) * kw`. A chunk missing from one side
//!   contributes `0.0` for that side rather than being dropped.
//! - `Rrf`: reciprocal rank fusion, `alpha / (k + rank_sem) + (1 - alpha) /
//!   (k + rank_kw)`, 1-based ranks, `k = 60`. A chunk missing from one side
//!   simply has no term for that side.

use std::collections::HashMap;

pub const DEFAULT_ALPHA: f32 = 0.7;
pub const RRF_K: f32 = 60.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FusionMode {
    Weighted,
    Rrf,
}

impl FusionMode {
    #[must_use]
    pub fn from_str_opt(mode: Option<&str>) -> Self {
        match mode {
            Some(m) if m.eq_ignore_ascii_case("rrf") => Self::Rrf,
            _ => Self::Weighted,
        }
    }
}

/// One fused row: a chunk id plus its per-branch and combined scores.
#[derive(Debug, Clone)]
pub struct FusedScore {
    pub chunk_id: String,
    pub sem_score: f32,
    pub kw_score: f32,
    pub combined_score: f32,
}

/// Fuse two ranked lists keyed by chunk id, best-first. `Rrf` mode derives
/// rank purely from list order, so callers must not reorder these first.
#[must_use]
pub fn fuse(semantic: &[(String, f32)], keyword: &[(String, f32)], mode: FusionMode, alpha: f32) -> Vec<FusedScore> {
    match mode {
        FusionMode::Weighted => fuse_weighted(semantic, keyword, alpha),
        FusionMode::Rrf => fuse_rrf(semantic, keyword, alpha),
    }
}

fn fuse_weighted(semantic: &[(String, f32)], keyword: &[(String, f32)], alpha: f32) -> Vec<FusedScore> {
    let kw_norm = min_max_normalize(keyword);

    let sem_by_id: HashMap<&str, f32> = semantic.iter().map(|(id, s)| (id.as_str(), *s)).collect();
    let kw_by_id: HashMap<&str, f32> = kw_norm.iter().map(|(id, s)| (id.as_str(), *s)).collect();

    let mut ids: Vec<&str> = sem_by_id.keys().copied().collect();
    for id in kw_by_id.keys() {
        if !sem_by_id.contains_key(id) {
            ids.push(id);
        }
    }

    let mut fused: Vec<FusedScore> = ids
        .into_iter()
        .map(|id| {
            let sem_score = sem_by_id.get(id).copied().unwrap_or(0.0);
            let kw_score = kw_by_id.get(id).copied().unwrap_or(0.0);
            FusedScore {
                chunk_id: id.to_string(),
                sem_score,
                kw_score,
                combined_score: alpha * sem_score + (1.0 - alpha) * kw_score,
            }
        })
        .collect();

    sort_desc(&mut fused);
    fused
}

fn fuse_rrf(semantic: &[(String, f32)], keyword: &[(String, f32)], alpha: f32) -> Vec<FusedScore> {
    let sem_rank: HashMap<&str, usize> = semantic.iter().enumerate().map(|(i, (id, _))| (id.as_str(), i + 1)).collect();
    let kw_rank: HashMap<&str, usize> = keyword.iter().enumerate().map(|(i, (id, _))| (id.as_str(), i + 1)).collect();
    let sem_score: HashMap<&str, f32> = semantic.iter().map(|(id, s)| (id.as_str(), *s)).collect();
    let kw_score: HashMap<&str, f32> = keyword.iter().map(|(id, s)| (id.as_str(), *s)).collect();

    let mut ids: Vec<&str> = sem_rank.keys().copied().collect();
    for id in kw_rank.keys() {
        if !sem_rank.contains_key(id) {
            ids.push(id);
        }
    }

    let mut fused: Vec<FusedScore> = ids
        .into_iter()
        .map(|id| {
            let sem_term = sem_rank.get(id).map_or(0.0, |&rank| alpha / (RRF_K + rank as f32));
            let kw_term = kw_rank.get(id).map_or(0.0, |&rank| (1.0 - alpha) / (RRF_K + rank as f32));
            FusedScore {
                chunk_id: id.to_string(),
                sem_score: sem_score.get(id).copied().unwrap_or(0.0),
                kw_score: kw_score.get(id).copied().unwrap_or(0.0),
                combined_score: sem_term + kw_term,
            }
        })
        .collect();

    sort_desc(&mut fused);
    fused
}

fn sort_desc(fused: &mut [FusedScore]) {
    fused.sort_by(|a, b| b.combined_score.total_cmp(&a.combined_score).then_with(|| a.chunk_id.cmp(&b.chunk_id)));
}

/// Min-max normalize a batch of `(id, score)` pairs into `[0, 1]`. All-zero
/// if every score in the batch is equal, including the empty case.
fn min_max_normalize(scores: &[(String, f32)]) -> Vec<(String, f32)> {
    if scores.is_empty() {
        return Vec::new();
    }
    let min = scores.iter().map(|(_, s)| *s).fold(f32::INFINITY, f32::min);
    let max = scores.iter().map(|(_, s)| *s).fold(f32::NEG_INFINITY, f32::max);
    if (max - min).abs() < f32::EPSILON {
        return scores.iter().map(|(id, _)| (id.clone(), 0.0)).collect();
    }
    scores.iter().map(|(id, s)| (id.clone(), (s - min) / (max - min))).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weighted_blends_normalized_scores() {
        let semantic = vec![("a".to_string(), 0.9), ("b".to_string(), 0.5)];
        let keyword = vec![("a".to_string(), 2.0), ("b".to_string(), 4.0)];
        let fused = fuse(&semantic, &keyword, FusionMode::Weighted, 0.7);
        let a = fused.iter().find(|f| f.chunk_id == "a").unwrap();
        let b = fused.iter().find(|f| f.chunk_id == "b").unwrap();
        assert!((a.combined_score - 0.63).abs() < 1e-6);
        assert!((b.combined_score - (0.7 * 0.5 + 0.3)).abs() < 1e-6);
    }

    #[test]
    fn weighted_handles_one_sided_hits() {
        let semantic = vec![("a".to_string(), 0.9)];
        let keyword = vec![("b".to_string(), 3.0)];
        let fused = fuse(&semantic, &keyword, FusionMode::Weighted, 0.7);
        assert_eq!(fused.len(), 2);
        let a = fused.iter().find(|f| f.chunk_id == "a").unwrap();
        assert_eq!(a.kw_score, 0.0);
    }

    #[test]
    fn weighted_normalizes_to_zero_when_all_equal() {
        let semantic = vec![];
        let keyword = vec![("a".to_string(), 5.0), ("b".to_string(), 5.0)];
        let fused = fuse(&semantic, &keyword, FusionMode::Weighted, 0.7);
        assert!(fused.iter().all(|f| f.kw_score == 0.0));
    }

    #[test]
    fn rrf_ties_equal_ranks_regardless_of_raw_score() {
        let semantic = vec![("a".to_string(), 0.99), ("b".to_string(), 0.01)];
        let keyword = vec![("b".to_string(), 100.0), ("a".to_string(), 1.0)];
        let fused = fuse(&semantic, &keyword, FusionMode::Rrf, 0.5);
        let a = fused.iter().find(|f| f.chunk_id == "a").unwrap();
        let b = fused.iter().find(|f| f.chunk_id == "b").unwrap();
        assert!((a.combined_score - b.combined_score).abs() < 1e-6);
    }
}
