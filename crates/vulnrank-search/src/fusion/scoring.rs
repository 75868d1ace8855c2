//! Weighted Reciprocal Rank Fusion (RRF) of the lexical and semantic
//! ranked lists.
//!
//! Each list contributes `weight * 1 / (k + rank)` (ranks 1-indexed,
//! constant `k` dampens outliers); a record on only one list keeps the
//! other contribution at zero — partial evidence still counts, it is
//! never excluded. Ties break by more recent `modified_at`, then by
//! lexicographic id, so the output is a reproducible total order.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use vulnrank_core::config::FusionConfig;

/// A fused candidate with per-layer rank positions for explainability.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FusedCandidate {
    pub record_id: String,
    /// Weighted RRF composite score.
    pub score: f64,
    /// 1-indexed rank in the lexical list; `usize::MAX` when absent.
    pub lexical_rank: usize,
    /// 1-indexed rank in the semantic list; `usize::MAX` when absent.
    pub semantic_rank: usize,
}

/// Fuse two ranked id lists into one ordered candidate set.
///
/// `recency` supplies each record's `modified_at` for tie-breaking;
/// records missing from it sort as oldest.
#[must_use]
pub fn rrf_fuse(
    lexical: &[&str],
    semantic: &[&str],
    config: &FusionConfig,
    recency: &BTreeMap<String, DateTime<Utc>>,
) -> Vec<FusedCandidate> {
    let mut scores: BTreeMap<&str, f64> = BTreeMap::new();

    for (idx, id) in lexical.iter().enumerate() {
        *scores.entry(*id).or_insert(0.0) +=
            config.lexical_weight * rank_contribution(idx + 1, config.rrf_k);
    }
    for (idx, id) in semantic.iter().enumerate() {
        *scores.entry(*id).or_insert(0.0) +=
            config.semantic_weight * rank_contribution(idx + 1, config.rrf_k);
    }

    let mut fused: Vec<FusedCandidate> = scores
        .into_iter()
        .map(|(id, score)| FusedCandidate {
            record_id: id.to_string(),
            score,
            lexical_rank: find_rank(lexical, id),
            semantic_rank: find_rank(semantic, id),
        })
        .collect();

    fused.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| {
                let a_modified = recency.get(&a.record_id);
                let b_modified = recency.get(&b.record_id);
                b_modified.cmp(&a_modified)
            })
            .then_with(|| a.record_id.cmp(&b.record_id))
    });

    fused
}

#[allow(clippy::cast_precision_loss)]
fn rank_contribution(rank: usize, k: usize) -> f64 {
    1.0 / (k as f64 + rank as f64)
}

fn find_rank(layer: &[&str], id: &str) -> usize {
    layer
        .iter()
        .position(|candidate| *candidate == id)
        .map_or(usize::MAX, |idx| idx + 1)
}
