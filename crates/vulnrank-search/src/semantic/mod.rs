//! Semantic matching over precomputed embedding vectors.
//!
//! Embedding generation is an external collaborator behind the
//! [`Embedder`] trait; this layer only compares vectors. Cosine scores
//! stay in `[-1, 1]` — fusion is rank-based, so no further transform is
//! applied.

use anyhow::Result;
use std::collections::BTreeMap;
use tracing::debug;
use vulnrank_core::EngineError;

/// External embedding collaborator.
///
/// The dimension is fixed per deployment and must match the stored
/// record vectors; the engine checks and fails the query otherwise.
pub trait Embedder: Send + Sync {
    /// Embed free text into the deployment's fixed-length vector.
    ///
    /// # Errors
    ///
    /// Returns an error when the collaborator cannot produce a vector.
    fn embed(&self, text: &str) -> Result<Vec<f32>>;
}

/// Cosine similarity in `[-1, 1]`; `None` for mismatched or degenerate
/// (zero-norm) inputs.
#[must_use]
pub fn cosine_similarity(left: &[f32], right: &[f32]) -> Option<f32> {
    if left.len() != right.len() || left.is_empty() {
        return None;
    }

    let (dot, left_norm_sq, right_norm_sq) = left.iter().zip(right).fold(
        (0.0_f32, 0.0_f32, 0.0_f32),
        |(dot, left_sq, right_sq), (a, b)| {
            (
                a.mul_add(*b, dot),
                a.mul_add(*a, left_sq),
                b.mul_add(*b, right_sq),
            )
        },
    );

    let denom = left_norm_sq.sqrt() * right_norm_sq.sqrt();
    if denom <= f32::EPSILON {
        return None;
    }

    Some((dot / denom).clamp(-1.0, 1.0))
}

/// Score a query embedding against `(id, vector)` corpus entries.
///
/// Works over the full corpus or any pre-filtered subset the caller
/// supplies. Zero-norm corpus vectors are skipped with a debug log.
///
/// # Errors
///
/// Returns [`EngineError::EmbeddingDimensionMismatch`] if any corpus
/// vector's dimension differs from the query's — fatal for this query,
/// not retried.
pub fn semantic_scores<'a, I>(
    query_embedding: &[f32],
    corpus: I,
) -> Result<BTreeMap<String, f64>, EngineError>
where
    I: IntoIterator<Item = (&'a str, &'a [f32])>,
{
    let mut out = BTreeMap::new();
    for (id, embedding) in corpus {
        if embedding.len() != query_embedding.len() {
            return Err(EngineError::EmbeddingDimensionMismatch {
                expected: embedding.len(),
                actual: query_embedding.len(),
            });
        }
        match cosine_similarity(query_embedding, embedding) {
            Some(cosine) => {
                out.insert(id.to_string(), f64::from(cosine));
            }
            None => debug!("skipping degenerate embedding for {id}"),
        }
    }
    Ok(out)
}

/// Ids ranked by similarity descending, id ascending on ties.
///
/// # Errors
///
/// Same contract as [`semantic_scores`].
pub fn ranked<'a, I>(
    query_embedding: &[f32],
    corpus: I,
) -> Result<Vec<(String, f64)>, EngineError>
where
    I: IntoIterator<Item = (&'a str, &'a [f32])>,
{
    let mut scored: Vec<(String, f64)> = semantic_scores(query_embedding, corpus)?
        .into_iter()
        .collect();
    scored.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.0.cmp(&b.0))
    });
    Ok(scored)
}
