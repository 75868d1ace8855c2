//! Best-effort cross-encoder reranking of the top-K candidates.
//!
//! The collaborator call is the only stage allowed to block on I/O, so
//! it runs on a worker thread under an explicit timeout. A timeout,
//! collaborator error, or missing collaborator skips the stage and
//! keeps the fusion order — reranking is never fatal. The timeout is
//! also the cancellation point: dropping the receiver abandons the
//! worker and no partial scores ever reach the caller.

use anyhow::Result;
use std::sync::Arc;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;
use tracing::warn;
use vulnrank_core::model::RerankSkip;

/// External finer-grained relevance collaborator.
///
/// Scores the raw query text against a candidate's content, jointly —
/// not via precomputed vectors.
pub trait RerankModel: Send + Sync {
    /// Relevance of `candidate` to `query`; higher = more relevant.
    ///
    /// # Errors
    ///
    /// Returns an error when the collaborator cannot score the pair.
    fn score(&self, query: &str, candidate: &str) -> Result<f64>;
}

/// Re-score `(id, content)` candidates under a timeout.
///
/// On success returns `(id, score)` in input order; the caller decides
/// how substituted scores reorder its list. On any failure returns the
/// skip reason instead — degrade-and-continue, per the fusion
/// fallback's contract.
pub fn rerank_with_timeout(
    model: &Arc<dyn RerankModel>,
    query: &str,
    candidates: Vec<(String, String)>,
    timeout: Duration,
) -> Result<Vec<(String, f64)>, RerankSkip> {
    if candidates.is_empty() {
        return Ok(Vec::new());
    }

    let (tx, rx) = mpsc::channel();
    let model = Arc::clone(model);
    let query = query.to_string();

    thread::spawn(move || {
        let mut scored = Vec::with_capacity(candidates.len());
        for (id, content) in candidates {
            match model.score(&query, &content) {
                Ok(score) => scored.push((id, score)),
                Err(err) => {
                    // Receiver may have timed out and gone away.
                    let _ = tx.send(Err(err));
                    return;
                }
            }
        }
        let _ = tx.send(Ok(scored));
    });

    match rx.recv_timeout(timeout) {
        Ok(Ok(scored)) => Ok(scored),
        Ok(Err(err)) => {
            warn!("reranker failed, keeping fusion order: {err:#}");
            Err(RerankSkip::Failed)
        }
        Err(mpsc::RecvTimeoutError::Timeout) => {
            warn!("reranker timed out after {timeout:?}, keeping fusion order");
            Err(RerankSkip::Timeout)
        }
        Err(mpsc::RecvTimeoutError::Disconnected) => {
            warn!("reranker worker vanished, keeping fusion order");
            Err(RerankSkip::Failed)
        }
    }
}
