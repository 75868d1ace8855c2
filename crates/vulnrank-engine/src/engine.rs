//! The query orchestrator.
//!
//! One `search()` call walks the whole pipeline: pre-filter, lexical
//! and semantic matching in parallel over the immutable snapshot,
//! rank fusion, infrastructure tier filter/boost, best-effort rerank
//! of the top slice, risk scoring, and the final risk-ordered sort.
//! Stage-local failures degrade and are counted; only an unreadable
//! store, an empty corpus, or an embedding dimension mismatch abort
//! the query.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{debug, info, warn};
use vulnrank_core::EngineError;
use vulnrank_core::config::EngineConfig;
use vulnrank_core::model::{
    DegradationSummary, MatchTier, QueryFilters, QueryRequest, RerankSkip, ScoredResult,
    SearchResponse, VulnerabilityRecord,
};
use vulnrank_risk::matcher::PatchStatus;
use vulnrank_risk::{assess, classify, confidence, risk_score};
use vulnrank_search::fusion::scoring::FusedCandidate;
use vulnrank_search::rerank::{RerankModel, rerank_with_timeout};
use vulnrank_search::semantic::{Embedder, ranked as semantic_ranked};
use vulnrank_search::rrf_fuse;

use crate::snapshot::CorpusSnapshot;

/// The engine: a snapshot, policy, and the two optional collaborators.
pub struct Engine {
    snapshot: Arc<CorpusSnapshot>,
    config: EngineConfig,
    embedder: Option<Arc<dyn Embedder>>,
    reranker: Option<Arc<dyn RerankModel>>,
}

enum SemanticOutcome {
    Ranked(Vec<String>),
    Skipped(String),
}

/// A candidate surviving fusion and the tier filter, before scoring.
struct Candidate {
    id: String,
    relevance: f64,
    tier: MatchTier,
    patch: PatchStatus,
}

impl Engine {
    #[must_use]
    pub fn new(snapshot: CorpusSnapshot, config: EngineConfig) -> Self {
        Self {
            snapshot: Arc::new(snapshot),
            config,
            embedder: None,
            reranker: None,
        }
    }

    #[must_use]
    pub fn with_embedder(mut self, embedder: Arc<dyn Embedder>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    #[must_use]
    pub fn with_reranker(mut self, reranker: Arc<dyn RerankModel>) -> Self {
        self.reranker = Some(reranker);
        self
    }

    /// Swap in a freshly built snapshot. In-flight queries keep the
    /// `Arc` they cloned at entry; only new queries see the new data.
    pub fn reload(&mut self, snapshot: CorpusSnapshot) {
        info!(
            "corpus reload: v{} -> v{}",
            self.snapshot.version(),
            snapshot.version()
        );
        self.snapshot = Arc::new(snapshot);
    }

    /// The snapshot new queries would run against.
    #[must_use]
    pub fn snapshot(&self) -> Arc<CorpusSnapshot> {
        Arc::clone(&self.snapshot)
    }

    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Run one query end to end.
    ///
    /// # Errors
    ///
    /// [`EngineError::EmptyCorpus`] for a zero-record snapshot,
    /// [`EngineError::EmbeddingDimensionMismatch`] when the query
    /// embedding's dimension deviates from the corpus.
    pub fn search(&self, request: &QueryRequest) -> Result<SearchResponse, EngineError> {
        let snapshot = Arc::clone(&self.snapshot);
        if snapshot.is_empty() {
            return Err(EngineError::EmptyCorpus);
        }

        let mut degradation = DegradationSummary::default();

        let eligible: BTreeSet<&str> = snapshot
            .records()
            .values()
            .filter(|record| passes_filters(record, &request.filters))
            .map(|record| record.id.as_str())
            .collect();
        if eligible.is_empty() {
            debug!("no records pass the explicit filters");
            return Ok(SearchResponse {
                results: Vec::new(),
                degradation,
            });
        }

        // Both matchers read the same immutable snapshot; run them
        // side by side and join.
        let (lexical_join, semantic_outcome) = thread::scope(|scope| {
            let lexical = scope.spawn(|| lexical_ids(&snapshot, &request.text, &eligible));
            let semantic = self.semantic_ids(&snapshot, &request.text, &eligible);
            (lexical.join(), semantic)
        });
        let lexical = lexical_join
            .map_err(|_| EngineError::Internal("lexical matcher panicked".to_string()))?;
        let semantic = match semantic_outcome? {
            SemanticOutcome::Ranked(ids) => ids,
            SemanticOutcome::Skipped(reason) => {
                debug!("semantic layer skipped: {reason}");
                degradation.semantic_skipped = Some(reason);
                Vec::new()
            }
        };

        let lexical_refs: Vec<&str> = lexical.iter().map(String::as_str).collect();
        let semantic_refs: Vec<&str> = semantic.iter().map(String::as_str).collect();
        let mut fused = rrf_fuse(
            &lexical_refs,
            &semantic_refs,
            &self.config.fusion,
            snapshot.recency(),
        );
        seed_requested_ids(&mut fused, &request.filters, &eligible);

        let mut candidates = self.assess_candidates(&snapshot, request, fused, &mut degradation);
        self.rerank_top(&snapshot, &request.text, &mut candidates, &mut degradation);

        let mut results: Vec<ScoredResult> = candidates
            .into_iter()
            .filter_map(|candidate| {
                let record = snapshot.record(&candidate.id)?;
                let (score, factors) =
                    risk_score(record, candidate.tier, candidate.patch, &self.config.risk);
                Some(ScoredResult {
                    record_id: candidate.id,
                    relevance_score: candidate.relevance,
                    risk_score: score,
                    risk_factors: factors,
                    match_tier: candidate.tier,
                    risk_level: classify(score, &self.config.thresholds),
                    confidence: confidence(record),
                })
            })
            .collect();

        results.sort_by(|a, b| {
            b.risk_score
                .partial_cmp(&a.risk_score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| {
                    b.relevance_score
                        .partial_cmp(&a.relevance_score)
                        .unwrap_or(std::cmp::Ordering::Equal)
                })
                .then_with(|| {
                    let a_modified = snapshot.recency().get(&a.record_id);
                    let b_modified = snapshot.recency().get(&b.record_id);
                    b_modified.cmp(&a_modified)
                })
                .then_with(|| a.record_id.cmp(&b.record_id))
        });
        results.truncate(self.config.limit);

        Ok(SearchResponse {
            results,
            degradation,
        })
    }

    fn semantic_ids(
        &self,
        snapshot: &CorpusSnapshot,
        text: &str,
        eligible: &BTreeSet<&str>,
    ) -> Result<SemanticOutcome, EngineError> {
        let Some(embedder) = &self.embedder else {
            return Ok(SemanticOutcome::Skipped(
                "no embedder configured".to_string(),
            ));
        };
        if snapshot.embedding_dim().is_none() {
            return Ok(SemanticOutcome::Skipped(
                "snapshot holds no embeddings".to_string(),
            ));
        }

        let query_embedding = match embedder.embed(text) {
            Ok(embedding) => embedding,
            Err(err) => {
                warn!("embedder failed, continuing lexical-only: {err:#}");
                return Ok(SemanticOutcome::Skipped(format!("embedder failed: {err}")));
            }
        };

        let ranked = semantic_ranked(
            &query_embedding,
            snapshot.embeddings_for(eligible.iter().copied()),
        )?;
        Ok(SemanticOutcome::Ranked(
            ranked.into_iter().map(|(id, _)| id).collect(),
        ))
    }

    /// Infrastructure assessment: tier filter, tier boost, patch
    /// posture, malformed accounting.
    fn assess_candidates(
        &self,
        snapshot: &CorpusSnapshot,
        request: &QueryRequest,
        fused: Vec<FusedCandidate>,
        degradation: &mut DegradationSummary,
    ) -> Vec<Candidate> {
        let mut candidates: Vec<Candidate> = fused
            .into_iter()
            .filter_map(|fused| {
                let record = snapshot.record(&fused.record_id)?;
                let assessment = assess(record, &request.context);
                if assessment.malformed {
                    degradation.malformed_records += 1;
                }
                if assessment.tier < self.config.infra.min_tier
                    && !tier_drop_exempt(record, &request.filters)
                {
                    debug!(
                        "dropping {} below minimum tier ({})",
                        record.id, assessment.tier
                    );
                    return None;
                }
                Some(Candidate {
                    id: fused.record_id,
                    relevance: fused.score * self.config.infra.multiplier(assessment.tier),
                    tier: assessment.tier,
                    patch: assessment.patch,
                })
            })
            .collect();

        candidates.sort_by(|a, b| {
            b.relevance
                .partial_cmp(&a.relevance)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| {
                    let a_modified = snapshot.recency().get(&a.id);
                    let b_modified = snapshot.recency().get(&b.id);
                    b_modified.cmp(&a_modified)
                })
                .then_with(|| a.id.cmp(&b.id))
        });
        candidates
    }

    /// Replace the top slice's relevance with reranker scores, when a
    /// collaborator is configured and answers in time.
    fn rerank_top(
        &self,
        snapshot: &CorpusSnapshot,
        query: &str,
        candidates: &mut [Candidate],
        degradation: &mut DegradationSummary,
    ) {
        let Some(reranker) = &self.reranker else {
            degradation.rerank_skipped = Some(RerankSkip::Unavailable);
            return;
        };

        let top_k = self.config.rerank.top_k.min(candidates.len());
        if top_k == 0 {
            return;
        }
        let pairs: Vec<(String, String)> = candidates[..top_k]
            .iter()
            .filter_map(|candidate| {
                snapshot
                    .record(&candidate.id)
                    .map(|record| (candidate.id.clone(), record.content.clone()))
            })
            .collect();

        let timeout = Duration::from_millis(self.config.rerank.timeout_ms);
        match rerank_with_timeout(reranker, query, pairs, timeout) {
            Ok(scored) => {
                let scores: BTreeMap<String, f64> = scored.into_iter().collect();
                for candidate in &mut candidates[..top_k] {
                    if let Some(&score) = scores.get(&candidate.id) {
                        candidate.relevance = score;
                    }
                }
                candidates[..top_k].sort_by(|a, b| {
                    b.relevance
                        .partial_cmp(&a.relevance)
                        .unwrap_or(std::cmp::Ordering::Equal)
                        .then_with(|| {
                            let a_modified = snapshot.recency().get(&a.id);
                            let b_modified = snapshot.recency().get(&b.id);
                            b_modified.cmp(&a_modified)
                        })
                        .then_with(|| a.id.cmp(&b.id))
                });
            }
            Err(skip) => degradation.rerank_skipped = Some(skip),
        }
    }
}

fn lexical_ids(snapshot: &CorpusSnapshot, text: &str, eligible: &BTreeSet<&str>) -> Vec<String> {
    snapshot
        .index()
        .ranked(text)
        .into_iter()
        .filter(|(id, _)| eligible.contains(id.as_str()))
        .map(|(id, _)| id)
        .collect()
}

fn passes_filters(record: &VulnerabilityRecord, filters: &QueryFilters) -> bool {
    if !filters.ecosystems.is_empty() && !filters.ecosystems.contains(&record.ecosystem) {
        return false;
    }
    if !filters.ids.is_empty() && !filters.ids.iter().any(|id| *id == record.id) {
        return false;
    }
    if let Some(range) = &filters.published
        && !range.contains(record.published_at)
    {
        return false;
    }
    true
}

/// Explicitly requested ids always surface, even when neither text
/// layer scored them. Seeded at zero relevance so text evidence still
/// dominates among requested records.
fn seed_requested_ids(
    fused: &mut Vec<FusedCandidate>,
    filters: &QueryFilters,
    eligible: &BTreeSet<&str>,
) {
    for id in &filters.ids {
        if eligible.contains(id.as_str())
            && !fused.iter().any(|candidate| candidate.record_id == *id)
        {
            fused.push(FusedCandidate {
                record_id: id.clone(),
                score: 0.0,
                lexical_rank: usize::MAX,
                semantic_rank: usize::MAX,
            });
        }
    }
}

/// Id lookups and explicitly requested ecosystems bypass the minimum
/// tier drop.
fn tier_drop_exempt(record: &VulnerabilityRecord, filters: &QueryFilters) -> bool {
    filters.ids.iter().any(|id| *id == record.id) || filters.requests_ecosystem(&record.ecosystem)
}
