//! Engine output types: scored results and the degradation summary.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Degree of overlap between the declared infrastructure and a record's
/// affected-package data.
///
/// Ordering matters: `None < Ecosystem < Exact`, so a configured
/// minimum tier is a simple comparison.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum MatchTier {
    /// No overlap with the declared infrastructure.
    #[default]
    None,
    /// Ecosystem or service name overlaps, but no version evidence.
    Ecosystem,
    /// An installed package version falls inside an affected range.
    Exact,
}

impl fmt::Display for MatchTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("none"),
            Self::Ecosystem => f.write_str("ecosystem"),
            Self::Exact => f.write_str("exact"),
        }
    }
}

/// Categorical risk classification over the 0-100 composite score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Low => f.write_str("low"),
            Self::Medium => f.write_str("medium"),
            Self::High => f.write_str("high"),
            Self::Critical => f.write_str("critical"),
        }
    }
}

/// One ranked record with its full scoring breakdown.
///
/// `risk_factors` maps factor name to its signed point contribution;
/// `clamp(sum(values), 0, 100)` reconstructs `risk_score` exactly, with
/// no hidden adjustment. Serializes to a flat record for downstream
/// rendering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredResult {
    pub record_id: String,
    /// Fusion (or rerank) relevance; unbounded, higher = more relevant.
    pub relevance_score: f64,
    /// Composite exploitability risk in `[0, 100]`.
    pub risk_score: f64,
    /// Named point contributions behind `risk_score`.
    pub risk_factors: BTreeMap<String, f64>,
    pub match_tier: MatchTier,
    pub risk_level: RiskLevel,
    /// Share of risk inputs (CVSS, EPSS) actually present, in `[0, 1]`.
    pub confidence: f64,
}

/// Why the rerank stage was skipped for a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RerankSkip {
    /// No reranker collaborator configured.
    Unavailable,
    /// The collaborator did not answer within the configured timeout.
    Timeout,
    /// The collaborator returned an error.
    Failed,
}

/// Counted, non-fatal degradations for one query.
///
/// Stage-local failures are absorbed into the ranking but never
/// silently dropped; each one lands here.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DegradationSummary {
    /// Set when semantic matching did not run, with the reason.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub semantic_skipped: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rerank_skipped: Option<RerankSkip>,
    /// Records excluded from version-evidence matching because their
    /// ranges were unparseable.
    #[serde(default)]
    pub malformed_records: u64,
}

impl DegradationSummary {
    /// True when every stage ran cleanly.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.semantic_skipped.is_none()
            && self.rerank_skipped.is_none()
            && self.malformed_records == 0
    }
}

/// Ordered result list plus the degradation accounting for the query.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse {
    pub results: Vec<ScoredResult>,
    pub degradation: DegradationSummary,
}
