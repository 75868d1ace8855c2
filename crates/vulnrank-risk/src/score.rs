//! Composite exploitability risk on a 0-100 scale.
//!
//! Each sub-factor contributes a named number of points and the final
//! score is the clamped sum. The factors map is part of the public
//! result so a consumer can re-derive the score and see exactly which
//! inputs moved it. A record with no severity, no EPSS, an available
//! fix, and an ecosystem-tier match scores the neutral baseline of 0
//! points before clamping.

use std::collections::BTreeMap;
use vulnrank_core::config::{RiskThresholds, RiskWeights};
use vulnrank_core::model::{MatchTier, RiskLevel, ScoredResult, VulnerabilityRecord};

use crate::matcher::PatchStatus;

/// Score one record; returns the clamped score and the per-factor
/// contributions that sum (pre-clamp) to it.
#[must_use]
pub fn risk_score(
    record: &VulnerabilityRecord,
    tier: MatchTier,
    patch: PatchStatus,
    weights: &RiskWeights,
) -> (f64, BTreeMap<String, f64>) {
    let mut factors = BTreeMap::new();

    if let Some(severity) = &record.severity {
        factors.insert(
            "cvss".to_string(),
            severity.score / 10.0 * weights.cvss_max_points,
        );
    }
    if let Some(epss) = record.epss {
        factors.insert("epss".to_string(), epss * weights.epss_max_points);
    }
    if record.kev {
        factors.insert("kev".to_string(), weights.kev_points);
    }
    match patch {
        PatchStatus::NoFix => {
            factors.insert("patch".to_string(), weights.unpatched_points);
        }
        PatchStatus::FixedInstalled => {
            factors.insert("patch".to_string(), -weights.patched_credit);
        }
        PatchStatus::FixAvailable => {}
    }
    match tier {
        MatchTier::Exact => {
            factors.insert("tier".to_string(), weights.tier_exact_points);
        }
        MatchTier::None => {
            factors.insert("tier".to_string(), -weights.tier_none_penalty);
        }
        MatchTier::Ecosystem => {}
    }

    let score = factors.values().sum::<f64>().clamp(0.0, 100.0);
    (score, factors)
}

/// Map a 0-100 score onto a risk level.
#[must_use]
pub fn classify(score: f64, thresholds: &RiskThresholds) -> RiskLevel {
    if score >= thresholds.critical {
        RiskLevel::Critical
    } else if score >= thresholds.high {
        RiskLevel::High
    } else if score >= thresholds.medium {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    }
}

/// Share of optional risk inputs actually present on the record.
///
/// Identity, match evidence, and patch posture are always derivable,
/// so confidence floors at 3/5; CVSS and EPSS each add a fifth.
#[must_use]
pub fn confidence(record: &VulnerabilityRecord) -> f64 {
    let mut present = 3.0;
    if record.severity.is_some() {
        present += 1.0;
    }
    if record.epss.is_some() {
        present += 1.0;
    }
    present / 5.0
}

/// Aggregate view over a scored result set.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RiskSummary {
    pub critical: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
    pub mean_score: f64,
}

/// Summarize level counts and mean risk over a result set.
#[must_use]
pub fn summarize(results: &[ScoredResult]) -> RiskSummary {
    let mut summary = RiskSummary::default();
    for result in results {
        match result.risk_level {
            RiskLevel::Critical => summary.critical += 1,
            RiskLevel::High => summary.high += 1,
            RiskLevel::Medium => summary.medium += 1,
            RiskLevel::Low => summary.low += 1,
        }
        summary.mean_score += result.risk_score;
    }
    if !results.is_empty() {
        #[allow(clippy::cast_precision_loss)]
        {
            summary.mean_score /= results.len() as f64;
        }
    }
    summary
}
