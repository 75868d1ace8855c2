//! Engine configuration.
//!
//! Every weighting in the pipeline is policy, not a derived constant:
//! fusion weights, tier multipliers, risk sub-factor points, and risk
//! level thresholds are all loaded from TOML with serde defaults, so a
//! partial config file only overrides the keys it names. The defaults
//! below are illustrative, not canonical.

use crate::model::MatchTier;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Top-level engine configuration, one section per stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub fusion: FusionConfig,
    #[serde(default)]
    pub infra: InfraConfig,
    #[serde(default)]
    pub rerank: RerankConfig,
    #[serde(default)]
    pub risk: RiskWeights,
    #[serde(default)]
    pub thresholds: RiskThresholds,
    /// Maximum results returned per query.
    #[serde(default = "default_limit")]
    pub limit: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            fusion: FusionConfig::default(),
            infra: InfraConfig::default(),
            rerank: RerankConfig::default(),
            risk: RiskWeights::default(),
            thresholds: RiskThresholds::default(),
            limit: default_limit(),
        }
    }
}

/// Reciprocal-rank fusion parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FusionConfig {
    /// RRF constant; higher values dampen the impact of top ranks.
    #[serde(default = "default_rrf_k")]
    pub rrf_k: usize,
    #[serde(default = "default_half")]
    pub lexical_weight: f64,
    #[serde(default = "default_half")]
    pub semantic_weight: f64,
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            rrf_k: default_rrf_k(),
            lexical_weight: default_half(),
            semantic_weight: default_half(),
        }
    }
}

/// Infrastructure matching stage parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InfraConfig {
    /// Candidates below this tier are dropped, unless the query filters
    /// explicitly requested their ecosystem or named their id. The
    /// default keeps everything.
    #[serde(default)]
    pub min_tier: MatchTier,
    #[serde(default = "default_exact_multiplier")]
    pub exact_multiplier: f64,
    #[serde(default = "default_ecosystem_multiplier")]
    pub ecosystem_multiplier: f64,
    #[serde(default = "default_one")]
    pub none_multiplier: f64,
}

impl InfraConfig {
    /// Relevance amplification for a match tier.
    #[must_use]
    pub const fn multiplier(&self, tier: MatchTier) -> f64 {
        match tier {
            MatchTier::Exact => self.exact_multiplier,
            MatchTier::Ecosystem => self.ecosystem_multiplier,
            MatchTier::None => self.none_multiplier,
        }
    }
}

impl Default for InfraConfig {
    fn default() -> Self {
        Self {
            min_tier: MatchTier::None,
            exact_multiplier: default_exact_multiplier(),
            ecosystem_multiplier: default_ecosystem_multiplier(),
            none_multiplier: default_one(),
        }
    }
}

/// Rerank stage parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RerankConfig {
    /// How many fused-and-filtered candidates get the finer pass.
    #[serde(default = "default_rerank_top_k")]
    pub top_k: usize,
    /// Budget for the collaborator call; exceeded means skip, not fail.
    #[serde(default = "default_rerank_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for RerankConfig {
    fn default() -> Self {
        Self {
            top_k: default_rerank_top_k(),
            timeout_ms: default_rerank_timeout_ms(),
        }
    }
}

/// Point budget for each risk sub-factor on the 0-100 scale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskWeights {
    /// CVSS 0-10 maps linearly onto `[0, cvss_max_points]`.
    #[serde(default = "default_cvss_max_points")]
    pub cvss_max_points: f64,
    /// EPSS 0-1 maps linearly onto `[0, epss_max_points]`.
    #[serde(default = "default_epss_max_points")]
    pub epss_max_points: f64,
    /// Flat bonus for known-exploited vulnerabilities.
    #[serde(default = "default_kev_points")]
    pub kev_points: f64,
    /// Bonus when no patched release exists anywhere.
    #[serde(default = "default_unpatched_points")]
    pub unpatched_points: f64,
    /// Credit when the context already runs a fixed version.
    #[serde(default = "default_patched_credit")]
    pub patched_credit: f64,
    /// Bonus for an exact infrastructure match.
    #[serde(default = "default_tier_exact_points")]
    pub tier_exact_points: f64,
    /// Penalty when nothing in the context overlaps the record.
    #[serde(default = "default_tier_none_penalty")]
    pub tier_none_penalty: f64,
}

impl Default for RiskWeights {
    fn default() -> Self {
        Self {
            cvss_max_points: default_cvss_max_points(),
            epss_max_points: default_epss_max_points(),
            kev_points: default_kev_points(),
            unpatched_points: default_unpatched_points(),
            patched_credit: default_patched_credit(),
            tier_exact_points: default_tier_exact_points(),
            tier_none_penalty: default_tier_none_penalty(),
        }
    }
}

/// Risk level classification boundaries on the 0-100 scale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskThresholds {
    #[serde(default = "default_critical_threshold")]
    pub critical: f64,
    #[serde(default = "default_high_threshold")]
    pub high: f64,
    #[serde(default = "default_medium_threshold")]
    pub medium: f64,
}

impl Default for RiskThresholds {
    fn default() -> Self {
        Self {
            critical: default_critical_threshold(),
            high: default_high_threshold(),
            medium: default_medium_threshold(),
        }
    }
}

/// Load engine config from a TOML file; a missing file means defaults.
///
/// # Errors
///
/// Returns an error when the file exists but cannot be read or parsed.
pub fn load_engine_config(path: &Path) -> Result<EngineConfig> {
    if !path.exists() {
        return Ok(EngineConfig::default());
    }

    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("read engine config {}", path.display()))?;
    let config: EngineConfig = toml::from_str(&raw)
        .with_context(|| format!("parse engine config {}", path.display()))?;
    Ok(config)
}

const fn default_limit() -> usize {
    50
}

const fn default_rrf_k() -> usize {
    60
}

const fn default_half() -> f64 {
    0.5
}

const fn default_one() -> f64 {
    1.0
}

const fn default_exact_multiplier() -> f64 {
    2.0
}

const fn default_ecosystem_multiplier() -> f64 {
    1.25
}

const fn default_rerank_top_k() -> usize {
    20
}

const fn default_rerank_timeout_ms() -> u64 {
    2_000
}

const fn default_cvss_max_points() -> f64 {
    40.0
}

const fn default_epss_max_points() -> f64 {
    25.0
}

const fn default_kev_points() -> f64 {
    20.0
}

const fn default_unpatched_points() -> f64 {
    10.0
}

const fn default_patched_credit() -> f64 {
    10.0
}

const fn default_tier_exact_points() -> f64 {
    5.0
}

const fn default_tier_none_penalty() -> f64 {
    5.0
}

const fn default_critical_threshold() -> f64 {
    80.0
}

const fn default_high_threshold() -> f64 {
    60.0
}

const fn default_medium_threshold() -> f64 {
    40.0
}
