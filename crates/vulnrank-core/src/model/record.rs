//! The vulnerability record model.
//!
//! Records are immutable once loaded: every engine stage reads them
//! through a shared corpus snapshot and nothing mutates them in place.
//! Optional fields (`severity`, `epss`) degrade to documented neutral
//! defaults at scoring time — absence is never a failure.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Package ecosystem an advisory applies to.
///
/// The closed variants are the OSV bulk-export ecosystems the corpus is
/// built from; anything else round-trips through `Other` so unknown
/// feeds still load.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Ecosystem {
    Npm,
    #[serde(rename = "pypi")]
    PyPi,
    Maven,
    Go,
    #[serde(rename = "crates.io")]
    CratesIo,
    Debian,
    #[serde(untagged)]
    Other(String),
}

impl Ecosystem {
    /// Whether affected-range containment uses semantic-version ordering.
    ///
    /// Ecosystems with non-semver native schemes (Debian epochs, unknown
    /// feeds) fall back to exact string matching against explicit
    /// version sets.
    #[must_use]
    pub const fn uses_semver(&self) -> bool {
        match self {
            Self::Npm | Self::PyPi | Self::Maven | Self::Go | Self::CratesIo => true,
            Self::Debian | Self::Other(_) => false,
        }
    }
}

impl fmt::Display for Ecosystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Npm => f.write_str("npm"),
            Self::PyPi => f.write_str("pypi"),
            Self::Maven => f.write_str("maven"),
            Self::Go => f.write_str("go"),
            Self::CratesIo => f.write_str("crates.io"),
            Self::Debian => f.write_str("debian"),
            Self::Other(name) => f.write_str(name),
        }
    }
}

/// One vulnerable version window or an explicit vulnerable-version set.
///
/// Versions stay as raw strings here; parsing happens at match time so a
/// single malformed range degrades only that record's infrastructure
/// evidence instead of failing corpus load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VersionSpec {
    /// Half-open window `[introduced, fixed)`; `fixed = None` means no
    /// patched release exists yet.
    Range {
        introduced: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        fixed: Option<String>,
    },
    /// Explicit finite set of vulnerable versions, matched by equality.
    Exact(Vec<String>),
}

/// A package/version constraint from an advisory's affected list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AffectedPackage {
    pub name: String,
    pub ecosystem: Ecosystem,
    pub ranges: Vec<VersionSpec>,
}

/// Structured severity, when the advisory carries one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Severity {
    /// CVSS base score in `[0, 10]`.
    pub score: f64,
    /// CVSS vector string, informational.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vector: Option<String>,
}

/// An advisory reference link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reference {
    pub kind: String,
    pub url: String,
}

/// A single vulnerability record as served by a record store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VulnerabilityRecord {
    /// Stable advisory id (`GHSA-...`, `CVE-...`), unique per corpus.
    pub id: String,
    /// Normalized free text used for lexical and semantic matching.
    pub content: String,
    pub ecosystem: Ecosystem,
    #[serde(default)]
    pub affected: Vec<AffectedPackage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<Severity>,
    pub published_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
    #[serde(default)]
    pub references: Vec<Reference>,
    /// True iff the vulnerability is known to be actively exploited.
    #[serde(default)]
    pub kev: bool,
    /// Exploit-prediction probability in `[0, 1]`; `None` means unknown
    /// and is treated as neutral by the risk scorer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub epss: Option<f64>,
}

impl VulnerabilityRecord {
    /// Check structural invariants before a record enters a store.
    ///
    /// # Errors
    ///
    /// Returns a message naming the violated invariant: empty id,
    /// `published_at > modified_at`, CVSS outside `[0, 10]`, or EPSS
    /// outside `[0, 1]`.
    pub fn validate(&self) -> Result<(), String> {
        if self.id.trim().is_empty() {
            return Err("record id must not be empty".into());
        }
        if self.published_at > self.modified_at {
            return Err(format!(
                "record {}: published_at {} is after modified_at {}",
                self.id, self.published_at, self.modified_at
            ));
        }
        if let Some(severity) = &self.severity {
            if !(0.0..=10.0).contains(&severity.score) {
                return Err(format!(
                    "record {}: CVSS score {} outside [0, 10]",
                    self.id, severity.score
                ));
            }
        }
        if let Some(epss) = self.epss {
            if !(0.0..=1.0).contains(&epss) {
                return Err(format!(
                    "record {}: EPSS probability {epss} outside [0, 1]",
                    self.id
                ));
            }
        }
        Ok(())
    }
}
