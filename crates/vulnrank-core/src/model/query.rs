//! Query request and explicit filters.

use super::context::InfrastructureContext;
use super::record::Ecosystem;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Inclusive published-date window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub after: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub before: Option<DateTime<Utc>>,
}

impl DateRange {
    /// Whether a published timestamp falls inside the window.
    #[must_use]
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.after.is_none_or(|after| at >= after) && self.before.is_none_or(|before| at <= before)
    }
}

/// Explicit constraints applied as cheap pre-filters before fusion.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryFilters {
    /// Ecosystem allow-list; empty means all ecosystems.
    #[serde(default)]
    pub ecosystems: Vec<Ecosystem>,
    /// Explicit advisory/CVE id lookups. These bypass the minimum
    /// match-tier drop in the infrastructure stage.
    #[serde(default)]
    pub ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published: Option<DateRange>,
}

impl QueryFilters {
    /// True when no explicit constraint is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ecosystems.is_empty() && self.ids.is_empty() && self.published.is_none()
    }

    /// True when the filters explicitly requested this ecosystem.
    #[must_use]
    pub fn requests_ecosystem(&self, ecosystem: &Ecosystem) -> bool {
        self.ecosystems.contains(ecosystem)
    }
}

/// One engine invocation: the question, a context snapshot taken at
/// invocation time, and any explicit filters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryRequest {
    pub text: String,
    /// Owned copy of the session context; later user edits cannot
    /// affect an in-flight query.
    #[serde(default)]
    pub context: InfrastructureContext,
    #[serde(default)]
    pub filters: QueryFilters,
}

impl QueryRequest {
    /// A plain free-text query with no context and no filters.
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            context: InfrastructureContext::default(),
            filters: QueryFilters::default(),
        }
    }
}
