//! Engine data model.
//!
//! # Module layout
//!
//! - [`record`] — immutable vulnerability records and the ecosystem enum.
//! - [`version`] — lenient version parsing and ordering.
//! - [`context`] — the user-declared infrastructure profile.
//! - [`query`] — per-invocation request and explicit filters.
//! - [`result`] — scored output and degradation accounting.

pub mod context;
pub mod query;
pub mod record;
pub mod result;
pub mod version;

pub use context::{InfrastructureContext, InstalledPackage};
pub use query::{DateRange, QueryFilters, QueryRequest};
pub use record::{
    AffectedPackage, Ecosystem, Reference, Severity, VersionSpec, VulnerabilityRecord,
};
pub use result::{
    DegradationSummary, MatchTier, RerankSkip, RiskLevel, ScoredResult, SearchResponse,
};
pub use version::{Version, VersionParseError};
