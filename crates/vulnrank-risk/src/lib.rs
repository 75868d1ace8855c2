#![forbid(unsafe_code)]
//! vulnrank-risk library.
//!
//! Infrastructure match tiers, patch posture, and the composite risk
//! scorer. Everything here is pure over the record and context types
//! from `vulnrank-core`; the orchestrator owns I/O and degradation
//! accounting.
//!
//! # Conventions
//!
//! - **Errors**: matching and scoring never fail; malformed version
//!   data is flagged per record and counted by the caller.
//! - **Logging**: `tracing` `debug!` for skipped version evidence.

pub mod matcher;
pub mod score;

pub use matcher::{InfraAssessment, PatchStatus, assess};
pub use score::{RiskSummary, classify, confidence, risk_score, summarize};
