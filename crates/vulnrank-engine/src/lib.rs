#![forbid(unsafe_code)]
//! vulnrank-engine library.
//!
//! The orchestrator tying the retrieval and risk crates together:
//! immutable corpus snapshots plus the `search()` pipeline with
//! degradation accounting.
//!
//! # Conventions
//!
//! - **Errors**: fatal per-query failures are
//!   [`vulnrank_core::EngineError`]; everything stage-local degrades
//!   into the response's `DegradationSummary`.
//! - **Logging**: `tracing` (`info!` for snapshot lifecycle, `warn!`
//!   for degraded collaborators, `debug!` for per-record skips).

pub mod engine;
pub mod snapshot;

pub use engine::Engine;
pub use snapshot::CorpusSnapshot;
