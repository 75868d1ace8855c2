#![forbid(unsafe_code)]
//! vulnrank-search library.
//!
//! Hybrid retrieval layers: lexical BM25, semantic cosine similarity,
//! weighted reciprocal-rank fusion, and the best-effort reranker seam.
//!
//! # Conventions
//!
//! - **Errors**: fatal per-query failures are
//!   [`vulnrank_core::EngineError`]; stage-local failures degrade and
//!   are reported to the orchestrator, never panicked on.
//! - **Logging**: `tracing` macros (`warn!` for degraded layers,
//!   `debug!` for skipped rows).

pub mod fusion;
pub mod lexical;
pub mod rerank;
pub mod semantic;

pub use fusion::{FusedCandidate, rrf_fuse};
pub use lexical::Bm25Index;
pub use rerank::{RerankModel, rerank_with_timeout};
pub use semantic::{Embedder, cosine_similarity, semantic_scores};
