//! Rank fusion of the lexical and semantic layers.

pub mod scoring;

pub use scoring::{FusedCandidate, rrf_fuse};
