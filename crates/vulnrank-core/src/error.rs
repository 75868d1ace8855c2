//! Engine error taxonomy.
//!
//! Fatal, per-query failures are [`EngineError`] variants and abort the
//! query with enough context to retry or report. Non-fatal, stage-local
//! failures never surface here — they are absorbed into the
//! [`DegradationSummary`](crate::model::DegradationSummary) returned
//! alongside results.

use std::fmt;

/// Fatal engine failures, surfaced verbatim to the caller.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The engine was invoked before any record store was populated.
    /// Signals misconfiguration upstream; not retried internally.
    #[error("empty corpus: no vulnerability records loaded")]
    EmptyCorpus,

    /// Query and corpus embedding dimensions differ. The caller must
    /// re-embed with the deployment's fixed dimension or reject.
    #[error("embedding dimension mismatch: corpus dimension {expected}, query dimension {actual}")]
    EmbeddingDimensionMismatch { expected: usize, actual: usize },

    /// A record store operation failed.
    #[error("record store failure: {0}")]
    Store(#[from] anyhow::Error),

    /// Engine configuration could not be loaded or parsed.
    #[error("config error: {0}")]
    Config(String),

    /// A pipeline stage failed in a way no failure class covers, e.g.
    /// a panicked worker thread.
    #[error("internal error: {0}")]
    Internal(String),
}

impl EngineError {
    /// Stable machine-readable code for this failure class.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::EmptyCorpus => ErrorCode::EmptyCorpus,
            Self::EmbeddingDimensionMismatch { .. } => ErrorCode::EmbeddingDimensionMismatch,
            Self::Store(_) => ErrorCode::StoreFailure,
            Self::Config(_) => ErrorCode::ConfigParseError,
            Self::Internal(_) => ErrorCode::InternalUnexpected,
        }
    }
}

/// Machine-readable error codes for agent-friendly decision making.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    EmptyCorpus,
    EmbeddingDimensionMismatch,
    ConfigParseError,
    StoreFailure,
    MalformedRecord,
    RerankerUnavailable,
    RerankerTimeout,
    InternalUnexpected,
}

impl ErrorCode {
    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::EmptyCorpus => "E1001",
            Self::ConfigParseError => "E1002",
            Self::StoreFailure => "E1003",
            Self::EmbeddingDimensionMismatch => "E2001",
            Self::MalformedRecord => "E2002",
            Self::RerankerUnavailable => "E3001",
            Self::RerankerTimeout => "E3002",
            Self::InternalUnexpected => "E9001",
        }
    }

    /// Short human-facing summary for logs and terminal output.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::EmptyCorpus => "No vulnerability records loaded",
            Self::ConfigParseError => "Config file parse error",
            Self::StoreFailure => "Record store failure",
            Self::EmbeddingDimensionMismatch => "Embedding dimension mismatch",
            Self::MalformedRecord => "Record with unparseable version ranges",
            Self::RerankerUnavailable => "Reranker collaborator unavailable",
            Self::RerankerTimeout => "Reranker collaborator timed out",
            Self::InternalUnexpected => "Internal unexpected error",
        }
    }

    /// Optional remediation hint surfaced to operators and agents.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::EmptyCorpus => Some("Load a corpus into the record store before querying."),
            Self::ConfigParseError => Some("Fix syntax in the engine config TOML and retry."),
            Self::StoreFailure => Some("Check the record store path and schema version."),
            Self::EmbeddingDimensionMismatch => {
                Some("Re-embed the query with the deployment's embedding model.")
            }
            Self::MalformedRecord => {
                Some("Fix the record's affected ranges upstream; it is skipped, not fatal.")
            }
            Self::RerankerUnavailable | Self::RerankerTimeout => {
                Some("Reranking is best-effort; fusion order was used instead.")
            }
            Self::InternalUnexpected => Some("Retry once. If persistent, report a bug with logs."),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}
