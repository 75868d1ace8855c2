#![forbid(unsafe_code)]
//! vulnrank-core library.
//!
//! Data model, version ordering, error taxonomy, configuration, and
//! record stores shared by every vulnrank engine stage.
//!
//! # Conventions
//!
//! - **Errors**: typed [`error::EngineError`] for fatal engine failures;
//!   `anyhow::Result` with `.context()` at store/IO seams.
//! - **Logging**: `tracing` macros (`info!`, `warn!`, `debug!`).

pub mod config;
pub mod error;
pub mod model;
pub mod store;

pub use config::{EngineConfig, load_engine_config};
pub use error::{EngineError, ErrorCode};
