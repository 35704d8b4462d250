//! Baseline Common Library
//!
//! Shared types, error handling, and logging setup for the Baseline
//! workspace members.
//!
//! - **Error Handling**: [`BaselineError`] and the crate-wide [`Result`] alias
//! - **Logging**: tracing subscriber initialization via [`logging::LogConfig`]
//! - **Types**: canonical ingestion records shared between the pipeline stages

pub mod error;
pub mod logging;
pub mod types;

// Re-export commonly used types
pub use error::{BaselineError, Result};
