//! Error types shared across Baseline crates

use thiserror::Error;

/// Result type alias for Baseline operations
pub type Result<T> = std::result::Result<T, BaselineError>;

/// Shared error type for parsing concerns
#[derive(Error, Debug)]
pub enum BaselineError {
    #[error("Parse error: {0}")]
    Parse(String),
}
