//! Ingestion error taxonomy
//!
//! The variants split along the failure policy boundaries of the pipeline:
//! `AuthConfig` is fatal before any network call, `TransientFetch` is fatal
//! for one resource after retries are exhausted, and the remaining record
//! variants are isolated per record and accumulated into the run summary.

use baseline_common::types::EntityKind;
use thiserror::Error;

/// Result type alias for ingestion operations
pub type Result<T> = std::result::Result<T, IngestError>;

/// Error type for the ingestion pipeline
#[derive(Error, Debug)]
pub enum IngestError {
    /// Missing or invalid credentials. Aborts the run before any network call.
    #[error("Auth configuration error: {0}")]
    AuthConfig(String),

    /// Timeouts, 429s, and 5xx responses that survived the retry budget.
    /// Fatal for the affected resource only.
    #[error("Fetch for {resource} failed after {attempts} attempts: {message}")]
    TransientFetch {
        resource: String,
        attempts: u32,
        message: String,
    },

    /// The provider answered with a status that is neither a success nor a
    /// retryable condition. Fatal for the affected resource, no retries.
    #[error("Unexpected HTTP {status} fetching {resource}")]
    UnexpectedStatus {
        resource: String,
        status: reqwest::StatusCode,
    },

    /// One record failed normalization. Isolated from its siblings.
    #[error("Malformed {entity} record: {reason}")]
    MalformedRecord {
        entity: EntityKind,
        external_id: Option<String>,
        reason: String,
    },

    /// The store rejected a write for a reason other than the expected
    /// natural-key conflict. Isolated per record.
    #[error("Write conflict for {entity} {key}: {source}")]
    WriteConflict {
        entity: EntityKind,
        key: String,
        #[source]
        source: sqlx::Error,
    },

    /// A dependent write's referenced entity was never successfully written
    /// this run. The dependent write is skipped, not attempted.
    #[error("Dependency unresolved for {entity} {key}: {dependency} was never written")]
    DependencyUnresolved {
        entity: EntityKind,
        key: String,
        dependency: String,
    },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Common(#[from] baseline_common::BaselineError),
}

impl IngestError {
    /// Short taxonomy label used in the run summary
    pub fn label(&self) -> &'static str {
        match self {
            IngestError::AuthConfig(_) => "auth_config",
            IngestError::TransientFetch { .. } => "transient_fetch",
            IngestError::UnexpectedStatus { .. } => "unexpected_status",
            IngestError::MalformedRecord { .. } => "malformed_record",
            IngestError::WriteConflict { .. } => "write_conflict",
            IngestError::DependencyUnresolved { .. } => "dependency_unresolved",
            IngestError::Database(_) => "database",
            IngestError::Http(_) => "http",
            IngestError::Common(_) => "internal",
        }
    }

    /// The record key this error is attributable to, when there is one
    pub fn record_key(&self) -> Option<&str> {
        match self {
            IngestError::MalformedRecord { external_id, .. } => external_id.as_deref(),
            IngestError::WriteConflict { key, .. } => Some(key),
            IngestError::DependencyUnresolved { key, .. } => Some(key),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels() {
        let err = IngestError::AuthConfig("missing API_TENNIS_KEY".into());
        assert_eq!(err.label(), "auth_config");

        let err = IngestError::MalformedRecord {
            entity: EntityKind::Ranking,
            external_id: Some("77".into()),
            reason: "rank is not a positive integer".into(),
        };
        assert_eq!(err.label(), "malformed_record");
        assert_eq!(err.record_key(), Some("77"));
    }
}
