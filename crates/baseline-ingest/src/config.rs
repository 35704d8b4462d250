//! Configuration management
//!
//! The canonical configuration contract uses the `API_TENNIS_*` environment
//! variables of the documented default service. All values come from the
//! environment (with `.env` support via dotenvy); the API key carries an
//! explicit, clearly-labeled insecure default so local runs work out of the
//! box while every execution context can see and override it.

use baseline_common::types::SourceRecord;
use serde::{Deserialize, Serialize};

use crate::error::{IngestError, Result};

// ============================================================================
// Provider Configuration Constants
// ============================================================================

/// Default provider base URL.
pub const DEFAULT_BASE_URL: &str = "https://api.api-tennis.com/tennis";

/// Default header name carrying the API key.
pub const DEFAULT_KEY_HEADER: &str = "x-api-key";

/// INSECURE default API key, for local testing only.
///
/// This is the provider's published demo key. It is injected here as an
/// explicit configuration value, never a hidden fallback: `IngestConfig`
/// records when it is in effect and the binary warns at startup.
pub const INSECURE_DEFAULT_API_KEY: &str =
    "db53a535d63fe359cdaa1488d15f3e55e12835c85590c4e3eace0dcc43edb4ab";

/// Source row identity for the configured provider.
pub const SOURCE_SLUG: &str = "api-tennis";
pub const SOURCE_NAME: &str = "API-Tennis";
pub const SOURCE_DESCRIPTION: &str = "API-Tennis ingestion feed";

// ============================================================================
// HTTP / Retry Configuration Constants
// ============================================================================

/// Default maximum fetch attempts per page (initial try + retries).
pub const DEFAULT_MAX_ATTEMPTS: u32 = 4;

/// Default base backoff delay in milliseconds; doubles per attempt.
pub const DEFAULT_BACKOFF_MS: u64 = 500;

/// Default per-request timeout in seconds.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

// ============================================================================
// Database Configuration Constants
// ============================================================================

/// Default database URL for local development.
pub const DEFAULT_DATABASE_URL: &str = "postgresql://localhost/baseline";

/// Default maximum database connections in the pool.
pub const DEFAULT_DATABASE_MAX_CONNECTIONS: u32 = 5;

/// Default database connection timeout in seconds.
pub const DEFAULT_DATABASE_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Provider API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub base_url: String,
    pub api_key: String,
    pub key_header: String,
    /// True when `api_key` is the published insecure default
    pub using_insecure_default_key: bool,
}

/// HTTP retry and deadline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    pub max_attempts: u32,
    pub backoff_ms: u64,
    pub request_timeout_secs: u64,
    /// Optional wall-clock bound for one fetch phase; expired fetches are
    /// abandoned and reported as failed rather than left hanging
    pub phase_deadline_secs: Option<u64>,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub connect_timeout_secs: u64,
}

/// Full ingestion configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    pub api: ApiConfig,
    pub http: HttpConfig,
    pub database: DatabaseConfig,
}

/// Parse an optional env var, rejecting set-but-unparseable values rather
/// than silently falling back.
fn env_parsed_opt<T: std::str::FromStr>(name: &str) -> Result<Option<T>> {
    match std::env::var(name) {
        Ok(raw) => raw.parse().map(Some).map_err(|_| {
            IngestError::AuthConfig(format!("{} has an unparseable value: {}", name, raw))
        }),
        Err(_) => Ok(None),
    }
}

fn env_parsed<T: std::str::FromStr>(name: &str, default: T) -> Result<T> {
    Ok(env_parsed_opt(name)?.unwrap_or(default))
}

impl IngestConfig {
    /// Load configuration from environment and defaults
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let (api_key, using_insecure_default_key) = match std::env::var("API_TENNIS_KEY") {
            Ok(key) => (key, false),
            Err(_) => (INSECURE_DEFAULT_API_KEY.to_string(), true),
        };

        let config = IngestConfig {
            api: ApiConfig {
                base_url: std::env::var("API_TENNIS_BASE_URL")
                    .unwrap_or_else(|_| DEFAULT_BASE_URL.to_string()),
                api_key,
                key_header: std::env::var("API_TENNIS_KEY_HEADER")
                    .unwrap_or_else(|_| DEFAULT_KEY_HEADER.to_string()),
                using_insecure_default_key,
            },
            http: HttpConfig {
                max_attempts: env_parsed("INGEST_MAX_ATTEMPTS", DEFAULT_MAX_ATTEMPTS)?,
                backoff_ms: env_parsed("INGEST_BACKOFF_MS", DEFAULT_BACKOFF_MS)?,
                request_timeout_secs: env_parsed(
                    "INGEST_REQUEST_TIMEOUT_SECS",
                    DEFAULT_REQUEST_TIMEOUT_SECS,
                )?,
                phase_deadline_secs: env_parsed_opt("INGEST_PHASE_DEADLINE_SECS")?,
            },
            database: DatabaseConfig {
                url: std::env::var("DATABASE_URL")
                    .unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string()),
                max_connections: env_parsed(
                    "DATABASE_MAX_CONNECTIONS",
                    DEFAULT_DATABASE_MAX_CONNECTIONS,
                )?,
                connect_timeout_secs: env_parsed(
                    "DATABASE_CONNECT_TIMEOUT",
                    DEFAULT_DATABASE_CONNECT_TIMEOUT_SECS,
                )?,
            },
        };

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.api.base_url.is_empty() {
            return Err(IngestError::AuthConfig(
                "API_TENNIS_BASE_URL cannot be empty".to_string(),
            ));
        }

        // An explicitly empty key is a misconfiguration; the unset case is
        // covered by the insecure default.
        if self.api.api_key.is_empty() {
            return Err(IngestError::AuthConfig(
                "API_TENNIS_KEY is set but empty".to_string(),
            ));
        }

        if self.http.max_attempts == 0 {
            return Err(IngestError::AuthConfig(
                "INGEST_MAX_ATTEMPTS must be at least 1".to_string(),
            ));
        }

        if self.database.url.is_empty() {
            return Err(IngestError::AuthConfig(
                "DATABASE_URL cannot be empty".to_string(),
            ));
        }

        Ok(())
    }

    pub fn using_insecure_default_key(&self) -> bool {
        self.api.using_insecure_default_key
    }

    /// The canonical Source row this configuration identifies
    pub fn source_record(&self) -> SourceRecord {
        SourceRecord {
            slug: SOURCE_SLUG.to_string(),
            name: SOURCE_NAME.to_string(),
            base_url: self.api.base_url.clone(),
            description: Some(SOURCE_DESCRIPTION.to_string()),
        }
    }
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            api: ApiConfig {
                base_url: DEFAULT_BASE_URL.to_string(),
                api_key: INSECURE_DEFAULT_API_KEY.to_string(),
                key_header: DEFAULT_KEY_HEADER.to_string(),
                using_insecure_default_key: true,
            },
            http: HttpConfig {
                max_attempts: DEFAULT_MAX_ATTEMPTS,
                backoff_ms: DEFAULT_BACKOFF_MS,
                request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
                phase_deadline_secs: None,
            },
            database: DatabaseConfig {
                url: DEFAULT_DATABASE_URL.to_string(),
                max_connections: DEFAULT_DATABASE_MAX_CONNECTIONS,
                connect_timeout_secs: DEFAULT_DATABASE_CONNECT_TIMEOUT_SECS,
            },
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_load_defaults_use_insecure_key() {
        std::env::remove_var("API_TENNIS_KEY");
        std::env::remove_var("API_TENNIS_BASE_URL");

        let config = IngestConfig::load().unwrap();
        assert!(config.using_insecure_default_key());
        assert_eq!(config.api.api_key, INSECURE_DEFAULT_API_KEY);
        assert_eq!(config.api.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.api.key_header, DEFAULT_KEY_HEADER);
    }

    #[test]
    #[serial]
    fn test_explicit_key_overrides_default() {
        std::env::set_var("API_TENNIS_KEY", "real-key");

        let config = IngestConfig::load().unwrap();
        assert!(!config.using_insecure_default_key());
        assert_eq!(config.api.api_key, "real-key");

        std::env::remove_var("API_TENNIS_KEY");
    }

    #[test]
    #[serial]
    fn test_empty_key_is_rejected() {
        std::env::set_var("API_TENNIS_KEY", "");

        let err = IngestConfig::load().unwrap_err();
        assert!(matches!(err, IngestError::AuthConfig(_)));

        std::env::remove_var("API_TENNIS_KEY");
    }

    #[test]
    #[serial]
    fn test_unparseable_numeric_env_is_rejected() {
        std::env::set_var("INGEST_MAX_ATTEMPTS", "abc");

        let err = IngestConfig::load().unwrap_err();
        assert!(
            matches!(err, IngestError::AuthConfig(ref msg) if msg.contains("INGEST_MAX_ATTEMPTS")),
            "got {err}"
        );

        std::env::remove_var("INGEST_MAX_ATTEMPTS");
    }

    #[test]
    #[serial]
    fn test_unset_phase_deadline_stays_none() {
        std::env::remove_var("INGEST_PHASE_DEADLINE_SECS");

        let config = IngestConfig::load().unwrap();
        assert_eq!(config.http.phase_deadline_secs, None);
    }

    #[test]
    fn test_validate_rejects_zero_attempts() {
        let mut config = IngestConfig::default();
        config.http.max_attempts = 0;
        assert!(matches!(
            config.validate(),
            Err(IngestError::AuthConfig(_))
        ));
    }

    #[test]
    fn test_source_record_identity() {
        let config = IngestConfig::default();
        let source = config.source_record();
        assert_eq!(source.slug, SOURCE_SLUG);
        assert_eq!(source.base_url, DEFAULT_BASE_URL);
    }
}
