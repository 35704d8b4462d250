//! API-Tennis source client
//!
//! Issues authenticated GET requests against the provider, follows the
//! page-number pagination convention, and retries transient failures with
//! exponential backoff. Network I/O only; the client never touches the store.

use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::IngestConfig;
use crate::error::{IngestError, Result};

/// Provider resource types the pipeline fetches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    Players,
    Tournaments,
    Rankings,
    /// Calendar events feed, used by the read-only upcoming mode
    Events,
}

impl Resource {
    /// URL path segment for this resource
    pub fn path(&self) -> &'static str {
        match self {
            Resource::Players => "players",
            Resource::Tournaments => "tournaments",
            Resource::Rankings => "rankings",
            Resource::Events => "events",
        }
    }

    /// Provider-documented response keys that may carry this resource's
    /// record list, most specific first.
    fn record_keys(&self) -> [&'static str; 3] {
        match self {
            Resource::Players => ["players", "result", "response"],
            Resource::Tournaments => ["tournaments", "result", "response"],
            Resource::Rankings => ["rankings", "result", "response"],
            Resource::Events => ["events", "result", "response"],
        }
    }
}

impl std::fmt::Display for Resource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.path())
    }
}

/// HTTP client for the API-Tennis provider
#[derive(Debug)]
pub struct ApiTennisClient {
    client: Client,
    base_url: String,
    api_key: String,
    key_header: String,
    max_attempts: u32,
    backoff_ms: u64,
}

impl ApiTennisClient {
    /// Create a new client from configuration
    ///
    /// Fails fast with [`IngestError::AuthConfig`], before any network call,
    /// when no API key is configured.
    pub fn new(config: &IngestConfig) -> Result<Self> {
        if config.api.api_key.is_empty() {
            return Err(IngestError::AuthConfig(
                "API_TENNIS_KEY is not configured".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.http.request_timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: config.api.base_url.trim_end_matches('/').to_string(),
            api_key: config.api.api_key.clone(),
            key_header: config.api.key_header.clone(),
            max_attempts: config.http.max_attempts,
            backoff_ms: config.http.backoff_ms,
        })
    }

    /// Fetch the complete record stream for a resource
    ///
    /// Follows `paging.next` until the provider stops signalling a next page.
    /// The absence of the signal is the only termination condition; an
    /// empty-looking page does not end the stream on its own.
    pub async fn fetch_all(&self, resource: Resource) -> Result<Vec<Value>> {
        let mut records = Vec::new();
        let mut page: u64 = 1;

        loop {
            let payload = self.get_page(resource, page).await?;
            let page_records = extract_records(&payload, resource);
            debug!(resource = %resource, page, records = page_records.len(), "Fetched page");
            records.extend(page_records);

            match next_page(&payload) {
                Some(next) => page = next,
                None => break,
            }
        }

        info!(resource = %resource, records = records.len(), "Fetch complete");
        Ok(records)
    }

    /// Fetch one page with retry and exponential backoff
    ///
    /// Retries 429 and 5xx responses and transport timeouts; any other HTTP
    /// error fails immediately. Exhausting the attempt budget surfaces
    /// [`IngestError::TransientFetch`] rather than partial data.
    async fn get_page(&self, resource: Resource, page: u64) -> Result<Value> {
        let url = format!("{}/{}", self.base_url, resource.path());
        let mut last_message = String::new();

        for attempt in 1..=self.max_attempts {
            let response = self
                .client
                .get(&url)
                .header(self.key_header.as_str(), self.api_key.as_str())
                .query(&[("page", page)])
                .send()
                .await;

            match response {
                Ok(resp) => {
                    let status = resp.status();
                    if status.is_success() {
                        return Ok(resp.json().await?);
                    }
                    if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
                        last_message = format!("HTTP {}", status);
                    } else {
                        // Anything else (client errors other than 429, stray
                        // unfollowable redirects) is not transient; fail
                        // without consuming the retry budget.
                        return Err(match resp.error_for_status() {
                            Err(e) => e.into(),
                            Ok(resp) => IngestError::UnexpectedStatus {
                                resource: resource.path().to_string(),
                                status: resp.status(),
                            },
                        });
                    }
                },
                Err(e) if e.is_timeout() || e.is_connect() => {
                    last_message = e.to_string();
                },
                Err(e) => return Err(e.into()),
            }

            if attempt < self.max_attempts {
                let backoff = Duration::from_millis(self.backoff_ms * 2u64.pow(attempt - 1));
                warn!(
                    resource = %resource,
                    page,
                    attempt,
                    max_attempts = self.max_attempts,
                    backoff_ms = backoff.as_millis() as u64,
                    error = %last_message,
                    "Fetch attempt failed, retrying"
                );
                tokio::time::sleep(backoff).await;
            }
        }

        Err(IngestError::TransientFetch {
            resource: resource.path().to_string(),
            attempts: self.max_attempts,
            message: last_message,
        })
    }
}

/// Pull the record list out of a page payload
///
/// The provider has historically served lists under a resource-specific key,
/// `result`, or `response`; the first array found wins. Non-array values
/// under those keys are ignored.
fn extract_records(payload: &Value, resource: Resource) -> Vec<Value> {
    for key in resource.record_keys() {
        if let Some(list) = payload.get(key).and_then(Value::as_array) {
            return list.clone();
        }
    }
    Vec::new()
}

/// The provider's "more pages" signal: `paging.next` carrying a page number
fn next_page(payload: &Value) -> Option<u64> {
    payload
        .get("paging")
        .and_then(|p| p.get("next"))
        .and_then(Value::as_u64)
}
