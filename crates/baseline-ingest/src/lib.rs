//! Baseline Ingest - API-Tennis ingestion pipeline
//!
//! Pulls players, tournaments, and ranking snapshots from the API-Tennis
//! provider, normalizes them into canonical records, and upserts them into
//! the `ingest_*` Postgres tables keyed on provider external ids.
//!
//! The pipeline is three composable stages coordinated by the orchestrator:
//!
//! 1. [`client::ApiTennisClient`] — paginated, retrying HTTP fetch
//! 2. [`normalize`] — pure raw-record to canonical-record mapping
//! 3. [`store::RecordStore`] — idempotent insert-or-update per natural key

#![deny(clippy::unwrap_used, clippy::expect_used)]

pub mod client;
pub mod config;
pub mod error;
pub mod normalize;
pub mod orchestrator;
pub mod store;
pub mod summary;

pub use client::{ApiTennisClient, Resource};
pub use config::IngestConfig;
pub use error::{IngestError, Result};
pub use orchestrator::{list_upcoming, IngestOrchestrator};
pub use store::{PgStore, RecordStore};
pub use summary::{PhaseStats, RunPhase, RunSummary};
