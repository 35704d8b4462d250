//! Run summary and per-run state machine

use baseline_common::types::EntityKind;
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::error::IngestError;

/// Phase of one ingestion run
///
/// `Failed` is terminal and reachable only on an unrecoverable condition
/// (missing credentials, the Source row cannot be ensured). Per-record
/// failures never move the run here; they accumulate into the summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunPhase {
    Idle,
    FetchingPlayers,
    FetchingTournaments,
    FetchingRankings,
    Summarizing,
    Done,
    Failed,
}

impl RunPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunPhase::Idle => "idle",
            RunPhase::FetchingPlayers => "fetching_players",
            RunPhase::FetchingTournaments => "fetching_tournaments",
            RunPhase::FetchingRankings => "fetching_rankings",
            RunPhase::Summarizing => "summarizing",
            RunPhase::Done => "done",
            RunPhase::Failed => "failed",
        }
    }
}

/// Counters for one entity type's phase
#[derive(Debug, Clone, Default, Serialize)]
pub struct PhaseStats {
    /// Raw records fetched from the provider
    pub fetched: u64,
    /// Records that passed normalization
    pub normalized: u64,
    /// Rows newly created by the upsert writer
    pub inserted: u64,
    /// Rows updated in place by the upsert writer
    pub updated: u64,
    /// Records that failed normalization or were rejected by the store
    pub failed: u64,
    /// Dependent records skipped because their referenced entity was never
    /// successfully written this run
    pub skipped: u64,
    /// Set when the whole phase aborted (retries exhausted, deadline hit)
    pub fatal: Option<String>,
}

impl PhaseStats {
    pub fn upserted(&self) -> u64 {
        self.inserted + self.updated
    }

    pub fn clean(&self) -> bool {
        self.failed == 0 && self.skipped == 0 && self.fatal.is_none()
    }
}

/// One recorded per-record failure
#[derive(Debug, Clone, Serialize)]
pub struct RecordFailure {
    pub entity: EntityKind,
    pub key: Option<String>,
    pub kind: String,
    pub message: String,
}

impl RecordFailure {
    pub fn from_error(entity: EntityKind, error: &IngestError) -> Self {
        Self {
            entity,
            key: error.record_key().map(str::to_string),
            kind: error.label().to_string(),
            message: error.to_string(),
        }
    }
}

/// Summary of one full ingestion run
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub source_slug: String,
    pub source_id: Option<Uuid>,
    pub players: PhaseStats,
    pub tournaments: PhaseStats,
    pub rankings: PhaseStats,
    pub errors: Vec<RecordFailure>,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl RunSummary {
    pub fn new(source_slug: impl Into<String>) -> Self {
        Self {
            source_slug: source_slug.into(),
            source_id: None,
            players: PhaseStats::default(),
            tournaments: PhaseStats::default(),
            rankings: PhaseStats::default(),
            errors: Vec::new(),
            started_at: Utc::now(),
            completed_at: None,
        }
    }

    /// True only when no per-record failure or skip occurred anywhere
    pub fn fully_successful(&self) -> bool {
        self.players.clean() && self.tournaments.clean() && self.rankings.clean()
    }

    /// Record one per-record failure against its phase
    pub fn record_failure(&mut self, entity: EntityKind, error: &IngestError) {
        let stats = self.stats_mut(entity);
        match error {
            IngestError::DependencyUnresolved { .. } => stats.skipped += 1,
            _ => stats.failed += 1,
        }
        self.errors.push(RecordFailure::from_error(entity, error));
    }

    /// Mark a whole phase as aborted
    pub fn record_phase_fatal(&mut self, entity: EntityKind, error: &IngestError) {
        self.stats_mut(entity).fatal = Some(error.to_string());
        self.errors.push(RecordFailure::from_error(entity, error));
    }

    fn stats_mut(&mut self, entity: EntityKind) -> &mut PhaseStats {
        match entity {
            // Source failures are run-fatal before any phase counters exist;
            // attribute stray ones to the player phase marker.
            EntityKind::Source | EntityKind::Player => &mut self.players,
            EntityKind::Tournament => &mut self.tournaments,
            EntityKind::Ranking => &mut self.rankings,
        }
    }
}
