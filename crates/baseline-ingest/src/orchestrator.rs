//! Ingestion orchestrator
//!
//! Drives one full run: ensure the Source row exists, then fetch, normalize,
//! and upsert players, tournaments, and rankings, and assemble the run
//! summary. Players and tournaments have no dependency on each other, so
//! their fetch+normalize stages run concurrently; ranking writes wait for
//! the player-id map resolved during the player phase.

use std::collections::HashMap;
use std::time::Duration;

use baseline_common::types::{
    EntityKind, PlayerRecord, RankingRecord, TournamentRecord, UpcomingEvent, UpsertOutcome,
};
use chrono::Utc;
use serde_json::Value;
use tracing::{info, warn};
use uuid::Uuid;

use crate::client::{ApiTennisClient, Resource};
use crate::config::{IngestConfig, SOURCE_SLUG};
use crate::error::{IngestError, Result};
use crate::normalize::{
    filter_upcoming, normalize_batch, normalize_player, normalize_ranking,
    normalize_tournament, normalize_upcoming_event,
};
use crate::store::RecordStore;
use crate::summary::{PhaseStats, RunPhase, RunSummary};

/// Output of one entity type's fetch+normalize stage
struct FetchStage<T> {
    fetched: u64,
    records: Vec<T>,
    failures: Vec<IngestError>,
}

/// Fetch a resource and normalize its records, bounded by the phase deadline
///
/// A deadline expiry abandons the fetch and fails the stage; it never
/// returns partial data as complete.
async fn fetch_normalized<T>(
    client: &ApiTennisClient,
    resource: Resource,
    deadline_secs: Option<u64>,
    normalize: impl Fn(&Value) -> Result<T>,
) -> Result<FetchStage<T>> {
    let raws = match deadline_secs {
        Some(secs) => {
            tokio::time::timeout(Duration::from_secs(secs), client.fetch_all(resource))
                .await
                .map_err(|_| IngestError::TransientFetch {
                    resource: resource.path().to_string(),
                    attempts: 0,
                    message: format!("abandoned after {}s phase deadline", secs),
                })??
        },
        None => client.fetch_all(resource).await?,
    };

    let fetched = raws.len() as u64;
    let (records, failures) = normalize_batch(&raws, normalize);

    Ok(FetchStage {
        fetched,
        records,
        failures,
    })
}

fn apply_outcome(stats: &mut PhaseStats, outcome: UpsertOutcome) {
    match outcome {
        UpsertOutcome::Inserted => stats.inserted += 1,
        UpsertOutcome::Updated => stats.updated += 1,
    }
}

/// Orchestrates one ingestion run against a [`RecordStore`]
pub struct IngestOrchestrator<S> {
    client: ApiTennisClient,
    store: S,
    config: IngestConfig,
    phase: RunPhase,
}

impl<S: RecordStore> IngestOrchestrator<S> {
    pub fn new(client: ApiTennisClient, store: S, config: IngestConfig) -> Self {
        Self {
            client,
            store,
            config,
            phase: RunPhase::Idle,
        }
    }

    /// Current phase of the run state machine
    pub fn phase(&self) -> RunPhase {
        self.phase
    }

    /// Execute one full run
    ///
    /// Returns `Err` only for run-fatal conditions (the Source row could not
    /// be ensured); per-record and per-resource failures land in the summary
    /// while the run continues.
    pub async fn run(&mut self) -> Result<RunSummary> {
        let mut summary = RunSummary::new(SOURCE_SLUG);
        let deadline = self.config.http.phase_deadline_secs;

        let source = self.config.source_record();
        let source_id = match self.store.ensure_source(&source).await {
            Ok(id) => id,
            Err(e) => {
                self.phase = RunPhase::Failed;
                return Err(e);
            },
        };
        summary.source_id = Some(source_id);
        info!(source = %source.slug, source_id = %source_id, "Source row ensured");

        // Players and tournaments are independent; fetch+normalize both
        // concurrently, then write sequentially.
        self.phase = RunPhase::FetchingPlayers;
        let (players_stage, tournaments_stage) = tokio::join!(
            fetch_normalized(&self.client, Resource::Players, deadline, normalize_player),
            fetch_normalized(
                &self.client,
                Resource::Tournaments,
                deadline,
                normalize_tournament
            ),
        );

        let player_ids = self
            .write_players(&mut summary, source_id, players_stage)
            .await;

        self.phase = RunPhase::FetchingTournaments;
        self.write_tournaments(&mut summary, source_id, tournaments_stage)
            .await;

        self.phase = RunPhase::FetchingRankings;
        let rankings_stage = fetch_normalized(
            &self.client,
            Resource::Rankings,
            deadline,
            normalize_ranking,
        )
        .await;
        self.write_rankings(&mut summary, &player_ids, rankings_stage)
            .await;

        self.phase = RunPhase::Summarizing;
        summary.completed_at = Some(Utc::now());

        if summary.fully_successful() {
            info!(
                players = summary.players.upserted(),
                tournaments = summary.tournaments.upserted(),
                rankings = summary.rankings.upserted(),
                "Run complete"
            );
        } else {
            warn!(
                errors = summary.errors.len(),
                players_failed = summary.players.failed,
                tournaments_failed = summary.tournaments.failed,
                rankings_failed = summary.rankings.failed,
                rankings_skipped = summary.rankings.skipped,
                "Run complete with failures"
            );
        }

        self.phase = RunPhase::Done;
        Ok(summary)
    }

    /// Upsert the player stage, building the external-id to internal-id map
    /// that ranking writes depend on.
    async fn write_players(
        &self,
        summary: &mut RunSummary,
        source_id: Uuid,
        stage: Result<FetchStage<PlayerRecord>>,
    ) -> HashMap<String, Uuid> {
        let mut player_ids = HashMap::new();

        let stage = match stage {
            Ok(stage) => stage,
            Err(e) => {
                summary.record_phase_fatal(EntityKind::Player, &e);
                return player_ids;
            },
        };

        summary.players.fetched = stage.fetched;
        summary.players.normalized = stage.records.len() as u64;
        for failure in &stage.failures {
            summary.record_failure(EntityKind::Player, failure);
        }

        for record in &stage.records {
            match self.store.upsert_player(source_id, record).await {
                Ok((id, outcome)) => {
                    apply_outcome(&mut summary.players, outcome);
                    player_ids.insert(record.external_id.clone(), id);
                },
                Err(e) => summary.record_failure(EntityKind::Player, &e),
            }
        }

        player_ids
    }

    async fn write_tournaments(
        &self,
        summary: &mut RunSummary,
        source_id: Uuid,
        stage: Result<FetchStage<TournamentRecord>>,
    ) {
        let stage = match stage {
            Ok(stage) => stage,
            Err(e) => {
                summary.record_phase_fatal(EntityKind::Tournament, &e);
                return;
            },
        };

        summary.tournaments.fetched = stage.fetched;
        summary.tournaments.normalized = stage.records.len() as u64;
        for failure in &stage.failures {
            summary.record_failure(EntityKind::Tournament, failure);
        }

        for record in &stage.records {
            match self.store.upsert_tournament(source_id, record).await {
                Ok(outcome) => apply_outcome(&mut summary.tournaments, outcome),
                Err(e) => summary.record_failure(EntityKind::Tournament, &e),
            }
        }
    }

    /// Upsert the ranking stage. A ranking whose player was never
    /// successfully written this run is skipped and recorded, never
    /// attempted against the store.
    async fn write_rankings(
        &self,
        summary: &mut RunSummary,
        player_ids: &HashMap<String, Uuid>,
        stage: Result<FetchStage<RankingRecord>>,
    ) {
        let stage = match stage {
            Ok(stage) => stage,
            Err(e) => {
                summary.record_phase_fatal(EntityKind::Ranking, &e);
                return;
            },
        };

        summary.rankings.fetched = stage.fetched;
        summary.rankings.normalized = stage.records.len() as u64;
        for failure in &stage.failures {
            summary.record_failure(EntityKind::Ranking, failure);
        }

        for record in &stage.records {
            let Some(&player_id) = player_ids.get(&record.player_external_id) else {
                let e = IngestError::DependencyUnresolved {
                    entity: EntityKind::Ranking,
                    key: format!("{}@{}", record.player_external_id, record.ranking_date),
                    dependency: format!("player {}", record.player_external_id),
                };
                summary.record_failure(EntityKind::Ranking, &e);
                continue;
            };

            match self.store.upsert_ranking(player_id, record).await {
                Ok(outcome) => apply_outcome(&mut summary.rankings, outcome),
                Err(e) => summary.record_failure(EntityKind::Ranking, &e),
            }
        }
    }
}

/// Read-only connectivity check: fetch the events feed and list tournaments
/// starting today or later. Never touches the store.
pub async fn list_upcoming(client: &ApiTennisClient) -> Result<Vec<UpcomingEvent>> {
    let raws = client.fetch_all(Resource::Events).await?;
    let events: Vec<UpcomingEvent> = raws.iter().filter_map(normalize_upcoming_event).collect();
    Ok(filter_upcoming(events, Utc::now().date_naive()))
}
