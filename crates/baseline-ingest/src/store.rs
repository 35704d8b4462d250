//! Upsert writer
//!
//! Insert-or-update persistence for canonical records, one operation per
//! entity type, resolving by each table's declared unique constraint. The
//! store's constraints provide the at-most-one-row-per-key property; the
//! writer issues one statement per record so every failure is attributable
//! to the offending record.

use async_trait::async_trait;
use baseline_common::types::{
    EntityKind, PlayerRecord, RankingRecord, SourceRecord, TournamentRecord, UpsertOutcome,
};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::time::Duration;
use uuid::Uuid;

use crate::config::DatabaseConfig;
use crate::error::{IngestError, Result};

/// Destination store for canonical records
///
/// Implementations must be idempotent per natural key: resubmitting a record
/// never duplicates a row, the latest values win for mutable fields, and
/// first-insert metadata is preserved.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Upsert the Source row by slug and return its internal id
    async fn ensure_source(&self, source: &SourceRecord) -> Result<Uuid>;

    /// Upsert one player by (source_id, external_id), returning the resolved
    /// internal id needed by downstream ranking writes
    async fn upsert_player(
        &self,
        source_id: Uuid,
        record: &PlayerRecord,
    ) -> Result<(Uuid, UpsertOutcome)>;

    /// Upsert one tournament by (source_id, external_id)
    async fn upsert_tournament(
        &self,
        source_id: Uuid,
        record: &TournamentRecord,
    ) -> Result<UpsertOutcome>;

    /// Upsert one ranking snapshot by (player_id, ranking_date)
    async fn upsert_ranking(
        &self,
        player_id: Uuid,
        record: &RankingRecord,
    ) -> Result<UpsertOutcome>;
}

/// Postgres-backed record store over the `ingest_*` tables
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect a pool from configuration
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
            .connect(&config.url)
            .await?;

        Ok(Self::new(pool))
    }

    /// Classify a statement error as a per-record write conflict
    fn write_conflict(entity: EntityKind, key: &str, source: sqlx::Error) -> IngestError {
        IngestError::WriteConflict {
            entity,
            key: key.to_string(),
            source,
        }
    }
}

fn outcome(inserted: bool) -> UpsertOutcome {
    if inserted {
        UpsertOutcome::Inserted
    } else {
        UpsertOutcome::Updated
    }
}

#[async_trait]
impl RecordStore for PgStore {
    async fn ensure_source(&self, source: &SourceRecord) -> Result<Uuid> {
        // Source creation is run-fatal on failure, so errors propagate as
        // plain database errors rather than per-record conflicts.
        let id: Uuid = sqlx::query_scalar(
            r#"
            INSERT INTO ingest_sources (slug, name, base_url, description)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (slug)
            DO UPDATE SET
                name = EXCLUDED.name,
                base_url = EXCLUDED.base_url,
                description = EXCLUDED.description,
                updated_at = now()
            RETURNING id
            "#,
        )
        .bind(&source.slug)
        .bind(&source.name)
        .bind(&source.base_url)
        .bind(&source.description)
        .fetch_one(&self.pool)
        .await?;

        Ok(id)
    }

    async fn upsert_player(
        &self,
        source_id: Uuid,
        record: &PlayerRecord,
    ) -> Result<(Uuid, UpsertOutcome)> {
        let (id, inserted): (Uuid, bool) = sqlx::query_as(
            r#"
            INSERT INTO ingest_players (
                source_id, external_id, tour, full_name,
                country_code, handedness, birthdate, raw_payload
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (source_id, external_id)
            DO UPDATE SET
                tour = EXCLUDED.tour,
                full_name = EXCLUDED.full_name,
                country_code = EXCLUDED.country_code,
                handedness = EXCLUDED.handedness,
                birthdate = EXCLUDED.birthdate,
                raw_payload = EXCLUDED.raw_payload,
                updated_at = now()
            RETURNING id, (xmax = 0) AS inserted
            "#,
        )
        .bind(source_id)
        .bind(&record.external_id)
        .bind(record.tour.as_str())
        .bind(&record.full_name)
        .bind(&record.country_code)
        .bind(&record.handedness)
        .bind(record.birthdate)
        .bind(&record.raw_payload)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| Self::write_conflict(EntityKind::Player, &record.external_id, e))?;

        Ok((id, outcome(inserted)))
    }

    async fn upsert_tournament(
        &self,
        source_id: Uuid,
        record: &TournamentRecord,
    ) -> Result<UpsertOutcome> {
        let (inserted,): (bool,) = sqlx::query_as(
            r#"
            INSERT INTO ingest_tournaments (
                source_id, external_id, tour, season, name, surface,
                category, location, start_date, end_date, raw_payload
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            ON CONFLICT (source_id, external_id)
            DO UPDATE SET
                tour = EXCLUDED.tour,
                season = EXCLUDED.season,
                name = EXCLUDED.name,
                surface = EXCLUDED.surface,
                category = EXCLUDED.category,
                location = EXCLUDED.location,
                start_date = EXCLUDED.start_date,
                end_date = EXCLUDED.end_date,
                raw_payload = EXCLUDED.raw_payload,
                updated_at = now()
            RETURNING (xmax = 0) AS inserted
            "#,
        )
        .bind(source_id)
        .bind(&record.external_id)
        .bind(record.tour.as_str())
        .bind(record.season)
        .bind(&record.name)
        .bind(record.surface.map(|s| s.as_str()))
        .bind(&record.category)
        .bind(&record.location)
        .bind(record.start_date)
        .bind(record.end_date)
        .bind(&record.raw_payload)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| Self::write_conflict(EntityKind::Tournament, &record.external_id, e))?;

        Ok(outcome(inserted))
    }

    async fn upsert_ranking(
        &self,
        player_id: Uuid,
        record: &RankingRecord,
    ) -> Result<UpsertOutcome> {
        let key = format!("{}@{}", record.player_external_id, record.ranking_date);

        let (inserted,): (bool,) = sqlx::query_as(
            r#"
            INSERT INTO ingest_rankings (
                player_id, ranking_date, "rank", points, raw_payload
            )
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (player_id, ranking_date)
            DO UPDATE SET
                "rank" = EXCLUDED."rank",
                points = EXCLUDED.points,
                raw_payload = EXCLUDED.raw_payload,
                updated_at = now()
            RETURNING (xmax = 0) AS inserted
            "#,
        )
        .bind(player_id)
        .bind(record.ranking_date)
        .bind(record.rank)
        .bind(record.points)
        .bind(&record.raw_payload)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| Self::write_conflict(EntityKind::Ranking, &key, e))?;

        Ok(outcome(inserted))
    }
}
