//! Canonical ingestion record types
//!
//! These are the normalized, internally-schematized representations of the
//! entities the pipeline moves: one struct per destination table, independent
//! of the provider's raw payload shape. Every record keeps the raw provider
//! payload verbatim for auditability and reprocessing.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::BaselineError;

/// Professional tour a player or tournament belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tour {
    Atp,
    Wta,
}

impl Tour {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tour::Atp => "atp",
            Tour::Wta => "wta",
        }
    }
}

impl std::str::FromStr for Tour {
    type Err = BaselineError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "atp" => Ok(Tour::Atp),
            "wta" => Ok(Tour::Wta),
            other => Err(BaselineError::Parse(format!("unknown tour: {}", other))),
        }
    }
}

impl std::fmt::Display for Tour {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Court surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Surface {
    Hard,
    Clay,
    Grass,
    Carpet,
}

impl Surface {
    pub fn as_str(&self) -> &'static str {
        match self {
            Surface::Hard => "hard",
            Surface::Clay => "clay",
            Surface::Grass => "grass",
            Surface::Carpet => "carpet",
        }
    }

    /// Parse a provider surface string, returning None for anything that is
    /// not one of the four known surfaces.
    pub fn parse_opt(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "hard" => Some(Surface::Hard),
            "clay" => Some(Surface::Clay),
            "grass" => Some(Surface::Grass),
            "carpet" => Some(Surface::Carpet),
            _ => None,
        }
    }
}

impl std::fmt::Display for Surface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Entity type moving through the pipeline, used in error reporting and the
/// run summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Source,
    Player,
    Tournament,
    Ranking,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Source => "source",
            EntityKind::Player => "player",
            EntityKind::Tournament => "tournament",
            EntityKind::Ranking => "ranking",
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Outcome of one upsert against the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpsertOutcome {
    Inserted,
    Updated,
}

/// Canonical Source row, one per configured provider endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceRecord {
    pub slug: String,
    pub name: String,
    pub base_url: String,
    pub description: Option<String>,
}

/// Canonical player record, keyed by (source_id, external_id)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerRecord {
    pub external_id: String,
    pub full_name: String,
    pub tour: Tour,
    pub country_code: Option<String>,
    pub handedness: Option<String>,
    pub birthdate: Option<NaiveDate>,
    /// Raw provider payload, retained verbatim
    pub raw_payload: serde_json::Value,
}

/// Canonical tournament record, keyed by (source_id, external_id)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TournamentRecord {
    pub external_id: String,
    pub season: i32,
    pub name: String,
    pub tour: Tour,
    pub surface: Option<Surface>,
    pub category: Option<String>,
    pub location: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    /// Raw provider payload, retained verbatim
    pub raw_payload: serde_json::Value,
}

/// Canonical ranking snapshot, keyed by (player_id, ranking_date)
///
/// Still references the provider's player id at this stage; the orchestrator
/// resolves it to the internal player uuid before the write.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankingRecord {
    pub player_external_id: String,
    pub ranking_date: NaiveDate,
    pub rank: i32,
    pub points: i64,
    /// Raw provider payload, retained verbatim
    pub raw_payload: serde_json::Value,
}

/// An upcoming tournament as reported by the provider's events feed
///
/// Used only by the read-only `upcoming` mode; never written to the store,
/// so optional fields stay close to the raw shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpcomingEvent {
    pub external_id: Option<String>,
    pub name: Option<String>,
    pub category: Option<String>,
    pub surface: Option<String>,
    pub start_date: NaiveDate,
    pub location: Option<String>,
    pub raw_payload: serde_json::Value,
}
