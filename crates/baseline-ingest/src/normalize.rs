//! Record normalization
//!
//! Pure functions from one raw provider record to one canonical record.
//! Field mapping is explicit and total: every canonical field has a mapping
//! rule from a known provider field, a default, or is nullable. A malformed
//! record fails on its own; `normalize_batch` keeps its siblings alive and
//! collects the failures for the run summary.

use baseline_common::types::{
    EntityKind, PlayerRecord, RankingRecord, Surface, Tour, TournamentRecord, UpcomingEvent,
};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde_json::Value;

use crate::error::{IngestError, Result};

/// Normalize a whole fetched batch, isolating per-record failures
pub fn normalize_batch<T>(
    raws: &[Value],
    normalize: impl Fn(&Value) -> Result<T>,
) -> (Vec<T>, Vec<IngestError>) {
    let mut records = Vec::with_capacity(raws.len());
    let mut failures = Vec::new();

    for raw in raws {
        match normalize(raw) {
            Ok(record) => records.push(record),
            Err(e) => failures.push(e),
        }
    }

    (records, failures)
}

/// Normalize a raw provider player record
pub fn normalize_player(raw: &Value) -> Result<PlayerRecord> {
    let external_id = external_id(raw, &["id", "player_id"])
        .ok_or_else(|| malformed(EntityKind::Player, None, "missing external id"))?;

    let full_name = player_full_name(raw).ok_or_else(|| {
        malformed(EntityKind::Player, Some(&external_id), "missing full name")
    })?;

    let tour = tour_of(raw).ok_or_else(|| {
        malformed(EntityKind::Player, Some(&external_id), "cannot determine tour")
    })?;

    let country_code = match raw.get("country") {
        Some(Value::Object(country)) => {
            country.get("code").and_then(Value::as_str).and_then(normalize_country_code)
        },
        Some(Value::String(country)) => normalize_country_code(country),
        _ => None,
    };

    let handedness = string_field(raw, &["hand", "handedness"]);
    let birthdate = raw
        .get("birthday")
        .or_else(|| raw.get("birthdate"))
        .and_then(normalize_date);

    Ok(PlayerRecord {
        external_id,
        full_name,
        tour,
        country_code,
        handedness,
        birthdate,
        raw_payload: raw.clone(),
    })
}

/// Normalize a raw provider tournament record
pub fn normalize_tournament(raw: &Value) -> Result<TournamentRecord> {
    let external_id = external_id(raw, &["id", "tournament_id"])
        .ok_or_else(|| malformed(EntityKind::Tournament, None, "missing external id"))?;

    let season = raw
        .get("season")
        .or_else(|| raw.get("year"))
        .and_then(integer_value)
        .and_then(|s| i32::try_from(s).ok())
        .ok_or_else(|| {
            malformed(EntityKind::Tournament, Some(&external_id), "missing or non-numeric season")
        })?;

    let name = string_field(raw, &["name", "title"]).ok_or_else(|| {
        malformed(EntityKind::Tournament, Some(&external_id), "missing name")
    })?;

    let tour = tour_of(raw).ok_or_else(|| {
        malformed(EntityKind::Tournament, Some(&external_id), "cannot determine tour")
    })?;

    let surface = raw
        .get("surface")
        .or_else(|| raw.get("ground"))
        .or_else(|| raw.get("court").and_then(|c| c.get("surface")))
        .and_then(Value::as_str)
        .and_then(Surface::parse_opt);

    let location_obj = raw.get("location");
    let city = string_field(raw, &["city"])
        .or_else(|| location_obj.and_then(|l| string_field(l, &["city"])));
    let country = string_field(raw, &["country"])
        .or_else(|| location_obj.and_then(|l| string_field(l, &["country"])));
    let location = join_location(&[city, country]);

    Ok(TournamentRecord {
        external_id,
        season,
        name,
        tour,
        surface,
        category: string_field(raw, &["category", "level"]),
        location,
        start_date: raw
            .get("start_date")
            .or_else(|| raw.get("start"))
            .and_then(normalize_date),
        end_date: raw
            .get("end_date")
            .or_else(|| raw.get("end"))
            .and_then(normalize_date),
        raw_payload: raw.clone(),
    })
}

/// Normalize a raw provider ranking snapshot
///
/// Ranking rows arrive in two shapes: flat, or wrapped under a `ranking` key
/// with the player reference nested alongside. `rank` must parse as a
/// strictly positive integer; `points` defaults to zero when absent.
pub fn normalize_ranking(raw: &Value) -> Result<RankingRecord> {
    let info = raw.get("ranking").unwrap_or(raw);
    let player_ref = info
        .get("player")
        .or_else(|| raw.get("player"))
        .unwrap_or(raw);

    let player_external_id = external_id(player_ref, &["id", "player_id"])
        .or_else(|| external_id(raw, &["player_id"]))
        .ok_or_else(|| malformed(EntityKind::Ranking, None, "missing player reference"))?;

    let rank = info
        .get("rank")
        .and_then(integer_value)
        .filter(|r| *r > 0)
        .and_then(|r| i32::try_from(r).ok())
        .ok_or_else(|| {
            malformed(
                EntityKind::Ranking,
                Some(&player_external_id),
                "rank is not a positive integer",
            )
        })?;

    let points = match info.get("points") {
        None | Some(Value::Null) => 0,
        Some(value) => integer_value(value).filter(|p| *p >= 0).ok_or_else(|| {
            malformed(
                EntityKind::Ranking,
                Some(&player_external_id),
                "points is not a non-negative integer",
            )
        })?,
    };

    let ranking_date = info
        .get("date")
        .or_else(|| info.get("ranking_date"))
        .and_then(normalize_date)
        .unwrap_or_else(|| Utc::now().date_naive());

    Ok(RankingRecord {
        player_external_id,
        ranking_date,
        rank,
        points,
        raw_payload: raw.clone(),
    })
}

/// Normalize one calendar event for the read-only upcoming mode
///
/// Events without a parseable start date cannot be classified as upcoming
/// and are dropped, matching the feed's advisory nature.
pub fn normalize_upcoming_event(raw: &Value) -> Option<UpcomingEvent> {
    let start_date = event_start_date(raw)?;

    let location = join_location(&[
        string_field(raw, &["city"]),
        string_field(raw, &["country"]),
        string_field(raw, &["location"]),
        string_field(raw, &["venue"]),
    ]);

    Some(UpcomingEvent {
        external_id: external_id(raw, &["event_id", "id", "tournament_id"]),
        name: string_field(raw, &["name", "event", "tournament", "title", "tournament_name"]),
        category: string_field(raw, &["category", "league", "tour"]),
        surface: string_field(raw, &["surface"]),
        start_date,
        location,
        raw_payload: raw.clone(),
    })
}

/// Keep only events starting today or later
pub fn filter_upcoming(events: Vec<UpcomingEvent>, today: NaiveDate) -> Vec<UpcomingEvent> {
    events
        .into_iter()
        .filter(|e| e.start_date >= today)
        .collect()
}

// ============================================================================
// Field-level coercion helpers
// ============================================================================

fn malformed(entity: EntityKind, external_id: Option<&str>, reason: &str) -> IngestError {
    IngestError::MalformedRecord {
        entity,
        external_id: external_id.map(str::to_string),
        reason: reason.to_string(),
    }
}

/// Provider identifiers arrive as numbers or strings; canonical form is the
/// trimmed string representation.
fn external_id(raw: &Value, keys: &[&str]) -> Option<String> {
    for key in keys {
        match raw.get(key) {
            Some(Value::String(s)) if !s.trim().is_empty() => return Some(s.trim().to_string()),
            Some(Value::Number(n)) => return Some(n.to_string()),
            _ => continue,
        }
    }
    None
}

/// First non-empty string under any of the given keys
fn string_field(raw: &Value, keys: &[&str]) -> Option<String> {
    for key in keys {
        if let Some(s) = raw.get(key).and_then(Value::as_str) {
            let trimmed = s.trim();
            if !trimmed.is_empty() {
                return Some(trimmed.to_string());
            }
        }
    }
    None
}

/// Coerce a JSON number or numeric string to an integer
fn integer_value(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Parse a provider date value into a calendar date
///
/// Accepts unix epoch numbers and the date/timestamp string formats the
/// provider has been observed to serve.
pub fn normalize_date(value: &Value) -> Option<NaiveDate> {
    match value {
        Value::Number(n) => {
            let secs = n.as_i64()?;
            DateTime::<Utc>::from_timestamp(secs, 0).map(|dt| dt.date_naive())
        },
        Value::String(s) => parse_date_str(s.trim()),
        _ => None,
    }
}

fn parse_date_str(s: &str) -> Option<NaiveDate> {
    if s.is_empty() {
        return None;
    }

    for fmt in ["%Y-%m-%d", "%Y/%m/%d", "%d-%m-%Y"] {
        if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
            return Some(date);
        }
    }

    if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%SZ") {
        return Some(dt.date());
    }

    DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.date_naive())
}

/// Upper-case a country code and truncate to the three-character form
pub fn normalize_country_code(raw: &str) -> Option<String> {
    let code = raw.trim().to_uppercase();
    if code.is_empty() {
        return None;
    }
    Some(code.chars().take(3).collect())
}

/// Determine the tour from explicit tour/circuit fields or sex/gender markers
fn tour_of(raw: &Value) -> Option<Tour> {
    let sex = string_field(raw, &["sex", "gender"])
        .unwrap_or_default()
        .to_lowercase();
    let tour = string_field(raw, &["tour", "circuit"])
        .unwrap_or_default()
        .to_lowercase();

    if sex.starts_with('w') || tour == "wta" {
        Some(Tour::Wta)
    } else if sex.starts_with('m') || tour == "atp" {
        Some(Tour::Atp)
    } else {
        None
    }
}

fn player_full_name(raw: &Value) -> Option<String> {
    if let Some(name) = string_field(raw, &["full_name"]) {
        return Some(name);
    }

    let parts: Vec<String> = ["firstname", "lastname"]
        .into_iter()
        .filter_map(|key| string_field(raw, &[key]))
        .collect();

    if parts.is_empty() {
        None
    } else {
        Some(parts.join(" "))
    }
}

/// Events carry their start date under a number of historical keys
fn event_start_date(raw: &Value) -> Option<NaiveDate> {
    for key in [
        "start_date",
        "startdate",
        "start",
        "date",
        "event_date",
        "date_start",
        "begin_at",
        "day",
        "timestamp",
    ] {
        if let Some(date) = raw.get(key).and_then(normalize_date) {
            return Some(date);
        }
    }
    None
}

fn join_location(parts: &[Option<String>]) -> Option<String> {
    let joined: Vec<&str> = parts.iter().filter_map(|p| p.as_deref()).collect();
    if joined.is_empty() {
        None
    } else {
        Some(joined.join(", "))
    }
}
