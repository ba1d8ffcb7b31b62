// src/store/types.rs
// Row types for the cache/dedup store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// A monitored journal. Configuration management owns every field except
/// `last_fetched`, which the engine stamps after a successful scan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetJournal {
    pub id: i64,
    pub name: String,
    pub issn: Option<String>,
    /// Canonical keywords associated with this journal, configuration order.
    pub keywords: Vec<String>,
    pub active: bool,
    pub last_fetched: Option<DateTime<Utc>>,
}

/// Review state of a recommendation. `Unread` is the insert default;
/// `Confirmed`/`Dismissed` only ever come from an explicit user action and
/// are never reverted by re-ingestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Unread,
    Confirmed,
    Dismissed,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Unread => "unread",
            Status::Confirmed => "confirmed",
            Status::Dismissed => "dismissed",
        }
    }
}

impl std::str::FromStr for Status {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unread" => Ok(Status::Unread),
            "confirmed" => Ok(Status::Confirmed),
            "dismissed" => Ok(Status::Dismissed),
            other => Err(EngineError::InvalidStatus(other.to_string())),
        }
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The durable unit: a deduplicated, status-bearing recommendation.
/// At most one live row per DOI.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendationRecord {
    pub id: i64,
    pub doi: String,
    pub journal_id: i64,
    pub journal_name: String,
    pub title: String,
    pub abstract_text: Option<String>,
    pub authors: Vec<String>,
    pub year: Option<i64>,
    pub score: f64,
    pub reason: String,
    /// Matched canonical keywords, reason-display order.
    pub matched_keywords: Vec<String>,
    pub status: Status,
    pub fetched_at: DateTime<Utc>,
    pub reviewed_at: Option<DateTime<Utc>>,
}

/// What the orchestrator hands to `upsert` for a scored survivor.
#[derive(Debug, Clone)]
pub struct NewRecommendation {
    pub doi: String,
    pub journal_id: i64,
    pub title: String,
    pub abstract_text: Option<String>,
    pub authors: Vec<String>,
    pub year: Option<i64>,
    pub score: f64,
    pub reason: String,
    pub matched_keywords: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// First sighting: a new row with status `unread`.
    Inserted,
    /// Already cached: freshness advanced, score/reason raised if better,
    /// status untouched.
    Refreshed,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    #[default]
    Newest,
    Oldest,
}

/// Read-surface filter. All fields optional; `min_score` is a
/// presentation-layer threshold, never applied at scoring time.
#[derive(Debug, Clone, Default)]
pub struct ListFilter {
    pub journal_id: Option<i64>,
    pub keyword: Option<String>,
    pub status: Option<Status>,
    pub min_score: Option<f64>,
    pub sort: SortOrder,
    pub limit: Option<i64>,
}

/// One document of the user's own library, the raw material for the
/// similarity profile.
#[derive(Debug, Clone, Default)]
pub struct CorpusDocument {
    pub title: String,
    pub abstract_text: Option<String>,
    pub tags: Vec<String>,
    pub notes: Vec<String>,
}

/// Counts for the `stats` surface.
#[derive(Debug, Clone, Default, Serialize)]
pub struct StoreStats {
    pub total: i64,
    pub unread: i64,
    pub confirmed: i64,
    pub dismissed: i64,
}
