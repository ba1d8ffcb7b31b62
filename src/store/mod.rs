// src/store/mod.rs
// Time-bounded, DOI-keyed cache of recommendations plus the target-journal
// table and the user's library corpus. All writes for a given DOI serialize
// through single-writer transactions; the invariant is at most one row per
// DOI at all times, with status sticky once human-set.

pub mod types;

use std::time::Duration;

use anyhow::Result as AnyResult;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use sqlx::Row;
use tracing::{debug, info, warn};

use crate::error::{EngineError, Result};
use types::{
    CorpusDocument, ListFilter, NewRecommendation, RecommendationRecord, SortOrder, Status,
    StoreStats, TargetJournal, UpsertOutcome,
};

/// Create the SQLite pool. SQLite is single-writer with multiple readers,
/// so the pool stays small and recycles connections periodically.
pub async fn create_pool(database_url: &str, max_connections: u32) -> AnyResult<SqlitePool> {
    SqlitePoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(Duration::from_secs(10))
        .max_lifetime(Duration::from_secs(1800))
        .idle_timeout(Duration::from_secs(600))
        .connect(database_url)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to connect to database: {}", e))
}

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS target_journals (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE,
    issn TEXT,
    keywords TEXT NOT NULL DEFAULT '',
    active INTEGER NOT NULL DEFAULT 1,
    last_fetched TIMESTAMP,
    added_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
);

CREATE TABLE IF NOT EXISTS recommendations (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    doi TEXT NOT NULL UNIQUE,
    journal_id INTEGER NOT NULL REFERENCES target_journals(id) ON DELETE CASCADE,
    title TEXT NOT NULL,
    abstract TEXT,
    authors TEXT NOT NULL DEFAULT '[]',
    year INTEGER,
    score REAL NOT NULL,
    reason TEXT NOT NULL,
    matched_keywords TEXT NOT NULL DEFAULT '[]',
    status TEXT NOT NULL DEFAULT 'unread',
    fetched_at TIMESTAMP NOT NULL,
    reviewed_at TIMESTAMP
);

CREATE INDEX IF NOT EXISTS idx_recommendations_journal
    ON recommendations(journal_id);

CREATE TABLE IF NOT EXISTS library_documents (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    title TEXT NOT NULL,
    abstract TEXT,
    tags TEXT NOT NULL DEFAULT '[]',
    notes TEXT NOT NULL DEFAULT '[]'
);
"#;

#[derive(Clone)]
pub struct RecommendationStore {
    pool: SqlitePool,
}

impl RecommendationStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Apply the idempotent schema.
    pub async fn init_schema(&self) -> Result<()> {
        sqlx::raw_sql(SCHEMA).execute(&self.pool).await?;
        debug!("schema initialized");
        Ok(())
    }

    // ── Target journals

    pub async fn list_journals(&self, active_only: bool) -> Result<Vec<TargetJournal>> {
        let sql = if active_only {
            "SELECT * FROM target_journals WHERE active = 1 ORDER BY name"
        } else {
            "SELECT * FROM target_journals ORDER BY name"
        };
        let rows = sqlx::query(sql).fetch_all(&self.pool).await?;
        Ok(rows.iter().map(row_to_journal).collect())
    }

    pub async fn get_journal(&self, id: i64) -> Result<Option<TargetJournal>> {
        let row = sqlx::query("SELECT * FROM target_journals WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(row_to_journal))
    }

    pub async fn find_journal(&self, name: &str) -> Result<Option<TargetJournal>> {
        let row = sqlx::query("SELECT * FROM target_journals WHERE name = ?")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(row_to_journal))
    }

    pub async fn add_journal(
        &self,
        name: &str,
        issn: Option<&str>,
        keywords: &[String],
    ) -> Result<i64> {
        let row = sqlx::query(
            r#"
            INSERT INTO target_journals (name, issn, keywords, active)
            VALUES (?, ?, ?, 1)
            RETURNING id
            "#,
        )
        .bind(name)
        .bind(issn)
        .bind(keywords.join(","))
        .fetch_one(&self.pool)
        .await?;

        let id: i64 = row.get("id");
        info!(journal = name, id, "added target journal");
        Ok(id)
    }

    pub async fn set_journal_active(&self, id: i64, active: bool) -> Result<()> {
        let result = sqlx::query("UPDATE target_journals SET active = ? WHERE id = ?")
            .bind(active)
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(EngineError::NotFound(format!("journal {id}")));
        }
        info!(id, active, "journal toggled");
        Ok(())
    }

    pub async fn remove_journal(&self, id: i64) -> Result<()> {
        sqlx::query("DELETE FROM target_journals WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        info!(id, "removed target journal");
        Ok(())
    }

    /// Stamp a journal's last-fetch time after a successful scan. Never
    /// called on the failure path, so the next cycle retries the journal.
    pub async fn touch_journal(&self, id: i64) -> Result<()> {
        sqlx::query("UPDATE target_journals SET last_fetched = ? WHERE id = ?")
            .bind(Utc::now())
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    // ── Cache/dedup surface

    /// Cached rows for a journal whose last scan is still inside `window`,
    /// or None when stale/absent (the caller must re-fetch). A recent scan
    /// that matched nothing returns Some(empty): knowing there is nothing
    /// new is itself a cache hit, so the fetch is still skipped.
    pub async fn lookup_fresh(
        &self,
        journal: &TargetJournal,
        window: chrono::Duration,
    ) -> Result<Option<Vec<RecommendationRecord>>> {
        let Some(last_fetched) = journal.last_fetched else {
            return Ok(None);
        };
        if Utc::now() - last_fetched >= window {
            return Ok(None);
        }
        let records = self
            .list(&ListFilter {
                journal_id: Some(journal.id),
                ..Default::default()
            })
            .await?;
        Ok(Some(records))
    }

    /// Insert or refresh, keyed by DOI.
    ///
    /// New DOI: insert with status `unread`. Known DOI: advance
    /// `fetched_at`; raise score/reason/keywords only when the new score is
    /// strictly greater; never touch `status` or `reviewed_at`. Contention
    /// is retried once with a short backoff, then surfaced as a conflict.
    pub async fn upsert(&self, new: &NewRecommendation) -> Result<UpsertOutcome> {
        match self.try_upsert(new).await {
            Ok(outcome) => Ok(outcome),
            Err(err) if is_busy(&err) => {
                warn!(doi = %new.doi, "upsert contention, retrying once");
                tokio::time::sleep(Duration::from_millis(50)).await;
                match self.try_upsert(new).await {
                    Ok(outcome) => Ok(outcome),
                    // Still contended: a per-candidate conflict. Anything
                    // else (pool closed, disk gone) stays a storage error.
                    Err(err) if is_busy(&err) => {
                        Err(EngineError::StoreConflict(new.doi.clone()))
                    }
                    Err(err) => Err(err.into()),
                }
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn try_upsert(&self, new: &NewRecommendation) -> Result<UpsertOutcome, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let existing: Option<(i64, f64)> =
            sqlx::query_as("SELECT id, score FROM recommendations WHERE doi = ?")
                .bind(&new.doi)
                .fetch_optional(&mut *tx)
                .await?;

        let now = Utc::now();
        let outcome = match existing {
            None => {
                sqlx::query(
                    r#"
                    INSERT INTO recommendations (
                        doi, journal_id, title, abstract, authors, year,
                        score, reason, matched_keywords, status, fetched_at
                    ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, 'unread', ?)
                    "#,
                )
                .bind(&new.doi)
                .bind(new.journal_id)
                .bind(&new.title)
                .bind(&new.abstract_text)
                .bind(serde_json::to_string(&new.authors).unwrap_or_else(|_| "[]".to_string()))
                .bind(new.year)
                .bind(new.score)
                .bind(&new.reason)
                .bind(
                    serde_json::to_string(&new.matched_keywords)
                        .unwrap_or_else(|_| "[]".to_string()),
                )
                .bind(now)
                .execute(&mut *tx)
                .await?;
                UpsertOutcome::Inserted
            }
            Some((id, old_score)) => {
                if new.score > old_score {
                    sqlx::query(
                        r#"
                        UPDATE recommendations
                        SET fetched_at = ?, score = ?, reason = ?, matched_keywords = ?
                        WHERE id = ?
                        "#,
                    )
                    .bind(now)
                    .bind(new.score)
                    .bind(&new.reason)
                    .bind(
                        serde_json::to_string(&new.matched_keywords)
                            .unwrap_or_else(|_| "[]".to_string()),
                    )
                    .bind(id)
                    .execute(&mut *tx)
                    .await?;
                } else {
                    sqlx::query("UPDATE recommendations SET fetched_at = ? WHERE id = ?")
                        .bind(now)
                        .bind(id)
                        .execute(&mut *tx)
                        .await?;
                }
                UpsertOutcome::Refreshed
            }
        };

        tx.commit().await?;
        debug!(doi = %new.doi, ?outcome, "upsert");
        Ok(outcome)
    }

    // ── Read surface

    pub async fn list(&self, filter: &ListFilter) -> Result<Vec<RecommendationRecord>> {
        let mut sql = String::from(
            r#"
            SELECT r.*, j.name AS journal_name
            FROM recommendations r
            JOIN target_journals j ON j.id = r.journal_id
            WHERE 1=1
            "#,
        );
        if filter.journal_id.is_some() {
            sql.push_str(" AND r.journal_id = ?");
        }
        if filter.status.is_some() {
            sql.push_str(" AND r.status = ?");
        }
        if filter.min_score.is_some() {
            sql.push_str(" AND r.score >= ?");
        }
        if filter.keyword.is_some() {
            sql.push_str(" AND r.matched_keywords LIKE ?");
        }
        sql.push_str(match filter.sort {
            SortOrder::Newest => " ORDER BY r.fetched_at DESC, r.score DESC",
            SortOrder::Oldest => " ORDER BY r.fetched_at ASC, r.score ASC",
        });
        if filter.limit.is_some() {
            sql.push_str(" LIMIT ?");
        }

        let mut query = sqlx::query(&sql);
        if let Some(journal_id) = filter.journal_id {
            query = query.bind(journal_id);
        }
        if let Some(status) = filter.status {
            query = query.bind(status.as_str());
        }
        if let Some(min_score) = filter.min_score {
            query = query.bind(min_score);
        }
        if let Some(keyword) = &filter.keyword {
            // matched_keywords is a JSON array of canonical forms
            query = query.bind(format!(
                "%\"{}\"%",
                crate::keywords::normalize(keyword.trim())
            ));
        }
        if let Some(limit) = filter.limit {
            query = query.bind(limit);
        }

        let rows = query.fetch_all(&self.pool).await?;
        rows.iter().map(row_to_record).collect()
    }

    pub async fn get_by_doi(&self, doi: &str) -> Result<Option<RecommendationRecord>> {
        let row = sqlx::query(
            r#"
            SELECT r.*, j.name AS journal_name
            FROM recommendations r
            JOIN target_journals j ON j.id = r.journal_id
            WHERE r.doi = ?
            "#,
        )
        .bind(doi)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(row_to_record).transpose()
    }

    /// Idempotent explicit status update. Fails with NotFound for unknown
    /// DOIs; otherwise always succeeds, even when the status is unchanged.
    pub async fn set_status(&self, doi: &str, status: Status) -> Result<()> {
        let result = sqlx::query(
            "UPDATE recommendations SET status = ?, reviewed_at = ? WHERE doi = ?",
        )
        .bind(status.as_str())
        .bind(Utc::now())
        .bind(doi)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(EngineError::NotFound(doi.to_string()));
        }
        info!(doi, status = %status, "recommendation status updated");
        Ok(())
    }

    /// Delete one recommendation outright, regardless of status.
    pub async fn remove_recommendation(&self, doi: &str) -> Result<()> {
        let result = sqlx::query("DELETE FROM recommendations WHERE doi = ?")
            .bind(doi)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(EngineError::NotFound(doi.to_string()));
        }
        info!(doi, "removed recommendation");
        Ok(())
    }

    pub async fn stats(&self) -> Result<StoreStats> {
        let rows = sqlx::query("SELECT status, COUNT(*) AS count FROM recommendations GROUP BY status")
            .fetch_all(&self.pool)
            .await?;

        let mut stats = StoreStats::default();
        for row in rows {
            let status: String = row.get("status");
            let count: i64 = row.get("count");
            stats.total += count;
            match status.as_str() {
                "unread" => stats.unread = count,
                "confirmed" => stats.confirmed = count,
                "dismissed" => stats.dismissed = count,
                _ => {}
            }
        }
        Ok(stats)
    }

    /// Delete reviewed recommendations older than `days`. Unread rows are
    /// kept regardless of age.
    pub async fn prune_reviewed(&self, days: i64) -> Result<u64> {
        let threshold = Utc::now() - chrono::Duration::days(days);
        let result = sqlx::query(
            r#"
            DELETE FROM recommendations
            WHERE status IN ('confirmed', 'dismissed') AND reviewed_at < ?
            "#,
        )
        .bind(threshold)
        .execute(&self.pool)
        .await?;

        let deleted = result.rows_affected();
        info!(deleted, days, "pruned reviewed recommendations");
        Ok(deleted)
    }

    // ── User corpus

    pub async fn load_user_corpus(&self) -> Result<Vec<CorpusDocument>> {
        let rows = sqlx::query("SELECT title, abstract, tags, notes FROM library_documents")
            .fetch_all(&self.pool)
            .await?;

        Ok(rows
            .iter()
            .map(|row| CorpusDocument {
                title: row.get("title"),
                abstract_text: row.get("abstract"),
                tags: json_list(row.get("tags")),
                notes: json_list(row.get("notes")),
            })
            .collect())
    }

    pub async fn add_library_document(&self, doc: &CorpusDocument) -> Result<i64> {
        let row = sqlx::query(
            r#"
            INSERT INTO library_documents (title, abstract, tags, notes)
            VALUES (?, ?, ?, ?)
            RETURNING id
            "#,
        )
        .bind(&doc.title)
        .bind(&doc.abstract_text)
        .bind(serde_json::to_string(&doc.tags).unwrap_or_else(|_| "[]".to_string()))
        .bind(serde_json::to_string(&doc.notes).unwrap_or_else(|_| "[]".to_string()))
        .fetch_one(&self.pool)
        .await?;
        Ok(row.get("id"))
    }
}

fn is_busy(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db) => {
            let message = db.message().to_lowercase();
            message.contains("locked") || message.contains("busy")
        }
        _ => false,
    }
}

fn json_list(raw: Option<String>) -> Vec<String> {
    raw.and_then(|s| serde_json::from_str(&s).ok())
        .unwrap_or_default()
}

fn row_to_journal(row: &sqlx::sqlite::SqliteRow) -> TargetJournal {
    let keywords: String = row.get("keywords");
    TargetJournal {
        id: row.get("id"),
        name: row.get("name"),
        issn: row.get("issn"),
        keywords: keywords
            .split(',')
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(str::to_string)
            .collect(),
        active: row.get("active"),
        last_fetched: row.get("last_fetched"),
    }
}

fn row_to_record(row: &sqlx::sqlite::SqliteRow) -> Result<RecommendationRecord> {
    let status: String = row.get("status");
    Ok(RecommendationRecord {
        id: row.get("id"),
        doi: row.get("doi"),
        journal_id: row.get("journal_id"),
        journal_name: row.get("journal_name"),
        title: row.get("title"),
        abstract_text: row.get("abstract"),
        authors: json_list(row.get("authors")),
        year: row.get("year"),
        score: row.get("score"),
        reason: row.get("reason"),
        matched_keywords: json_list(row.get("matched_keywords")),
        status: status.parse()?,
        fetched_at: row.get::<DateTime<Utc>, _>("fetched_at"),
        reviewed_at: row.get("reviewed_at"),
    })
}
