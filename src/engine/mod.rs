// src/engine/mod.rs
// The scan-cycle orchestrator: fetch -> exclude -> match -> score -> upsert
// per active journal, with per-journal isolation. One journal failing
// (timeout, API error, bad payload) never aborts the cycle; only losing the
// store does.

use std::sync::Arc;

use futures::stream::{self, StreamExt};
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::error::{EngineError, Result};
use crate::fetch::ArticleSource;
use crate::keywords::KeywordSet;
use crate::matcher::{ExclusionFilter, Matcher};
use crate::scorer::ScoringProfile;
use crate::store::types::{
    ListFilter, NewRecommendation, RecommendationRecord, Status, TargetJournal, UpsertOutcome,
};
use crate::store::RecommendationStore;

/// Per-journal progress callback: (journal name, candidates fetched,
/// candidates matched).
pub type ProgressFn = dyn Fn(&str, usize, usize) + Send + Sync;

#[derive(Debug, Clone, Default)]
pub struct RefreshOptions {
    /// Scan a single journal by name instead of every active one.
    pub journal: Option<String>,
    /// Day range for the recent-articles window; engine default when None.
    pub days: Option<i64>,
    /// Freshness window override in hours.
    pub window_hours: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct JournalOutcome {
    pub journal: String,
    pub fetched: usize,
    pub excluded: usize,
    pub matched: usize,
    pub inserted: usize,
    pub refreshed: usize,
    pub conflicts: usize,
    /// True when the freshness window allowed skipping the API call.
    pub skipped_fresh: bool,
    pub error: Option<String>,
}

impl JournalOutcome {
    fn empty(journal: &str) -> Self {
        Self {
            journal: journal.to_string(),
            fetched: 0,
            excluded: 0,
            matched: 0,
            inserted: 0,
            refreshed: 0,
            conflicts: 0,
            skipped_fresh: false,
            error: None,
        }
    }

    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

/// What one scan cycle did, journal by journal. Previously cached
/// recommendations stay intact and readable no matter what is in here.
#[derive(Debug, Clone, Default)]
pub struct RefreshReport {
    pub journals: Vec<JournalOutcome>,
}

impl RefreshReport {
    pub fn succeeded(&self) -> usize {
        self.journals.iter().filter(|j| j.succeeded()).count()
    }

    pub fn failed(&self) -> usize {
        self.journals.len() - self.succeeded()
    }

    pub fn total_fetched(&self) -> usize {
        self.journals.iter().map(|j| j.fetched).sum()
    }

    pub fn total_matched(&self) -> usize {
        self.journals.iter().map(|j| j.matched).sum()
    }

    pub fn total_inserted(&self) -> usize {
        self.journals.iter().map(|j| j.inserted).sum()
    }

    pub fn total_refreshed(&self) -> usize {
        self.journals.iter().map(|j| j.refreshed).sum()
    }
}

pub struct RecommendationEngine {
    store: RecommendationStore,
    source: Arc<dyn ArticleSource>,
    keywords: Arc<KeywordSet>,
    config: Config,
}

impl RecommendationEngine {
    pub fn new(
        store: RecommendationStore,
        source: Arc<dyn ArticleSource>,
        keywords: Arc<KeywordSet>,
        config: Config,
    ) -> Self {
        Self {
            store,
            source,
            keywords,
            config,
        }
    }

    /// Run one scan cycle. Journals scan concurrently (bounded); the
    /// keyword set and scoring profile are snapshotted once per cycle and
    /// passed in explicitly, so a configuration reload can never race a
    /// running scan.
    pub async fn refresh(
        &self,
        options: &RefreshOptions,
        progress: Option<&ProgressFn>,
    ) -> Result<RefreshReport> {
        let journals = self.select_journals(options).await?;
        if journals.is_empty() {
            warn!("no active target journals, nothing to scan");
            return Ok(RefreshReport::default());
        }

        let corpus = self.store.load_user_corpus().await?;
        let profile = ScoringProfile::from_corpus(&corpus);
        let days = options.days.unwrap_or(self.config.fetch_days);
        let window = options
            .window_hours
            .map(chrono::Duration::hours)
            .unwrap_or_else(|| self.config.cache_window());

        info!(
            journals = journals.len(),
            days,
            window_hours = window.num_hours(),
            "starting scan cycle"
        );

        let mut report = RefreshReport::default();
        let mut scans = stream::iter(
            journals
                .iter()
                .map(|journal| self.scan_journal(journal, days, window, &profile, progress)),
        )
        .buffered(self.config.max_concurrent_fetches.max(1));

        while let Some(result) = scans.next().await {
            // Per-journal failures come back inside the outcome; an Err
            // here means the store itself is gone, which aborts the cycle.
            report.journals.push(result?);
        }
        drop(scans);

        info!(
            succeeded = report.succeeded(),
            failed = report.failed(),
            fetched = report.total_fetched(),
            matched = report.total_matched(),
            inserted = report.total_inserted(),
            "scan cycle complete"
        );
        Ok(report)
    }

    async fn select_journals(&self, options: &RefreshOptions) -> Result<Vec<TargetJournal>> {
        match &options.journal {
            Some(name) => {
                let journal = self
                    .store
                    .find_journal(name)
                    .await?
                    .ok_or_else(|| EngineError::NotFound(name.clone()))?;
                Ok(vec![journal])
            }
            None => self.store.list_journals(true).await,
        }
    }

    async fn scan_journal(
        &self,
        journal: &TargetJournal,
        days: i64,
        window: chrono::Duration,
        profile: &ScoringProfile,
        progress: Option<&ProgressFn>,
    ) -> Result<JournalOutcome> {
        let mut outcome = JournalOutcome::empty(&journal.name);

        if self.store.lookup_fresh(journal, window).await?.is_some() {
            info!(journal = %journal.name, "cache still fresh, skipping fetch");
            outcome.skipped_fresh = true;
            if let Some(progress) = progress {
                progress(&journal.name, 0, 0);
            }
            return Ok(outcome);
        }

        let fetched = match tokio::time::timeout(
            self.config.fetch_timeout(),
            self.source.fetch_recent(journal, days),
        )
        .await
        {
            Ok(Ok(candidates)) => candidates,
            Ok(Err(source)) => {
                // last_fetched stays untouched so the next cycle retries.
                let err = EngineError::Fetch {
                    journal: journal.name.clone(),
                    source,
                };
                error!(error = %err, "fetch failed");
                outcome.error = Some(err.to_string());
                if let Some(progress) = progress {
                    progress(&journal.name, 0, 0);
                }
                return Ok(outcome);
            }
            Err(_) => {
                error!(journal = %journal.name, "fetch timed out");
                outcome.error = Some("fetch timed out".to_string());
                if let Some(progress) = progress {
                    progress(&journal.name, 0, 0);
                }
                return Ok(outcome);
            }
        };
        outcome.fetched = fetched.len();

        let exclusion =
            ExclusionFilter::from_keyword_set(&self.keywords, self.config.exclusion_filter_enabled);
        let matcher = Matcher::new(&self.keywords);

        for candidate in fetched {
            if candidate.doi.is_empty() {
                // No dedup key, nothing durable to write.
                continue;
            }
            if exclusion.should_exclude(&candidate) {
                outcome.excluded += 1;
                continue;
            }
            let match_result = matcher.match_article(&candidate, &journal.keywords);
            if !match_result.pass {
                continue;
            }
            outcome.matched += 1;
            debug!(
                doi = %candidate.doi,
                matched = %match_result.describe(5),
                "candidate matched"
            );

            let (score, reason) = profile.score(&candidate);
            let new = NewRecommendation {
                doi: candidate.doi.clone(),
                journal_id: journal.id,
                title: candidate.title.clone(),
                abstract_text: candidate.abstract_text.clone(),
                authors: candidate.authors.clone(),
                year: candidate.year,
                score,
                reason,
                matched_keywords: match_result.matched_canonicals(),
            };

            match self.store.upsert(&new).await {
                Ok(UpsertOutcome::Inserted) => outcome.inserted += 1,
                Ok(UpsertOutcome::Refreshed) => outcome.refreshed += 1,
                Err(EngineError::StoreConflict(doi)) => {
                    // Cycle-level warning; this candidate alone is skipped.
                    warn!(doi = %doi, "upsert conflict survived retry");
                    outcome.conflicts += 1;
                }
                Err(err) if err.is_fatal() => return Err(err),
                Err(err) => {
                    warn!(doi = %new.doi, error = %err, "candidate skipped");
                }
            }
        }

        self.store.touch_journal(journal.id).await?;
        if let Some(progress) = progress {
            progress(&journal.name, outcome.fetched, outcome.matched);
        }
        info!(
            journal = %journal.name,
            fetched = outcome.fetched,
            excluded = outcome.excluded,
            matched = outcome.matched,
            inserted = outcome.inserted,
            refreshed = outcome.refreshed,
            "journal scan complete"
        );
        Ok(outcome)
    }

    // ── Read surface, delegated to the store

    pub async fn list(&self, filter: &ListFilter) -> Result<Vec<RecommendationRecord>> {
        self.store.list(filter).await
    }

    pub async fn set_status(&self, doi: &str, status: Status) -> Result<()> {
        self.store.set_status(doi, status).await
    }

    pub fn store(&self) -> &RecommendationStore {
        &self.store
    }
}
