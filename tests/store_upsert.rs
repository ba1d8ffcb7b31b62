// tests/store_upsert.rs
// Cache/dedup store invariants: one row per DOI, sticky status, monotone
// scoring, freshness window.

use paperscout::store::types::{
    CorpusDocument, ListFilter, NewRecommendation, SortOrder, Status, UpsertOutcome,
};
use paperscout::store::RecommendationStore;
use paperscout::EngineError;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};

/// In-memory store with one target journal; returns (store, journal_id).
async fn setup_store() -> (RecommendationStore, i64) {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("failed to create in-memory SQLite pool");

    let store = RecommendationStore::new(pool);
    store.init_schema().await.unwrap();

    let journal_id = store
        .add_journal(
            "Applied Energy",
            Some("0306-2619"),
            &["co2 capture".to_string(), "hydrogen".to_string()],
        )
        .await
        .unwrap();
    (store, journal_id)
}

fn recommendation(journal_id: i64, doi: &str, score: f64) -> NewRecommendation {
    NewRecommendation {
        doi: doi.to_string(),
        journal_id,
        title: "Novel carbon dioxide capture process".to_string(),
        abstract_text: Some("Pilot-scale absorption study.".to_string()),
        authors: vec!["Ada Lovelace".to_string()],
        year: Some(2025),
        score,
        reason: format!("profile similarity {score:.2}"),
        matched_keywords: vec!["co2 capture".to_string()],
    }
}

#[tokio::test]
async fn first_upsert_inserts_unread() {
    let (store, journal_id) = setup_store().await;

    let outcome = store
        .upsert(&recommendation(journal_id, "10.1000/x", 0.4))
        .await
        .unwrap();

    assert_eq!(outcome, UpsertOutcome::Inserted);
    let record = store.get_by_doi("10.1000/x").await.unwrap().unwrap();
    assert_eq!(record.status, Status::Unread);
    assert_eq!(record.journal_name, "Applied Energy");
    assert!(record.reviewed_at.is_none());
}

#[tokio::test]
async fn repeated_upsert_keeps_one_row_and_advances_freshness() {
    let (store, journal_id) = setup_store().await;

    store
        .upsert(&recommendation(journal_id, "10.1000/x", 0.4))
        .await
        .unwrap();
    let before = store.get_by_doi("10.1000/x").await.unwrap().unwrap();

    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    let outcome = store
        .upsert(&recommendation(journal_id, "10.1000/x", 0.4))
        .await
        .unwrap();

    assert_eq!(outcome, UpsertOutcome::Refreshed);
    let records = store.list(&ListFilter::default()).await.unwrap();
    assert_eq!(records.len(), 1);
    let after = &records[0];
    assert!(after.fetched_at > before.fetched_at);
    assert_eq!(after.score, before.score);
    assert_eq!(after.status, Status::Unread);
}

#[tokio::test]
async fn higher_score_wins_lower_score_is_ignored() {
    let (store, journal_id) = setup_store().await;

    store
        .upsert(&recommendation(journal_id, "10.1000/x", 0.4))
        .await
        .unwrap();
    store
        .upsert(&recommendation(journal_id, "10.1000/x", 0.7))
        .await
        .unwrap();

    let record = store.get_by_doi("10.1000/x").await.unwrap().unwrap();
    assert_eq!(record.score, 0.7);
    assert_eq!(record.reason, "profile similarity 0.70");

    // A later, lower score never regresses the row.
    store
        .upsert(&recommendation(journal_id, "10.1000/x", 0.5))
        .await
        .unwrap();
    let record = store.get_by_doi("10.1000/x").await.unwrap().unwrap();
    assert_eq!(record.score, 0.7);

    let records = store.list(&ListFilter::default()).await.unwrap();
    assert_eq!(records.len(), 1);
}

#[tokio::test]
async fn human_set_status_survives_reingestion() {
    let (store, journal_id) = setup_store().await;

    store
        .upsert(&recommendation(journal_id, "10.1000/x", 0.4))
        .await
        .unwrap();
    store
        .set_status("10.1000/x", Status::Confirmed)
        .await
        .unwrap();

    // Re-ingestion with a better score refreshes scoring, never status.
    store
        .upsert(&recommendation(journal_id, "10.1000/x", 0.9))
        .await
        .unwrap();

    let record = store.get_by_doi("10.1000/x").await.unwrap().unwrap();
    assert_eq!(record.status, Status::Confirmed);
    assert_eq!(record.score, 0.9);
    assert!(record.reviewed_at.is_some());
}

#[tokio::test]
async fn set_status_is_idempotent_but_fails_on_unknown_doi() {
    let (store, journal_id) = setup_store().await;
    store
        .upsert(&recommendation(journal_id, "10.1000/x", 0.4))
        .await
        .unwrap();

    store
        .set_status("10.1000/x", Status::Dismissed)
        .await
        .unwrap();
    // Unchanged status still succeeds.
    store
        .set_status("10.1000/x", Status::Dismissed)
        .await
        .unwrap();

    let err = store
        .set_status("10.1000/does-not-exist", Status::Confirmed)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::NotFound(_)));
}

#[tokio::test]
async fn lookup_fresh_requires_a_recent_scan() {
    let (store, journal_id) = setup_store().await;
    let window = chrono::Duration::hours(24);

    let journal = store.get_journal(journal_id).await.unwrap().unwrap();
    assert!(store.lookup_fresh(&journal, window).await.unwrap().is_none());

    store
        .upsert(&recommendation(journal_id, "10.1000/x", 0.4))
        .await
        .unwrap();
    store.touch_journal(journal_id).await.unwrap();

    let journal = store.get_journal(journal_id).await.unwrap().unwrap();
    let cached = store.lookup_fresh(&journal, window).await.unwrap();
    assert_eq!(cached.unwrap().len(), 1);

    // A zero-width window is always stale.
    let journal = store.get_journal(journal_id).await.unwrap().unwrap();
    assert!(store
        .lookup_fresh(&journal, chrono::Duration::zero())
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn list_filters_and_sorts() {
    let (store, journal_id) = setup_store().await;

    let mut low = recommendation(journal_id, "10.1000/low", 0.1);
    low.matched_keywords = vec!["hydrogen".to_string()];
    store.upsert(&low).await.unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    store
        .upsert(&recommendation(journal_id, "10.1000/high", 0.8))
        .await
        .unwrap();
    store
        .set_status("10.1000/high", Status::Confirmed)
        .await
        .unwrap();

    let newest = store.list(&ListFilter::default()).await.unwrap();
    assert_eq!(newest[0].doi, "10.1000/high");

    let oldest = store
        .list(&ListFilter {
            sort: SortOrder::Oldest,
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(oldest[0].doi, "10.1000/low");

    let confident = store
        .list(&ListFilter {
            min_score: Some(0.2),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(confident.len(), 1);
    assert_eq!(confident[0].doi, "10.1000/high");

    let by_keyword = store
        .list(&ListFilter {
            keyword: Some("hydrogen".to_string()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(by_keyword.len(), 1);
    assert_eq!(by_keyword[0].doi, "10.1000/low");

    let confirmed = store
        .list(&ListFilter {
            status: Some(Status::Confirmed),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(confirmed.len(), 1);
}

#[tokio::test]
async fn prune_removes_old_reviewed_rows_only() {
    let (store, journal_id) = setup_store().await;

    store
        .upsert(&recommendation(journal_id, "10.1000/reviewed", 0.5))
        .await
        .unwrap();
    store
        .upsert(&recommendation(journal_id, "10.1000/unread", 0.5))
        .await
        .unwrap();
    store
        .set_status("10.1000/reviewed", Status::Dismissed)
        .await
        .unwrap();

    // reviewed_at is just now, so a 90-day threshold removes nothing.
    assert_eq!(store.prune_reviewed(90).await.unwrap(), 0);
    // A negative age pushes the threshold into the future: the dismissed
    // row is older than it and goes; the unread row stays regardless.
    assert_eq!(store.prune_reviewed(-1).await.unwrap(), 1);

    let remaining = store.list(&ListFilter::default()).await.unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].doi, "10.1000/unread");
}

#[tokio::test]
async fn stats_counts_by_status() {
    let (store, journal_id) = setup_store().await;
    store
        .upsert(&recommendation(journal_id, "10.1000/a", 0.5))
        .await
        .unwrap();
    store
        .upsert(&recommendation(journal_id, "10.1000/b", 0.5))
        .await
        .unwrap();
    store.set_status("10.1000/b", Status::Confirmed).await.unwrap();

    let stats = store.stats().await.unwrap();
    assert_eq!(stats.total, 2);
    assert_eq!(stats.unread, 1);
    assert_eq!(stats.confirmed, 1);
    assert_eq!(stats.dismissed, 0);
}

#[tokio::test]
async fn corpus_round_trips_through_the_library_table() {
    let (store, _) = setup_store().await;
    store
        .add_library_document(&CorpusDocument {
            title: "Calcium looping pilot".to_string(),
            abstract_text: Some("CaO carbonation kinetics.".to_string()),
            tags: vec!["calcium looping".to_string()],
            notes: vec!["relevant to WP2".to_string()],
        })
        .await
        .unwrap();

    let corpus = store.load_user_corpus().await.unwrap();
    assert_eq!(corpus.len(), 1);
    assert_eq!(corpus[0].tags, vec!["calcium looping"]);
    assert_eq!(corpus[0].notes, vec!["relevant to WP2"]);
}

#[tokio::test]
async fn recent_scan_with_no_matches_is_still_fresh() {
    let (store, journal_id) = setup_store().await;

    // A scan that matched nothing still stamps the journal; knowing there
    // is nothing new counts as a cache hit.
    store.touch_journal(journal_id).await.unwrap();

    let journal = store.get_journal(journal_id).await.unwrap().unwrap();
    let cached = store
        .lookup_fresh(&journal, chrono::Duration::hours(24))
        .await
        .unwrap();
    assert_eq!(cached.unwrap().len(), 0);
}

#[tokio::test]
async fn remove_deletes_one_row_and_fails_on_unknown_doi() {
    let (store, journal_id) = setup_store().await;
    store
        .upsert(&recommendation(journal_id, "10.1000/x", 0.4))
        .await
        .unwrap();
    store
        .upsert(&recommendation(journal_id, "10.1000/y", 0.4))
        .await
        .unwrap();

    store.remove_recommendation("10.1000/x").await.unwrap();

    assert!(store.get_by_doi("10.1000/x").await.unwrap().is_none());
    assert_eq!(store.list(&ListFilter::default()).await.unwrap().len(), 1);

    let err = store.remove_recommendation("10.1000/x").await.unwrap_err();
    assert!(matches!(err, EngineError::NotFound(_)));
}

#[tokio::test]
async fn closed_store_is_fatal_not_a_conflict() {
    let (store, journal_id) = setup_store().await;
    store.pool().close().await;

    let err = store
        .upsert(&recommendation(journal_id, "10.1000/x", 0.4))
        .await
        .unwrap_err();
    assert!(err.is_fatal());
    assert!(!matches!(err, EngineError::StoreConflict(_)));
}

#[tokio::test]
async fn contended_upsert_surfaces_a_conflict_not_a_fatal_error() {
    let dir = tempfile::tempdir().unwrap();
    let options = SqliteConnectOptions::new()
        .filename(dir.path().join("contention.db"))
        .create_if_missing(true)
        .busy_timeout(std::time::Duration::from_millis(50));

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options.clone())
        .await
        .unwrap();
    let store = RecommendationStore::new(pool);
    store.init_schema().await.unwrap();
    let journal_id = store
        .add_journal("Applied Energy", None, &["co2 capture".to_string()])
        .await
        .unwrap();

    // A second connection holds the write lock across the whole attempt,
    // so both the first try and the retry come back busy.
    let blocker = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await
        .unwrap();
    let mut tx = blocker.begin().await.unwrap();
    sqlx::query("INSERT INTO library_documents (title) VALUES ('lock holder')")
        .execute(&mut *tx)
        .await
        .unwrap();

    let err = store
        .upsert(&recommendation(journal_id, "10.1000/x", 0.4))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::StoreConflict(_)));
    assert!(!err.is_fatal());

    // Once the lock is gone the same upsert goes through.
    tx.rollback().await.unwrap();
    let outcome = store
        .upsert(&recommendation(journal_id, "10.1000/x", 0.4))
        .await
        .unwrap();
    assert_eq!(outcome, UpsertOutcome::Inserted);
}
