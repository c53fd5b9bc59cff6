//! Integration tests for the sync cycle.
//!
//! A scripted in-memory source stands in for the remote API; everything else
//! (stores, ranking SQL, migrations) is real, backed by in-memory SQLite.

#![cfg(all(feature = "sqlite", feature = "migrate"))]

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use sea_orm::DatabaseConnection;
use toprepos::activity::ActivityRecord;
use toprepos::source::{FetchError, Provider, RepositorySnapshot, RepositorySource};
use toprepos::store::{SortField, find_activity, get_last_activity_date, list_top};
use toprepos::sync::{ErrorPolicy, SyncError, SyncOptions, SyncOrchestrator, SyncProgress};
use toprepos::{PoolOptions, connect_and_migrate};

/// Upper bound for one cycle. Exceeding it means something hangs.
const SYNC_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
struct ActivityCall {
    repo: String,
    since: DateTime<Utc>,
    until: DateTime<Utc>,
}

/// Serves fixed repositories and one activity day per repository.
struct ScriptedSource {
    repos: Vec<RepositorySnapshot>,
    activity_day: NaiveDate,
    failing: HashSet<String>,
    calls: Mutex<Vec<ActivityCall>>,
}

impl ScriptedSource {
    fn new(names: &[&str], activity_day: NaiveDate) -> Self {
        let repos = names
            .iter()
            .enumerate()
            .map(|(i, name)| RepositorySnapshot {
                owner: "org".to_string(),
                name: name.to_string(),
                stars: 1_000 - i as i64,
                forks: 0,
                open_issues: 0,
                watchers: 0,
                language: None,
            })
            .collect();
        Self {
            repos,
            activity_day,
            failing: HashSet::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    fn failing_on(mut self, name: &str) -> Self {
        self.failing.insert(name.to_string());
        self
    }

    fn calls(&self) -> Vec<ActivityCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl RepositorySource for ScriptedSource {
    fn provider(&self) -> Provider {
        Provider::GitHub
    }

    async fn get_top_repositories(
        &self,
        limit: usize,
    ) -> toprepos::source::Result<Vec<RepositorySnapshot>> {
        Ok(self.repos.iter().take(limit).cloned().collect())
    }

    async fn get_repository_activity(
        &self,
        _owner: &str,
        repo: &str,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> toprepos::source::Result<Vec<ActivityRecord>> {
        self.calls.lock().unwrap().push(ActivityCall {
            repo: repo.to_string(),
            since,
            until,
        });

        if self.failing.contains(repo) {
            return Err(FetchError::Fatal {
                status: 404,
                message: "Not Found".to_string(),
            });
        }

        Ok(vec![ActivityRecord {
            date: self.activity_day,
            commits: 2,
            authors: vec!["alice".to_string(), "bob".to_string()],
        }])
    }
}

async fn setup_test_db() -> DatabaseConnection {
    connect_and_migrate("sqlite::memory:", &PoolOptions::default())
        .await
        .expect("Failed to create test database")
}

fn options(on_error: ErrorPolicy) -> SyncOptions {
    SyncOptions {
        repo_delay: Duration::ZERO,
        on_error,
        ..SyncOptions::default()
    }
}

async fn run(
    source: Arc<ScriptedSource>,
    db: &DatabaseConnection,
    on_error: ErrorPolicy,
) -> Result<toprepos::sync::SyncReport, SyncError> {
    let orchestrator = SyncOrchestrator::new(source, db.clone(), options(on_error));
    tokio::time::timeout(SYNC_TIMEOUT, orchestrator.run_cycle())
        .await
        .expect("sync cycle timed out")
}

#[tokio::test]
async fn test_first_cycle_uses_initial_window() {
    let db = setup_test_db().await;
    let today = Utc::now().date_naive();
    let source = Arc::new(ScriptedSource::new(&["a", "b"], today));

    let started = Utc::now();
    let report = run(Arc::clone(&source), &db, ErrorPolicy::Abort)
        .await
        .expect("cycle");

    assert_eq!(report.ranked, 2);
    assert_eq!(report.activity_synced, 2);
    assert_eq!(report.activity_rows, 2);
    assert!(report.is_clean());

    let calls = source.calls();
    assert_eq!(calls.len(), 2);
    for call in &calls {
        let expected = started - chrono::Duration::days(30);
        let drift = (call.since - expected).num_seconds().abs();
        assert!(drift < 60, "since {} too far from {expected}", call.since);
        assert!(call.until >= started);
    }

    let stored = find_activity(&db, "org", "a", None, None).await.expect("find");
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].commits, 2);
}

#[tokio::test]
async fn test_second_cycle_resumes_from_watermark() {
    let db = setup_test_db().await;
    let day = NaiveDate::from_ymd_opt(2024, 5, 20).expect("valid date");
    let source = Arc::new(ScriptedSource::new(&["a"], day));

    run(Arc::clone(&source), &db, ErrorPolicy::Abort)
        .await
        .expect("first cycle");
    assert_eq!(
        get_last_activity_date(&db, "org", "a").await.expect("watermark"),
        Some(day)
    );

    run(Arc::clone(&source), &db, ErrorPolicy::Abort)
        .await
        .expect("second cycle");

    let calls = source.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[1].since, day.and_time(NaiveTime::MIN).and_utc());

    let rows = list_top(&db, SortField::Stars, 100).await.expect("list");
    assert_eq!(rows[0].position_prev, 1);
    assert_eq!(rows[0].position_cur, 1);
}

#[tokio::test]
async fn test_abort_stops_at_first_failure() {
    let db = setup_test_db().await;
    let today = Utc::now().date_naive();
    let source = Arc::new(ScriptedSource::new(&["a", "b", "c"], today).failing_on("b"));

    let err = run(Arc::clone(&source), &db, ErrorPolicy::Abort)
        .await
        .expect_err("cycle should abort");
    assert!(matches!(err, SyncError::Fetch { .. }));
    assert!(!err.is_retryable());

    let visited: Vec<String> = source.calls().into_iter().map(|c| c.repo).collect();
    assert_eq!(visited, vec!["a".to_string(), "b".to_string()]);

    // Ranking and the repository before the failure are already committed.
    assert_eq!(list_top(&db, SortField::Stars, 100).await.expect("list").len(), 3);
    assert!(get_last_activity_date(&db, "org", "a").await.expect("a").is_some());
    assert!(get_last_activity_date(&db, "org", "c").await.expect("c").is_none());
}

#[tokio::test]
async fn test_continue_records_failure_and_proceeds() {
    let db = setup_test_db().await;
    let today = Utc::now().date_naive();
    let source = Arc::new(ScriptedSource::new(&["a", "b", "c"], today).failing_on("b"));

    let report = run(Arc::clone(&source), &db, ErrorPolicy::Continue)
        .await
        .expect("cycle continues past failures");

    assert_eq!(report.activity_synced, 2);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].repo, "b");
    assert!(report.failures[0].error.contains("404"));
    assert!(get_last_activity_date(&db, "org", "c").await.expect("c").is_some());
}

#[tokio::test]
async fn test_progress_events_cover_every_repository() {
    let db = setup_test_db().await;
    let today = Utc::now().date_naive();
    let source = Arc::new(ScriptedSource::new(&["a", "b"], today));

    let synced = Arc::new(AtomicUsize::new(0));
    let completed = Arc::new(AtomicUsize::new(0));
    let synced_cb = Arc::clone(&synced);
    let completed_cb = Arc::clone(&completed);

    let orchestrator = SyncOrchestrator::new(source, db.clone(), options(ErrorPolicy::Abort))
        .with_progress(Box::new(move |event| match event {
            SyncProgress::ActivitySynced { .. } => {
                synced_cb.fetch_add(1, Ordering::SeqCst);
            }
            SyncProgress::CycleComplete { .. } => {
                completed_cb.fetch_add(1, Ordering::SeqCst);
            }
            _ => {}
        }));

    tokio::time::timeout(SYNC_TIMEOUT, orchestrator.run_cycle())
        .await
        .expect("sync cycle timed out")
        .expect("cycle");

    assert_eq!(synced.load(Ordering::SeqCst), 2);
    assert_eq!(completed.load(Ordering::SeqCst), 1);
}
