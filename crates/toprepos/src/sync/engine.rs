//! The sync cycle.
//!
//! One cycle, strictly sequential:
//!
//! 1. fetch the top-N repositories from the source
//! 2. upsert them and recompute ranks (one transaction)
//! 3. for each repository in fetch order, resume activity from its stored
//!    watermark (or the initial window), fetch, upsert, then pause
//!
//! Steps 1 and 2 failing always abort the cycle. Step 3 failures follow the
//! configured [`ErrorPolicy`].

use std::sync::Arc;

use chrono::{DateTime, NaiveTime, Utc};
use sea_orm::DatabaseConnection;

use super::progress::{ProgressCallback, SyncProgress, emit};
use super::types::{ErrorPolicy, RepoFailure, SyncError, SyncOptions, SyncReport};
use crate::source::{RepositorySnapshot, RepositorySource};
use crate::store;

/// Drives sync cycles against one source and one database.
pub struct SyncOrchestrator {
    source: Arc<dyn RepositorySource>,
    db: DatabaseConnection,
    options: SyncOptions,
    on_progress: Option<ProgressCallback>,
}

impl SyncOrchestrator {
    pub fn new(source: Arc<dyn RepositorySource>, db: DatabaseConnection, options: SyncOptions) -> Self {
        Self {
            source,
            db,
            options,
            on_progress: None,
        }
    }

    /// Install a progress callback.
    #[must_use]
    pub fn with_progress(mut self, on_progress: ProgressCallback) -> Self {
        self.on_progress = Some(on_progress);
        self
    }

    pub fn options(&self) -> &SyncOptions {
        &self.options
    }

    /// Run one full cycle.
    ///
    /// # Errors
    /// Fetching or ranking the top repositories failing is always an error.
    /// A per-repository failure is an error under [`ErrorPolicy::Abort`] and a
    /// [`SyncReport::failures`] entry under [`ErrorPolicy::Continue`].
    #[tracing::instrument(
        skip_all,
        fields(provider = %self.source.provider(), top_n = self.options.top_n, on_error = %self.options.on_error)
    )]
    pub async fn run_cycle(&self) -> Result<SyncReport, SyncError> {
        let progress = self.on_progress.as_ref();
        let mut report = SyncReport::default();

        emit(
            progress,
            SyncProgress::FetchingTopRepositories {
                limit: self.options.top_n,
            },
        );
        let repos = self
            .source
            .get_top_repositories(self.options.top_n)
            .await
            .map_err(|e| SyncError::fetch("top repositories", e))?;
        emit(
            progress,
            SyncProgress::FetchedTopRepositories { count: repos.len() },
        );

        store::update_top_repositories(&self.db, &repos)
            .await
            .map_err(|e| SyncError::store("top repositories", e))?;
        report.ranked = repos.len();
        emit(progress, SyncProgress::RankingUpdated { count: repos.len() });
        tracing::info!(count = repos.len(), "ranking updated");

        let total = repos.len();
        for (index, repo) in repos.iter().enumerate() {
            if index > 0 && !self.options.repo_delay.is_zero() {
                tokio::time::sleep(self.options.repo_delay).await;
            }

            match self.sync_repository(repo, index + 1, total).await {
                Ok(rows) => {
                    report.activity_synced += 1;
                    report.activity_rows += rows;
                    emit(
                        progress,
                        SyncProgress::ActivitySynced {
                            owner: repo.owner.clone(),
                            repo: repo.name.clone(),
                            rows,
                        },
                    );
                }
                Err(err) => {
                    let continuing = self.options.on_error == ErrorPolicy::Continue;
                    emit(
                        progress,
                        SyncProgress::RepositoryFailed {
                            owner: repo.owner.clone(),
                            repo: repo.name.clone(),
                            error: err.to_string(),
                            continuing,
                        },
                    );

                    if !continuing {
                        return Err(err);
                    }

                    tracing::warn!(repo = %repo.full_name(), error = %err, "activity sync failed, continuing");
                    report.failures.push(RepoFailure {
                        owner: repo.owner.clone(),
                        repo: repo.name.clone(),
                        error: err.to_string(),
                    });
                }
            }
        }

        emit(
            progress,
            SyncProgress::CycleComplete {
                ranked: report.ranked,
                synced: report.activity_synced,
                failed: report.failures.len(),
            },
        );
        tracing::info!(
            ranked = report.ranked,
            synced = report.activity_synced,
            rows = report.activity_rows,
            failed = report.failures.len(),
            "sync cycle complete"
        );

        Ok(report)
    }

    #[tracing::instrument(skip(self, repo), fields(repo = %repo.full_name()))]
    async fn sync_repository(
        &self,
        repo: &RepositorySnapshot,
        index: usize,
        total: usize,
    ) -> Result<u64, SyncError> {
        let stage = || format!("activity for {}", repo.full_name());

        let watermark = store::get_last_activity_date(&self.db, &repo.owner, &repo.name)
            .await
            .map_err(|e| SyncError::store(stage(), e))?;

        emit(
            self.on_progress.as_ref(),
            SyncProgress::SyncingActivity {
                owner: repo.owner.clone(),
                repo: repo.name.clone(),
                index,
                total,
                watermark,
            },
        );

        let until = Utc::now();
        let since = resume_point(watermark, until, self.options.initial_window);
        tracing::debug!(%since, %until, ?watermark, "fetching activity");

        let records = self
            .source
            .get_repository_activity(&repo.owner, &repo.name, since, until)
            .await
            .map_err(|e| SyncError::fetch(stage(), e))?;

        store::upsert_activities(&self.db, &repo.owner, &repo.name, &records)
            .await
            .map_err(|e| SyncError::store(stage(), e))
    }
}

/// Start of the next fetch window.
///
/// The watermark day itself is fetched again from midnight UTC so a day that
/// was still in progress at the previous sync gets its full count.
fn resume_point(
    watermark: Option<chrono::NaiveDate>,
    now: DateTime<Utc>,
    initial_window: chrono::Duration,
) -> DateTime<Utc> {
    match watermark {
        Some(day) => day.and_time(NaiveTime::MIN).and_utc(),
        None => now
            .checked_sub_signed(initial_window)
            .unwrap_or(DateTime::<Utc>::MIN_UTC),
    }
}
