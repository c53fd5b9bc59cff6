use toprepos::sync::SyncProgress;

/// Logging reporter using tracing for structured output.
pub struct LoggingReporter;

impl LoggingReporter {
    pub fn new() -> Self {
        Self
    }

    pub fn handle(&self, event: SyncProgress) {
        match event {
            SyncProgress::FetchingTopRepositories { limit } => {
                tracing::info!(limit, "Fetching top repositories");
            }

            SyncProgress::FetchedTopRepositories { count } => {
                tracing::debug!(count, "Fetched top repositories");
            }

            SyncProgress::RankingUpdated { count } => {
                tracing::info!(count, "Ranking updated");
            }

            SyncProgress::SyncingActivity {
                owner,
                repo,
                index,
                total,
                watermark,
            } => {
                tracing::debug!(
                    repo = %format!("{}/{}", owner, repo),
                    index,
                    total,
                    watermark = ?watermark,
                    "Syncing activity"
                );
            }

            SyncProgress::ActivitySynced { owner, repo, rows } => {
                tracing::info!(repo = %format!("{}/{}", owner, repo), rows, "Activity synced");
            }

            SyncProgress::RepositoryFailed {
                owner,
                repo,
                error,
                continuing,
            } => {
                if continuing {
                    tracing::warn!(repo = %format!("{}/{}", owner, repo), error = %error, "Activity sync failed");
                } else {
                    tracing::error!(repo = %format!("{}/{}", owner, repo), error = %error, "Activity sync failed, aborting cycle");
                }
            }

            SyncProgress::CycleComplete {
                ranked,
                synced,
                failed,
            } => {
                tracing::info!(ranked, synced, failed, "Sync complete");
            }

            _ => {}
        }
    }
}

impl Default for LoggingReporter {
    fn default() -> Self {
        Self::new()
    }
}
