//! Progress events emitted while a cycle runs.
//!
//! The library never renders progress itself; callers install a callback and
//! decide how to surface events (the CLI turns them into log lines).

/// Progress events emitted during a sync cycle.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub enum SyncProgress {
    /// Requesting the top repositories from the source.
    FetchingTopRepositories {
        /// Requested count.
        limit: usize,
    },

    /// Top repositories received.
    FetchedTopRepositories {
        count: usize,
    },

    /// Snapshots upserted and ranks recomputed.
    RankingUpdated {
        count: usize,
    },

    /// Starting one repository's activity sync.
    SyncingActivity {
        owner: String,
        repo: String,
        /// 1-based position in this cycle.
        index: usize,
        total: usize,
        /// Stored watermark the fetch resumes from, if any.
        watermark: Option<chrono::NaiveDate>,
    },

    /// Activity for one repository stored.
    ActivitySynced {
        owner: String,
        repo: String,
        rows: u64,
    },

    /// Activity sync failed for one repository.
    RepositoryFailed {
        owner: String,
        repo: String,
        error: String,
        /// True when the cycle continues with the next repository.
        continuing: bool,
    },

    /// Cycle finished.
    CycleComplete {
        ranked: usize,
        synced: usize,
        failed: usize,
    },
}

/// Callback for progress updates during a cycle.
pub type ProgressCallback = Box<dyn Fn(SyncProgress) + Send + Sync>;

/// Emit a progress event if a callback is provided.
#[inline]
pub fn emit(on_progress: Option<&ProgressCallback>, event: SyncProgress) {
    if let Some(cb) = on_progress {
        cb(event);
    }
}
