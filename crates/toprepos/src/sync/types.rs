//! Options, outcomes and errors of a sync cycle.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use crate::source::FetchError;
use crate::store::StoreError;

/// Number of repositories fetched and ranked per cycle.
pub const DEFAULT_TOP_N: usize = 100;

/// Look-back window for repositories with no stored activity.
pub const DEFAULT_INITIAL_WINDOW_DAYS: i64 = 30;

/// Pause between consecutive repositories' activity fetches.
pub const DEFAULT_REPO_DELAY: Duration = Duration::from_secs(1);

/// What a cycle does when one repository's activity sync fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorPolicy {
    /// Stop the cycle at the first failing repository.
    #[default]
    Abort,
    /// Record the failure in the report and move on.
    Continue,
}

impl ErrorPolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Abort => "abort",
            Self::Continue => "continue",
        }
    }
}

impl fmt::Display for ErrorPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ErrorPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "abort" => Ok(Self::Abort),
            "continue" => Ok(Self::Continue),
            other => Err(format!(
                "unknown error policy {other:?} (expected \"abort\" or \"continue\")"
            )),
        }
    }
}

/// Options for one sync cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncOptions {
    /// How many top repositories to fetch.
    pub top_n: usize,
    /// First-sync look-back for repositories without a watermark.
    pub initial_window: chrono::Duration,
    pub repo_delay: Duration,
    pub on_error: ErrorPolicy,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            top_n: DEFAULT_TOP_N,
            initial_window: chrono::Duration::days(DEFAULT_INITIAL_WINDOW_DAYS),
            repo_delay: DEFAULT_REPO_DELAY,
            on_error: ErrorPolicy::default(),
        }
    }
}

/// A repository whose activity could not be synced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoFailure {
    pub owner: String,
    pub repo: String,
    pub error: String,
}

/// Outcome of a completed cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Repositories fetched and written to the ranking table.
    pub ranked: usize,
    /// Repositories whose activity was fetched and stored.
    pub activity_synced: usize,
    /// Activity rows inserted or overwritten.
    pub activity_rows: u64,
    /// Per-repository failures recorded under [`ErrorPolicy::Continue`].
    pub failures: Vec<RepoFailure>,
}

impl SyncReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// A failed cycle. Re-running the job is the retry mechanism.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("fetching {stage} failed: {source}")]
    Fetch {
        stage: String,
        #[source]
        source: FetchError,
    },

    #[error("storing {stage} failed: {source}")]
    Store {
        stage: String,
        #[source]
        source: StoreError,
    },
}

impl SyncError {
    pub(crate) fn fetch(stage: impl Into<String>, source: FetchError) -> Self {
        Self::Fetch {
            stage: stage.into(),
            source,
        }
    }

    pub(crate) fn store(stage: impl Into<String>, source: StoreError) -> Self {
        Self::Store {
            stage: stage.into(),
            source,
        }
    }

    /// Whether a later cycle could plausibly succeed without intervention.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Fetch { source, .. } => source.is_retryable(),
            Self::Store { .. } => false,
        }
    }
}
