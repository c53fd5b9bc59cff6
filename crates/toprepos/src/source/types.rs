use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Popularity metrics for one repository, as reported by a remote source.
///
/// Rank fields are not part of the remote view; they are computed by the
/// ranking store once snapshots are persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositorySnapshot {
    /// Repository owner (user, organization or namespace path).
    pub owner: String,
    /// Repository name.
    pub name: String,
    pub stars: i64,
    pub forks: i64,
    pub open_issues: i64,
    /// Watcher count. Stored and exposed, never used for ranking.
    pub watchers: i64,
    /// Primary language, when the provider reports one.
    pub language: Option<String>,
}

impl RepositorySnapshot {
    /// `owner/name`.
    #[inline]
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }
}

/// A single commit after decoding, reduced to what activity tracking needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawCommit {
    pub author: String,
    pub committed_at: DateTime<Utc>,
}

impl RawCommit {
    pub fn new(author: impl Into<String>, committed_at: DateTime<Utc>) -> Self {
        Self {
            author: author.into(),
            committed_at,
        }
    }
}
