//! Remote repository sources.
//!
//! A [`RepositorySource`] answers two questions about a hosting platform:
//! which repositories are the most starred right now, and what commit activity
//! a given repository had within a time window. Two backends are provided,
//! [`GitHubSource`] and [`GitLabSource`]; both speak HTTP through the
//! [`HttpTransport`](crate::http::HttpTransport) seam.
//!
//! # Example
//!
//! ```ignore
//! use toprepos::source::{Provider, SourceConfig, build_source};
//!
//! let source = build_source(&SourceConfig::new(Provider::GitHub))?;
//! let top = source.get_top_repositories(100).await?;
//! ```

mod client;
mod errors;
mod github;
mod gitlab;
mod pagination;
mod rate_limit;
mod types;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::activity::ActivityRecord;

pub use errors::{FetchError, Result};
pub use github::{GITHUB_API_URL, GitHubSource};
pub use gitlab::{GITLAB_API_URL, GitLabSource};
pub use pagination::{PaginationInfo, parse_link_header};
pub use rate_limit::{ApiRateLimiter, RateLimitInfo};
pub use types::{RawCommit, RepositorySnapshot};

/// Delay between consecutive commit pages.
pub const DEFAULT_PAGE_DELAY: Duration = Duration::from_millis(500);

/// Supported hosting platforms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Provider {
    #[default]
    GitHub,
    GitLab,
}

impl Provider {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::GitHub => "github",
            Self::GitLab => "gitlab",
        }
    }

    /// API root used when no base URL is configured.
    pub fn default_base_url(self) -> &'static str {
        match self {
            Self::GitHub => GITHUB_API_URL,
            Self::GitLab => GITLAB_API_URL,
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "github" => Ok(Self::GitHub),
            "gitlab" => Ok(Self::GitLab),
            other => Err(format!(
                "unknown provider {other:?} (expected \"github\" or \"gitlab\")"
            )),
        }
    }
}

/// A paginated repository-search and commit-activity API.
#[async_trait]
pub trait RepositorySource: Send + Sync {
    fn provider(&self) -> Provider;

    /// Up to `limit` repositories ordered by descending stars.
    async fn get_top_repositories(&self, limit: usize) -> Result<Vec<RepositorySnapshot>>;

    /// Per-day commit activity for commits in `[since, until]`.
    async fn get_repository_activity(
        &self,
        owner: &str,
        repo: &str,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<Vec<ActivityRecord>>;
}

/// Settings needed to construct a source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceConfig {
    pub provider: Provider,
    /// Overrides [`Provider::default_base_url`].
    pub base_url: Option<String>,
    pub token: Option<String>,
    /// Client-side request rate cap; `None` disables the limiter.
    pub requests_per_second: Option<u32>,
    pub page_delay: Duration,
}

impl SourceConfig {
    pub fn new(provider: Provider) -> Self {
        Self {
            provider,
            base_url: None,
            token: None,
            requests_per_second: None,
            page_delay: DEFAULT_PAGE_DELAY,
        }
    }

    pub fn base_url(&self) -> &str {
        self.base_url
            .as_deref()
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .unwrap_or_else(|| self.provider.default_base_url())
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self::new(Provider::default())
    }
}

/// Construct the configured backend behind a trait object.
pub fn build_source(config: &SourceConfig) -> Result<Arc<dyn RepositorySource>> {
    let limiter = config.requests_per_second.map(ApiRateLimiter::new);
    let token = config.token.as_deref();
    let base_url = config.base_url();

    tracing::debug!(provider = %config.provider, base_url, "building repository source");

    Ok(match config.provider {
        Provider::GitHub => Arc::new(GitHubSource::new(
            base_url,
            token,
            config.page_delay,
            limiter,
        )?),
        Provider::GitLab => Arc::new(GitLabSource::new(
            base_url,
            token,
            config.page_delay,
            limiter,
        )?),
    })
}
