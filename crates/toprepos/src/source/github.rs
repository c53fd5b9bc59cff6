//! GitHub REST backend.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Deserialize;

use crate::activity::{ActivityRecord, aggregate_commits};
use crate::http::{DEFAULT_REQUEST_TIMEOUT, HttpTransport, ReqwestTransport};

use super::client::ApiClient;
use super::errors::{FetchError, Result};
use super::pagination::{MAX_PAGE_SIZE, Page, PaginationInfo, fetch_all_pages, fetch_up_to};
use super::rate_limit::ApiRateLimiter;
use super::types::{RawCommit, RepositorySnapshot};
use super::{Provider, RepositorySource};

/// Public GitHub API root.
pub const GITHUB_API_URL: &str = "https://api.github.com";

const API_VERSION: &str = "2022-11-28";

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<GitHubRepo>,
}

#[derive(Debug, Deserialize)]
struct GitHubRepo {
    name: String,
    owner: GitHubOwner,
    stargazers_count: i64,
    forks_count: i64,
    open_issues_count: i64,
    #[serde(default)]
    watchers_count: i64,
    language: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GitHubOwner {
    login: String,
}

#[derive(Debug, Deserialize)]
struct GitHubCommit {
    commit: CommitDetail,
}

#[derive(Debug, Deserialize)]
struct CommitDetail {
    author: Option<Signature>,
    committer: Option<Signature>,
}

#[derive(Debug, Deserialize)]
struct Signature {
    name: Option<String>,
    date: Option<DateTime<Utc>>,
}

impl From<GitHubRepo> for RepositorySnapshot {
    fn from(repo: GitHubRepo) -> Self {
        Self {
            owner: repo.owner.login,
            name: repo.name,
            stars: repo.stargazers_count,
            forks: repo.forks_count,
            open_issues: repo.open_issues_count,
            watchers: repo.watchers_count,
            language: repo.language,
        }
    }
}

impl GitHubCommit {
    /// Author name and author date, falling back to the committer for either.
    fn into_raw(self) -> Option<RawCommit> {
        let CommitDetail { author, committer } = self.commit;
        let (author_name, author_date) = author.map(|s| (s.name, s.date)).unwrap_or_default();
        let (committer_name, committer_date) =
            committer.map(|s| (s.name, s.date)).unwrap_or_default();

        let name = author_name.or(committer_name)?;
        let date = author_date.or(committer_date)?;
        Some(RawCommit::new(name, date))
    }
}

/// [`RepositorySource`] backed by the GitHub search and commits endpoints.
#[derive(Clone)]
pub struct GitHubSource {
    api: ApiClient,
    page_delay: Duration,
}

impl GitHubSource {
    pub fn new(
        base_url: &str,
        token: Option<&str>,
        page_delay: Duration,
        rate_limiter: Option<ApiRateLimiter>,
    ) -> Result<Self> {
        let transport = ReqwestTransport::with_timeout(DEFAULT_REQUEST_TIMEOUT)
            .map_err(|e| FetchError::Config(e.to_string()))?;
        Self::with_transport(
            Arc::new(transport),
            base_url,
            token,
            page_delay,
            rate_limiter,
        )
    }

    pub fn with_transport(
        transport: Arc<dyn HttpTransport>,
        base_url: &str,
        token: Option<&str>,
        page_delay: Duration,
        rate_limiter: Option<ApiRateLimiter>,
    ) -> Result<Self> {
        let headers = vec![
            (
                "Accept".to_string(),
                "application/vnd.github+json".to_string(),
            ),
            ("X-GitHub-Api-Version".to_string(), API_VERSION.to_string()),
        ];
        let api = ApiClient::new(transport, base_url, headers, token, rate_limiter)?;
        Ok(Self { api, page_delay })
    }

    async fn search_page(&self, page: u32, per_page: usize) -> Result<Vec<RepositorySnapshot>> {
        let url = self.api.endpoint(
            &["search", "repositories"],
            &[
                ("q", "stars:>0".to_string()),
                ("sort", "stars".to_string()),
                ("order", "desc".to_string()),
                ("per_page", per_page.to_string()),
                ("page", page.to_string()),
            ],
        )?;
        let (body, _): (SearchResponse, _) = self.api.get_json(&url).await?;
        Ok(body.items.into_iter().map(RepositorySnapshot::from).collect())
    }

    async fn commits_page(
        &self,
        owner: &str,
        repo: &str,
        since: &str,
        until: &str,
        page: u32,
    ) -> Result<Page<RawCommit>> {
        let url = self.api.endpoint(
            &["repos", owner, repo, "commits"],
            &[
                ("since", since.to_string()),
                ("until", until.to_string()),
                ("per_page", MAX_PAGE_SIZE.to_string()),
                ("page", page.to_string()),
            ],
        )?;
        let (commits, headers): (Vec<GitHubCommit>, _) = self.api.get_json(&url).await?;

        let total = commits.len();
        let items: Vec<RawCommit> = commits.into_iter().filter_map(GitHubCommit::into_raw).collect();
        if items.len() < total {
            tracing::debug!(
                owner,
                repo,
                skipped = total - items.len(),
                "skipped commits without author name or date"
            );
        }

        Ok(Page {
            items,
            pagination: PaginationInfo::from_headers(&headers),
        })
    }
}

#[async_trait]
impl RepositorySource for GitHubSource {
    fn provider(&self) -> Provider {
        Provider::GitHub
    }

    async fn get_top_repositories(&self, limit: usize) -> Result<Vec<RepositorySnapshot>> {
        let repos = fetch_up_to(limit, |page, per_page| self.search_page(page, per_page)).await?;
        tracing::debug!(count = repos.len(), limit, "fetched top repositories from GitHub");
        Ok(repos)
    }

    async fn get_repository_activity(
        &self,
        owner: &str,
        repo: &str,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<Vec<ActivityRecord>> {
        let since = since.to_rfc3339_opts(SecondsFormat::Secs, true);
        let until = until.to_rfc3339_opts(SecondsFormat::Secs, true);

        let commits = fetch_all_pages(self.page_delay, |page| {
            self.commits_page(owner, repo, &since, &until, page)
        })
        .await?;

        tracing::debug!(owner, repo, commits = commits.len(), "fetched commits from GitHub");
        Ok(aggregate_commits(&commits))
    }
}
