//! GitLab REST v4 backend.

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

/// gitlab.com API root.
pub const GITLAB_API_URL: &str = "https://gitlab.com/api/v4";

#[derive(Debug, Deserialize)]
struct GitLabProject {
    path: String,
    namespace: GitLabNamespace,
    star_count: i64,
    #[serde(default)]
    forks_count: i64,
    /// Absent when issues are disabled for the project.
    open_issues_count: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct GitLabNamespace {
    full_path: String,
}

#[derive(Debug, Deserialize)]
struct GitLabCommit {
    author_name: Option<String>,
    committed_date: Option<DateTime<Utc>>,
    authored_date: Option<DateTime<Utc>>,
}

impl From<GitLabProject> for RepositorySnapshot {
    fn from(project: GitLabProject) -> Self {
        Self {
            owner: project.namespace.full_path,
            name: project.path,
            stars: project.star_count,
            forks: project.forks_count,
            open_issues: project.open_issues_count.unwrap_or(0),
            // GitLab has no watcher count or primary language on this endpoint.
            watchers: 0,
            language: None,
        }
    }
}

impl GitLabCommit {
    fn into_raw(self) -> Option<RawCommit> {
        let date = self.committed_date.or(self.authored_date)?;
        Some(RawCommit::new(self.author_name?, date))
    }
}

/// [`RepositorySource`] backed by the GitLab projects and commits endpoints.
#[derive(Clone)]
pub struct GitLabSource {
    api: ApiClient,
    page_delay: Duration,
}

impl GitLabSource {
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
        let headers = vec![("Accept".to_string(), "application/json".to_string())];
        let api = ApiClient::new(transport, base_url, headers, token, rate_limiter)?;
        Ok(Self { api, page_delay })
    }

    async fn projects_page(&self, page: u32, per_page: usize) -> Result<Vec<RepositorySnapshot>> {
        let url = self.api.endpoint(
            &["projects"],
            &[
                ("order_by", "star_count".to_string()),
                ("sort", "desc".to_string()),
                ("per_page", per_page.to_string()),
                ("page", page.to_string()),
            ],
        )?;
        let (projects, _): (Vec<GitLabProject>, _) = self.api.get_json(&url).await?;
        Ok(projects.into_iter().map(RepositorySnapshot::from).collect())
    }

    async fn commits_page(
        &self,
        project: &str,
        since: &str,
        until: &str,
        page: u32,
    ) -> Result<Page<RawCommit>> {
        let url = self.api.endpoint(
            &["projects", project, "repository", "commits"],
            &[
                ("since", since.to_string()),
                ("until", until.to_string()),
                ("per_page", MAX_PAGE_SIZE.to_string()),
                ("page", page.to_string()),
            ],
        )?;
        let (commits, headers): (Vec<GitLabCommit>, _) = self.api.get_json(&url).await?;

        Ok(Page {
            items: commits.into_iter().filter_map(GitLabCommit::into_raw).collect(),
            pagination: PaginationInfo::from_headers(&headers),
        })
    }
}

#[async_trait]
impl RepositorySource for GitLabSource {
    fn provider(&self) -> Provider {
        Provider::GitLab
    }

    async fn get_top_repositories(&self, limit: usize) -> Result<Vec<RepositorySnapshot>> {
        let repos = fetch_up_to(limit, |page, per_page| self.projects_page(page, per_page)).await?;
        tracing::debug!(count = repos.len(), limit, "fetched top projects from GitLab");
        Ok(repos)
    }

    async fn get_repository_activity(
        &self,
        owner: &str,
        repo: &str,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<Vec<ActivityRecord>> {
        // Project IDs may be given as the URL-encoded full path.
        let project = format!("{owner}/{repo}");
        let since = since.to_rfc3339_opts(SecondsFormat::Secs, true);
        let until = until.to_rfc3339_opts(SecondsFormat::Secs, true);

        let commits = fetch_all_pages(self.page_delay, |page| {
            self.commits_page(&project, &since, &until, page)
        })
        .await?;

        tracing::debug!(project = %project, commits = commits.len(), "fetched commits from GitLab");
        Ok(aggregate_commits(&commits))
    }
}
