//! Shared request plumbing for the provider backends.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use url::Url;

use crate::http::{HttpHeaders, HttpRequest, HttpTransport};

use super::errors::{FetchError, Result};
use super::rate_limit::{ApiRateLimiter, log_rate_limit};

/// Authenticated JSON GET client bound to one API base URL.
#[derive(Clone)]
pub(crate) struct ApiClient {
    transport: Arc<dyn HttpTransport>,
    base_url: Url,
    headers: HttpHeaders,
    rate_limiter: Option<ApiRateLimiter>,
}

impl ApiClient {
    /// `headers` are sent with every request; a bearer token is appended when given.
    pub(crate) fn new(
        transport: Arc<dyn HttpTransport>,
        base_url: &str,
        mut headers: HttpHeaders,
        token: Option<&str>,
        rate_limiter: Option<ApiRateLimiter>,
    ) -> Result<Self> {
        let base_url = Url::parse(base_url.trim_end_matches('/'))
            .map_err(|e| FetchError::Config(format!("invalid base URL {base_url:?}: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(FetchError::Config(format!(
                "base URL {base_url} cannot carry a path"
            )));
        }

        if let Some(token) = token.map(str::trim).filter(|t| !t.is_empty()) {
            headers.push(("Authorization".to_string(), format!("Bearer {token}")));
        }

        Ok(Self {
            transport,
            base_url,
            headers,
            rate_limiter,
        })
    }

    /// Build `{base}/{segments...}?{query}`.
    ///
    /// Each segment is percent-encoded on its own, so `owner/repo` passed as a
    /// single segment becomes `owner%2Frepo`.
    pub(crate) fn endpoint(&self, segments: &[&str], query: &[(&str, String)]) -> Result<String> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| FetchError::Config(format!("base URL {} cannot carry a path", self.base_url)))?
            .pop_if_empty()
            .extend(segments);

        if !query.is_empty() {
            url.query_pairs_mut()
                .extend_pairs(query.iter().map(|(k, v)| (*k, v.as_str())));
        }

        Ok(url.into())
    }

    /// GET `url` and decode the JSON body. Response headers are returned for
    /// pagination.
    pub(crate) async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<(T, HttpHeaders)> {
        if let Some(limiter) = &self.rate_limiter {
            limiter.wait().await;
        }

        let request = HttpRequest {
            url: url.to_string(),
            headers: self.headers.clone(),
        };
        tracing::debug!(url, "GET");

        let response = self.transport.send(request).await?;
        log_rate_limit(url, &response.headers);

        if !response.is_success() {
            return Err(FetchError::from_response(&response));
        }

        let data = serde_json::from_slice(&response.body).map_err(|source| FetchError::Decode {
            url: url.to_string(),
            source,
        })?;

        Ok((data, response.headers))
    }
}
