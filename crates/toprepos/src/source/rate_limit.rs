use std::num::NonZeroU32;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};

use crate::http::{HttpHeaders, header_get};

type GovernorRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Client-side token bucket shared by every request a source issues.
///
/// ```ignore
/// let limiter = ApiRateLimiter::new(10);
/// limiter.wait().await;
/// transport.send(request).await?;
/// ```
#[derive(Clone)]
pub struct ApiRateLimiter {
    inner: Arc<GovernorRateLimiter>,
}

impl ApiRateLimiter {
    /// `requests_per_second` of 0 is treated as 1.
    pub fn new(requests_per_second: u32) -> Self {
        let rps = NonZeroU32::new(requests_per_second).unwrap_or(NonZeroU32::MIN);
        Self {
            inner: Arc::new(RateLimiter::direct(Quota::per_second(rps))),
        }
    }

    /// Wait until the bucket allows another request.
    pub async fn wait(&self) {
        self.inner.until_ready().await;
    }
}

impl std::fmt::Debug for ApiRateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiRateLimiter").finish_non_exhaustive()
    }
}

/// Remote rate-limit state as advertised in response headers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitInfo {
    pub limit: Option<u64>,
    pub remaining: u64,
    pub reset_at: Option<DateTime<Utc>>,
}

impl RateLimitInfo {
    /// Parse GitHub (`x-ratelimit-*`) or GitLab (`ratelimit-*`) headers.
    ///
    /// Returns `None` when no `remaining` count is present.
    pub fn from_headers(headers: &HttpHeaders) -> Option<Self> {
        let pick = |suffix: &str| {
            header_get(headers, &format!("x-ratelimit-{suffix}"))
                .or_else(|| header_get(headers, &format!("ratelimit-{suffix}")))
        };

        let remaining = pick("remaining")?.trim().parse::<u64>().ok()?;
        let limit = pick("limit").and_then(|v| v.trim().parse::<u64>().ok());
        let reset_at = pick("reset")
            .and_then(|v| v.trim().parse::<i64>().ok())
            .and_then(|epoch| DateTime::from_timestamp(epoch, 0));

        Some(Self {
            limit,
            remaining,
            reset_at,
        })
    }
}

/// Log whatever rate-limit headers the response carried.
pub(crate) fn log_rate_limit(url: &str, headers: &HttpHeaders) {
    if let Some(info) = RateLimitInfo::from_headers(headers) {
        tracing::debug!(
            url,
            remaining = info.remaining,
            limit = ?info.limit,
            reset_at = ?info.reset_at,
            "remote rate limit"
        );
    }
}
