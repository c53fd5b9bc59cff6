//! HTTP transport seam used by the remote repository sources.
//!
//! Sources only ever issue GET requests with a handful of headers, so the
//! request/response types stay small. Production code goes through
//! [`ReqwestTransport`]; unit tests use the in-memory `MockTransport`.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

/// Request timeout applied to every remote call.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Header list as ordered name/value pairs.
///
/// Lookups through [`header_get`] are case-insensitive.
pub type HttpHeaders = Vec<(String, String)>;

/// An outgoing GET request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub url: String,
    pub headers: HttpHeaders,
}

impl HttpRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            headers: Vec::new(),
        }
    }

    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

/// A fully buffered response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: HttpHeaders,
    pub body: Vec<u8>,
}

impl HttpResponse {
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        header_get(&self.headers, name)
    }

    /// Whether the status is in the 2xx range.
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Body as lossy UTF-8, for error messages.
    #[must_use]
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

#[derive(Debug, Error)]
pub enum HttpError {
    /// Connection, TLS, timeout or body read failure.
    #[error("http transport error: {0}")]
    Transport(String),
}

/// Transport boundary for all remote HTTP I/O.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, HttpError>;
}

/// First header value matching `name`, ignoring ASCII case.
#[must_use]
pub fn header_get<'a>(headers: &'a HttpHeaders, name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}

/// reqwest-backed transport.
#[derive(Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self, HttpError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("toprepos/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| HttpError::Transport(e.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, HttpError> {
        let mut builder = self.client.get(&request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let resp = builder
            .send()
            .await
            .map_err(|e| HttpError::Transport(e.to_string()))?;

        let status = resp.status().as_u16();
        let headers: HttpHeaders = resp
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    value.to_str().unwrap_or_default().to_string(),
                )
            })
            .collect();

        let body = resp
            .bytes()
            .await
            .map_err(|e| HttpError::Transport(e.to_string()))?
            .to_vec();

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

// ---------- Test-only mock transport ----------

#[cfg(test)]
pub(crate) use mock::MockTransport;


#[cfg(test)]
mod tests {
    use super::*;

    fn response(status: u16, headers: Vec<(&str, &str)>, body: &str) -> HttpResponse {
        HttpResponse {
            status,
            headers: headers
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            body: body.as_bytes().to_vec(),
        }
    }

    #[test]
    fn header_lookup_ignores_case_and_takes_first() {
        let resp = response(
            200,
            vec![("Link", "<a>; rel=\"last\""), ("link", "<b>; rel=\"last\"")],
            "",
        );
        assert_eq!(resp.header("LINK"), Some("<a>; rel=\"last\""));
        assert_eq!(resp.header("x-missing"), None);
    }

    #[test]
    fn success_range_is_2xx_only() {
        assert!(response(200, vec![], "").is_success());
        assert!(response(204, vec![], "").is_success());
        assert!(!response(304, vec![], "").is_success());
        assert!(!response(500, vec![], "").is_success());
    }

    #[test]
    fn request_builder_appends_headers_in_order() {
        let req = HttpRequest::get("https://example.test")
            .header("Accept", "application/json")
            .header("Authorization", "Bearer t");
        assert_eq!(req.headers.len(), 2);
        assert_eq!(header_get(&req.headers, "authorization"), Some("Bearer t"));
    }

    #[tokio::test]
    async fn mock_transport_serves_fifo_and_records_requests() {
        let transport = MockTransport::new();
        transport.push_response("https://x.test/a", response(200, vec![], "first"));
        transport.push_response("https://x.test/a", response(500, vec![], "second"));

        let first = transport
            .send(HttpRequest::get("https://x.test/a"))
            .await
            .expect("first response queued");
        let second = transport
            .send(HttpRequest::get("https://x.test/a"))
            .await
            .expect("second response queued");
        let missing = transport.send(HttpRequest::get("https://x.test/a")).await;

        assert_eq!(first.body_text(), "first");
        assert_eq!(second.status, 500);
        assert!(
            matches!(missing, Err(HttpError::Transport(ref m)) if m.contains("https://x.test/a"))
        );
        assert_eq!(transport.requests().len(), 3);
    }
}
