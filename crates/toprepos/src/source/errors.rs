use thiserror::Error;

use crate::http::{HttpError, HttpResponse};

/// Errors raised while talking to a remote repository source.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Network failure, 5xx or rate limiting. Re-running the cycle later may succeed.
    #[error("transient fetch error: {message}")]
    Transient { message: String },

    /// Client error such as bad credentials or an unknown repository.
    #[error("fatal fetch error (HTTP {status}): {message}")]
    Fatal { status: u16, message: String },

    /// The response body did not match the expected wire shape.
    #[error("failed to decode response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    /// The source could not be constructed (bad base URL, HTTP client setup).
    #[error("invalid source configuration: {0}")]
    Config(String),
}

impl FetchError {
    /// Create a transient error.
    #[inline]
    pub fn transient(message: impl Into<String>) -> Self {
        Self::Transient {
            message: message.into(),
        }
    }

    /// Classify a non-2xx response.
    ///
    /// 429 and 5xx are transient; every other status is fatal.
    pub fn from_response(response: &HttpResponse) -> Self {
        let message = first_line(&response.body_text());
        match response.status {
            429 => Self::Transient {
                message: format!("rate limited: {message}"),
            },
            s if s >= 500 => Self::Transient {
                message: format!("HTTP {s}: {message}"),
            },
            status => Self::Fatal { status, message },
        }
    }

    /// Whether retrying the cycle later could plausibly succeed.
    #[inline]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transient { .. })
    }
}

impl From<HttpError> for FetchError {
    fn from(err: HttpError) -> Self {
        Self::transient(err.to_string())
    }
}

fn first_line(text: &str) -> String {
    text.lines().next().unwrap_or_default().trim().to_string()
}

/// Result type for source operations.
pub type Result<T> = std::result::Result<T, FetchError>;
