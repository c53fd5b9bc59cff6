use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use thiserror::Error;

use crate::store::StoreError;

/// Error returned by read API handlers.
#[derive(Debug, Error)]
pub enum ApiError {
    /// A query parameter was rejected before touching the database.
    #[error("{0}")]
    BadRequest(String),

    /// Anything else. The client only ever sees a generic message.
    #[error("internal error: {0}")]
    Internal(#[source] StoreError),
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    detail: String,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::InvalidInput { message } => Self::BadRequest(message),
            other => Self::Internal(other),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status();
        let detail = match self {
            Self::BadRequest(message) => message,
            Self::Internal(err) => {
                tracing::error!(error = %err, "read API request failed");
                "Internal server error".to_string()
            }
        };
        (status, Json(ErrorBody { detail })).into_response()
    }
}
