//! Read-only HTTP API over the ranking and activity tables.
//!
//! | Route | Response |
//! |-------|----------|
//! | `GET /api/repos/top100?sort_by=` | up to 100 ranked rows |
//! | `GET /api/repos/{owner}/{repo}/activity?since=&until=` | daily activity, oldest first |
//! | `GET /health` | `ok` |

mod errors;
mod params;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::get,
};
use sea_orm::DatabaseConnection;

use crate::activity::ActivityRecord;
use crate::entity::top_repository;
use crate::store;

pub use errors::ApiError;
pub use params::{ActivityQuery, TopQuery, parse_day};

/// Rows returned by the ranking endpoint.
pub const TOP_LIMIT: u64 = 100;

/// Shared handler state. Cloning shares the pool.
#[derive(Clone, Debug)]
pub struct AppState {
    pub db: DatabaseConnection,
}

impl AppState {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/repos/top100", get(top_repositories))
        .route("/api/repos/{owner}/{repo}/activity", get(repository_activity))
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}

async fn top_repositories(
    State(state): State<AppState>,
    Query(query): Query<TopQuery>,
) -> Result<Json<Vec<top_repository::Model>>, ApiError> {
    let sort_by = query.sort_field()?;
    let rows = store::list_top(&state.db, sort_by, TOP_LIMIT).await?;
    Ok(Json(rows))
}

async fn repository_activity(
    State(state): State<AppState>,
    Path((owner, repo)): Path<(String, String)>,
    Query(query): Query<ActivityQuery>,
) -> Result<Json<Vec<ActivityRecord>>, ApiError> {
    let (since, until) = query.range()?;
    let rows = store::find_activity(&state.db, &owner, &repo, since, until).await?;
    let records = rows
        .into_iter()
        .map(|row| ActivityRecord {
            date: row.date,
            commits: row.commits,
            authors: row.authors.0,
        })
        .collect();
    Ok(Json(records))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode};
    use sea_orm::{DatabaseBackend, DbErr, MockDatabase};
    use tower::ServiceExt;

    fn row(owner: &str, repo: &str, stars: i64, forks: i64) -> top_repository::Model {
        top_repository::Model {
            repo: repo.to_string(),
            owner: owner.to_string(),
            position_cur: 1,
            position_prev: 0,
            stars,
            watchers: 0,
            forks,
            open_issues: 0,
            language: Some("Rust".to_string()),
        }
    }

    async fn fetch(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
        (status, body)
    }

    #[tokio::test]
    async fn health_is_ok() {
        let db = MockDatabase::new(DatabaseBackend::Sqlite).into_connection();
        let response = router(AppState::new(db))
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn unknown_sort_field_is_rejected_before_querying() {
        let db = MockDatabase::new(DatabaseBackend::Sqlite).into_connection();
        let app = router(AppState::new(db.clone()));

        let (status, body) = fetch(app, "/api/repos/top100?sort_by=name").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["detail"].as_str().unwrap().contains("name"));
        assert!(db.into_transaction_log().is_empty());
    }

    #[tokio::test]
    async fn top_rows_serialize_all_columns() {
        let db = MockDatabase::new(DatabaseBackend::Sqlite)
            .append_query_results([vec![row("rust-lang", "rust", 90_000, 12_000)]])
            .into_connection();
        let app = router(AppState::new(db));

        let (status, body) = fetch(app, "/api/repos/top100?sort_by=forks").await;
        assert_eq!(status, StatusCode::OK);
        let first = &body[0];
        assert_eq!(first["owner"], "rust-lang");
        assert_eq!(first["repo"], "rust");
        assert_eq!(first["forks"], 12_000);
        assert_eq!(first["position_cur"], 1);
        assert_eq!(first["language"], "Rust");
    }

    #[tokio::test]
    async fn database_failure_is_a_generic_500() {
        let db = MockDatabase::new(DatabaseBackend::Sqlite)
            .append_query_errors([DbErr::Custom("connection reset".to_string())])
            .into_connection();
        let app = router(AppState::new(db));

        let (status, body) = fetch(app, "/api/repos/top100").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["detail"], "Internal server error");
    }

    #[tokio::test]
    async fn invalid_activity_bound_is_a_bad_request() {
        let db = MockDatabase::new(DatabaseBackend::Sqlite).into_connection();
        let app = router(AppState::new(db));

        let (status, body) = fetch(app, "/api/repos/o/r/activity?since=last-week").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["detail"].as_str().unwrap().contains("since"));
    }
}
