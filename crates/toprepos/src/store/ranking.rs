use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use sea_orm::{
    ActiveValue::Set, ConnectionTrait, DatabaseConnection, EntityTrait, QueryOrder, QuerySelect,
    Statement, TransactionTrait, sea_query::OnConflict,
};
use serde::{Deserialize, Serialize};

use crate::entity::top_repository::{ActiveModel, Column, Entity as TopRepository, Model};
use crate::source::RepositorySnapshot;

use super::INSERT_CHUNK_SIZE;
use super::errors::{Result, StoreError};

/// Dense re-rank of every stored row by stars.
///
/// `SET` expressions see the pre-update row, so `position_prev` receives the
/// old `position_cur`. Runs unchanged on PostgreSQL and SQLite >= 3.33.
const RECOMPUTE_RANKS_SQL: &str = "\
WITH ranked AS (
    SELECT repo, owner,
           ROW_NUMBER() OVER (ORDER BY stars DESC, owner ASC, repo ASC) AS new_position
    FROM top100
)
UPDATE top100
SET position_prev = position_cur,
    position_cur = ranked.new_position
FROM ranked
WHERE top100.repo = ranked.repo AND top100.owner = ranked.owner";

/// Columns the read API may sort the ranking by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    #[default]
    Stars,
    Forks,
    OpenIssues,
    Watchers,
}

impl SortField {
    pub const ALL: [Self; 4] = [Self::Stars, Self::Forks, Self::OpenIssues, Self::Watchers];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Stars => "stars",
            Self::Forks => "forks",
            Self::OpenIssues => "open_issues",
            Self::Watchers => "watchers",
        }
    }

    fn column(self) -> Column {
        match self {
            Self::Stars => Column::Stars,
            Self::Forks => Column::Forks,
            Self::OpenIssues => Column::OpenIssues,
            Self::Watchers => Column::Watchers,
        }
    }
}

impl fmt::Display for SortField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortField {
    type Err = StoreError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|field| field.as_str() == s)
            .ok_or_else(|| {
                StoreError::invalid_input(format!(
                    "sort_by must be one of stars, forks, open_issues, watchers (got {s:?})"
                ))
            })
    }
}

fn to_active_model(snapshot: &RepositorySnapshot) -> ActiveModel {
    ActiveModel {
        repo: Set(snapshot.name.clone()),
        owner: Set(snapshot.owner.clone()),
        position_cur: Set(0),
        position_prev: Set(0),
        stars: Set(snapshot.stars),
        watchers: Set(snapshot.watchers),
        forks: Set(snapshot.forks),
        open_issues: Set(snapshot.open_issues),
        language: Set(snapshot.language.clone()),
    }
}

/// Conflicts on (repo, owner) overwrite the metrics and leave both ranks alone.
pub(crate) fn build_upsert_on_conflict() -> OnConflict {
    OnConflict::columns([Column::Repo, Column::Owner])
        .update_columns([
            Column::Stars,
            Column::Forks,
            Column::OpenIssues,
            Column::Watchers,
            Column::Language,
        ])
        .to_owned()
}

/// Upsert `snapshots` and recompute ranks over all stored rows, atomically.
///
/// Afterwards `position_cur` is a gapless 1..K ranking by descending stars
/// and `position_prev` holds each row's rank from before this call. Rows that
/// were not part of `snapshots` keep their metrics and are still ranked.
/// Duplicate (owner, name) pairs keep their first occurrence. Empty input
/// leaves the table untouched.
///
/// Returns the number of snapshots written.
pub async fn update_top_repositories(
    db: &DatabaseConnection,
    snapshots: &[RepositorySnapshot],
) -> Result<u64> {
    if snapshots.is_empty() {
        return Ok(0);
    }

    let mut seen = HashSet::with_capacity(snapshots.len());
    let models: Vec<ActiveModel> = snapshots
        .iter()
        .filter(|s| seen.insert((s.owner.as_str(), s.name.as_str())))
        .map(to_active_model)
        .collect();
    if models.len() < snapshots.len() {
        tracing::debug!(
            dropped = snapshots.len() - models.len(),
            "ignoring duplicate repositories in snapshot batch"
        );
    }
    let count = models.len() as u64;

    let txn = db.begin().await?;

    for chunk in models.chunks(INSERT_CHUNK_SIZE) {
        TopRepository::insert_many(chunk.to_vec())
            .on_conflict(build_upsert_on_conflict())
            .exec_without_returning(&txn)
            .await?;
    }

    let ranked = txn
        .execute(Statement::from_string(
            txn.get_database_backend(),
            RECOMPUTE_RANKS_SQL.to_string(),
        ))
        .await?
        .rows_affected();

    txn.commit().await?;

    tracing::debug!(upserted = count, ranked, "top repositories updated");
    Ok(count)
}

/// Stored rows ordered descending by `sort_by`, at most `limit`.
///
/// Ties fall back to the current rank, then the natural key.
pub async fn list_top(db: &DatabaseConnection, sort_by: SortField, limit: u64) -> Result<Vec<Model>> {
    let rows = TopRepository::find()
        .order_by_desc(sort_by.column())
        .order_by_asc(Column::PositionCur)
        .order_by_asc(Column::Owner)
        .order_by_asc(Column::Repo)
        .limit(limit)
        .all(db)
        .await?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::{DatabaseBackend, DbErr, MockDatabase, MockExecResult, QueryTrait};

    #[test]
    fn sort_field_allow_list() {
        assert_eq!("stars".parse::<SortField>().ok(), Some(SortField::Stars));
        assert_eq!("forks".parse::<SortField>().ok(), Some(SortField::Forks));
        assert_eq!(
            "open_issues".parse::<SortField>().ok(),
            Some(SortField::OpenIssues)
        );
        assert_eq!("watchers".parse::<SortField>().ok(), Some(SortField::Watchers));

        for bad in ["", "STARS", "stars; DROP TABLE top100", "position_cur", "language"] {
            let err = bad.parse::<SortField>().expect_err("not allow-listed");
            assert!(matches!(err, StoreError::InvalidInput { .. }), "{bad:?}");
        }
    }

    #[test]
    fn sort_field_round_trips_through_display() {
        for field in SortField::ALL {
            assert_eq!(field.to_string().parse::<SortField>().ok(), Some(field));
        }
    }

    #[test]
    fn upsert_leaves_ranks_out_of_update_set() {
        let snapshot = RepositorySnapshot {
            owner: "rust-lang".to_string(),
            name: "rust".to_string(),
            stars: 100,
            forks: 10,
            open_issues: 5,
            watchers: 100,
            language: Some("Rust".to_string()),
        };

        let sql = TopRepository::insert_many(vec![to_active_model(&snapshot)])
            .on_conflict(build_upsert_on_conflict())
            .build(DatabaseBackend::Postgres)
            .to_string();

        assert!(sql.contains("ON CONFLICT (\"repo\", \"owner\") DO UPDATE"), "{sql}");
        assert!(sql.contains("\"stars\" = \"excluded\".\"stars\""), "{sql}");
        assert!(sql.contains("\"language\" = \"excluded\".\"language\""), "{sql}");
        assert!(!sql.contains("\"position_cur\" = \"excluded\""), "{sql}");
        assert!(!sql.contains("\"position_prev\" = \"excluded\""), "{sql}");
    }

    #[test]
    fn list_top_orders_by_requested_column() {
        let sql = TopRepository::find()
            .order_by_desc(SortField::OpenIssues.column())
            .limit(100)
            .build(DatabaseBackend::Sqlite)
            .to_string();
        assert!(sql.contains("ORDER BY \"top100\".\"open_issues\" DESC"), "{sql}");
        assert!(sql.contains("LIMIT 100"), "{sql}");
    }

    #[tokio::test]
    async fn empty_batch_touches_nothing() {
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
        let written = update_top_repositories(&db, &[])
            .await
            .expect("empty batch succeeds");
        assert_eq!(written, 0);
        assert!(db.into_transaction_log().is_empty());
    }

    #[tokio::test]
    async fn update_runs_upsert_then_rank_in_one_transaction() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results([
                MockExecResult {
                    rows_affected: 1,
                    last_insert_id: 0,
                },
                MockExecResult {
                    rows_affected: 1,
                    last_insert_id: 0,
                },
            ])
            .into_connection();

        let snapshot = RepositorySnapshot {
            owner: "o".to_string(),
            name: "r".to_string(),
            stars: 1,
            forks: 0,
            open_issues: 0,
            watchers: 0,
            language: None,
        };
        update_top_repositories(&db, &[snapshot.clone(), snapshot])
            .await
            .expect("mock update succeeds");

        let rendered = format!("{:?}", db.into_transaction_log());
        assert!(rendered.contains("ON CONFLICT"), "{rendered}");
        assert!(rendered.contains("ROW_NUMBER()"), "{rendered}");
        let upsert_at = rendered.find("ON CONFLICT").expect("upsert logged");
        let rank_at = rendered.find("ROW_NUMBER()").expect("rank logged");
        assert!(upsert_at < rank_at, "upsert must precede the re-rank");
    }

    #[tokio::test]
    async fn failed_rerank_rolls_back_the_upsert() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results([MockExecResult {
                rows_affected: 1,
                last_insert_id: 0,
            }])
            .append_exec_errors([DbErr::Custom("rank recompute failed".to_string())])
            .into_connection();

        let snapshot = RepositorySnapshot {
            owner: "o".to_string(),
            name: "r".to_string(),
            stars: 1,
            forks: 0,
            open_issues: 0,
            watchers: 0,
            language: None,
        };
        let err = update_top_repositories(&db, &[snapshot])
            .await
            .expect_err("re-rank failure surfaces");
        assert!(matches!(err, StoreError::Database(DbErr::Custom(_))), "{err:?}");

        let rendered = format!("{:?}", db.into_transaction_log());
        assert!(rendered.contains("ON CONFLICT"), "{rendered}");
        assert!(rendered.contains("ROW_NUMBER()"), "{rendered}");
        assert!(rendered.contains("ROLLBACK"), "{rendered}");
        assert!(!rendered.contains("COMMIT"), "{rendered}");
    }
}
