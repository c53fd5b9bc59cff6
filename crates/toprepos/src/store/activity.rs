use std::collections::BTreeMap;

use chrono::NaiveDate;
use sea_orm::{
    ActiveValue::Set, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, TransactionTrait, sea_query::OnConflict,
};

use crate::activity::ActivityRecord;
use crate::entity::activity::{ActiveModel, Authors, Column, Entity as Activity, Model};

use super::INSERT_CHUNK_SIZE;
use super::errors::{Result, StoreError};

/// Latest stored activity date for a repository, if any.
pub async fn get_last_activity_date(
    db: &DatabaseConnection,
    owner: &str,
    repo: &str,
) -> Result<Option<NaiveDate>> {
    let latest = Activity::find()
        .select_only()
        .column(Column::Date)
        .filter(Column::Repo.eq(repo))
        .filter(Column::Owner.eq(owner))
        .order_by_desc(Column::Date)
        .into_tuple::<NaiveDate>()
        .one(db)
        .await?;
    Ok(latest)
}

/// Conflicts on (date, repo, owner) replace the count and the author list.
pub(crate) fn build_upsert_on_conflict() -> OnConflict {
    OnConflict::columns([Column::Date, Column::Repo, Column::Owner])
        .update_columns([Column::Commits, Column::Authors])
        .to_owned()
}

/// Insert or overwrite one row per record, in a single transaction.
///
/// A re-fetched date replaces what was stored for it; nothing is merged. When
/// the same date appears more than once in `records`, the last one wins.
/// Returns the number of rows written.
pub async fn upsert_activities(
    db: &DatabaseConnection,
    owner: &str,
    repo: &str,
    records: &[ActivityRecord],
) -> Result<u64> {
    if records.is_empty() {
        return Ok(0);
    }
    if owner.is_empty() || repo.is_empty() {
        return Err(StoreError::invalid_input("owner and repo must be non-empty"));
    }

    let mut by_date: BTreeMap<NaiveDate, &ActivityRecord> = BTreeMap::new();
    for record in records {
        if record.commits < 0 {
            return Err(StoreError::invalid_input(format!(
                "negative commit count {} for {owner}/{repo} on {}",
                record.commits, record.date
            )));
        }
        by_date.insert(record.date, record);
    }

    let models: Vec<ActiveModel> = by_date
        .into_values()
        .map(|record| ActiveModel {
            date: Set(record.date),
            repo: Set(repo.to_owned()),
            owner: Set(owner.to_owned()),
            commits: Set(record.commits),
            authors: Set(Authors(record.authors.clone())),
        })
        .collect();
    let count = models.len() as u64;

    let txn = db.begin().await?;
    for chunk in models.chunks(INSERT_CHUNK_SIZE) {
        Activity::insert_many(chunk.to_vec())
            .on_conflict(build_upsert_on_conflict())
            .exec_without_returning(&txn)
            .await?;
    }
    txn.commit().await?;

    tracing::debug!(owner, repo, rows = count, "activity upserted");
    Ok(count)
}

/// Stored activity within the inclusive day range, oldest first.
///
/// Either bound may be omitted.
pub async fn find_activity(
    db: &DatabaseConnection,
    owner: &str,
    repo: &str,
    since: Option<NaiveDate>,
    until: Option<NaiveDate>,
) -> Result<Vec<Model>> {
    let mut query = Activity::find()
        .filter(Column::Repo.eq(repo))
        .filter(Column::Owner.eq(owner));

    if let Some(since) = since {
        query = query.filter(Column::Date.gte(since));
    }
    if let Some(until) = until {
        query = query.filter(Column::Date.lte(until));
    }

    Ok(query.order_by_asc(Column::Date).all(db).await?)
}
