//! Ranked repository snapshot, one row per (repo, owner).

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "top100")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub repo: String,
    #[sea_orm(primary_key, auto_increment = false)]
    pub owner: String,

    /// Rank assigned by the most recent recompute, 1-based. 0 until ranked.
    pub position_cur: i32,
    /// Rank held immediately before the most recent recompute.
    pub position_prev: i32,

    pub stars: i64,
    pub watchers: i64,
    pub forks: i64,
    pub open_issues: i64,
    pub language: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
