//! toprepos - tracks the most-starred repositories of a forge and their daily
//! commit activity.
//!
//! One sync cycle fetches the top-N repositories from GitHub or GitLab, upserts
//! them into the `top100` table with dense star ranks (keeping each row's
//! previous rank), then walks every repository's commits since its last stored
//! day and upserts per-day counts and author lists into `activity`. The [`api`]
//! module serves both tables read-only over HTTP.
//!
//! # Features
//!
//! - `postgres`, `sqlite` - database drivers (both on by default).
//! - `migrate` - bundles the schema [`migration::Migrator`] and enables
//!   [`connect_and_migrate`].
//!
//! # Example
//!
//! ```ignore
//! use toprepos::source::{SourceConfig, build_source};
//! use toprepos::sync::{SyncOptions, SyncOrchestrator};
//! use toprepos::{PoolOptions, connect_and_migrate};
//!
//! let db = connect_and_migrate("sqlite://toprepos.db?mode=rwc", &PoolOptions::default()).await?;
//! let source = build_source(&SourceConfig::default())?;
//!
//! let report = SyncOrchestrator::new(source, db.clone(), SyncOptions::default())
//!     .run_cycle()
//!     .await?;
//!
//! let top = toprepos::store::list_top(&db, toprepos::store::SortField::Forks, 10).await?;
//! ```

pub mod activity;
pub mod api;
pub mod db;
pub mod entity;
pub mod http;
pub mod source;
pub mod store;
pub mod sync;

#[cfg(feature = "migrate")]
pub mod migration;

pub use activity::{ActivityRecord, aggregate_commits};
pub use db::{PoolOptions, connect};
#[cfg(feature = "migrate")]
pub use db::connect_and_migrate;
pub use entity::prelude::*;
