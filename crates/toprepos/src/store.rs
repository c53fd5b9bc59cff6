//! Persistence for ranked repository snapshots and daily activity.
//!
//! Every multi-row write runs in its own transaction; reads go straight to the
//! pool.

mod activity;
mod errors;
mod ranking;

pub use activity::{find_activity, get_last_activity_date, upsert_activities};
pub use errors::{Result, StoreError};
pub use ranking::{SortField, list_top, update_top_repositories};

/// Rows per INSERT statement, keeping bind parameters well under SQLite's limit.
const INSERT_CHUNK_SIZE: usize = 100;
