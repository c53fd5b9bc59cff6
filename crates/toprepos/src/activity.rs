//! Per-day commit activity.

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::source::RawCommit;

/// Commit activity of one repository on one UTC calendar day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityRecord {
    pub date: NaiveDate,
    pub commits: i32,
    /// Distinct author names. Order carries no meaning.
    pub authors: Vec<String>,
}

/// Group commits by the UTC date of their timestamp.
///
/// Records come back sorted by date with sorted author lists, which keeps
/// output deterministic, but nothing downstream depends on that order.
pub fn aggregate_commits(commits: &[RawCommit]) -> Vec<ActivityRecord> {
    let mut by_day: BTreeMap<NaiveDate, (i32, BTreeSet<&str>)> = BTreeMap::new();

    for commit in commits {
        let entry = by_day.entry(commit.committed_at.date_naive()).or_default();
        entry.0 = entry.0.saturating_add(1);
        entry.1.insert(commit.author.as_str());
    }

    by_day
        .into_iter()
        .map(|(date, (commits, authors))| ActivityRecord {
            date,
            commits,
            authors: authors.into_iter().map(str::to_owned).collect(),
        })
        .collect()
}
