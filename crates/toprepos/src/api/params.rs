//! Query-string parameters and their validation.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::Deserialize;

use super::errors::ApiError;
use crate::store::SortField;

#[derive(Debug, Default, Deserialize)]
pub struct TopQuery {
    pub sort_by: Option<String>,
}

impl TopQuery {
    /// Resolve `sort_by` against the allow-list; absent means stars.
    pub fn sort_field(&self) -> Result<SortField, ApiError> {
        match self.sort_by.as_deref() {
            None => Ok(SortField::default()),
            Some(raw) => Ok(raw.parse::<SortField>()?),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ActivityQuery {
    pub since: Option<String>,
    pub until: Option<String>,
}

impl ActivityQuery {
    /// Both bounds as calendar days, either possibly open.
    pub fn range(&self) -> Result<(Option<NaiveDate>, Option<NaiveDate>), ApiError> {
        let since = parse_bound("since", self.since.as_deref())?;
        let until = parse_bound("until", self.until.as_deref())?;
        Ok((since, until))
    }
}

fn parse_bound(name: &str, raw: Option<&str>) -> Result<Option<NaiveDate>, ApiError> {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(None);
    };
    parse_day(raw).map(Some).ok_or_else(|| {
        ApiError::bad_request(format!(
            "invalid {name} {raw:?}: expected an ISO-8601 date or timestamp"
        ))
    })
}

/// Reduce an ISO-8601 date or timestamp to its calendar day.
///
/// Timestamps keep the calendar date they were written in, offset or not.
pub fn parse_day(raw: &str) -> Option<NaiveDate> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.date_naive());
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(ts) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(ts.date());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()
}
