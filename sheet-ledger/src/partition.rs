//! Partition resolution and day-marker text
//!
//! Everything calendar-related is evaluated in one configured time zone, so a
//! record submitted at 23:30 local time lands in that local day and month
//! regardless of where the server runs.

use crate::error::{Error, Result};
use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref DAY_MARKER: Regex = Regex::new(
        r"^(Monday|Tuesday|Wednesday|Thursday|Friday|Saturday|Sunday),\s[A-Za-z]+\s\d{1,2},\s\d{4}$"
    )
    .expect("day marker pattern is valid");
}

/// Month tab name for `now` in `tz`, e.g. "August 2025".
pub fn resolve_partition_name(now: DateTime<Utc>, tz: Tz) -> String {
    now.with_timezone(&tz).format("%B %Y").to_string()
}

/// Parse a day-marker cell such as "Friday, August 8, 2025".
///
/// The cell must match the weekday/month/day/year shape. The weekday itself
/// is not cross-checked against the date.
pub fn parse_day_marker(cell: &str) -> Option<NaiveDate> {
    if !DAY_MARKER.is_match(cell) {
        return None;
    }
    let (_, date) = cell.split_once(", ")?;
    NaiveDate::parse_from_str(date, "%B %d, %Y").ok()
}

/// Resolves partition names, day markers and timestamps in a fixed time zone
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartitionResolver {
    tz: Tz,
}

impl PartitionResolver {
    /// Resolver for `tz`
    pub fn new(tz: Tz) -> Self {
        Self { tz }
    }

    /// Resolver for an IANA zone name such as "Asia/Manila"
    pub fn from_name(name: &str) -> Result<Self> {
        let tz: Tz = name
            .parse()
            .map_err(|e| Error::Config(format!("Unknown time zone {:?}: {}", name, e)))?;
        Ok(Self::new(tz))
    }

    /// Configured time zone
    pub fn time_zone(&self) -> Tz {
        self.tz
    }

    /// Month tab for `now`
    pub fn partition_name(&self, now: DateTime<Utc>) -> String {
        resolve_partition_name(now, self.tz)
    }

    /// Day-marker text for `now`: "Friday, August 8, 2025"
    pub fn day_marker(&self, now: DateTime<Utc>) -> String {
        now.with_timezone(&self.tz)
            .format("%A, %B %-d, %Y")
            .to_string()
    }

    /// Date cell text for `now`: "8/8/2025, 9:05:03 AM"
    pub fn timestamp(&self, now: DateTime<Utc>) -> String {
        now.with_timezone(&self.tz)
            .format("%-m/%-d/%Y, %-I:%M:%S %p")
            .to_string()
    }

    /// Local calendar date of `now`
    pub fn today(&self, now: DateTime<Utc>) -> NaiveDate {
        now.with_timezone(&self.tz).date_naive()
    }
}
