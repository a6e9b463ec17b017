//! Pure file predicates: name, size and modification time.
//!
//! All bounds are exclusive. None of these touch the filesystem.

use chrono::{DateTime, Utc};
use regex::Regex;

/// Name pattern plus exclusion pattern, both searched anywhere in the name.
///
/// The exclusion only takes effect when a name pattern is configured too:
/// with no `fileName`, every name passes and `excludes` is ignored. Existing
/// entity configurations rely on this, so it is kept as-is.
#[derive(Debug, Clone, Default)]
pub struct NameFilter {
    pattern: Option<Regex>,
    exclude: Option<Regex>,
}

impl NameFilter {
    pub fn new(pattern: Option<Regex>, exclude: Option<Regex>) -> Self {
        Self { pattern, exclude }
    }

    pub fn matches(&self, name: &str) -> bool {
        match &self.pattern {
            None => true,
            Some(pattern) => {
                pattern.is_match(name)
                    && self.exclude.as_ref().map_or(true, |ex| !ex.is_match(name))
            }
        }
    }
}

/// Exclusive size window in bytes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SizeRange {
    /// `biggerThan`: size must be strictly greater.
    pub lower: Option<i64>,
    /// `smallerThan`: size must be strictly smaller.
    pub upper: Option<i64>,
}

impl SizeRange {
    pub fn new(lower: Option<i64>, upper: Option<i64>) -> Self {
        Self { lower, upper }
    }

    pub fn matches(&self, size: u64) -> bool {
        // Sizes past i64::MAX cannot occur on any real filesystem.
        let size = i64::try_from(size).unwrap_or(i64::MAX);
        self.lower.map_or(true, |lo| size > lo) && self.upper.map_or(true, |hi| size < hi)
    }
}

/// Exclusive modification-time window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimeRange {
    /// `newerThan`: modified strictly after.
    pub newer_than: Option<DateTime<Utc>>,
    /// `olderThan`: modified strictly before.
    pub older_than: Option<DateTime<Utc>>,
}

impl TimeRange {
    pub fn new(newer_than: Option<DateTime<Utc>>, older_than: Option<DateTime<Utc>>) -> Self {
        Self {
            newer_than,
            older_than,
        }
    }

    pub fn matches(&self, modified: DateTime<Utc>) -> bool {
        self.older_than.map_or(true, |before| modified < before)
            && self.newer_than.map_or(true, |after| modified > after)
    }
}
