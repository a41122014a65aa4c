// Pure dataset transforms: retention window and daily merge.
// File access (load, save) stays in snapshot_store::mod.

use chrono::{Duration, NaiveDate};

use crate::models::{DailySnapshot, Dataset};

pub const DEFAULT_RETENTION_DAYS: u32 = 31;

/// Oldest date kept by a window of `window_days` ending at (and including) `today`.
pub fn cutoff_date(today: NaiveDate, window_days: u32) -> NaiveDate {
    today - Duration::days(i64::from(window_days.saturating_sub(1)))
}

/// Returns a copy of `dataset` holding at most the `window_days` most recent calendar days,
/// `today` included. The window is anchored on `today`, not on the newest stored date.
pub fn retain(dataset: &Dataset, window_days: u32, today: NaiveDate) -> Dataset {
    let cutoff = cutoff_date(today, window_days);
    dataset
        .iter()
        .filter(|(date, _)| *date >= cutoff)
        .map(|(date, snapshot)| (date, snapshot.clone()))
        .collect()
}

/// Returns `dataset` with `snapshot` stored under `date`. An existing entry is replaced whole.
pub fn merge(dataset: &Dataset, date: NaiveDate, snapshot: DailySnapshot) -> Dataset {
    let mut out = dataset.clone();
    out.insert(date, snapshot);
    out
}
