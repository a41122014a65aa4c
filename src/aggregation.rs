// Availability aggregation over the retained dataset.
// Percentage denominator is the number of retained days, so a key missing on some day counts
// as not available that day. The history trail only lists days the key was reported.

use chrono::NaiveDate;
use std::collections::BTreeMap;

use crate::models::{CapacityKey, Dataset, StatusValue};

/// Per-key availability percentages and history trails for one dataset.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Aggregation {
    /// Available days / retained days * 100, full precision.
    pub percentages: BTreeMap<CapacityKey, f64>,
    /// (date, status) per reported day, most recent first.
    pub history: BTreeMap<CapacityKey, Vec<(NaiveDate, StatusValue)>>,
    /// Number of retained days used as the denominator.
    pub total_days: usize,
}

impl Aggregation {
    /// Percentage for `key`; 0 when the key never appears.
    pub fn percentage(&self, key: &CapacityKey) -> f64 {
        self.percentages.get(key).copied().unwrap_or(0.0)
    }

    pub fn history(&self, key: &CapacityKey) -> &[(NaiveDate, StatusValue)] {
        self.history.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn keys(&self) -> impl Iterator<Item = &CapacityKey> {
        self.percentages.keys()
    }
}

/// Walks every date, AD, shape and fault domain once.
pub fn aggregate(dataset: &Dataset) -> Aggregation {
    let total_days = dataset.len();
    let mut available: BTreeMap<CapacityKey, usize> = BTreeMap::new();
    let mut history: BTreeMap<CapacityKey, Vec<(NaiveDate, StatusValue)>> = BTreeMap::new();

    for (date, snapshot) in dataset.iter() {
        for (key, status) in snapshot.entries() {
            let count = available.entry(key.clone()).or_insert(0);
            if status.availability_status.is_available() {
                *count += 1;
            }
            history
                .entry(key)
                .or_default()
                .push((date, status.availability_status.clone()));
        }
    }

    // Dataset iterates ascending; a stable descending sort keeps that explicit.
    for trail in history.values_mut() {
        trail.sort_by(|a, b| b.0.cmp(&a.0));
    }

    let percentages = available
        .into_iter()
        .map(|(key, count)| (key, percentage(count, total_days)))
        .collect();

    Aggregation {
        percentages,
        history,
        total_days,
    }
}

fn percentage(count: usize, total_days: usize) -> f64 {
    if total_days == 0 {
        return 0.0;
    }
    (count as f64 / total_days as f64) * 100.0
}

/// Rounded whole-number percentage for display.
pub fn display_percentage(value: f64) -> i64 {
    value.round() as i64
}

/// History trail as "date: STATUS" items joined by ", ".
pub fn format_trail(trail: &[(NaiveDate, StatusValue)]) -> String {
    trail
        .iter()
        .map(|(date, status)| format!("{}: {}", date.format("%Y-%m-%d"), status))
        .collect::<Vec<_>>()
        .join(", ")
}
