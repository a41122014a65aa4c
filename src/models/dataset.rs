// Multi-day dataset keyed by calendar date (ascending).

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::DailySnapshot;

/// Retained history: one snapshot per date. Iterates oldest first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Dataset {
    days: BTreeMap<NaiveDate, DailySnapshot>,
}

impl Dataset {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.days.len()
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    pub fn get(&self, date: NaiveDate) -> Option<&DailySnapshot> {
        self.days.get(&date)
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.days.contains_key(&date)
    }

    /// Insert or replace the snapshot for `date`. Returns the replaced snapshot, if any.
    pub fn insert(&mut self, date: NaiveDate, snapshot: DailySnapshot) -> Option<DailySnapshot> {
        self.days.insert(date, snapshot)
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = (NaiveDate, &DailySnapshot)> {
        self.days.iter().map(|(d, s)| (*d, s))
    }

    pub fn dates(&self) -> impl DoubleEndedIterator<Item = NaiveDate> + '_ {
        self.days.keys().copied()
    }

    pub fn oldest_date(&self) -> Option<NaiveDate> {
        self.days.keys().next().copied()
    }

    pub fn latest_date(&self) -> Option<NaiveDate> {
        self.days.keys().next_back().copied()
    }
}

impl FromIterator<(NaiveDate, DailySnapshot)> for Dataset {
    fn from_iter<I: IntoIterator<Item = (NaiveDate, DailySnapshot)>>(iter: I) -> Self {
        Self {
            days: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for Dataset {
    type Item = (NaiveDate, DailySnapshot);
    type IntoIter = std::collections::btree_map::IntoIter<NaiveDate, DailySnapshot>;

    fn into_iter(self) -> Self::IntoIter {
        self.days.into_iter()
    }
}
