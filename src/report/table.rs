// Report table as plain data: one row per AD, one cell per (shape, fault domain).

use crate::aggregation::{Aggregation, display_percentage, format_trail};
use crate::models::{CapacityKey, DailySnapshot, FaultDomain, StatusValue};

pub const NO_DATA_CLASS: &str = "status-nodata";
pub const NO_DATA_DETAIL: &str = "No data";

/// CSS class for a status on the report day.
pub fn status_class(status: &StatusValue) -> &'static str {
    match status {
        StatusValue::Available => "status-available",
        StatusValue::OutOfHostCapacity => "status-unavailable",
        StatusValue::HardwareNotSupported => "status-unsupported",
        StatusValue::Unknown | StatusValue::Other(_) => "status-unknown",
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReportCell {
    pub key: CapacityKey,
    /// Status on the report day; None when the day has no entry for this key.
    pub status: Option<StatusValue>,
    /// Window percentage at full precision (0 for no-data cells).
    pub percentage: f64,
    /// Tooltip: history trail, or "No data".
    pub detail: String,
}

impl ReportCell {
    pub fn has_data(&self) -> bool {
        self.status.is_some()
    }

    pub fn css_class(&self) -> &'static str {
        self.status.as_ref().map(status_class).unwrap_or(NO_DATA_CLASS)
    }

    pub fn display(&self) -> String {
        format!("{}%", display_percentage(self.percentage))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReportRow {
    pub availability_domain: String,
    pub cells: Vec<ReportCell>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReportTable {
    /// Union of shapes on the report day, sorted.
    pub shapes: Vec<String>,
    pub fault_domains: Vec<FaultDomain>,
    /// In the snapshot's AD order.
    pub rows: Vec<ReportRow>,
}

impl ReportTable {
    pub fn cell(&self, key: &CapacityKey) -> Option<&ReportCell> {
        self.rows
            .iter()
            .find(|r| r.availability_domain == key.availability_domain)?
            .cells
            .iter()
            .find(|c| c.key == *key)
    }
}

pub fn build_table(snapshot: &DailySnapshot, aggregation: &Aggregation) -> ReportTable {
    let shapes: Vec<String> = snapshot.shape_names().into_iter().map(String::from).collect();
    let fault_domains = FaultDomain::ALL.to_vec();

    let rows = snapshot
        .domain_names()
        .into_iter()
        .map(|ad| {
            let cells = shapes
                .iter()
                .flat_map(|shape| {
                    fault_domains
                        .iter()
                        .map(move |fd| CapacityKey::new(ad, shape.as_str(), *fd))
                })
                .map(|key| match snapshot.status(&key) {
                    Some(status) => ReportCell {
                        status: Some(status.availability_status.clone()),
                        percentage: aggregation.percentage(&key),
                        detail: format_trail(aggregation.history(&key)),
                        key,
                    },
                    None => ReportCell {
                        key,
                        status: None,
                        percentage: 0.0,
                        detail: NO_DATA_DETAIL.to_string(),
                    },
                })
                .collect();
            ReportRow {
                availability_domain: ad.to_string(),
                cells,
            }
        })
        .collect();

    ReportTable {
        shapes,
        fault_domains,
        rows,
    }
}
