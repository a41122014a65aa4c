// Static HTML availability report.
// Output depends only on its inputs; the generation time is passed in, never read here.

mod table;

pub use table::{
    NO_DATA_CLASS, NO_DATA_DETAIL, ReportCell, ReportRow, ReportTable, build_table, status_class,
};

use askama::Template;
use chrono::{NaiveDate, NaiveDateTime};
use std::path::{Path, PathBuf};

use crate::aggregation::Aggregation;
use crate::models::{DailySnapshot, Dataset};
use crate::snapshot_store::{StoreError, commit, stage};
use crate::version::{NAME, VERSION};

#[derive(Debug, Clone)]
pub struct ReportOptions {
    pub title: String,
}

/// Rendered report for one target date.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportArtifact {
    pub target_date: NaiveDate,
    pub html: String,
}

pub struct LegendEntry {
    pub class: &'static str,
    pub label: &'static str,
}

pub const LEGEND: &[LegendEntry] = &[
    LegendEntry {
        class: "status-available",
        label: "Available",
    },
    LegendEntry {
        class: "status-unavailable",
        label: "Out of Host Capacity",
    },
    LegendEntry {
        class: "status-unsupported",
        label: "Hardware Not Supported",
    },
    LegendEntry {
        class: "status-unknown",
        label: "Unknown",
    },
    LegendEntry {
        class: NO_DATA_CLASS,
        label: "No data",
    },
];

#[derive(Template)]
#[template(path = "report.html")]
struct ReportPage<'a> {
    title: &'a str,
    target_date: String,
    table: &'a ReportTable,
    legend: &'a [LegendEntry],
    total_days: usize,
    generated_at: String,
    name: &'a str,
    version: &'a str,
}

/// Today when the dataset has it, otherwise the newest stored date.
pub fn select_target_date(dataset: &Dataset, today: NaiveDate) -> Option<NaiveDate> {
    if dataset.contains(today) {
        Some(today)
    } else {
        dataset.latest_date()
    }
}

pub fn render(
    target_date: NaiveDate,
    snapshot: &DailySnapshot,
    aggregation: &Aggregation,
    generated_at: NaiveDateTime,
    options: &ReportOptions,
) -> Result<ReportArtifact, askama::Error> {
    let table = build_table(snapshot, aggregation);
    let page = ReportPage {
        title: &options.title,
        target_date: target_date.format("%Y-%m-%d").to_string(),
        table: &table,
        legend: LEGEND,
        total_days: aggregation.total_days,
        generated_at: generated_at.format("%Y-%m-%d %H:%M:%S").to_string(),
        name: NAME,
        version: VERSION,
    };
    Ok(ReportArtifact {
        target_date,
        html: page.render()?,
    })
}

/// Dated file name for an artifact, e.g. "capacity_availability_2025-07-14.html".
pub fn dated_file_name(prefix: &str, target_date: NaiveDate) -> String {
    format!("{}{}.html", prefix, target_date.format("%Y-%m-%d"))
}

/// Writes the dated artifact and the stable "latest" artifact (same bytes).
/// Both are staged before either is renamed into place; if the latest rename fails
/// the dated file is removed again, so a failed run leaves no new dated page.
pub fn write_artifacts(
    output_dir: &Path,
    file_prefix: &str,
    latest_name: &str,
    artifact: &ReportArtifact,
) -> Result<Vec<PathBuf>, StoreError> {
    let dated = output_dir.join(dated_file_name(file_prefix, artifact.target_date));
    let latest = output_dir.join(latest_name);
    let bytes = artifact.html.as_bytes();
    let staged_dated = stage(&dated, bytes)?;
    let staged_latest = stage(&latest, bytes)?;

    commit(staged_dated, &dated)?;
    if let Err(e) = commit(staged_latest, &latest) {
        if let Err(cleanup) = std::fs::remove_file(&dated) {
            tracing::warn!(path = %dated.display(), error = %cleanup, "could not remove dated report");
        }
        return Err(e);
    }
    for path in [&dated, &latest] {
        tracing::info!(path = %path.display(), "report written");
    }
    Ok(vec![dated, latest])
}
