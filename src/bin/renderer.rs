// Render the HTML availability report from the persisted dataset.

use anyhow::{Context, Result};
use capacity_tracker::aggregation;
use capacity_tracker::config::AppConfig;
use capacity_tracker::report::{self, ReportOptions};
use capacity_tracker::snapshot_store::SnapshotStore;
use capacity_tracker::{logging, version};
use std::path::Path;

fn main() -> Result<()> {
    logging::init();
    tracing::info!(name = version::NAME, version = version::VERSION, "renderer starting");

    let app_config = AppConfig::load()?;
    let store = SnapshotStore::new(&app_config.storage.path, app_config.storage.retention_days);
    let dataset = store.load_existing().context("load dataset")?;
    anyhow::ensure!(
        !dataset.is_empty(),
        "dataset {} has no days; run the collector first",
        store.path().display()
    );

    let today = chrono::Local::now().date_naive();
    let target_date = report::select_target_date(&dataset, today)
        .context("dataset has no target date")?;
    if target_date != today {
        tracing::warn!(%today, %target_date, "no snapshot for today; rendering newest day");
    }
    let snapshot = dataset
        .get(target_date)
        .context("target date missing from dataset")?;

    let aggregation = aggregation::aggregate(&dataset);
    let options = ReportOptions {
        title: app_config.report.title.clone(),
    };
    let artifact = report::render(
        target_date,
        snapshot,
        &aggregation,
        chrono::Local::now().naive_local(),
        &options,
    )
    .context("render report")?;

    let written = report::write_artifacts(
        Path::new(&app_config.report.output_dir),
        &app_config.report.file_prefix,
        &app_config.report.latest_name,
        &artifact,
    )
    .context("write report")?;

    tracing::info!(
        %target_date,
        days = aggregation.total_days,
        files = written.len(),
        "renderer finished"
    );
    Ok(())
}
