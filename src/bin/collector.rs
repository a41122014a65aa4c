// Daily collection run: query every configured (AD, shape), merge today's snapshot, persist.

use anyhow::{Context, Result};
use capacity_tracker::capacity_client::OciClientFactory;
use capacity_tracker::collector::{self, CollectOptions};
use capacity_tracker::config::AppConfig;
use capacity_tracker::snapshot_store::SnapshotStore;
use capacity_tracker::{logging, version};
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<()> {
    logging::init();
    tracing::info!(name = version::NAME, version = version::VERSION, "collector starting");

    let app_config = AppConfig::load()?;
    let (collector_config, oci_config) = app_config.require_collector()?;

    let store = SnapshotStore::new(&app_config.storage.path, app_config.storage.retention_days);
    // A corrupt dataset stops the run; overwriting it would lose history.
    let dataset = store.load().context("load dataset")?;
    store
        .check_writable()
        .context("dataset location is not writable")?;

    let factory = OciClientFactory::from_config(oci_config).context("build OCI client")?;
    collector::preflight(&factory, &oci_config.region, &oci_config.tenancy).await?;

    let today = chrono::Local::now().date_naive();
    let options = CollectOptions {
        compartment_id: oci_config.compartment_id().to_string(),
        inter_ad_delay: Duration::from_millis(collector_config.inter_ad_delay_ms),
        max_concurrent_domains: collector_config.max_concurrent_domains,
    };
    let collection = collector::collect(
        &factory,
        today,
        &collector_config.availability_domains,
        &collector_config.shapes,
        &collector_config.fault_domains,
        &options,
    )
    .await;

    for ad in &collection.summary.domains_skipped {
        tracing::warn!(ad = %ad, "availability domain has no data for today");
    }

    let updated = store.apply_day(&dataset, today, collection.snapshot, today);
    store.save(&updated).context("save dataset")?;

    tracing::info!(
        date = %today,
        days = updated.len(),
        domains_collected = collection.summary.domains_collected,
        domains_skipped = collection.summary.domains_skipped.len(),
        shapes_failed = collection.summary.shapes_failed.len(),
        "collector finished"
    );
    Ok(())
}
