// Daily capacity collection: every configured (AD, shape) against the capacity API.
// Fail-open per call: an AD whose region or name cannot be resolved is skipped, a failed shape
// query is omitted, and the rest of the day is still collected. Nothing is written here.

use chrono::NaiveDate;
use futures_util::stream::{self, StreamExt};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{info, warn};

use crate::capacity_client::{
    CapacityClient, CapacityReportRequest, ClientFactory, ShapeAvailabilityReport, Tenancy,
};
use crate::models::{DailySnapshot, DomainSnapshot, FaultDomain, FaultDomainStatus, ShapeAvailability};

#[derive(Debug, Clone)]
pub struct CollectOptions {
    pub compartment_id: String,
    /// Minimum gap between starting one availability domain and starting the next, and between
    /// finishing one and starting the next. Applies across all concurrent slots.
    pub inter_ad_delay: Duration,
    /// Availability domains in flight at once; results are still assembled in list order.
    pub max_concurrent_domains: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectSummary {
    pub domains_collected: usize,
    pub domains_skipped: Vec<String>,
    /// (AD, shape) pairs whose query failed.
    pub shapes_failed: Vec<(String, String)>,
}

#[derive(Debug, Clone)]
pub struct Collection {
    pub snapshot: DailySnapshot,
    pub summary: CollectSummary,
}

enum DomainOutcome {
    Collected {
        ad: String,
        domain: DomainSnapshot,
        failed_shapes: Vec<String>,
    },
    Skipped {
        ad: String,
    },
}

/// Region of an availability domain name: "UK-LONDON-1-AD-1" -> "uk-london-1".
pub fn region_of(ad: &str) -> Option<String> {
    let (region, _) = ad.split_once("-AD-")?;
    if region.is_empty() {
        return None;
    }
    Some(region.to_lowercase())
}

/// Fully qualified AD name. The tenancy-specific prefix comes from the first listed domain
/// ("abCD:UK-LONDON-1-AD-1" -> "abCD:<ad>").
pub fn qualify_ad(listed: &[String], ad: &str) -> Option<String> {
    let (prefix, _) = listed.first()?.split_once(':')?;
    if prefix.is_empty() {
        return None;
    }
    Some(format!("{}:{}", prefix, ad))
}

/// Resolve the tenancy in the home region. Any failure here is fatal for the run.
pub async fn preflight<F: ClientFactory>(
    factory: &F,
    home_region: &str,
    tenancy_id: &str,
) -> anyhow::Result<Tenancy> {
    let client = factory
        .client_for(home_region)
        .map_err(|e| anyhow::anyhow!("client for home region {}: {}", home_region, e))?;
    let tenancy = client
        .get_tenancy(tenancy_id)
        .await
        .map_err(|e| anyhow::anyhow!("resolve tenancy {}: {}", tenancy_id, e))?;
    info!(tenancy = %tenancy.name, id = %tenancy.id, "tenancy resolved");
    Ok(tenancy)
}

/// Collect one day's snapshot. Never fails; failures show up in the summary and as missing data.
pub async fn collect<F: ClientFactory>(
    factory: &F,
    date: NaiveDate,
    availability_domains: &[String],
    shapes: &[String],
    fault_domains: &[FaultDomain],
    options: &CollectOptions,
) -> Collection {
    let pacer = &Pacer::new(options.inter_ad_delay);
    let outcomes: Vec<DomainOutcome> = stream::iter(availability_domains)
        .map(move |ad| async move {
            pacer.ready().await;
            let outcome = collect_domain(factory, date, ad, shapes, fault_domains, options).await;
            pacer.finished().await;
            outcome
        })
        .buffered(options.max_concurrent_domains.max(1))
        .collect()
        .await;

    let mut snapshot = DailySnapshot::new();
    let mut summary = CollectSummary::default();
    for outcome in outcomes {
        match outcome {
            DomainOutcome::Collected {
                ad,
                domain,
                failed_shapes,
            } => {
                summary.domains_collected += 1;
                summary
                    .shapes_failed
                    .extend(failed_shapes.into_iter().map(|s| (ad.clone(), s)));
                snapshot.insert_domain(ad, domain);
            }
            DomainOutcome::Skipped { ad } => summary.domains_skipped.push(ad),
        }
    }

    info!(
        %date,
        domains_collected = summary.domains_collected,
        domains_skipped = summary.domains_skipped.len(),
        shapes_failed = summary.shapes_failed.len(),
        "collection finished"
    );
    Collection { snapshot, summary }
}

/// Spaces out availability domain starts. One instance is shared by every in-flight slot,
/// so the request rate stays bounded whatever the concurrency.
struct Pacer {
    delay: Duration,
    next_start: Mutex<Instant>,
}

impl Pacer {
    fn new(delay: Duration) -> Self {
        Self {
            delay,
            next_start: Mutex::new(Instant::now()),
        }
    }

    /// Waits for this slot's turn. Turns are handed out in arrival order.
    async fn ready(&self) {
        if self.delay.is_zero() {
            return;
        }
        let mut next_start = self.next_start.lock().await;
        tokio::time::sleep_until(*next_start).await;
        *next_start = Instant::now() + self.delay;
    }

    /// Pushes the next start to at least `delay` after this domain finished.
    async fn finished(&self) {
        if self.delay.is_zero() {
            return;
        }
        let mut next_start = self.next_start.lock().await;
        *next_start = (*next_start).max(Instant::now() + self.delay);
    }
}

async fn collect_domain<F: ClientFactory>(
    factory: &F,
    date: NaiveDate,
    ad: &str,
    shapes: &[String],
    fault_domains: &[FaultDomain],
    options: &CollectOptions,
) -> DomainOutcome {
    let skipped = || DomainOutcome::Skipped { ad: ad.to_string() };

    let Some(region) = region_of(ad) else {
        warn!(ad, %date, "cannot derive region from availability domain; skipped");
        return skipped();
    };
    let client = match factory.client_for(&region) {
        Ok(c) => c,
        Err(e) => {
            warn!(ad, region = %region, %date, error = %e, "no client for region; skipped");
            return skipped();
        }
    };
    let listed = match client
        .list_availability_domains(&options.compartment_id)
        .await
    {
        Ok(l) => l,
        Err(e) => {
            warn!(ad, region = %region, %date, error = %e, "availability domain lookup failed; skipped");
            return skipped();
        }
    };
    let Some(qualified) = qualify_ad(&listed, ad) else {
        warn!(ad, region = %region, %date, listed = listed.len(), "cannot qualify availability domain name; skipped");
        return skipped();
    };

    let mut domain = DomainSnapshot::default();
    let mut failed_shapes = Vec::new();
    for shape in shapes {
        let request = CapacityReportRequest {
            compartment_id: options.compartment_id.clone(),
            availability_domain: qualified.clone(),
            shape: shape.clone(),
            fault_domains: fault_domains.to_vec(),
        };
        match client.create_capacity_report(&request).await {
            Ok(reports) => {
                let availability = shape_availability(ad, shape, date, reports);
                if availability.fault_domains.is_empty() {
                    warn!(ad, shape = %shape, %date, "capacity report had no fault domain entries; shape omitted");
                    failed_shapes.push(shape.clone());
                } else {
                    domain.shapes.insert(shape.clone(), availability);
                }
            }
            Err(e) => {
                warn!(ad, shape = %shape, %date, error = %e, "capacity query failed; shape omitted");
                failed_shapes.push(shape.clone());
            }
        }
    }

    info!(
        ad,
        region = %region,
        shapes = domain.shapes.len(),
        failed = failed_shapes.len(),
        "availability domain collected"
    );
    DomainOutcome::Collected {
        ad: ad.to_string(),
        domain,
        failed_shapes,
    }
}

fn shape_availability(
    ad: &str,
    shape: &str,
    date: NaiveDate,
    reports: Vec<ShapeAvailabilityReport>,
) -> ShapeAvailability {
    let mut availability = ShapeAvailability::default();
    for report in reports {
        let Some(fd) = FaultDomain::from_api_name(&report.fault_domain) else {
            warn!(ad, shape, %date, fault_domain = %report.fault_domain, "unknown fault domain in report; ignored");
            continue;
        };
        availability.fault_domains.insert(
            fd,
            FaultDomainStatus {
                availability_status: report.availability_status,
                available_count: report.available_count,
                instance_shape: report.instance_shape,
                instance_shape_config: report.instance_shape_config,
            },
        );
    }
    availability
}
