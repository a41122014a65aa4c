// Collector tests against an in-memory capacity API: fail-open behaviour, ordering, pacing

mod common;

use capacity_tracker::aggregation::aggregate;
use capacity_tracker::collector::{CollectOptions, collect, preflight};
use capacity_tracker::models::*;
use capacity_tracker::report::{NO_DATA_CLASS, NO_DATA_DETAIL, build_table};
use capacity_tracker::snapshot_store::SnapshotStore;
use common::*;
use std::time::Duration;
use tempfile::TempDir;

const LONDON_1: &str = "UK-LONDON-1-AD-1";
const LONDON_2: &str = "UK-LONDON-1-AD-2";
const FRANKFURT_1: &str = "EU-FRANKFURT-1-AD-1";

fn options(concurrency: usize) -> CollectOptions {
    CollectOptions {
        compartment_id: "ocid1.tenancy.oc1..aaaa".into(),
        inter_ad_delay: Duration::from_secs(2),
        max_concurrent_domains: concurrency,
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[tokio::test(start_paused = true)]
async fn collects_every_ad_and_shape() {
    let factory = FakeFactory::new(
        FakeApi::default().status(LONDON_2, "BM.B", StatusValue::OutOfHostCapacity),
    );
    let collection = collect(
        &factory,
        date("2025-07-14"),
        &strings(&[LONDON_1, LONDON_2]),
        &strings(&["BM.A", "BM.B"]),
        &FaultDomain::ALL,
        &options(1),
    )
    .await;

    assert_eq!(collection.summary.domains_collected, 2);
    assert!(collection.summary.domains_skipped.is_empty());
    assert!(collection.summary.shapes_failed.is_empty());
    let snapshot = &collection.snapshot;
    assert_eq!(snapshot.domain_names(), vec![LONDON_1, LONDON_2]);
    let key = CapacityKey::new(LONDON_2, "BM.B", FaultDomain::Fd3);
    assert_eq!(
        snapshot.status(&key).unwrap().availability_status,
        StatusValue::OutOfHostCapacity
    );
    assert_eq!(snapshot.status(&key).unwrap().instance_shape, "BM.B");
}

#[tokio::test(start_paused = true)]
async fn requests_use_qualified_ad_name() {
    let factory = FakeFactory::new(FakeApi::default());
    collect(
        &factory,
        date("2025-07-14"),
        &strings(&[LONDON_2]),
        &strings(&["BM.A"]),
        &[FaultDomain::Fd1, FaultDomain::Fd2],
        &options(1),
    )
    .await;
    let requests = factory.api.recorded();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].availability_domain, "abCD:UK-LONDON-1-AD-2");
    assert_eq!(requests[0].compartment_id, "ocid1.tenancy.oc1..aaaa");
    assert_eq!(
        requests[0].fault_domains,
        vec![FaultDomain::Fd1, FaultDomain::Fd2]
    );
}

#[tokio::test(start_paused = true)]
async fn failed_shape_is_omitted_and_others_kept() {
    let factory = FakeFactory::new(FakeApi::default().timeout(LONDON_2, "BM.B"));
    let collection = collect(
        &factory,
        date("2025-07-14"),
        &strings(&[LONDON_1, LONDON_2]),
        &strings(&["BM.A", "BM.B"]),
        &FaultDomain::ALL,
        &options(1),
    )
    .await;

    let snapshot = &collection.snapshot;
    let london_2 = snapshot.domain(LONDON_2).expect("AD still collected");
    assert!(london_2.shape("BM.A").is_some());
    assert!(london_2.shape("BM.B").is_none());
    assert!(snapshot.domain(LONDON_1).unwrap().shape("BM.B").is_some());
    assert_eq!(
        collection.summary.shapes_failed,
        vec![(LONDON_2.to_string(), "BM.B".to_string())]
    );
}

#[tokio::test(start_paused = true)]
async fn unreachable_region_skips_only_that_ad() {
    let factory = FakeFactory::new(FakeApi::default().unreachable("eu-frankfurt-1"));
    let collection = collect(
        &factory,
        date("2025-07-14"),
        &strings(&[FRANKFURT_1, LONDON_1]),
        &strings(&["BM.A"]),
        &FaultDomain::ALL,
        &options(1),
    )
    .await;

    assert_eq!(collection.summary.domains_skipped, vec![FRANKFURT_1.to_string()]);
    assert_eq!(collection.snapshot.domain_names(), vec![LONDON_1]);
}

#[tokio::test(start_paused = true)]
async fn failed_listing_skips_ad() {
    let factory = FakeFactory::new(FakeApi::default().failing_listing("uk-london-1"));
    let collection = collect(
        &factory,
        date("2025-07-14"),
        &strings(&[LONDON_1, FRANKFURT_1]),
        &strings(&["BM.A"]),
        &FaultDomain::ALL,
        &options(1),
    )
    .await;

    assert_eq!(collection.summary.domains_skipped, vec![LONDON_1.to_string()]);
    assert_eq!(collection.snapshot.domain_names(), vec![FRANKFURT_1]);
    assert!(
        factory
            .api
            .recorded()
            .iter()
            .all(|r| r.availability_domain.ends_with(FRANKFURT_1))
    );
}

#[tokio::test(start_paused = true)]
async fn ad_without_region_suffix_is_skipped() {
    let factory = FakeFactory::new(FakeApi::default());
    let collection = collect(
        &factory,
        date("2025-07-14"),
        &strings(&["not-an-ad", LONDON_1]),
        &strings(&["BM.A"]),
        &FaultDomain::ALL,
        &options(1),
    )
    .await;
    assert_eq!(collection.summary.domains_skipped, vec!["not-an-ad".to_string()]);
    assert_eq!(collection.summary.domains_collected, 1);
}

#[tokio::test(start_paused = true)]
async fn concurrent_collection_keeps_configured_order() {
    let factory = FakeFactory::new(FakeApi::default());
    let ads = strings(&[FRANKFURT_1, LONDON_2, LONDON_1]);
    let collection = collect(
        &factory,
        date("2025-07-14"),
        &ads,
        &strings(&["BM.A", "BM.B"]),
        &FaultDomain::ALL,
        &options(3),
    )
    .await;
    assert_eq!(
        collection.snapshot.domain_names(),
        vec![FRANKFURT_1, LONDON_2, LONDON_1]
    );
    assert_eq!(collection.summary.domains_collected, 3);
}

#[tokio::test(start_paused = true)]
async fn sequential_collection_pauses_between_ads() {
    let factory = FakeFactory::new(FakeApi::default());
    let started = tokio::time::Instant::now();
    collect(
        &factory,
        date("2025-07-14"),
        &strings(&[LONDON_1, LONDON_2, FRANKFURT_1]),
        &strings(&["BM.A"]),
        &FaultDomain::ALL,
        &options(1),
    )
    .await;
    // Two pauses: none after the last AD.
    assert_eq!(started.elapsed(), Duration::from_secs(4));
}

#[tokio::test(start_paused = true)]
async fn concurrent_collection_spaces_out_ad_starts() {
    let factory = FakeFactory::new(FakeApi::default().with_latency(Duration::from_secs(5)));
    let started = tokio::time::Instant::now();
    let collection = collect(
        &factory,
        date("2025-07-14"),
        &strings(&[LONDON_1, LONDON_2, FRANKFURT_1]),
        &strings(&["BM.A"]),
        &FaultDomain::ALL,
        &options(3),
    )
    .await;
    assert_eq!(collection.summary.domains_collected, 3);

    let offsets: Vec<Duration> = factory
        .api
        .domain_start_times()
        .into_iter()
        .map(|(_, at)| at - started)
        .collect();
    assert_eq!(
        offsets,
        vec![
            Duration::ZERO,
            Duration::from_secs(2),
            Duration::from_secs(4)
        ]
    );
    // Queries overlap: the last AD starts at 4s and takes 5s.
    assert_eq!(started.elapsed(), Duration::from_secs(9));
}

#[tokio::test(start_paused = true)]
async fn sequential_collection_pauses_after_each_ad_finishes() {
    let factory = FakeFactory::new(FakeApi::default().with_latency(Duration::from_secs(5)));
    let started = tokio::time::Instant::now();
    collect(
        &factory,
        date("2025-07-14"),
        &strings(&[LONDON_1, LONDON_2]),
        &strings(&["BM.A"]),
        &FaultDomain::ALL,
        &options(1),
    )
    .await;
    let offsets: Vec<Duration> = factory
        .api
        .domain_start_times()
        .into_iter()
        .map(|(_, at)| at - started)
        .collect();
    assert_eq!(offsets, vec![Duration::ZERO, Duration::from_secs(7)]);
    assert_eq!(started.elapsed(), Duration::from_secs(12));
}

#[tokio::test(start_paused = true)]
async fn timed_out_shape_renders_as_no_data() {
    let dir = TempDir::new().unwrap();
    let store = SnapshotStore::new(dir.path().join("capacity_report.json"), 31);
    let yesterday = date("2025-07-13");
    let today = date("2025-07-14");
    let existing = dataset_of(vec![(
        "2025-07-13",
        snapshot_of(&[
            (LONDON_1, "BM.A", StatusValue::Available),
            (LONDON_2, "BM.A", StatusValue::Available),
            (LONDON_2, "BM.B", StatusValue::Available),
        ]),
    )]);
    store.save(&existing).unwrap();

    let factory = FakeFactory::new(FakeApi::default().timeout(LONDON_2, "BM.B"));
    let collection = collect(
        &factory,
        today,
        &strings(&[LONDON_1, LONDON_2]),
        &strings(&["BM.A", "BM.B"]),
        &FaultDomain::ALL,
        &options(1),
    )
    .await;
    let dataset = store.load().unwrap();
    let updated = store.apply_day(&dataset, today, collection.snapshot, today);
    store.save(&updated).unwrap();

    let reloaded = store.load_existing().unwrap();
    assert!(reloaded.contains(yesterday));
    let snapshot = reloaded.get(today).unwrap();
    let table = build_table(snapshot, &aggregate(&reloaded));
    for fd in FaultDomain::ALL {
        let missing = table
            .cell(&CapacityKey::new(LONDON_2, "BM.B", fd))
            .expect("cell for every AD, shape and fault domain");
        assert_eq!(missing.css_class(), NO_DATA_CLASS);
        assert!(!missing.has_data());
        assert_eq!(missing.detail, NO_DATA_DETAIL);

        let present = table.cell(&CapacityKey::new(LONDON_1, "BM.B", fd)).unwrap();
        assert_eq!(present.css_class(), "status-available");
        assert_eq!(present.display(), "50%");
    }
}

#[tokio::test(start_paused = true)]
async fn preflight_resolves_tenancy() {
    let factory = FakeFactory::new(FakeApi::default());
    let tenancy = preflight(&factory, "uk-london-1", "ocid1.tenancy.oc1..aaaa")
        .await
        .expect("tenancy");
    assert_eq!(tenancy.id, "ocid1.tenancy.oc1..aaaa");
}

#[tokio::test(start_paused = true)]
async fn preflight_fails_for_unreachable_home_region() {
    let factory = FakeFactory::new(FakeApi::default().unreachable("uk-london-1"));
    let err = preflight(&factory, "uk-london-1", "ocid1.tenancy.oc1..aaaa")
        .await
        .unwrap_err();
    assert!(err.to_string().contains("uk-london-1"));
}
