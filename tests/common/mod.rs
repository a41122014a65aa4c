// Shared test helpers: snapshot builders and an in-memory capacity client
#![allow(dead_code)]

use capacity_tracker::capacity_client::{
    CapacityClient, CapacityReportRequest, ClientError, ClientFactory, ShapeAvailabilityReport,
    Tenancy,
};
use capacity_tracker::models::*;
use chrono::NaiveDate;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

pub fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

/// Shape entry with the same status in every listed fault domain.
pub fn shape_with(shape: &str, statuses: &[(FaultDomain, StatusValue)]) -> ShapeAvailability {
    ShapeAvailability {
        fault_domains: statuses
            .iter()
            .map(|(fd, status)| (*fd, FaultDomainStatus::new(shape, status.clone())))
            .collect(),
    }
}

pub fn shape_all(shape: &str, status: StatusValue) -> ShapeAvailability {
    let statuses: Vec<_> = FaultDomain::ALL
        .iter()
        .map(|fd| (*fd, status.clone()))
        .collect();
    shape_with(shape, &statuses)
}

/// Snapshot from (AD, shape, status) triples; every fault domain gets the status.
/// ADs keep first-seen order.
pub fn snapshot_of(entries: &[(&str, &str, StatusValue)]) -> DailySnapshot {
    let mut order: Vec<String> = Vec::new();
    let mut domains: HashMap<String, DomainSnapshot> = HashMap::new();
    for (ad, shape, status) in entries {
        if !domains.contains_key(*ad) {
            order.push(ad.to_string());
        }
        domains
            .entry(ad.to_string())
            .or_default()
            .shapes
            .insert(shape.to_string(), shape_all(shape, status.clone()));
    }
    let mut snapshot = DailySnapshot::new();
    for ad in order {
        let domain = domains.remove(&ad).unwrap_or_default();
        snapshot.insert_domain(ad, domain);
    }
    snapshot
}

pub fn dataset_of(days: Vec<(&str, DailySnapshot)>) -> Dataset {
    days.into_iter().map(|(d, s)| (date(d), s)).collect()
}

/// Behaviour of the fake capacity API, shared by every client it hands out.
#[derive(Default)]
pub struct FakeApi {
    /// Regions for which no client can be built.
    pub unreachable_regions: HashSet<String>,
    /// Regions whose availability domain listing fails.
    pub listing_fails: HashSet<String>,
    /// (plain AD, shape) pairs whose capacity query times out.
    pub timeouts: HashSet<(String, String)>,
    /// (plain AD, shape) -> status; anything else is AVAILABLE.
    pub statuses: HashMap<(String, String), StatusValue>,
    /// Simulated time each capacity query takes.
    pub latency: Duration,
    /// Capacity requests in the order they were received, with the (paused-clock) time.
    pub requests: Mutex<Vec<(Instant, CapacityReportRequest)>>,
}

impl FakeApi {
    pub fn timeout(mut self, ad: &str, shape: &str) -> Self {
        self.timeouts.insert((ad.to_string(), shape.to_string()));
        self
    }

    pub fn status(mut self, ad: &str, shape: &str, status: StatusValue) -> Self {
        self.statuses
            .insert((ad.to_string(), shape.to_string()), status);
        self
    }

    pub fn unreachable(mut self, region: &str) -> Self {
        self.unreachable_regions.insert(region.to_string());
        self
    }

    pub fn failing_listing(mut self, region: &str) -> Self {
        self.listing_fails.insert(region.to_string());
        self
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn recorded(&self) -> Vec<CapacityReportRequest> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .map(|(_, r)| r.clone())
            .collect()
    }

    /// When the first query for each fully qualified AD arrived, in arrival order.
    pub fn domain_start_times(&self) -> Vec<(String, Instant)> {
        let mut starts: Vec<(String, Instant)> = Vec::new();
        for (at, request) in self.requests.lock().unwrap().iter() {
            if !starts.iter().any(|(ad, _)| *ad == request.availability_domain) {
                starts.push((request.availability_domain.clone(), *at));
            }
        }
        starts
    }
}

#[derive(Clone)]
pub struct FakeFactory {
    pub api: Arc<FakeApi>,
}

impl FakeFactory {
    pub fn new(api: FakeApi) -> Self {
        Self { api: Arc::new(api) }
    }
}

impl ClientFactory for FakeFactory {
    type Client = FakeClient;

    fn client_for(&self, region: &str) -> Result<FakeClient, ClientError> {
        if self.api.unreachable_regions.contains(region) {
            return Err(ClientError::Config(format!("unknown region {}", region)));
        }
        Ok(FakeClient {
            region: region.to_string(),
            api: self.api.clone(),
        })
    }
}

pub struct FakeClient {
    region: String,
    api: Arc<FakeApi>,
}

impl CapacityClient for FakeClient {
    fn region(&self) -> &str {
        &self.region
    }

    async fn get_tenancy(&self, tenancy_id: &str) -> Result<Tenancy, ClientError> {
        if tenancy_id.is_empty() {
            return Err(ClientError::Api {
                operation: "get_tenancy",
                status: 404,
                code: "NotAuthorizedOrNotFound".into(),
                message: "tenancy not found".into(),
            });
        }
        Ok(Tenancy {
            id: tenancy_id.to_string(),
            name: "example-tenancy".into(),
        })
    }

    async fn list_availability_domains(
        &self,
        _compartment_id: &str,
    ) -> Result<Vec<String>, ClientError> {
        if self.api.listing_fails.contains(&self.region) {
            return Err(ClientError::Api {
                operation: "list_availability_domains",
                status: 500,
                code: "InternalError".into(),
                message: "listing failed".into(),
            });
        }
        let upper = self.region.to_uppercase();
        Ok((1..=3).map(|n| format!("abCD:{}-AD-{}", upper, n)).collect())
    }

    async fn create_capacity_report(
        &self,
        request: &CapacityReportRequest,
    ) -> Result<Vec<ShapeAvailabilityReport>, ClientError> {
        self.api
            .requests
            .lock()
            .unwrap()
            .push((Instant::now(), request.clone()));
        if !self.api.latency.is_zero() {
            tokio::time::sleep(self.api.latency).await;
        }
        let plain = request
            .availability_domain
            .split_once(':')
            .map(|(_, ad)| ad)
            .unwrap_or(&request.availability_domain)
            .to_string();
        let key = (plain, request.shape.clone());
        if self.api.timeouts.contains(&key) {
            return Err(ClientError::Timeout {
                operation: "create_capacity_report",
            });
        }
        let status = self
            .api
            .statuses
            .get(&key)
            .cloned()
            .unwrap_or(StatusValue::Available);
        Ok(request
            .fault_domains
            .iter()
            .map(|fd| ShapeAvailabilityReport {
                fault_domain: fd.api_name().to_string(),
                availability_status: status.clone(),
                available_count: Some(if status.is_available() { 1 } else { 0 }),
                instance_shape: request.shape.clone(),
                instance_shape_config: None,
            })
            .collect())
    }
}
