// One day's capacity snapshot: AD -> shape -> fault domain -> status.
// JSON layout matches the persisted dataset; AD order is kept as written.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use super::{CapacityKey, FaultDomain, StatusValue};

/// Status record for one fault domain. Count and shape config are carried through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaultDomainStatus {
    pub availability_status: StatusValue,
    #[serde(default)]
    pub available_count: Option<i64>,
    #[serde(default)]
    pub instance_shape: String,
    #[serde(default)]
    pub instance_shape_config: Option<serde_json::Value>,
}

impl FaultDomainStatus {
    pub fn new(instance_shape: impl Into<String>, availability_status: StatusValue) -> Self {
        Self {
            availability_status,
            available_count: None,
            instance_shape: instance_shape.into(),
            instance_shape_config: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ShapeAvailability {
    #[serde(default)]
    pub fault_domains: BTreeMap<FaultDomain, FaultDomainStatus>,
}

/// Shapes reported for one availability domain.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DomainSnapshot {
    pub shapes: BTreeMap<String, ShapeAvailability>,
}

impl DomainSnapshot {
    pub fn shape(&self, shape: &str) -> Option<&ShapeAvailability> {
        self.shapes.get(shape)
    }
}

/// One calendar day's fetch result. Availability domains keep insertion order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DailySnapshot {
    domains: IndexMap<String, DomainSnapshot>,
}

impl DailySnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a domain, replacing an existing one with the same name in place.
    pub fn insert_domain(&mut self, name: impl Into<String>, domain: DomainSnapshot) {
        self.domains.insert(name.into(), domain);
    }

    pub fn domain(&self, name: &str) -> Option<&DomainSnapshot> {
        self.domains.get(name)
    }

    /// Domains in insertion order.
    pub fn domains(&self) -> impl Iterator<Item = (&str, &DomainSnapshot)> {
        self.domains.iter().map(|(n, d)| (n.as_str(), d))
    }

    pub fn domain_names(&self) -> Vec<&str> {
        self.domains.keys().map(String::as_str).collect()
    }

    /// Union of shape names across all domains, sorted.
    pub fn shape_names(&self) -> Vec<&str> {
        let set: BTreeSet<&str> = self
            .domains
            .values()
            .flat_map(|d| d.shapes.keys().map(String::as_str))
            .collect();
        set.into_iter().collect()
    }

    pub fn status(&self, key: &CapacityKey) -> Option<&FaultDomainStatus> {
        self.domain(&key.availability_domain)?
            .shape(&key.shape)?
            .fault_domains
            .get(&key.fault_domain)
    }

    /// Every (key, status) present, in domain order then shape then fault domain.
    pub fn entries(&self) -> impl Iterator<Item = (CapacityKey, &FaultDomainStatus)> {
        self.domains.iter().flat_map(|(ad, domain)| {
            domain.shapes.iter().flat_map(move |(shape, availability)| {
                availability
                    .fault_domains
                    .iter()
                    .map(move |(fd, status)| (CapacityKey::new(ad.as_str(), shape.as_str(), *fd), status))
            })
        })
    }

    pub fn len(&self) -> usize {
        self.domains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.domains.is_empty()
    }
}
