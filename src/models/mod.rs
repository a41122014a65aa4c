// Domain models: capacity keys, daily snapshots, retained dataset

mod capacity;
mod dataset;
mod snapshot;

pub use capacity::{CapacityKey, FaultDomain, StatusValue};
pub use dataset::Dataset;
pub use snapshot::{DailySnapshot, DomainSnapshot, FaultDomainStatus, ShapeAvailability};
