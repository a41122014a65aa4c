// Capacity identity and status values

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Fault domain within an availability domain. Serializes to the API name (e.g. "FAULT-DOMAIN-1").
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum FaultDomain {
    #[serde(rename = "FAULT-DOMAIN-1")]
    Fd1,
    #[serde(rename = "FAULT-DOMAIN-2")]
    Fd2,
    #[serde(rename = "FAULT-DOMAIN-3")]
    Fd3,
}

impl FaultDomain {
    pub const ALL: [FaultDomain; 3] = [FaultDomain::Fd1, FaultDomain::Fd2, FaultDomain::Fd3];

    /// Name used by the capacity API and the persisted dataset.
    pub fn api_name(self) -> &'static str {
        match self {
            FaultDomain::Fd1 => "FAULT-DOMAIN-1",
            FaultDomain::Fd2 => "FAULT-DOMAIN-2",
            FaultDomain::Fd3 => "FAULT-DOMAIN-3",
        }
    }

    /// Short column label for the report.
    pub fn label(self) -> &'static str {
        match self {
            FaultDomain::Fd1 => "FD1",
            FaultDomain::Fd2 => "FD2",
            FaultDomain::Fd3 => "FD3",
        }
    }

    /// Parse from the API name. Unknown names yield None.
    pub fn from_api_name(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|fd| fd.api_name() == s)
    }
}

impl fmt::Display for FaultDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.api_name())
    }
}

/// Availability status of one (AD, shape, fault domain) on one day.
/// Strings outside the known set are kept verbatim in `Other` so a load/save cycle never
/// rewrites stored history; they count as not available and render as unknown.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum StatusValue {
    Available,
    OutOfHostCapacity,
    HardwareNotSupported,
    Unknown,
    Other(String),
}

impl StatusValue {
    pub fn as_str(&self) -> &str {
        match self {
            StatusValue::Available => "AVAILABLE",
            StatusValue::OutOfHostCapacity => "OUT_OF_HOST_CAPACITY",
            StatusValue::HardwareNotSupported => "HARDWARE_NOT_SUPPORTED",
            StatusValue::Unknown => "UNKNOWN",
            StatusValue::Other(raw) => raw,
        }
    }

    /// Parse a status string as sent by the API or stored on disk (e.g. "OUT_OF_HOST_CAPACITY").
    pub fn from_api(s: &str) -> Self {
        match s {
            "AVAILABLE" => StatusValue::Available,
            "OUT_OF_HOST_CAPACITY" => StatusValue::OutOfHostCapacity,
            "HARDWARE_NOT_SUPPORTED" => StatusValue::HardwareNotSupported,
            "UNKNOWN" => StatusValue::Unknown,
            other => StatusValue::Other(other.to_string()),
        }
    }

    pub fn is_available(&self) -> bool {
        *self == StatusValue::Available
    }
}

impl fmt::Display for StatusValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for StatusValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for StatusValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(StatusValue::from_api(&raw))
    }
}

/// Identity of one measurement series. Ordered by AD, then shape, then fault domain.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CapacityKey {
    pub availability_domain: String,
    pub shape: String,
    pub fault_domain: FaultDomain,
}

impl CapacityKey {
    pub fn new(
        availability_domain: impl Into<String>,
        shape: impl Into<String>,
        fault_domain: FaultDomain,
    ) -> Self {
        Self {
            availability_domain: availability_domain.into(),
            shape: shape.into(),
            fault_domain,
        }
    }
}

impl fmt::Display for CapacityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}",
            self.availability_domain, self.shape, self.fault_domain
        )
    }
}
