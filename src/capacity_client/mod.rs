// Capacity report API boundary.
// A factory hands out one immutable client per region; nothing is re-targeted in place.

mod oci;
mod retry;
mod signer;

pub use oci::{OciClient, OciClientFactory};
pub use retry::RetryPolicy;
pub use signer::{RequestSigner, SignedHeaders, SignerError};

use std::future::Future;
use thiserror::Error;

use crate::models::{FaultDomain, StatusValue};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tenancy {
    pub id: String,
    pub name: String,
}

/// One capacity query: a shape in one availability domain, across the given fault domains.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapacityReportRequest {
    pub compartment_id: String,
    /// Fully qualified name, e.g. "abCD:UK-LONDON-1-AD-1".
    pub availability_domain: String,
    pub shape: String,
    pub fault_domains: Vec<FaultDomain>,
}

/// Per-fault-domain answer from a capacity report.
#[derive(Debug, Clone, PartialEq)]
pub struct ShapeAvailabilityReport {
    pub fault_domain: String,
    pub availability_status: StatusValue,
    pub available_count: Option<i64>,
    pub instance_shape: String,
    pub instance_shape_config: Option<serde_json::Value>,
}

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("{operation}: HTTP {status} {code}: {message}")]
    Api {
        operation: &'static str,
        status: u16,
        code: String,
        message: String,
    },
    #[error("{operation}: request timed out")]
    Timeout { operation: &'static str },
    #[error("{operation}: transport error: {source}")]
    Transport {
        operation: &'static str,
        #[source]
        source: reqwest::Error,
    },
    #[error("{operation}: unexpected response: {message}")]
    Decode {
        operation: &'static str,
        message: String,
    },
    #[error("{operation}: gave up after {attempts} attempts: {last}")]
    Exhausted {
        operation: &'static str,
        attempts: u32,
        #[source]
        last: Box<ClientError>,
    },
    #[error("request signing: {0}")]
    Signing(#[from] SignerError),
    #[error("client configuration: {0}")]
    Config(String),
}

impl ClientError {
    /// Timeouts, connection failures, throttling (429) and server errors (5xx).
    pub fn is_transient(&self) -> bool {
        match self {
            ClientError::Api { status, .. } => *status == 429 || *status >= 500,
            ClientError::Timeout { .. } => true,
            ClientError::Transport { source, .. } => source.is_timeout() || source.is_connect(),
            _ => false,
        }
    }
}

/// Region-scoped capacity API client.
pub trait CapacityClient: Send + Sync {
    fn region(&self) -> &str;

    fn get_tenancy(
        &self,
        tenancy_id: &str,
    ) -> impl Future<Output = Result<Tenancy, ClientError>> + Send;

    /// Fully qualified availability domain names visible to `compartment_id` in this region.
    fn list_availability_domains(
        &self,
        compartment_id: &str,
    ) -> impl Future<Output = Result<Vec<String>, ClientError>> + Send;

    fn create_capacity_report(
        &self,
        request: &CapacityReportRequest,
    ) -> impl Future<Output = Result<Vec<ShapeAvailabilityReport>, ClientError>> + Send;
}

/// Builds a client bound to one region.
pub trait ClientFactory: Send + Sync {
    type Client: CapacityClient;

    fn client_for(&self, region: &str) -> Result<Self::Client, ClientError>;
}
