// OCI REST implementation of the capacity client (identity + compute capacity report).

use chrono::Utc;
use reqwest::{Method, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::instrument;

use super::{
    CapacityClient, CapacityReportRequest, ClientError, ClientFactory, RequestSigner, RetryPolicy,
    ShapeAvailabilityReport, Tenancy,
};
use crate::config::OciConfig;
use crate::models::StatusValue;
use crate::version;

const API_VERSION: &str = "20160918";

/// Shares one HTTP connection pool and signer; each region gets its own client value.
#[derive(Clone)]
pub struct OciClientFactory {
    http: reqwest::Client,
    signer: Arc<RequestSigner>,
    retry: RetryPolicy,
}

impl OciClientFactory {
    pub fn new(http: reqwest::Client, signer: RequestSigner, retry: RetryPolicy) -> Self {
        Self {
            http,
            signer: Arc::new(signer),
            retry,
        }
    }

    pub fn from_config(cfg: &OciConfig) -> Result<Self, ClientError> {
        let signer =
            RequestSigner::from_key_file(&cfg.tenancy, &cfg.user, &cfg.fingerprint, &cfg.key_file)?;
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(cfg.request_timeout_secs))
            .user_agent(version::user_agent())
            .build()
            .map_err(|e| ClientError::Config(e.to_string()))?;
        let retry = RetryPolicy {
            max_attempts: cfg.max_attempts,
            initial_backoff: Duration::from_millis(cfg.initial_backoff_ms),
            max_backoff: Duration::from_millis(cfg.max_backoff_ms),
        };
        Ok(Self::new(http, signer, retry))
    }
}

impl ClientFactory for OciClientFactory {
    type Client = OciClient;

    fn client_for(&self, region: &str) -> Result<OciClient, ClientError> {
        let region = region.to_lowercase();
        if region.is_empty()
            || !region
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-')
        {
            return Err(ClientError::Config(format!("invalid region name: {:?}", region)));
        }
        Ok(OciClient {
            http: self.http.clone(),
            signer: self.signer.clone(),
            retry: self.retry,
            identity_host: format!("identity.{}.oraclecloud.com", region),
            iaas_host: format!("iaas.{}.oraclecloud.com", region),
            region,
        })
    }
}

/// Client bound to one region. Immutable once built.
pub struct OciClient {
    http: reqwest::Client,
    signer: Arc<RequestSigner>,
    retry: RetryPolicy,
    region: String,
    identity_host: String,
    iaas_host: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TenancyBody {
    id: String,
    #[serde(default)]
    name: String,
}

#[derive(Debug, Deserialize)]
struct AvailabilityDomainBody {
    name: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateCapacityReportBody<'a> {
    compartment_id: &'a str,
    availability_domain: &'a str,
    shape_availabilities: Vec<ShapeAvailabilityDetails<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ShapeAvailabilityDetails<'a> {
    instance_shape: &'a str,
    fault_domain: &'a str,
    instance_shape_config: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CapacityReportBody {
    #[serde(default)]
    shape_availabilities: Vec<ShapeAvailabilityBody>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ShapeAvailabilityBody {
    #[serde(default)]
    fault_domain: Option<String>,
    #[serde(default)]
    availability_status: Option<String>,
    #[serde(default)]
    available_count: Option<i64>,
    #[serde(default)]
    instance_shape: String,
    #[serde(default)]
    instance_shape_config: Option<serde_json::Value>,
}

#[derive(Debug, Default, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    code: String,
    #[serde(default)]
    message: String,
}

impl OciClient {
    fn url(&self, host: &str, path: &str) -> Result<Url, ClientError> {
        Url::parse(&format!("https://{}/{}/{}", host, API_VERSION, path))
            .map_err(|e| ClientError::Config(format!("build url: {}", e)))
    }

    /// Signed request with retry. Returns the decoded body and the `opc-next-page` token, if any.
    async fn call<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        method: Method,
        url: &Url,
        body: Option<Vec<u8>>,
    ) -> Result<(T, Option<String>), ClientError> {
        let body = body.as_deref();
        self.retry
            .run(operation, move || {
                self.send_once(operation, method.clone(), url, body)
            })
            .await
    }

    async fn send_once<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        method: Method,
        url: &Url,
        body: Option<&[u8]>,
    ) -> Result<(T, Option<String>), ClientError> {
        let host = url.host_str().unwrap_or_default();
        let target = request_target(url);
        let date = Utc::now().format("%a, %d %b %Y %H:%M:%S GMT").to_string();
        let signed = self.signer.sign(method.as_str(), &target, host, &date, body);

        let mut request = self
            .http
            .request(method, url.clone())
            .header("date", &signed.date)
            .header("authorization", &signed.authorization)
            .header("accept", "application/json");
        if let (Some(b), Some(sha), Some(content_type)) =
            (body, &signed.content_sha256, signed.content_type)
        {
            request = request
                .header("content-type", content_type)
                .header("x-content-sha256", sha)
                .body(b.to_vec());
        }

        let transport = |e: reqwest::Error| {
            if e.is_timeout() {
                ClientError::Timeout { operation }
            } else {
                ClientError::Transport {
                    operation,
                    source: e,
                }
            }
        };
        let response = request.send().await.map_err(transport)?;
        let status = response.status();
        let next_page = response
            .headers()
            .get("opc-next-page")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let bytes = response.bytes().await.map_err(transport)?;

        if !status.is_success() {
            let err: ApiErrorBody = serde_json::from_slice(&bytes).unwrap_or_default();
            return Err(ClientError::Api {
                operation,
                status: status.as_u16(),
                code: err.code,
                message: err.message,
            });
        }
        let value = serde_json::from_slice(&bytes).map_err(|e| ClientError::Decode {
            operation,
            message: e.to_string(),
        })?;
        Ok((value, next_page))
    }
}

impl CapacityClient for OciClient {
    fn region(&self) -> &str {
        &self.region
    }

    #[instrument(skip(self), fields(client = "oci", operation = "get_tenancy", region = %self.region))]
    async fn get_tenancy(&self, tenancy_id: &str) -> Result<Tenancy, ClientError> {
        let url = self.url(&self.identity_host, &format!("tenancies/{}", tenancy_id))?;
        let (body, _): (TenancyBody, _) = self.call("get_tenancy", Method::GET, &url, None).await?;
        Ok(Tenancy {
            id: body.id,
            name: body.name,
        })
    }

    #[instrument(skip(self), fields(client = "oci", operation = "list_availability_domains", region = %self.region))]
    async fn list_availability_domains(
        &self,
        compartment_id: &str,
    ) -> Result<Vec<String>, ClientError> {
        let mut names = Vec::new();
        let mut page: Option<String> = None;
        loop {
            let mut url = self.url(&self.identity_host, "availabilityDomains")?;
            {
                let mut query = url.query_pairs_mut();
                query.append_pair("compartmentId", compartment_id);
                if let Some(p) = &page {
                    query.append_pair("page", p);
                }
            }
            let (body, next): (Vec<AvailabilityDomainBody>, _) = self
                .call("list_availability_domains", Method::GET, &url, None)
                .await?;
            names.extend(body.into_iter().map(|d| d.name));
            match next {
                Some(token) if !token.is_empty() => page = Some(token),
                _ => break,
            }
        }
        Ok(names)
    }

    #[instrument(
        skip(self, request),
        fields(client = "oci", operation = "create_capacity_report", region = %self.region, shape = %request.shape)
    )]
    async fn create_capacity_report(
        &self,
        request: &CapacityReportRequest,
    ) -> Result<Vec<ShapeAvailabilityReport>, ClientError> {
        let url = self.url(&self.iaas_host, "computeCapacityReports")?;
        let payload = CreateCapacityReportBody {
            compartment_id: &request.compartment_id,
            availability_domain: &request.availability_domain,
            shape_availabilities: request
                .fault_domains
                .iter()
                .map(|fd| ShapeAvailabilityDetails {
                    instance_shape: &request.shape,
                    fault_domain: fd.api_name(),
                    instance_shape_config: None,
                })
                .collect(),
        };
        let bytes = serde_json::to_vec(&payload).map_err(|e| ClientError::Decode {
            operation: "create_capacity_report",
            message: e.to_string(),
        })?;
        let (body, _): (CapacityReportBody, _) = self
            .call("create_capacity_report", Method::POST, &url, Some(bytes))
            .await?;
        Ok(body
            .shape_availabilities
            .into_iter()
            .map(|s| ShapeAvailabilityReport {
                fault_domain: s.fault_domain.unwrap_or_default(),
                availability_status: s
                    .availability_status
                    .as_deref()
                    .map(StatusValue::from_api)
                    .unwrap_or(StatusValue::Unknown),
                available_count: s.available_count,
                instance_shape: s.instance_shape,
                instance_shape_config: s.instance_shape_config,
            })
            .collect())
    }
}

/// Path plus query exactly as sent on the wire.
fn request_target(url: &Url) -> String {
    match url.query() {
        Some(q) => format!("{}?{}", url.path(), q),
        None => url.path().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_target_includes_query() {
        let mut url =
            Url::parse("https://identity.uk-london-1.oraclecloud.com/20160918/availabilityDomains")
                .unwrap();
        url.query_pairs_mut()
            .append_pair("compartmentId", "ocid1.tenancy.oc1..aaaa");
        assert_eq!(
            request_target(&url),
            "/20160918/availabilityDomains?compartmentId=ocid1.tenancy.oc1..aaaa"
        );
    }

    #[test]
    fn capacity_report_body_uses_api_field_names() {
        let body = CreateCapacityReportBody {
            compartment_id: "ocid1.tenancy.oc1..aaaa",
            availability_domain: "abCD:UK-LONDON-1-AD-1",
            shape_availabilities: vec![ShapeAvailabilityDetails {
                instance_shape: "BM.Standard3.64",
                fault_domain: "FAULT-DOMAIN-1",
                instance_shape_config: None,
            }],
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["compartmentId"], "ocid1.tenancy.oc1..aaaa");
        assert_eq!(json["shapeAvailabilities"][0]["instanceShape"], "BM.Standard3.64");
        assert_eq!(json["shapeAvailabilities"][0]["faultDomain"], "FAULT-DOMAIN-1");
        assert!(json["shapeAvailabilities"][0]["instanceShapeConfig"].is_null());
    }
}
