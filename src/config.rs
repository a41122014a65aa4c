use serde::Deserialize;

use crate::models::FaultDomain;
use crate::snapshot_store::DEFAULT_RETENTION_DAYS;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub collector: CollectorConfig,
    /// Only the collector needs credentials; the renderer runs without this section.
    pub oci: Option<OciConfig>,
    #[serde(default)]
    pub report: ReportConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_dataset_path")]
    pub path: String,
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: default_dataset_path(),
            retention_days: default_retention_days(),
        }
    }
}

fn default_dataset_path() -> String {
    "capacity_report.json".into()
}

fn default_retention_days() -> u32 {
    DEFAULT_RETENTION_DAYS
}

#[derive(Debug, Clone, Deserialize)]
pub struct CollectorConfig {
    /// Availability domain names, e.g. "UK-LONDON-1-AD-1". Row order in the report follows this list.
    #[serde(default)]
    pub availability_domains: Vec<String>,
    #[serde(default)]
    pub shapes: Vec<String>,
    #[serde(default = "default_fault_domains")]
    pub fault_domains: Vec<FaultDomain>,
    /// Pause after each availability domain to bound the request rate.
    #[serde(default = "default_inter_ad_delay_ms")]
    pub inter_ad_delay_ms: u64,
    /// Availability domains queried at once. 1 = sequential.
    #[serde(default = "default_max_concurrent_domains")]
    pub max_concurrent_domains: usize,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            availability_domains: Vec::new(),
            shapes: Vec::new(),
            fault_domains: default_fault_domains(),
            inter_ad_delay_ms: default_inter_ad_delay_ms(),
            max_concurrent_domains: default_max_concurrent_domains(),
        }
    }
}

fn default_fault_domains() -> Vec<FaultDomain> {
    FaultDomain::ALL.to_vec()
}

fn default_inter_ad_delay_ms() -> u64 {
    2000
}

fn default_max_concurrent_domains() -> usize {
    1
}

#[derive(Debug, Clone, Deserialize)]
pub struct OciConfig {
    pub tenancy: String,
    /// Compartment queried for capacity; defaults to the tenancy.
    pub compartment: Option<String>,
    pub user: String,
    pub fingerprint: String,
    /// PEM private key (PKCS#1 or PKCS#8). A leading "~/" expands to $HOME.
    pub key_file: String,
    /// Home region, used to resolve the tenancy before collecting.
    pub region: String,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl OciConfig {
    pub fn compartment_id(&self) -> &str {
        self.compartment.as_deref().unwrap_or(&self.tenancy)
    }
}

fn default_max_attempts() -> u32 {
    5
}

fn default_initial_backoff_ms() -> u64 {
    1000
}

fn default_max_backoff_ms() -> u64 {
    30_000
}

fn default_request_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReportConfig {
    #[serde(default = "default_output_dir")]
    pub output_dir: String,
    #[serde(default = "default_title")]
    pub title: String,
    /// Dated artifact name is `<file_prefix><YYYY-MM-DD>.html`.
    #[serde(default = "default_file_prefix")]
    pub file_prefix: String,
    #[serde(default = "default_latest_name")]
    pub latest_name: String,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            title: default_title(),
            file_prefix: default_file_prefix(),
            latest_name: default_latest_name(),
        }
    }
}

fn default_output_dir() -> String {
    ".".into()
}

fn default_title() -> String {
    "OCI BM Availability".into()
}

fn default_file_prefix() -> String {
    "capacity_availability_".into()
}

fn default_latest_name() -> String {
    "index.html".into()
}

impl AppConfig {
    pub fn load() -> anyhow::Result<Self> {
        let path = std::env::var("CONFIG_FILE").unwrap_or_else(|_| "config.toml".into());
        let s = std::fs::read_to_string(&path)
            .map_err(|e| anyhow::anyhow!("read config {}: {}", path, e))?;
        Self::load_from_str(&s)
    }

    /// Parse and validate config from a string (e.g. for tests).
    pub fn load_from_str(s: &str) -> anyhow::Result<Self> {
        let config: AppConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            !self.storage.path.is_empty(),
            "storage.path must be non-empty"
        );
        anyhow::ensure!(
            self.storage.retention_days > 0,
            "storage.retention_days must be > 0, got {}",
            self.storage.retention_days
        );
        anyhow::ensure!(
            self.collector.max_concurrent_domains > 0,
            "collector.max_concurrent_domains must be > 0, got {}",
            self.collector.max_concurrent_domains
        );
        anyhow::ensure!(
            !self.report.output_dir.is_empty(),
            "report.output_dir must be non-empty"
        );
        anyhow::ensure!(
            !self.report.latest_name.is_empty(),
            "report.latest_name must be non-empty"
        );
        if let Some(oci) = &self.oci {
            oci.validate()?;
        }
        Ok(())
    }

    /// Collector settings; fails when the run would have nothing to query or no credentials.
    pub fn require_collector(&self) -> anyhow::Result<(&CollectorConfig, &OciConfig)> {
        let collector = &self.collector;
        anyhow::ensure!(
            !collector.availability_domains.is_empty(),
            "collector.availability_domains must list at least one availability domain"
        );
        anyhow::ensure!(
            !collector.shapes.is_empty(),
            "collector.shapes must list at least one shape"
        );
        anyhow::ensure!(
            !collector.fault_domains.is_empty(),
            "collector.fault_domains must list at least one fault domain"
        );
        for ad in &collector.availability_domains {
            anyhow::ensure!(
                ad.contains("-AD-"),
                "collector.availability_domains: {} does not look like <REGION>-AD-<n>",
                ad
            );
        }
        let oci = self
            .oci
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("[oci] section is required by the collector"))?;
        Ok((collector, oci))
    }
}

impl OciConfig {
    fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(!self.tenancy.is_empty(), "oci.tenancy must be non-empty");
        anyhow::ensure!(!self.user.is_empty(), "oci.user must be non-empty");
        anyhow::ensure!(
            !self.fingerprint.is_empty(),
            "oci.fingerprint must be non-empty"
        );
        anyhow::ensure!(!self.key_file.is_empty(), "oci.key_file must be non-empty");
        anyhow::ensure!(!self.region.is_empty(), "oci.region must be non-empty");
        anyhow::ensure!(
            self.max_attempts > 0,
            "oci.max_attempts must be > 0, got {}",
            self.max_attempts
        );
        anyhow::ensure!(
            self.max_backoff_ms >= self.initial_backoff_ms,
            "oci.max_backoff_ms must be >= oci.initial_backoff_ms ({} < {})",
            self.max_backoff_ms,
            self.initial_backoff_ms
        );
        anyhow::ensure!(
            self.request_timeout_secs > 0,
            "oci.request_timeout_secs must be > 0, got {}",
            self.request_timeout_secs
        );
        Ok(())
    }
}
