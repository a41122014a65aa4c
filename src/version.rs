// Build identity, stamped into the OCI user-agent and the report footer

/// Package version (from Cargo.toml).
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Package name (from Cargo.toml).
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// "capacity-tracker/0.3.0"
pub fn user_agent() -> String {
    format!("{}/{}", NAME, VERSION)
}
