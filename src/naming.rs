//! Deployment-policy name normalization.
//!
//! Every raw name coming off the wire passes through a [`NamingControl`]
//! before identity construction, so a deployment can rewrite or bound names
//! in one place. The default implementation enforces length ceilings only;
//! tests and deployments substitute their own.

use serde::Deserialize;
use tracing::debug;

/// Rewrites raw entity names per deployment policy.
pub trait NamingControl: Send + Sync {
    fn format_service_name(&self, name: &str) -> String;

    fn format_instance_name(&self, name: &str) -> String;

    fn format_endpoint_name(&self, name: &str) -> String;
}

/// Name length ceilings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NamingConfig {
    pub service_name_max_length: usize,
    pub instance_name_max_length: usize,
    pub endpoint_name_max_length: usize,
}

impl Default for NamingConfig {
    fn default() -> Self {
        Self {
            service_name_max_length: 70,
            instance_name_max_length: 70,
            endpoint_name_max_length: 150,
        }
    }
}

/// Default naming policy: truncate over-long names, pass the rest through.
#[derive(Debug, Default)]
pub struct LengthNamingControl {
    config: NamingConfig,
}

impl LengthNamingControl {
    pub fn new(config: NamingConfig) -> Self {
        Self { config }
    }

    fn truncate(kind: &'static str, name: &str, max: usize) -> String {
        if name.chars().count() <= max {
            return name.to_string();
        }
        let cut: String = name.chars().take(max).collect();
        debug!(kind, original = name, truncated = %cut, "Name over length ceiling");
        cut
    }
}

impl NamingControl for LengthNamingControl {
    fn format_service_name(&self, name: &str) -> String {
        Self::truncate("service", name, self.config.service_name_max_length)
    }

    fn format_instance_name(&self, name: &str) -> String {
        Self::truncate("instance", name, self.config.instance_name_max_length)
    }

    fn format_endpoint_name(&self, name: &str) -> String {
        Self::truncate("endpoint", name, self.config.endpoint_name_max_length)
    }
}
