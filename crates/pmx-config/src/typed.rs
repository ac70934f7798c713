use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::LoadedConfig;

/// Host value that disables aggregator reporting.
pub const HOST_DISABLED: &str = "none";

/// Environment variable overriding `reporting.host`.
pub const ENV_HYPERVISOR_HOST: &str = "PMX_HYPERVISOR_HOST";

pub const DEFAULT_SERVICE_PATH: &str = "axis2/services/Hyperadvisor";
pub const DEFAULT_SUMMARY_FILE: &str = "output.txt";

/// Aggregator ("hypervisor") reporting preferences.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportingConfig {
    pub enabled: bool,
    pub host: String,
    pub service_path: String,
    pub timeout_ms: u64,
}

impl Default for ReportingConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            host: HOST_DISABLED.to_string(),
            service_path: DEFAULT_SERVICE_PATH.to_string(),
            timeout_ms: 10_000,
        }
    }
}

impl ReportingConfig {
    /// Reporting configured with `host`, enabled.
    pub fn to_host(host: impl Into<String>) -> Self {
        Self {
            enabled: true,
            host: host.into(),
            ..Self::default()
        }
    }

    /// True only when enabled and the host is neither empty nor the `none` sentinel.
    pub fn is_active(&self) -> bool {
        let host = self.host.trim();
        self.enabled && !host.is_empty() && !host.eq_ignore_ascii_case(HOST_DISABLED)
    }

    /// `http://<host>/<service_path>`
    pub fn endpoint_url(&self) -> String {
        format!(
            "http://{}/{}",
            self.host.trim().trim_end_matches('/'),
            self.service_path.trim().trim_start_matches('/')
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub output_dir: PathBuf,
    /// Interactive runs surface validation errors to a UI; non-interactive
    /// runs also print them to stderr.
    pub interactive: bool,
    pub summary_file: String,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("pmx-out"),
            interactive: false,
            summary_file: DEFAULT_SUMMARY_FILE.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PmxConfig {
    pub reporting: ReportingConfig,
    pub run: RunConfig,
}

impl PmxConfig {
    /// Typed view of a loaded document. Missing keys take defaults; unknown
    /// keys are ignored here (see `report_unused_keys`).
    pub fn from_loaded(loaded: &LoadedConfig) -> Result<Self> {
        serde_json::from_value(loaded.config_json.clone()).context("config does not match schema")
    }

    /// Apply environment overrides from the process environment.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|k| std::env::var(k).ok());
    }

    /// Apply overrides from an arbitrary lookup (tests pass a closure).
    pub fn apply_overrides_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(host) = lookup(ENV_HYPERVISOR_HOST) {
            let host = host.trim();
            if !host.is_empty() {
                self.reporting.host = host.to_string();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn none_host_disables_reporting_case_insensitively() {
        let mut r = ReportingConfig::to_host("NONE");
        assert!(!r.is_active());
        r.host = "10.0.0.5:8080".to_string();
        assert!(r.is_active());
        r.enabled = false;
        assert!(!r.is_active());
    }

    #[test]
    fn endpoint_url_joins_host_and_path() {
        let r = ReportingConfig::to_host("hv.local:8080/");
        assert_eq!(r.endpoint_url(), "http://hv.local:8080/axis2/services/Hyperadvisor");
    }

    #[test]
    fn env_override_replaces_host() {
        let mut cfg = PmxConfig::default();
        cfg.apply_overrides_from(|k| (k == ENV_HYPERVISOR_HOST).then(|| " hv:9 ".to_string()));
        assert_eq!(cfg.reporting.host, "hv:9");
    }
}
