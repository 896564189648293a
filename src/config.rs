//! Configuration file support for kube-sensor.
//!
//! Provides YAML-based configuration through `kube-sensor.config.yml` files,
//! including data structures, file loading, and validation.

use anyhow::Context;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::warn;

use crate::application::components::{
    DEFAULT_BYPASS_ANNOTATION, DEFAULT_ENFORCEMENT_TIMEOUT, DEFAULT_MAX_CONCURRENT_SCANS,
    DEFAULT_SCAN_TIMEOUT,
};
use crate::application::dto::DedupeMode;
use crate::application::factories::SensorSettings;
use crate::shared::{Result, SensorError};

pub const CONFIG_FILENAME: &str = "kube-sensor.config.yml";

const DEFAULT_QUEUE_CAPACITY: usize = 100;

/// Top-level configuration file schema.
///
/// Every field is optional; missing values fall back to the defaults of
/// [`SensorSettings`].
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFile {
    pub scan_concurrency: Option<usize>,
    pub scan_timeout_secs: Option<u64>,
    pub enforcement_timeout_secs: Option<u64>,
    pub queue_capacity: Option<usize>,
    pub dedupe: Option<DedupeMode>,
    pub bypass_annotation: Option<String>,
    pub scanner: Option<ScannerConfig>,
    /// Captures unknown fields for warnings.
    #[serde(flatten)]
    pub unknown_fields: HashMap<String, serde_yaml_ng::Value>,
}

/// Remote image scan service.
#[derive(Debug, Deserialize)]
pub struct ScannerConfig {
    pub endpoint: String,
}

impl ConfigFile {
    /// Resolves the file against the built-in defaults.
    pub fn to_settings(&self) -> SensorSettings {
        SensorSettings {
            max_concurrent_scans: self
                .scan_concurrency
                .unwrap_or(DEFAULT_MAX_CONCURRENT_SCANS),
            scan_timeout: self
                .scan_timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_SCAN_TIMEOUT),
            enforcement_timeout: self
                .enforcement_timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_ENFORCEMENT_TIMEOUT),
            queue_capacity: self.queue_capacity.unwrap_or(DEFAULT_QUEUE_CAPACITY),
            dedupe: self.dedupe.unwrap_or_default(),
            bypass_annotation: self
                .bypass_annotation
                .clone()
                .unwrap_or_else(|| DEFAULT_BYPASS_ANNOTATION.to_string()),
        }
    }

    pub fn scanner_endpoint(&self) -> Option<&str> {
        self.scanner.as_ref().map(|s| s.endpoint.as_str())
    }
}

/// Load config from an explicit path. Returns an error if the file is not found.
pub fn load_config_from_path(path: &Path) -> Result<ConfigFile> {
    let content = std::fs::read_to_string(path).with_context(|| {
        format!(
            "Failed to read config file: {}\n\n💡 Hint: Check that the file exists and is readable.",
            path.display()
        )
    })?;

    let config: ConfigFile = serde_yaml_ng::from_str(&content).with_context(|| {
        format!(
            "Failed to parse config file: {}\n\n💡 Hint: Ensure the file contains valid YAML syntax.",
            path.display()
        )
    })?;

    validate_config(&config)?;
    warn_unknown_fields(&config);

    Ok(config)
}

/// Auto-discover config in a directory. Returns `None` silently if not found.
pub fn discover_config(dir: &Path) -> Result<Option<ConfigFile>> {
    let config_path = dir.join(CONFIG_FILENAME);

    if !config_path.exists() {
        return Ok(None);
    }

    let config = load_config_from_path(&config_path)?;
    Ok(Some(config))
}

fn invalid(reason: impl Into<String>, hint: impl Into<String>) -> anyhow::Error {
    SensorError::ConfigError {
        reason: reason.into(),
        hint: hint.into(),
    }
    .into()
}

/// Validate the loaded configuration.
fn validate_config(config: &ConfigFile) -> Result<()> {
    if config.scan_concurrency == Some(0) {
        return Err(invalid(
            "scan_concurrency must be greater than 0",
            format!("The default allows {} concurrent scans.", DEFAULT_MAX_CONCURRENT_SCANS),
        ));
    }
    if config
        .scan_concurrency
        .is_some_and(|value| value > Semaphore::MAX_PERMITS)
    {
        return Err(invalid(
            format!(
                "scan_concurrency must not exceed {}",
                Semaphore::MAX_PERMITS
            ),
            format!("The default allows {} concurrent scans.", DEFAULT_MAX_CONCURRENT_SCANS),
        ));
    }
    if config.queue_capacity == Some(0) {
        return Err(invalid(
            "queue_capacity must be greater than 0",
            format!("The default capacity is {}.", DEFAULT_QUEUE_CAPACITY),
        ));
    }
    if config
        .queue_capacity
        .is_some_and(|value| value > Semaphore::MAX_PERMITS)
    {
        return Err(invalid(
            format!("queue_capacity must not exceed {}", Semaphore::MAX_PERMITS),
            format!("The default capacity is {}.", DEFAULT_QUEUE_CAPACITY),
        ));
    }
    for (field, value) in [
        ("scan_timeout_secs", config.scan_timeout_secs),
        ("enforcement_timeout_secs", config.enforcement_timeout_secs),
    ] {
        if value == Some(0) {
            return Err(invalid(
                format!("{} must be greater than 0", field),
                "Omit the field to use the default timeout.",
            ));
        }
    }
    if let Some(ref annotation) = config.bypass_annotation {
        if annotation.trim().is_empty() {
            return Err(invalid(
                "bypass_annotation must not be empty",
                format!("Omit the field to use '{}'.", DEFAULT_BYPASS_ANNOTATION),
            ));
        }
    }
    if let Some(ref scanner) = config.scanner {
        if !scanner.endpoint.starts_with("http://") && !scanner.endpoint.starts_with("https://") {
            return Err(invalid(
                format!(
                    "scanner.endpoint must be an http(s) URL, got '{}'",
                    scanner.endpoint
                ),
                "For example, \"http://scanner.security.svc:8080\".",
            ));
        }
    }
    Ok(())
}

/// Warn about unknown fields in the config file.
fn warn_unknown_fields(config: &ConfigFile) {
    for key in config.unknown_fields.keys() {
        warn!(field = %key, "Unknown config field will be ignored");
    }
}
