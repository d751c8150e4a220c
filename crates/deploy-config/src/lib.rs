//! # Deploy Config
//!
//! Environment-table parsing for the stack deployer.
//!
//! The table is a YAML file mapping service names to key/value sections,
//! plus an optional `global` section whose keys are broadcast to every
//! service flagged as a global consumer. Values are opaque strings; any
//! quoting the manifest syntax needs is applied by the YAML serializer when
//! the manifest is rendered, never by hand here.
//!
//! ```yaml
//! global:
//!   TENANTS: "acme,initech"
//! operational-api:
//!   LISTEN_ADDR: "0.0.0.0:8080"
//!   PROMETHEUS_URL: "http://prometheus.monitoring:9090"
//! ```

#![warn(missing_docs)]
#![warn(unsafe_code)]

use indexmap::IndexMap;
use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

pub mod resolver;

pub use resolver::{EnvVar, resolve_env};

/// Configuration error types
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the environment-table file
    #[error("Failed to read env table: {0}")]
    ReadError(#[from] std::io::Error),

    /// Failed to parse YAML
    #[error("Failed to parse env table YAML: {0}")]
    YamlError(#[from] serde_yaml::Error),

    /// A value was not a plain scalar
    #[error("Env table entry '{section}.{key}' must be a scalar value")]
    NonScalarValue {
        /// The service (or `global`) section
        section: String,
        /// The offending key
        key: String,
    },
}

/// Result type for configuration operations
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Raw table shape as it appears on disk
#[derive(Debug, Deserialize)]
struct RawTable {
    #[serde(default)]
    global: IndexMap<String, serde_yaml::Value>,
    #[serde(flatten)]
    services: IndexMap<String, IndexMap<String, serde_yaml::Value>>,
}

/// The parsed environment table.
///
/// Key order within each section follows the file, and that order is what
/// ends up in the rendered manifests.
#[derive(Debug, Clone, Default)]
pub struct EnvTable {
    /// Keys broadcast to global-consumer services
    pub global: IndexMap<String, String>,
    /// Per-service sections keyed by service name
    pub services: IndexMap<String, IndexMap<String, String>>,
}

impl EnvTable {
    /// The section for a single service, if the file has one
    pub fn section(&self, service: &str) -> Option<&IndexMap<String, String>> {
        self.services.get(service)
    }
}

/// Parse an environment-table file
pub fn parse_file(path: impl AsRef<Path>) -> Result<EnvTable> {
    let content = std::fs::read_to_string(path)?;
    parse_str(&content)
}

/// Parse an environment table from a string
pub fn parse_str(content: &str) -> Result<EnvTable> {
    let raw: RawTable = serde_yaml::from_str(content)?;

    let global = scalar_section("global", raw.global)?;
    let mut services = IndexMap::new();
    for (service, section) in raw.services {
        let values = scalar_section(&service, section)?;
        services.insert(service, values);
    }
    Ok(EnvTable { global, services })
}

/// Coerce one section's values to strings, rejecting nested structure
fn scalar_section(
    section: &str,
    raw: IndexMap<String, serde_yaml::Value>,
) -> Result<IndexMap<String, String>> {
    let mut out = IndexMap::new();
    for (key, value) in raw {
        let text = match value {
            serde_yaml::Value::String(s) => s,
            serde_yaml::Value::Number(n) => n.to_string(),
            serde_yaml::Value::Bool(b) => b.to_string(),
            _ => {
                return Err(ConfigError::NonScalarValue {
                    section: section.to_string(),
                    key,
                });
            }
        };
        out.insert(key, text);
    }
    Ok(out)
}
