//! Process-wide configuration.
//!
//! All configuration is driven by environment variables so the binary can be
//! dropped into a container without a config file.

use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

use crate::types::AwsRegion;

/// Output format of the tracing subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable, one event per line.
    #[default]
    Text,
    /// One JSON object per event.
    Json,
}

impl LogFormat {
    fn parse(value: &str) -> Self {
        if value.eq_ignore_ascii_case("json") {
            Self::Json
        } else {
            Self::Text
        }
    }
}

/// Global configuration for Stowage.
///
/// # Examples
///
/// ```
/// use stowage_core::StowageConfig;
///
/// let config = StowageConfig::builder()
///     .endpoint_url(Some("http://localhost:4566".to_owned()))
///     .build();
/// assert_eq!(config.log_level, "info");
/// assert!(config.endpoint_url.is_some());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, TypedBuilder)]
#[serde(rename_all = "camelCase")]
pub struct StowageConfig {
    /// Log level filter string (e.g. `"info"`, `"debug"`).
    #[builder(default = String::from("info"))]
    pub log_level: String,

    /// Tracing output format.
    #[builder(default)]
    pub log_format: LogFormat,

    /// Region used when a request does not name one (e.g. for STS).
    #[builder(default)]
    pub default_region: AwsRegion,

    /// Custom endpoint for every AWS client (emulators, VPC endpoints).
    #[builder(default)]
    pub endpoint_url: Option<String>,
}

impl Default for StowageConfig {
    fn default() -> Self {
        Self {
            log_level: String::from("info"),
            log_format: LogFormat::Text,
            default_region: AwsRegion::default(),
            endpoint_url: None,
        }
    }
}

impl StowageConfig {
    /// Load configuration from environment variables.
    ///
    /// | Variable | Default |
    /// |----------|---------|
    /// | `LOG_LEVEL` | `info` |
    /// | `LOG_FORMAT` | `text` |
    /// | `DEFAULT_REGION` | `us-east-1` |
    /// | `AWS_ENDPOINT_URL` | *(unset)* |
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build the configuration from `lookup`, which maps a variable name to
    /// its value.
    #[must_use]
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(v) = lookup("LOG_LEVEL") {
            config.log_level = v;
        }
        if let Some(v) = lookup("LOG_FORMAT") {
            config.log_format = LogFormat::parse(&v);
        }
        if let Some(v) = lookup("DEFAULT_REGION") {
            if let Ok(region) = AwsRegion::parse(&v) {
                config.default_region = region;
            }
        }
        if let Some(v) = lookup("AWS_ENDPOINT_URL") {
            if !v.trim().is_empty() {
                config.endpoint_url = Some(v);
            }
        }

        config
    }
}
