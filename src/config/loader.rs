//! Configuration loader
//!
//! Loads configuration from YAML files, environment variables, or programmatic API.
//! Priority: environment variables > provided config > defaults

use std::env;
use std::str::FromStr;

use crate::config::types::{Config, ForwardingConfig};
use crate::error::ConfigError;
use tracing::{debug, info, warn};

const ENV_BIND_ADDRESS: &str = "REDUCE_RESOLUTION_BIND_ADDRESS";
const ENV_PORT: &str = "REDUCE_RESOLUTION_PORT";
const ENV_AGGREGATE_HISTOGRAMS: &str = "REDUCE_RESOLUTION_AGGREGATE_HISTOGRAMS";
const ENV_PROPAGATE_SCOPE_ATTRIBUTES: &str = "REDUCE_RESOLUTION_PROPAGATE_SCOPE_ATTRIBUTES";
const ENV_FORWARDING_ENABLED: &str = "REDUCE_RESOLUTION_FORWARDING_ENABLED";
const ENV_FORWARDING_ENDPOINT_URL: &str = "REDUCE_RESOLUTION_FORWARDING_ENDPOINT_URL";
const ENV_FORWARDING_TIMEOUT_SECS: &str = "REDUCE_RESOLUTION_FORWARDING_TIMEOUT_SECS";

/// Configuration loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from YAML file
    pub fn from_yaml(path: impl AsRef<std::path::Path>) -> Result<Config, ConfigError> {
        let path = path.as_ref();
        info!(
            config_path = %path.display(),
            "Loading configuration from YAML file"
        );

        let content = std::fs::read_to_string(path).map_err(|e| {
            warn!(
                config_path = %path.display(),
                error = %e,
                "Failed to read configuration file"
            );
            ConfigError::Read(e.to_string())
        })?;

        debug!(
            config_path = %path.display(),
            file_size_bytes = content.len(),
            "Read configuration file"
        );

        let mut config = Self::parse_yaml(&content).map_err(|e| {
            warn!(
                config_path = %path.display(),
                error = %e,
                "Failed to parse YAML configuration"
            );
            e
        })?;

        Self::apply_env_overrides(&mut config);

        config.validate().map_err(|e| {
            warn!(
                config_path = %path.display(),
                error = %e,
                "Configuration validation failed"
            );
            e
        })?;

        info!(
            config_path = %path.display(),
            gauge_aggregations = config.gauge_aggregations.len(),
            aggregate_histograms = config.aggregate_histograms,
            listen = %config.server.socket_address(),
            "Configuration loaded and validated successfully"
        );

        Ok(config)
    }

    /// Parse configuration from a YAML string without env overrides or validation
    pub fn parse_yaml(content: &str) -> Result<Config, ConfigError> {
        // An empty document means "all defaults"
        if content.trim().is_empty() {
            return Ok(Config::default());
        }
        serde_yaml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Config, ConfigError> {
        Self::load(None)
    }

    /// Load configuration with priority: environment variables > provided config > defaults
    pub fn load(provided: Option<Config>) -> Result<Config, ConfigError> {
        if provided.is_some() {
            info!("Loading configuration with provided config and environment variable overrides");
        } else {
            info!("Loading configuration with defaults and environment variable overrides");
        }

        let mut config = provided.unwrap_or_default();

        Self::apply_env_overrides(&mut config);

        debug!("Applied environment variable overrides");

        config.validate().map_err(|e| {
            warn!(error = %e, "Configuration validation failed");
            e
        })?;

        info!(
            gauge_aggregations = config.gauge_aggregations.len(),
            aggregate_histograms = config.aggregate_histograms,
            listen = %config.server.socket_address(),
            "Configuration loaded and validated successfully"
        );

        Ok(config)
    }

    /// Apply environment variable overrides to configuration
    fn apply_env_overrides(config: &mut Config) {
        if let Ok(address) = env::var(ENV_BIND_ADDRESS) {
            debug!(
                env_var = ENV_BIND_ADDRESS,
                value = %address,
                "Applying environment variable override"
            );
            config.server.bind_address = address;
        }

        if let Some(port) = parse_env::<u16>(ENV_PORT) {
            config.server.port = port;
        }

        if let Some(enabled) = parse_env::<bool>(ENV_AGGREGATE_HISTOGRAMS) {
            config.aggregate_histograms = enabled;
        }

        if let Some(enabled) = parse_env::<bool>(ENV_PROPAGATE_SCOPE_ATTRIBUTES) {
            config.propagate_scope_attributes = enabled;
        }

        if let Some(enabled) = parse_env::<bool>(ENV_FORWARDING_ENABLED) {
            let mut forwarding = config.forwarding.take().unwrap_or_default();
            forwarding.enabled = enabled;
            config.forwarding = Some(forwarding);
        }

        if let Ok(url) = env::var(ENV_FORWARDING_ENDPOINT_URL) {
            debug!(
                env_var = ENV_FORWARDING_ENDPOINT_URL,
                value = %url,
                "Applying environment variable override"
            );
            config
                .forwarding
                .get_or_insert_with(ForwardingConfig::default)
                .endpoint_url = Some(url);
        }

        if let Some(secs) = parse_env::<u64>(ENV_FORWARDING_TIMEOUT_SECS) {
            config
                .forwarding
                .get_or_insert_with(ForwardingConfig::default)
                .timeout_secs = secs;
        }
    }
}

/// Read and parse one environment variable, logging values that fail to parse
fn parse_env<T>(name: &'static str) -> Option<T>
where
    T: FromStr + std::fmt::Debug,
    T::Err: std::fmt::Display,
{
    let raw = env::var(name).ok()?;
    match raw.parse::<T>() {
        Ok(value) => {
            debug!(
                env_var = name,
                value = ?value,
                "Applying environment variable override"
            );
            Some(value)
        }
        Err(e) => {
            warn!(
                env_var = name,
                value = %raw,
                error = %e,
                "Failed to parse environment variable, keeping configured value"
            );
            None
        }
    }
}
