//! Configuration type definitions
//!
//! Defines the processor settings (which gauge statistics to emit, whether
//! histograms are aggregated) and the settings of the standalone service.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use crate::aggregation::GaugeStatistic;
use crate::error::ConfigError;

/// Listener configuration for the standalone gRPC service
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Address to bind the OTLP/gRPC listener to (default: 0.0.0.0)
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// Port for the OTLP/gRPC listener (default: 4317, standard OTLP port)
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_port(),
        }
    }
}

impl ServerConfig {
    /// Validate listener configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.bind_address.trim().is_empty() {
            return Err(ConfigError::ValidationFailed(
                "Bind address cannot be empty".to_string(),
            ));
        }

        if self.port == 0 {
            return Err(ConfigError::ValidationFailed(
                "Port must be between 1 and 65535".to_string(),
            ));
        }

        Ok(())
    }

    /// `host:port` string for the listener
    pub fn socket_address(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }
}

/// Main configuration structure
///
/// # Configuration Sources
///
/// Configuration can be loaded from:
/// - YAML files
/// - Environment variables (with `REDUCE_RESOLUTION_*` prefix)
/// - Programmatic API (using `ConfigBuilder`)
///
/// # Default Values
///
/// - `gauge_aggregations`: empty, every gauge emits `abs_min` and `abs_max`
/// - `aggregate_histograms`: `true`
/// - `propagate_scope_attributes`: `true`
/// - `server`: `0.0.0.0:4317`
/// - `forwarding`: Disabled by default
///
/// # Example
///
/// ```no_run
/// use otlp_reduce_resolution::ConfigBuilder;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let config = ConfigBuilder::new()
///     .gauge_statistics("cpu.temperature", ["avg", "min", "max"])
///     .aggregate_histograms(false)
///     .build()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Gauge statistics to emit, keyed by metric name (case-insensitive)
    #[serde(default, alias = "gauge-aggregations")]
    pub gauge_aggregations: HashMap<String, Vec<String>>,

    /// Whether histogram metrics are aggregated or passed through untouched
    #[serde(default = "default_true")]
    pub aggregate_histograms: bool,

    /// Whether scope attributes are copied onto the output scopes
    #[serde(default = "default_true")]
    pub propagate_scope_attributes: bool,

    /// Listener configuration for the standalone service
    #[serde(default)]
    pub server: ServerConfig,

    /// Optional downstream forwarding configuration
    #[serde(default)]
    pub forwarding: Option<ForwardingConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            gauge_aggregations: HashMap::new(),
            aggregate_histograms: true,
            propagate_scope_attributes: true,
            server: ServerConfig::default(),
            forwarding: None,
        }
    }
}

impl Config {
    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut seen = HashSet::with_capacity(self.gauge_aggregations.len());
        for (metric, statistics) in &self.gauge_aggregations {
            if metric.trim().is_empty() {
                return Err(ConfigError::ValidationFailed(
                    "Gauge aggregation metric name cannot be empty".to_string(),
                ));
            }
            if !seen.insert(metric.to_lowercase()) {
                return Err(ConfigError::ValidationFailed(format!(
                    "Gauge aggregation metric '{}' is configured more than once (names are case-insensitive)",
                    metric
                )));
            }
            for statistic in statistics {
                if statistic.parse::<GaugeStatistic>().is_err() {
                    return Err(ConfigError::UnknownStatistic {
                        metric: metric.clone(),
                        statistic: statistic.clone(),
                    });
                }
            }
        }

        self.server.validate()?;

        if let Some(ref forwarding) = self.forwarding {
            forwarding.validate()?;
        }

        Ok(())
    }

    /// Gauge statistics table with lowercased metric names
    pub fn gauge_statistics(&self) -> GaugeStatistics {
        GaugeStatistics::new(&self.gauge_aggregations)
    }
}

/// Lookup table from metric name to its requested gauge statistics
#[derive(Debug, Clone, Default)]
pub struct GaugeStatistics {
    by_metric: HashMap<String, Vec<String>>,
}

impl GaugeStatistics {
    /// Build from a raw name→statistics map, lowercasing the names
    pub fn new(raw: &HashMap<String, Vec<String>>) -> Self {
        Self {
            by_metric: raw
                .iter()
                .map(|(name, stats)| (name.to_lowercase(), stats.clone()))
                .collect(),
        }
    }

    /// Statistics configured for `metric_name`, or `None` for the default set
    pub fn for_metric(&self, metric_name: &str) -> Option<&[String]> {
        self.by_metric
            .get(&metric_name.to_lowercase())
            .map(Vec::as_slice)
    }
}

/// Configuration for forwarding the reduced batches to a downstream collector
///
/// # Example
///
/// ```no_run
/// use otlp_reduce_resolution::config::ForwardingConfig;
///
/// let forwarding = ForwardingConfig {
///     enabled: true,
///     endpoint_url: Some("http://collector.example.com:4317".to_string()),
///     timeout_secs: 10,
/// };
/// ```
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ForwardingConfig {
    /// Whether forwarding is enabled (default: false)
    #[serde(default)]
    pub enabled: bool,

    /// Downstream OTLP/gRPC endpoint URL (required if enabled)
    pub endpoint_url: Option<String>,

    /// Per-export timeout in seconds (default: 10)
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ForwardingConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint_url: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl ForwardingConfig {
    /// Validate forwarding configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.enabled {
            return Ok(());
        }

        let Some(ref endpoint) = self.endpoint_url else {
            return Err(ConfigError::MissingRequiredField(
                "endpoint_url is required when forwarding is enabled".to_string(),
            ));
        };

        let parsed = url::Url::parse(endpoint)
            .map_err(|e| ConfigError::InvalidUrl(format!("{}: {}", endpoint, e)))?;
        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            return Err(ConfigError::InvalidUrl(
                "Endpoint URL must use http:// or https:// scheme".to_string(),
            ));
        }

        if self.timeout_secs == 0 {
            return Err(ConfigError::ValidationFailed(
                "Forwarding timeout must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

/// Builder for creating configurations programmatically
#[derive(Debug, Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Create a new configuration builder
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    /// Set the statistics emitted for one gauge metric
    pub fn gauge_statistics<I, S>(mut self, metric: impl Into<String>, statistics: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.gauge_aggregations.insert(
            metric.into(),
            statistics.into_iter().map(Into::into).collect(),
        );
        self
    }

    /// Enable or disable histogram aggregation
    pub fn aggregate_histograms(mut self, enabled: bool) -> Self {
        self.config.aggregate_histograms = enabled;
        self
    }

    /// Enable or disable copying scope attributes to output scopes
    pub fn propagate_scope_attributes(mut self, enabled: bool) -> Self {
        self.config.propagate_scope_attributes = enabled;
        self
    }

    /// Set the listener bind address
    pub fn bind_address(mut self, address: impl Into<String>) -> Self {
        self.config.server.bind_address = address.into();
        self
    }

    /// Set the listener port
    pub fn port(mut self, port: u16) -> Self {
        self.config.server.port = port;
        self
    }

    /// Enable forwarding with configuration
    pub fn enable_forwarding(mut self, forwarding: ForwardingConfig) -> Self {
        self.config.forwarding = Some(forwarding);
        self
    }

    /// Build the configuration with validation
    pub fn build(self) -> Result<Config, ConfigError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

// Default value functions
fn default_true() -> bool {
    true
}

fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    4317
}

fn default_timeout_secs() -> u64 {
    10
}
