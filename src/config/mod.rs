//! Configuration module
//!
//! Provides configuration management for the reduce-resolution processor
//! including loading from YAML files, environment variables, and
//! programmatic API.

pub mod loader;
pub mod types;

pub use loader::ConfigLoader;
pub use types::{Config, ConfigBuilder, ForwardingConfig, GaugeStatistics, ServerConfig};
