//! OTLP Reduce Resolution
//!
//! A metrics processor that reduces the resolution and cardinality of an
//! OpenTelemetry Protocol (OTLP) metrics batch. Instead of many raw samples
//! per series, each batch is folded into per-series summaries computed over
//! exactly the samples present in that batch.
//!
//! # Features
//!
//! - Gauge series reduced to configurable statistics (`avg`, `sum`, `min`,
//!   `max`, `abs_min`, `abs_max`, `count`)
//! - Sum series merged per temporality (latest cumulative snapshot, summed deltas)
//! - Explicit-bucket histograms merged per temporality
//! - All input resources collapsed into one output resource
//! - Configurable via YAML, environment variables, or programmatic API
//! - Standalone OTLP/gRPC service with downstream forwarding
//! - Mock collector for testing
//!
//! # Example
//!
//! ```no_run
//! use opentelemetry_proto::tonic::collector::metrics::v1::ExportMetricsServiceRequest;
//! use otlp_reduce_resolution::{ConfigBuilder, ReduceResolutionProcessor};
//!
//! # fn main() -> Result<(), otlp_reduce_resolution::ReduceResolutionError> {
//! let config = ConfigBuilder::new()
//!     .gauge_statistics("cpu.temperature", ["avg", "max"])
//!     .build()?;
//! let processor = ReduceResolutionProcessor::new(config);
//!
//! let batch = ExportMetricsServiceRequest::default();
//! let reduced = processor.process(batch);
//! # let _ = reduced;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod aggregation;
pub mod config;
pub mod error;
pub mod mock;
pub mod otlp;
pub mod processor;

// Re-export public API
pub use config::{Config, ConfigBuilder, ConfigLoader, ForwardingConfig, ServerConfig};
pub use error::{ConfigError, ForwardError, MergeError, ReduceResolutionError, ServerError};
pub use mock::MockCollector;
pub use processor::ReduceResolutionProcessor;

// Initialize tracing subscriber for structured logging
use tracing_subscriber::EnvFilter;

/// Initialize structured logging
pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .try_init();
}
