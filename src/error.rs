//! Error types for the reduce-resolution processor
//!
//! The aggregation engine itself never fails a batch; these types cover the
//! host side (configuration, gRPC server, downstream forwarding) plus the
//! per-point merge rejections the engine recovers from locally.

use thiserror::Error;

/// Main error type for the library
#[derive(Error, Debug)]
pub enum ReduceResolutionError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Downstream forwarding errors
    #[error("Forwarding error: {0}")]
    Forward(#[from] ForwardError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Server-related errors
    #[error("Server error: {0}")]
    Server(#[from] ServerError),
}

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Configuration file could not be read
    #[error("Failed to read config file: {0}")]
    Read(String),

    /// Configuration file could not be parsed
    #[error("Failed to parse config: {0}")]
    Parse(String),

    /// A gauge statistic name is not one of the supported statistics
    #[error("Unknown gauge statistic '{statistic}' configured for metric '{metric}'")]
    UnknownStatistic {
        /// Metric the statistic was configured for
        metric: String,
        /// The offending statistic name
        statistic: String,
    },

    /// Missing required configuration field
    #[error("Missing required field: {0}")]
    MissingRequiredField(String),

    /// Invalid URL format
    #[error("Invalid URL format: {0}")]
    InvalidUrl(String),

    /// Configuration validation failed
    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),
}

/// Downstream forwarding errors
#[derive(Error, Debug)]
pub enum ForwardError {
    /// Could not connect to the downstream endpoint
    #[error("Failed to connect to {endpoint}: {message}")]
    Connect {
        /// Endpoint URL
        endpoint: String,
        /// Underlying transport error
        message: String,
    },

    /// The downstream endpoint rejected the export call
    #[error("Export rejected by downstream: {0}")]
    Rejected(String),

    /// The export call did not finish in time
    #[error("Export timed out after {0} seconds")]
    Timeout(u64),
}

/// Server-related errors
#[derive(Error, Debug)]
pub enum ServerError {
    /// Failed to bind server address
    #[error("Failed to bind server address: {0}")]
    BindError(String),

    /// Failed to start server
    #[error("Failed to start server: {0}")]
    StartupError(String),
}

/// A data point that could not be merged into an existing aggregate
///
/// The aggregate is left untouched when this is returned; the caller drops
/// the point.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MergeError {
    /// Incoming point was reported with a different temporality than the aggregate
    #[error("temporality changed from {existing} to {incoming}")]
    TemporalityMismatch {
        /// Temporality fixed when the aggregate was created
        existing: &'static str,
        /// Temporality of the rejected point
        incoming: &'static str,
    },

    /// Histogram bounds or bucket count layout differ from the aggregate's
    #[error("histogram bucket layout differs ({existing_bounds} bounds tracked, {incoming_bounds} incoming)")]
    BucketLayoutMismatch {
        /// Number of explicit bounds on the aggregate
        existing_bounds: usize,
        /// Number of explicit bounds on the rejected point
        incoming_bounds: usize,
    },
}
