//! OpenTelemetry Protocol (OTLP) module
//!
//! Hosts the processor as a pipeline stage: a gRPC MetricsService that
//! receives batches and a consumer that receives the reduced output.

pub mod consumer;
pub mod forwarder;
pub mod server;

pub use consumer::{DiscardConsumer, MetricsConsumer};
pub use forwarder::OtlpGrpcForwarder;
pub use server::{ReduceResolutionServer, ReduceResolutionService};
