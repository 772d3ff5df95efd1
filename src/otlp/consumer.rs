//! Downstream consumer contract
//!
//! The service hands every reduced batch to a [`MetricsConsumer`]; what
//! happens next (forwarding, discarding, recording in tests) is up to the
//! implementation.

use crate::error::ForwardError;
use opentelemetry_proto::tonic::collector::metrics::v1::ExportMetricsServiceRequest;
use tracing::debug;

/// Receiver of reduced metric batches
#[tonic::async_trait]
pub trait MetricsConsumer: Send + Sync + std::fmt::Debug {
    /// Accept one reduced batch
    async fn consume(&self, request: ExportMetricsServiceRequest) -> Result<(), ForwardError>;
}

/// Consumer that drops every batch; used when forwarding is disabled
#[derive(Debug, Clone, Copy, Default)]
pub struct DiscardConsumer;

#[tonic::async_trait]
impl MetricsConsumer for DiscardConsumer {
    async fn consume(&self, request: ExportMetricsServiceRequest) -> Result<(), ForwardError> {
        debug!(
            resource_metrics = request.resource_metrics.len(),
            "Forwarding disabled, discarding reduced batch"
        );
        Ok(())
    }
}
