//! Downstream forwarding module
//!
//! Sends reduced batches to a downstream OTLP/gRPC collector. Each batch is
//! sent once; a failed export is reported to the caller and not retried.

use crate::config::ForwardingConfig;
use crate::error::{ConfigError, ForwardError};
use crate::otlp::consumer::MetricsConsumer;
use opentelemetry_proto::tonic::collector::metrics::v1::ExportMetricsServiceRequest;
use opentelemetry_proto::tonic::collector::metrics::v1::metrics_service_client::MetricsServiceClient;
use prost::Message;
use std::time::Duration;
use tonic::transport::{Channel, Endpoint};
use tracing::{debug, info, warn};

/// Forwards reduced batches to a downstream OTLP/gRPC endpoint
#[derive(Debug, Clone)]
pub struct OtlpGrpcForwarder {
    endpoint: String,
    timeout: Duration,
    client: MetricsServiceClient<Channel>,
}

impl OtlpGrpcForwarder {
    /// Create a forwarder for `endpoint`
    ///
    /// The connection is established lazily on the first export, so this must
    /// be called from within a Tokio runtime but does not block on the network.
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, ForwardError> {
        let endpoint = endpoint.into();
        let channel = Endpoint::from_shared(endpoint.clone())
            .map_err(|e| ForwardError::Connect {
                endpoint: endpoint.clone(),
                message: e.to_string(),
            })?
            .connect_lazy();

        info!(endpoint = %endpoint, timeout_secs = timeout.as_secs(), "Created OTLP forwarder");

        Ok(Self {
            endpoint,
            timeout,
            client: MetricsServiceClient::new(channel),
        })
    }

    /// Create a forwarder from configuration
    pub fn from_config(config: &ForwardingConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let endpoint = config.endpoint_url.clone().ok_or_else(|| {
            ConfigError::MissingRequiredField(
                "endpoint_url is required when forwarding is enabled".to_string(),
            )
        })?;
        Self::new(endpoint, Duration::from_secs(config.timeout_secs))
            .map_err(|e| ConfigError::InvalidUrl(e.to_string()))
    }

    /// Downstream endpoint URL
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[tonic::async_trait]
impl MetricsConsumer for OtlpGrpcForwarder {
    async fn consume(&self, request: ExportMetricsServiceRequest) -> Result<(), ForwardError> {
        let payload_bytes = request.encoded_len();
        let mut client = self.client.clone();

        let response = tokio::time::timeout(self.timeout, client.export(request))
            .await
            .map_err(|_| {
                warn!(endpoint = %self.endpoint, "Forwarding timed out");
                ForwardError::Timeout(self.timeout.as_secs())
            })?
            .map_err(|status| {
                warn!(
                    endpoint = %self.endpoint,
                    code = ?status.code(),
                    error = %status.message(),
                    "Downstream rejected export"
                );
                ForwardError::Rejected(status.message().to_string())
            })?;

        if let Some(partial) = response.into_inner().partial_success {
            if partial.rejected_data_points > 0 {
                warn!(
                    endpoint = %self.endpoint,
                    rejected_data_points = partial.rejected_data_points,
                    error = %partial.error_message,
                    "Downstream partially rejected export"
                );
            }
        }

        debug!(
            endpoint = %self.endpoint,
            payload_bytes,
            "Forwarded reduced batch"
        );
        Ok(())
    }
}
