//! gRPC server for receiving OTLP metrics
//!
//! Implements the OTLP MetricsService using the tonic gRPC framework. Every
//! export call is reduced on its own and handed to the configured consumer.

use crate::error::{ReduceResolutionError, ServerError};
use crate::otlp::consumer::MetricsConsumer;
use crate::processor::ReduceResolutionProcessor;
use opentelemetry_proto::tonic::collector::metrics::v1::{
    ExportMetricsServiceRequest, ExportMetricsServiceResponse,
    metrics_service_server::{MetricsService, MetricsServiceServer},
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_stream::wrappers::TcpListenerStream;
use tonic::transport::Server;
use tonic::{Request, Response, Status};
use tracing::{debug, error, info};

/// Metrics service implementation
#[derive(Debug, Clone)]
pub struct ReduceResolutionService {
    processor: Arc<ReduceResolutionProcessor>,
    consumer: Arc<dyn MetricsConsumer>,
}

impl ReduceResolutionService {
    /// Create a service that reduces batches and passes them to `consumer`
    pub fn new(processor: ReduceResolutionProcessor, consumer: Arc<dyn MetricsConsumer>) -> Self {
        Self {
            processor: Arc::new(processor),
            consumer,
        }
    }
}

#[tonic::async_trait]
impl MetricsService for ReduceResolutionService {
    async fn export(
        &self,
        request: Request<ExportMetricsServiceRequest>,
    ) -> Result<Response<ExportMetricsServiceResponse>, Status> {
        let req = request.into_inner();
        debug!(
            resource_metrics = req.resource_metrics.len(),
            "Received metrics export"
        );

        let reduced = self.processor.process(req);

        if let Err(e) = self.consumer.consume(reduced).await {
            error!("Failed to forward reduced metrics: {}", e);
            return Err(Status::unavailable(format!(
                "Failed to forward reduced metrics: {}",
                e
            )));
        }

        Ok(Response::new(ExportMetricsServiceResponse {
            partial_success: None,
        }))
    }
}

/// gRPC server hosting the reduce-resolution metrics service
#[derive(Debug, Clone)]
pub struct ReduceResolutionServer {
    service: ReduceResolutionService,
}

impl ReduceResolutionServer {
    /// Create a new gRPC server
    pub fn new(service: ReduceResolutionService) -> Self {
        Self { service }
    }

    /// Start the gRPC server on the specified address
    pub async fn start(&self, addr: SocketAddr) -> Result<(), ReduceResolutionError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::BindError(format!("{}: {}", addr, e)))?;
        self.start_with_listener(listener).await
    }

    /// Serve on an already bound listener
    pub async fn start_with_listener(&self, listener: TcpListener) -> Result<(), ReduceResolutionError> {
        let local_addr = listener.local_addr()?;
        info!("Starting OTLP gRPC server on {}", local_addr);

        Server::builder()
            .add_service(MetricsServiceServer::new(self.service.clone()))
            .serve_with_incoming(TcpListenerStream::new(listener))
            .await
            .map_err(|e| ServerError::StartupError(e.to_string()))?;

        Ok(())
    }
}
