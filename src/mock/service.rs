//! Mock downstream collector for testing
//!
//! Provides an in-process OTLP metrics endpoint that records every export it
//! receives, so tests can assert on what the reduce-resolution service
//! forwarded.

use opentelemetry_proto::tonic::collector::metrics::v1::{
    ExportMetricsServiceRequest, ExportMetricsServiceResponse,
    metrics_service_server::{MetricsService, MetricsServiceServer},
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio_stream::wrappers::TcpListenerStream;
use tonic::{Request, Response, Status};
use tracing::{error, info};

/// Mock collector state
#[derive(Debug, Default)]
struct MockCollectorState {
    /// Requests received via gRPC
    received_metrics: Vec<ExportMetricsServiceRequest>,
    /// Count of gRPC calls received
    grpc_calls: u64,
    /// When set, every call fails with this message
    fail_with: Option<String>,
}

/// Mock downstream OTLP collector
#[derive(Debug, Clone)]
pub struct MockCollector {
    state: Arc<RwLock<MockCollectorState>>,
}

impl MockCollector {
    /// Create a new mock collector
    pub fn new() -> Self {
        Self {
            state: Arc::new(RwLock::new(MockCollectorState::default())),
        }
    }

    /// Start serving on an ephemeral localhost port
    ///
    /// Returns the `http://` URL the collector is listening on.
    pub async fn start(&self) -> Result<String, String> {
        let addr = "127.0.0.1:0"
            .parse::<SocketAddr>()
            .map_err(|e| format!("Failed to parse address: {}", e))?;
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|e| format!("Failed to bind listener: {}", e))?;
        let addr = listener
            .local_addr()
            .map_err(|e| format!("Failed to get local address: {}", e))?;
        let url = format!("http://{}", addr);

        let metrics_service = MockMetricsServiceImpl {
            state: self.state.clone(),
        };
        tokio::spawn(async move {
            let server = tonic::transport::Server::builder()
                .add_service(MetricsServiceServer::new(metrics_service))
                .serve_with_incoming(TcpListenerStream::new(listener))
                .await;

            if let Err(e) = server {
                error!("Mock collector server error: {}", e);
            }
        });

        info!(addr = %url, "Mock collector started");
        Ok(url)
    }

    /// Make every subsequent export fail with `message`
    pub async fn fail_exports(&self, message: impl Into<String>) {
        self.state.write().await.fail_with = Some(message.into());
    }

    /// All requests received so far
    pub async fn received_metrics(&self) -> Vec<ExportMetricsServiceRequest> {
        self.state.read().await.received_metrics.clone()
    }

    /// Assert that the expected number of requests were received
    pub async fn assert_metrics_received(&self, expected_count: usize) -> Result<(), String> {
        let state = self.state.read().await;
        if state.received_metrics.len() != expected_count {
            Err(format!(
                "Expected {} metric requests, but received {}",
                expected_count,
                state.received_metrics.len()
            ))
        } else {
            Ok(())
        }
    }

    /// Get the number of gRPC calls received
    pub async fn grpc_calls_count(&self) -> u64 {
        self.state.read().await.grpc_calls
    }

    /// Reset the mock state (for test isolation)
    pub async fn reset(&self) {
        let mut state = self.state.write().await;
        *state = MockCollectorState::default();
    }
}

impl Default for MockCollector {
    fn default() -> Self {
        Self::new()
    }
}

/// Mock Metrics Service implementation
#[derive(Debug, Clone)]
struct MockMetricsServiceImpl {
    state: Arc<RwLock<MockCollectorState>>,
}

#[tonic::async_trait]
impl MetricsService for MockMetricsServiceImpl {
    async fn export(
        &self,
        request: Request<ExportMetricsServiceRequest>,
    ) -> Result<Response<ExportMetricsServiceResponse>, Status> {
        let req = request.into_inner();

        let mut state = self.state.write().await;
        state.grpc_calls += 1;
        if let Some(ref message) = state.fail_with {
            return Err(Status::internal(message.clone()));
        }
        state.received_metrics.push(req);

        Ok(Response::new(ExportMetricsServiceResponse {
            partial_success: None,
        }))
    }
}
