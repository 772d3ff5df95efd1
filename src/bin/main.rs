//! Standalone OTLP Reduce Resolution Service
//!
//! Runs as a standalone service that receives OTLP metrics via gRPC, reduces
//! each batch and forwards the result to a downstream collector.
//!
//! Usage: `otlp-reduce-resolution [--config <path.yaml>]`

use anyhow::Context;
use clap::Parser;
use otlp_reduce_resolution::otlp::{
    DiscardConsumer, MetricsConsumer, OtlpGrpcForwarder, ReduceResolutionServer,
    ReduceResolutionService,
};
use otlp_reduce_resolution::{Config, ConfigLoader, ReduceResolutionProcessor};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};

/// OTLP reduce resolution service
#[derive(Parser, Debug)]
#[command(name = "otlp-reduce-resolution")]
#[command(version, about = "Reduces OTLP metric batches to per-series summaries", long_about = None)]
struct Cli {
    /// Path to YAML configuration file (environment variables still override it)
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .json()
        .init();

    let config = match cli.config {
        Some(path) => ConfigLoader::from_yaml(&path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => ConfigLoader::from_env().context("loading configuration from environment")?,
    };

    let consumer = build_consumer(&config)?;
    let processor = ReduceResolutionProcessor::new(config.clone());
    let server = ReduceResolutionServer::new(ReduceResolutionService::new(processor, consumer));

    let addr: SocketAddr = config
        .server
        .socket_address()
        .parse()
        .with_context(|| format!("invalid listen address {}", config.server.socket_address()))?;

    let server_handle = tokio::spawn(async move {
        if let Err(e) = server.start(addr).await {
            error!("gRPC server error: {}", e);
        }
    });

    info!(
        listen = %addr,
        aggregate_histograms = config.aggregate_histograms,
        "OTLP reduce resolution service started"
    );

    // Keep the service running
    tokio::signal::ctrl_c().await?;

    info!("Shutting down...");
    server_handle.abort();

    Ok(())
}

fn build_consumer(config: &Config) -> anyhow::Result<Arc<dyn MetricsConsumer>> {
    match config.forwarding {
        Some(ref forwarding) if forwarding.enabled => {
            let forwarder = OtlpGrpcForwarder::from_config(forwarding)?;
            info!(endpoint = %forwarder.endpoint(), "Forwarding reduced metrics");
            Ok(Arc::new(forwarder))
        }
        _ => {
            info!("Forwarding disabled, reduced metrics are discarded");
            Ok(Arc::new(DiscardConsumer))
        }
    }
}
