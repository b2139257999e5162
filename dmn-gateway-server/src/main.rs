//! DMN Gateway Server
//!
//! Main entry point for the Dinner gRPC service.
//!
//! Reads config from env vars:
//!   DMN_GATEWAY_CONFIG: optional YAML config file
//!   DMN_GATEWAY_PORT:   listen port (default: 50051)

use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use dmn_gateway_server::{build_gateway, serve, shutdown_signal, GatewayConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "dmn_gateway_server=info,dmn_gateway_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting DMN gateway");

    let config = GatewayConfig::load()?;

    tracing::info!(
        port = config.port,
        model = %config.model_identifier(),
        source = ?config.model.directory,
        policy = ?config.handle_policy,
        strict_type_check = config.strict_type_check,
        timeout_ms = ?config.evaluation_timeout_ms,
        "Configuration loaded"
    );

    let gateway = Arc::new(build_gateway(&config));

    // Fail fast on a missing or malformed model; with the cached policy this
    // also fills the cache.
    gateway
        .resolver()
        .resolve(gateway.model())
        .context("decision model could not be resolved at startup")?;
    tracing::info!(model = %gateway.model(), "Decision model ready");

    serve(config.listen_addr(), gateway, shutdown_signal()).await?;

    tracing::info!("Done.");
    Ok(())
}
