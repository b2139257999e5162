//! Server wiring: gateway construction, serving and shutdown

pub mod grpc;

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio_stream::wrappers::TcpListenerStream;
use tonic::transport::Server;

use dmn_gateway_core::{
    ArtifactLoader, DecisionGateway, EmbeddedArtifactLoader, FsArtifactLoader, ModelResolver,
};

use crate::config::GatewayConfig;
use crate::dinner::{DINNER_ARTIFACT, DINNER_ARTIFACT_YAML};
use crate::proto::dinner::v1::dinner_server::DinnerServer;

pub use grpc::{into_status, DinnerService, WARNING_METADATA_KEY};

/// Build the evaluation gateway described by `config`.
pub fn build_gateway(config: &GatewayConfig) -> DecisionGateway {
    let loader: Arc<dyn ArtifactLoader> = match &config.model.directory {
        Some(directory) => Arc::new(FsArtifactLoader::new(directory)),
        None => Arc::new(
            EmbeddedArtifactLoader::new().with_artifact(DINNER_ARTIFACT, DINNER_ARTIFACT_YAML),
        ),
    };

    let resolver = ModelResolver::new(loader, config.handle_policy, config.runtime_options());

    DecisionGateway::new(Arc::new(resolver), config.model_identifier())
        .with_timeout(config.evaluation_timeout())
}

/// Serve the Dinner service on `addr` until `shutdown` resolves.
pub async fn serve(
    addr: SocketAddr,
    gateway: Arc<DecisionGateway>,
    shutdown: impl Future<Output = ()>,
) -> anyhow::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    serve_with_listener(listener, gateway, shutdown).await
}

/// Serve on an already-bound listener. In-flight calls finish before this
/// returns.
pub async fn serve_with_listener(
    listener: TcpListener,
    gateway: Arc<DecisionGateway>,
    shutdown: impl Future<Output = ()>,
) -> anyhow::Result<()> {
    tracing::info!(addr = %listener.local_addr()?, "Starting gRPC server");

    Server::builder()
        .add_service(DinnerServer::new(DinnerService::new(gateway)))
        .serve_with_incoming_shutdown(TcpListenerStream::new(listener), shutdown)
        .await?;

    tracing::info!("gRPC server stopped");
    Ok(())
}

/// Resolves on SIGINT or SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, draining in-flight calls");
}
