//! Server startup and lifecycle

use crate::{AppState, GatewayConfig, routes};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

/// Run the gateway server
pub async fn run_server(config: GatewayConfig) -> anyhow::Result<()> {
    run_server_with_shutdown(config, std::future::pending::<()>()).await
}

/// Run server with graceful shutdown
pub async fn run_server_with_shutdown(
    config: GatewayConfig,
    shutdown_signal: impl std::future::Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    let state = Arc::new(AppState::new(config.clone()).await?);

    let addr = config.bind_addr();
    let listener = TcpListener::bind(&addr).await?;

    info!("🚀 Blobgate listening on http://{}", listener.local_addr()?);

    serve(listener, state, shutdown_signal).await?;

    info!("👋 Gateway shutdown complete");

    Ok(())
}

/// Serve requests on an already bound listener until `shutdown_signal` resolves
pub async fn serve(
    listener: TcpListener,
    state: Arc<AppState>,
    shutdown_signal: impl std::future::Future<Output = ()> + Send + 'static,
) -> std::io::Result<()> {
    let app = routes::create_router(state);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal)
    .await
}
