//! HTTP server lifecycle with graceful shutdown.

use std::net::SocketAddr;
use std::time::Duration;

use axum::Router;
use axum_server::Handle;

use crate::TRACING_TARGET_SERVER;

/// How long in-flight requests may drain after a shutdown signal.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(15);

/// Serves the router until ctrl-c, then drains gracefully.
pub async fn serve(router: Router, port: u16) -> anyhow::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let handle = Handle::new();

    tokio::spawn(shutdown_signal(handle.clone()));

    tracing::info!(
        target: TRACING_TARGET_SERVER,
        addr = %addr,
        "HTTP server listening"
    );

    axum_server::bind(addr)
        .handle(handle)
        .serve(router.into_make_service())
        .await?;

    tracing::info!(target: TRACING_TARGET_SERVER, "HTTP server stopped");
    Ok(())
}

/// Waits for ctrl-c and triggers graceful shutdown.
async fn shutdown_signal(handle: Handle) {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::error!(
            target: TRACING_TARGET_SERVER,
            error = %error,
            "Failed to listen for shutdown signal"
        );
        return;
    }

    tracing::info!(
        target: TRACING_TARGET_SERVER,
        grace_secs = SHUTDOWN_GRACE.as_secs(),
        "Shutdown requested, draining connections"
    );
    handle.graceful_shutdown(Some(SHUTDOWN_GRACE));
}
