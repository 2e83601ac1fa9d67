//! OS signal handling.
//!
//! SIGINT and SIGTERM both trigger a graceful shutdown.

use crate::lifecycle::Shutdown;

/// Wait for SIGINT or SIGTERM, then fire `shutdown`.
pub async fn shutdown_on_signal(shutdown: &Shutdown) {
    wait_for_signal().await;
    shutdown.trigger();
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut terminate = match signal(SignalKind::terminate()) {
        Ok(stream) => stream,
        Err(e) => {
            tracing::error!(error = %e, "Failed to install SIGTERM handler, falling back to Ctrl+C");
            ctrl_c().await;
            return;
        }
    };

    tokio::select! {
        _ = ctrl_c() => tracing::info!("SIGINT received"),
        _ = terminate.recv() => tracing::info!("SIGTERM received"),
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    ctrl_c().await;
    tracing::info!("Ctrl+C received");
}

async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
}
