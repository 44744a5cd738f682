//! OS signal handling.
//!
//! - SIGHUP → config reload (no authentication; process-level trust)
//! - SIGINT / SIGTERM → graceful shutdown

use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::state::GatewayState;

/// Reload the gateway on every SIGHUP.
#[cfg(unix)]
pub fn spawn_reload_on_sighup(gateway: Arc<GatewayState>) -> std::io::Result<JoinHandle<()>> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut hangup = signal(SignalKind::hangup())?;
    Ok(tokio::spawn(async move {
        while hangup.recv().await.is_some() {
            tracing::info!("SIGHUP received, reloading config");
            let gateway = Arc::clone(&gateway);
            // Errors are logged by reload itself.
            let _ = tokio::task::spawn_blocking(move || gateway.reload()).await;
        }
    }))
}

/// Reload the gateway whenever the receiver yields (file watcher).
pub fn spawn_reload_on_notify(
    gateway: Arc<GatewayState>,
    mut rx: tokio::sync::mpsc::UnboundedReceiver<()>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while rx.recv().await.is_some() {
            let gateway = Arc::clone(&gateway);
            let _ = tokio::task::spawn_blocking(move || gateway.reload()).await;
        }
    })
}

/// Wait for Ctrl+C or SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                term.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}
