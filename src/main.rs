//! CGI gateway.
//!
//! # Architecture Overview
//!
//! ```text
//!                         ┌──────────────────────────────────────────────┐
//!   Client Request        │                 CGI GATEWAY                  │
//!   ──────────────────────┼─▶ net ──▶ http ──▶ GatewayState snapshot     │
//!                         │                      │                       │
//!                         │                      ▼                       │
//!                         │            RoutingTable (auth + routes)      │
//!                         │                      │                       │
//!                         │                      ▼                       │
//!                         │     RouteHandler (sub-path, serialization)   │
//!                         │           │                     │            │
//!                         │           ▼                     ▼            │
//!   Client Response       │     CGI executor          Hijack bridge      │
//!   ◀─────────────────────┼──── (stdin/stdout)       (101 + raw bytes) ──┼──▶ process
//!                         │                                              │
//!                         │  Reload: SIGHUP | GET /reload | file watch   │
//!                         │     → load → compile → atomic swap           │
//!                         └──────────────────────────────────────────────┘
//! ```

use std::sync::Arc;

use clap::Parser;

use cgi_gateway::config::watcher::ConfigWatcher;
use cgi_gateway::config::Settings;
use cgi_gateway::exec::CompileOptions;
use cgi_gateway::lifecycle::{signals, Shutdown};
use cgi_gateway::net::{GatewayListener, SessionTracker};
use cgi_gateway::observability::{logging, metrics};
use cgi_gateway::{GatewayServer, GatewayState};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let settings = Settings::parse();
    logging::init_tracing();

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        config = ?settings.config_path,
        listen = %settings.listen,
        pid = std::process::id(),
        "cgi-gateway starting"
    );

    if let Some(addr) = settings.metrics_address {
        metrics::init_metrics(addr);
    }

    let options = CompileOptions {
        max_body_bytes: settings.max_body_bytes,
        sessions: SessionTracker::new(),
    };
    let gateway = Arc::new(GatewayState::bootstrap(&settings.config_path, options));

    #[cfg(unix)]
    signals::spawn_reload_on_sighup(Arc::clone(&gateway))?;

    // Keep the watcher handle alive for the life of the process.
    let _watcher = if settings.watch_config {
        let (watcher, rx) = ConfigWatcher::new(&settings.config_path);
        signals::spawn_reload_on_notify(Arc::clone(&gateway), rx);
        match watcher.run() {
            Ok(handle) => Some(handle),
            Err(e) => {
                tracing::error!(error = %e, "Cannot watch config file, continuing without it");
                None
            }
        }
    } else {
        None
    };

    let listener = GatewayListener::bind(&settings.listen).await?;

    let shutdown = Shutdown::new();
    shutdown.trigger_on(signals::shutdown_signal());

    GatewayServer::new(gateway)
        .run(listener, shutdown.subscribe())
        .await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
