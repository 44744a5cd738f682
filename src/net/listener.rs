//! Listener binding for the configured transport.
//!
//! # Responsibilities
//! - Bind a TCP or Unix domain socket from a `ListenAddr`
//! - Expose the client address to handlers as connect info
//! - Remove the Unix socket file once serving stops

use std::net::SocketAddr;
use std::path::PathBuf;

use axum::extract::connect_info::Connected;
use axum::serve::IncomingStream;
use tokio::net::TcpListener;
#[cfg(unix)]
use tokio::net::UnixListener;

use crate::config::ListenAddr;

/// Error type for listener operations.
#[derive(Debug, thiserror::Error)]
pub enum ListenerError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("unix sockets are not supported on this platform")]
    UnixUnsupported,
}

/// A bound listener of either transport kind.
#[derive(Debug)]
pub enum GatewayListener {
    Tcp(TcpListener),
    #[cfg(unix)]
    Unix(UnixListener, PathBuf),
}

impl GatewayListener {
    /// Bind to the configured address.
    pub async fn bind(addr: &ListenAddr) -> Result<Self, ListenerError> {
        match addr {
            ListenAddr::Tcp(address) => {
                let listener = TcpListener::bind(address.as_str())
                    .await
                    .map_err(|source| ListenerError::Bind {
                        addr: addr.to_string(),
                        source,
                    })?;
                Ok(GatewayListener::Tcp(listener))
            }
            #[cfg(unix)]
            ListenAddr::Unix(path) => {
                let listener = UnixListener::bind(path).map_err(|source| ListenerError::Bind {
                    addr: addr.to_string(),
                    source,
                })?;
                Ok(GatewayListener::Unix(listener, path.clone()))
            }
            #[cfg(not(unix))]
            ListenAddr::Unix(_) => Err(ListenerError::UnixUnsupported),
        }
    }

    /// TCP address actually bound, if this is a TCP listener.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        match self {
            GatewayListener::Tcp(listener) => listener.local_addr().ok(),
            #[cfg(unix)]
            GatewayListener::Unix(..) => None,
        }
    }

    /// Human-readable address for logs.
    pub fn describe(&self) -> String {
        match self {
            GatewayListener::Tcp(listener) => match listener.local_addr() {
                Ok(addr) => format!("tcp:{}", addr),
                Err(_) => "tcp:?".to_string(),
            },
            #[cfg(unix)]
            GatewayListener::Unix(_, path) => format!("unix:{}", path.display()),
        }
    }
}

/// Client address as seen by handlers. `None` on Unix sockets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeerAddr(pub Option<SocketAddr>);

impl Connected<IncomingStream<'_, TcpListener>> for PeerAddr {
    fn connect_info(stream: IncomingStream<'_, TcpListener>) -> Self {
        PeerAddr(Some(*stream.remote_addr()))
    }
}

#[cfg(unix)]
impl Connected<IncomingStream<'_, UnixListener>> for PeerAddr {
    fn connect_info(_stream: IncomingStream<'_, UnixListener>) -> Self {
        PeerAddr(None)
    }
}

/// Removes a Unix socket file when dropped.
#[derive(Debug)]
pub struct SocketFileGuard(pub PathBuf);

impl Drop for SocketFileGuard {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.0) {
            tracing::warn!(path = ?self.0, error = %e, "Failed to remove socket file");
        }
    }
}
