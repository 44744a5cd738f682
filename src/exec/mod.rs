//! Per-route execution.
//!
//! # Data Flow
//! ```text
//! RouteHandler::handle
//!     → sub-path policy (404 when not allowed)
//!     → serialization lock (non-parallel routes only)
//!     → cgi.rs (one process per request)
//!       or hijack.rs (upgrade + raw byte bridge)
//! ```
//!
//! # Design Decisions
//! - Each handler owns its lock; locks are never shared between routes or
//!   between table generations
//! - For hijack routes the lock guard moves into the session and is held
//!   until the process exits
//! - Upgrade validation happens before waiting for the lock

pub mod cgi;
pub mod command;
pub mod hijack;

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, Response};
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::config::env::DEFAULT_MAX_BODY_BYTES;
use crate::config::EntryConfig;
use crate::http::response::RequestError;
use crate::net::connection::SessionTracker;

pub use cgi::CgiExecutor;
pub use command::CommandSpec;
pub use hijack::HijackBridge;

/// Error type for process execution.
#[derive(Debug, thiserror::Error)]
pub enum ExecError {
    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("process IO error: {0}")]
    Io(#[from] io::Error),

    #[error("request body exceeds {limit} bytes")]
    BodyTooLarge { limit: usize },

    #[error("failed to read request body: {0}")]
    Body(String),

    #[error("malformed CGI output: {0}")]
    MalformedOutput(String),
}

/// Settings shared by every handler of a compiled table.
#[derive(Debug, Clone)]
pub struct CompileOptions {
    pub max_body_bytes: usize,
    /// Live hijack sessions; shared across reloads.
    pub sessions: SessionTracker,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            sessions: SessionTracker::new(),
        }
    }
}

/// Request facts a handler needs beyond the request itself.
#[derive(Debug, Clone, Copy)]
pub struct Invocation<'a> {
    /// Normalized route path that matched.
    pub route: &'a str,
    /// Remainder of the request path below `route`.
    pub sub_path: &'a str,
    /// Client address, when the listener provides one.
    pub peer: Option<SocketAddr>,
}

#[derive(Debug)]
enum Mode {
    Cgi(CgiExecutor),
    Hijack(HijackBridge),
}

/// Compiled handler for one route entry.
#[derive(Debug)]
pub struct RouteHandler {
    path: String,
    command: Arc<CommandSpec>,
    allow_sub_path: bool,
    serial: Option<Arc<Mutex<()>>>,
    mode: Mode,
}

impl RouteHandler {
    /// Build the handler for `entry`, mounted at the normalized `path`.
    pub fn new(path: &str, entry: &EntryConfig, options: &CompileOptions) -> Self {
        let command = Arc::new(CommandSpec::new(&entry.cmd));

        let mode = if entry.hijack_tcp {
            Mode::Hijack(HijackBridge::new(
                Arc::clone(&command),
                options.sessions.clone(),
            ))
        } else {
            Mode::Cgi(CgiExecutor::new(Arc::clone(&command), options.max_body_bytes))
        };

        Self {
            path: path.to_string(),
            command,
            allow_sub_path: entry.allow_sub_path,
            serial: (!entry.allow_parallel).then(|| Arc::new(Mutex::new(()))),
            mode,
        }
    }

    pub fn command(&self) -> &CommandSpec {
        &self.command
    }

    pub fn is_hijack(&self) -> bool {
        matches!(self.mode, Mode::Hijack(_))
    }

    pub fn is_serialized(&self) -> bool {
        self.serial.is_some()
    }

    /// Serve one request routed to this handler.
    pub async fn handle(
        &self,
        req: Request<Body>,
        invocation: &Invocation<'_>,
    ) -> Result<Response<Body>, RequestError> {
        if !self.allow_sub_path && !invocation.sub_path.is_empty() {
            tracing::debug!(route = %self.path, sub_path = %invocation.sub_path, "Sub-path not allowed");
            return Err(RequestError::SubPathRejected);
        }

        match &self.mode {
            Mode::Cgi(executor) => {
                let _permit = self.acquire().await;
                Ok(executor.serve(req, invocation).await?)
            }
            Mode::Hijack(bridge) => {
                let pending = bridge.negotiate(req)?;
                let permit = self.acquire().await;
                Ok(pending.accept(permit))
            }
        }
    }

    async fn acquire(&self) -> Option<OwnedMutexGuard<()>> {
        match &self.serial {
            Some(lock) => Some(Arc::clone(lock).lock_owned().await),
            None => None,
        }
    }
}
