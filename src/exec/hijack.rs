//! HTTP → raw TCP bridge.
//!
//! # Data Flow
//! ```text
//! Client ──HTTP/1.1 GET + Upgrade: tcp──▶ negotiate()
//!        ◀──────── 101 Switching Protocols ─ accept()
//!
//! Client ◀════ opaque bytes ════▶ child process (stdin / stdout)
//! ```
//!
//! # Session States
//! `Negotiating → Bridging → Terminating → Closed`, linear, no retries.
//!
//! # Design Decisions
//! - The hyper upgrade handle is taken out of the request before the 101 is
//!   returned; from then on the session task is the sole owner of the
//!   connection
//! - Bytes hyper read ahead of the upgrade are replayed by `Upgraded` before
//!   live socket data, so the process sees the exact client byte order
//! - The process is never killed: a client close only closes its stdin
//! - Process exit ends the session: stdout gets a short drain, then the
//!   transport is shut down even if a descendant still holds the pipe

use std::io;
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{header, HeaderValue, Request, Response, StatusCode, Version};
use hyper::upgrade::OnUpgrade;
use hyper_util::rt::TokioIo;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};

use crate::exec::command::{self, CommandSpec};
use crate::http::response::RequestError;
use crate::net::connection::{SessionId, SessionState, SessionTracker};

/// How long buffered process output may still flow after the process exits.
const OUTPUT_DRAIN: Duration = Duration::from_millis(250);

/// Upgrades requests to a byte stream bridged to a spawned process.
#[derive(Debug, Clone)]
pub struct HijackBridge {
    command: Arc<CommandSpec>,
    sessions: SessionTracker,
}

/// A validated upgrade request whose connection has been taken over but
/// not yet answered.
#[derive(Debug)]
pub struct PendingUpgrade {
    on_upgrade: OnUpgrade,
    env: Vec<(String, String)>,
    command: Arc<CommandSpec>,
    sessions: SessionTracker,
}

impl HijackBridge {
    pub fn new(command: Arc<CommandSpec>, sessions: SessionTracker) -> Self {
        Self { command, sessions }
    }

    /// Validate the upgrade request and take the connection's upgrade handle.
    ///
    /// Fails without side effects: 400 for anything but HTTP/1.1, 426 when
    /// `Upgrade: tcp` is missing, 500 when the transport cannot be taken over.
    pub fn negotiate<B>(&self, mut req: Request<B>) -> Result<PendingUpgrade, RequestError> {
        if req.version() != Version::HTTP_11 {
            return Err(RequestError::UnsupportedVersion);
        }

        let wants_tcp = req
            .headers()
            .get(header::UPGRADE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.trim().eq_ignore_ascii_case("tcp"))
            .unwrap_or(false);
        if !wants_tcp {
            return Err(RequestError::UpgradeRequired);
        }

        let on_upgrade = req
            .extensions_mut()
            .remove::<OnUpgrade>()
            .ok_or(RequestError::HijackUnsupported)?;

        Ok(PendingUpgrade {
            on_upgrade,
            env: session_env(&req),
            command: Arc::clone(&self.command),
            sessions: self.sessions.clone(),
        })
    }
}

impl PendingUpgrade {
    /// Commit to the upgrade: spawn the session task and return the 101.
    ///
    /// `permit` is held until the session ends; for serialized routes it is
    /// the route lock guard.
    pub fn accept<P>(self, permit: P) -> Response<Body>
    where
        P: Send + 'static,
    {
        let PendingUpgrade {
            on_upgrade,
            env,
            command,
            sessions,
        } = self;

        tokio::spawn(async move {
            let _permit = permit;
            let guard = sessions.track();
            let session_id = guard.id();
            trace_state(session_id, SessionState::Negotiating);

            let upgraded = match on_upgrade.await {
                Ok(upgraded) => upgraded,
                Err(e) => {
                    tracing::warn!(session_id = %session_id, error = %e, "Connection upgrade failed");
                    return;
                }
            };

            tracing::info!(
                session_id = %session_id,
                command = ?command.program(),
                "Hijack session started"
            );

            match bridge(TokioIo::new(upgraded), &command, env, session_id).await {
                Ok(status) => {
                    tracing::info!(session_id = %session_id, status = %status, "Hijack session ended")
                }
                Err(e) => {
                    tracing::error!(session_id = %session_id, error = %e, "Hijack session failed")
                }
            }
        });

        switching_protocols()
    }
}

fn switching_protocols() -> Response<Body> {
    let mut response = Response::new(Body::empty());
    *response.status_mut() = StatusCode::SWITCHING_PROTOCOLS;
    let headers = response.headers_mut();
    headers.insert(header::UPGRADE, HeaderValue::from_static("tcp"));
    headers.insert(header::CONNECTION, HeaderValue::from_static("Upgrade"));
    response
}

/// Environment for a hijack process: request line data, one variable per
/// header, and `PATH`.
pub fn session_env<B>(req: &Request<B>) -> Vec<(String, String)> {
    let mut env = vec![
        (
            "HTTP_HOST".to_string(),
            command::request_host(req.headers(), req.uri()),
        ),
        ("REQUEST_METHOD".to_string(), req.method().to_string()),
        ("REQUEST_URI".to_string(), command::request_uri(req.uri())),
    ];
    env.extend(command::header_env(req.headers()));
    env.push(("PATH".to_string(), command::search_path()));
    env
}

/// Run one session over `io` until the process exits.
///
/// Both the process and the transport are released before this returns,
/// including when spawning fails.
pub async fn bridge<S>(
    io: S,
    command: &CommandSpec,
    env: Vec<(String, String)>,
    session_id: SessionId,
) -> io::Result<ExitStatus>
where
    S: AsyncRead + AsyncWrite + Send,
{
    let mut cmd = command.to_command();
    cmd.envs(env)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null());

    let mut child = match cmd.spawn() {
        Ok(child) => child,
        Err(e) => {
            tracing::error!(
                session_id = %session_id,
                command = ?command.program(),
                error = %e,
                "Exec error"
            );
            // io is dropped here, closing the connection.
            return Err(e);
        }
    };
    trace_state(session_id, SessionState::Bridging);

    let (reader, mut writer) = tokio::io::split(io);
    let stdin = child.stdin.take();
    let stdout = child.stdout.take();

    let status = {
        let inbound = async move {
            let mut reader = reader;
            if let Some(mut stdin) = stdin {
                if let Err(e) = tokio::io::copy(&mut reader, &mut stdin).await {
                    tracing::debug!(session_id = %session_id, error = %e, "Client to process copy ended");
                }
                let _ = stdin.shutdown().await;
            }
        };

        let outbound = async {
            if let Some(mut stdout) = stdout {
                if let Err(e) = tokio::io::copy(&mut stdout, &mut writer).await {
                    tracing::debug!(session_id = %session_id, error = %e, "Process to client copy ended");
                }
            }
        };

        tokio::pin!(inbound, outbound);
        let mut inbound_done = false;
        let mut outbound_done = false;

        let status = loop {
            tokio::select! {
                status = child.wait() => break status,
                () = &mut inbound, if !inbound_done => {
                    inbound_done = true;
                    tracing::debug!(session_id = %session_id, "Client closed, waiting for process exit");
                }
                () = &mut outbound, if !outbound_done => outbound_done = true,
            }
        };

        // A background descendant may keep stdout open; don't wait for it.
        if !outbound_done && tokio::time::timeout(OUTPUT_DRAIN, &mut outbound).await.is_err() {
            tracing::debug!(session_id = %session_id, "Process output still open after exit, closing");
        }
        status
    };

    trace_state(session_id, SessionState::Terminating);
    let _ = writer.shutdown().await;
    drop(writer);
    trace_state(session_id, SessionState::Closed);

    status
}

fn trace_state(session_id: SessionId, state: SessionState) {
    tracing::trace!(session_id = %session_id, state = ?state, "Session state");
}
