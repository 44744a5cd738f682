//! CGI executor: one process per request.
//!
//! # Responsibilities
//! - Translate the request into a CGI environment
//! - Feed the request body to stdin while collecting stdout
//! - Turn the process output into an HTTP response
//!
//! # Design Decisions
//! - Bodies are buffered on both sides (bounded on input)
//! - Output without a CGI header block is served verbatim as `text/plain`
//! - Stderr is discarded; a non-zero exit status is logged, not mapped to 5xx
//! - No retries

use std::io;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Instant;

use axum::body::Body;
use axum::http::{
    header, request::Parts, HeaderMap, HeaderName, HeaderValue, Request, Response, StatusCode,
};
use tokio::io::AsyncWriteExt;

use crate::exec::command::{self, CommandSpec};
use crate::exec::{ExecError, Invocation};
use crate::observability::metrics;

const SERVER_SOFTWARE: &str = concat!("cgi-gateway/", env!("CARGO_PKG_VERSION"));

/// Runs a configured command as a CGI script.
#[derive(Debug, Clone)]
pub struct CgiExecutor {
    command: Arc<CommandSpec>,
    max_body_bytes: usize,
}

impl CgiExecutor {
    pub fn new(command: Arc<CommandSpec>, max_body_bytes: usize) -> Self {
        Self {
            command,
            max_body_bytes,
        }
    }

    /// Run the command once for this request.
    pub async fn serve(
        &self,
        req: Request<Body>,
        invocation: &Invocation<'_>,
    ) -> Result<Response<Body>, ExecError> {
        let start = Instant::now();
        let (parts, body) = req.into_parts();

        if let Some(len) = content_length(&parts.headers) {
            if len > self.max_body_bytes {
                return Err(ExecError::BodyTooLarge {
                    limit: self.max_body_bytes,
                });
            }
        }
        let body = axum::body::to_bytes(body, self.max_body_bytes)
            .await
            .map_err(|e| ExecError::Body(e.to_string()))?;

        let env = cgi_env(&parts, invocation, body.len());

        tracing::info!(
            route = %invocation.route,
            command = ?self.command.program(),
            args = ?self.command.args(),
            "Executing CGI"
        );

        let mut cmd = self.command.to_command();
        cmd.envs(env)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null());

        let mut child = cmd.spawn().map_err(|source| ExecError::Spawn {
            program: self.command.program().display().to_string(),
            source,
        })?;

        let stdin = child.stdin.take();
        let feed = async move {
            if let Some(mut stdin) = stdin {
                if let Err(e) = stdin.write_all(&body).await {
                    // Scripts are free to ignore their input.
                    if e.kind() != io::ErrorKind::BrokenPipe {
                        tracing::debug!(error = %e, "Failed to write CGI request body");
                    }
                }
            }
        };

        let ((), output) = tokio::join!(feed, child.wait_with_output());
        let output = output?;

        if !output.status.success() {
            tracing::warn!(
                route = %invocation.route,
                status = %output.status,
                "CGI process exited unsuccessfully"
            );
        }
        metrics::record_cgi_duration(invocation.route, start);

        parse_cgi_output(&output.stdout)
    }
}

fn content_length(headers: &HeaderMap) -> Option<usize> {
    headers
        .get(header::CONTENT_LENGTH)?
        .to_str()
        .ok()?
        .trim()
        .parse()
        .ok()
}

/// CGI environment for a request.
pub fn cgi_env(parts: &Parts, invocation: &Invocation<'_>, body_len: usize) -> Vec<(String, String)> {
    let host = command::request_host(&parts.headers, &parts.uri);
    let (server_name, server_port) = split_host(&host);

    let mut env = vec![
        ("GATEWAY_INTERFACE".to_string(), "CGI/1.1".to_string()),
        ("SERVER_SOFTWARE".to_string(), SERVER_SOFTWARE.to_string()),
        ("SERVER_PROTOCOL".to_string(), format!("{:?}", parts.version)),
        ("SERVER_NAME".to_string(), server_name),
        ("SERVER_PORT".to_string(), server_port),
        ("HTTP_HOST".to_string(), host),
        ("REQUEST_METHOD".to_string(), parts.method.to_string()),
        ("REQUEST_URI".to_string(), command::request_uri(&parts.uri)),
        (
            "QUERY_STRING".to_string(),
            parts.uri.query().unwrap_or_default().to_string(),
        ),
        ("SCRIPT_NAME".to_string(), invocation.route.to_string()),
        ("PATH_INFO".to_string(), invocation.sub_path.to_string()),
    ];

    if let Some(peer) = invocation.peer {
        env.push(("REMOTE_ADDR".to_string(), peer.ip().to_string()));
        env.push(("REMOTE_HOST".to_string(), peer.ip().to_string()));
        env.push(("REMOTE_PORT".to_string(), peer.port().to_string()));
    }

    if let Some(content_type) = parts
        .headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
    {
        env.push(("CONTENT_TYPE".to_string(), content_type.to_string()));
    }
    if body_len > 0 || parts.headers.contains_key(header::CONTENT_LENGTH) {
        env.push(("CONTENT_LENGTH".to_string(), body_len.to_string()));
    }

    env.extend(
        command::header_env(&parts.headers)
            .into_iter()
            .filter(|(k, _)| k != "HTTP_PROXY"),
    );
    env.push(("PATH".to_string(), command::search_path()));
    env
}

fn split_host(host: &str) -> (String, String) {
    match host.rsplit_once(':') {
        Some((name, port)) if !port.is_empty() && port.bytes().all(|b| b.is_ascii_digit()) => {
            (name.to_string(), port.to_string())
        }
        _ => (host.to_string(), "80".to_string()),
    }
}

/// Build the HTTP response from a CGI script's stdout.
pub fn parse_cgi_output(output: &[u8]) -> Result<Response<Body>, ExecError> {
    let Some((fields, body)) = split_header_block(output) else {
        let mut response = Response::new(Body::from(output.to_vec()));
        response.headers_mut().insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("text/plain; charset=utf-8"),
        );
        return Ok(response);
    };

    let mut status = None;
    let mut headers = HeaderMap::new();
    for (name, value) in fields {
        if name.eq_ignore_ascii_case("status") {
            let code = value
                .split_whitespace()
                .next()
                .and_then(|code| code.parse::<u16>().ok())
                .and_then(|code| StatusCode::from_u16(code).ok())
                .ok_or_else(|| ExecError::MalformedOutput(format!("bogus status {:?}", value)))?;
            status = Some(code);
            continue;
        }

        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            (Ok(name), Ok(value)) => {
                headers.append(name, value);
            }
            _ => tracing::warn!(header = %name, "Skipping invalid CGI header"),
        }
    }

    let status = status.unwrap_or(if headers.contains_key(header::LOCATION) {
        StatusCode::FOUND
    } else {
        StatusCode::OK
    });

    let mut response = Response::new(Body::from(body.to_vec()));
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    Ok(response)
}

/// Split a leading `Name: value` block terminated by an empty line.
///
/// Returns `None` when the output does not start with such a block.
fn split_header_block(output: &[u8]) -> Option<(Vec<(&str, &str)>, &[u8])> {
    let mut fields = Vec::new();
    let mut rest = output;

    loop {
        let newline = rest.iter().position(|b| *b == b'\n')?;
        let line = &rest[..newline];
        let line = line.strip_suffix(b"\r").unwrap_or(line);
        rest = &rest[newline + 1..];

        if line.is_empty() {
            return if fields.is_empty() {
                None
            } else {
                Some((fields, rest))
            };
        }

        let line = std::str::from_utf8(line).ok()?;
        let (name, value) = line.split_once(':')?;
        if name.is_empty() || !name.bytes().all(is_token_byte) {
            return None;
        }
        fields.push((name, value.trim()));
    }
}

fn is_token_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b"!#$%&'*+-.^_`|~".contains(&b)
}
