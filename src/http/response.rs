//! Request-level errors and their HTTP responses.
//!
//! # Design Decisions
//! - Every per-request failure is contained to that request
//! - Bodies are short plain-text `"<code> <reason>: <detail>"` lines
//! - 401 responses always carry the Basic challenge

use axum::body::Body;
use axum::http::{header, HeaderValue, Response, StatusCode};
use axum::response::IntoResponse;

use crate::config::ConfigError;
use crate::exec::ExecError;
use crate::security::CHALLENGE;

/// Failure of a single request.
#[derive(Debug, thiserror::Error)]
pub enum RequestError {
    #[error("missing or invalid credential")]
    Unauthorized,

    #[error("only GET and POST are accepted")]
    MethodNotAllowed,

    #[error("no matching route")]
    NotFound,

    #[error("sub-path not allowed on this route")]
    SubPathRejected,

    #[error("only HTTP/1.1 is supported")]
    UnsupportedVersion,

    #[error("must upgrade to 'tcp'")]
    UpgradeRequired,

    #[error("cannot hijack connection")]
    HijackUnsupported,

    #[error(transparent)]
    Exec(#[from] ExecError),

    #[error("reload failed: {0}")]
    Reload(#[from] ConfigError),
}

impl RequestError {
    pub fn status(&self) -> StatusCode {
        match self {
            RequestError::Unauthorized => StatusCode::UNAUTHORIZED,
            RequestError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            RequestError::NotFound | RequestError::SubPathRejected => StatusCode::NOT_FOUND,
            RequestError::UnsupportedVersion => StatusCode::BAD_REQUEST,
            RequestError::UpgradeRequired => StatusCode::UPGRADE_REQUIRED,
            RequestError::HijackUnsupported => StatusCode::INTERNAL_SERVER_ERROR,
            RequestError::Exec(ExecError::BodyTooLarge { .. }) => StatusCode::PAYLOAD_TOO_LARGE,
            RequestError::Exec(ExecError::Body(_)) => StatusCode::BAD_REQUEST,
            RequestError::Exec(_) => StatusCode::INTERNAL_SERVER_ERROR,
            RequestError::Reload(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for RequestError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status();
        let reason = status.canonical_reason().unwrap_or_default();

        // Internal details stay in the log.
        let text = match &self {
            RequestError::Exec(ExecError::Spawn { .. } | ExecError::Io(_)) => {
                format!("{} {}\n", status.as_u16(), reason)
            }
            other => format!("{} {}: {}\n", status.as_u16(), reason, other),
        };

        let mut response = Response::new(Body::from(text));
        *response.status_mut() = status;
        let headers = response.headers_mut();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("text/plain; charset=utf-8"),
        );
        match self {
            RequestError::Unauthorized => {
                headers.insert(header::WWW_AUTHENTICATE, HeaderValue::from_static(CHALLENGE));
            }
            RequestError::MethodNotAllowed => {
                headers.insert(header::ALLOW, HeaderValue::from_static("GET, POST"));
            }
            RequestError::UpgradeRequired => {
                headers.insert(header::UPGRADE, HeaderValue::from_static("tcp"));
                headers.insert(header::CONNECTION, HeaderValue::from_static("Upgrade"));
            }
            _ => {}
        }
        response
    }
}
