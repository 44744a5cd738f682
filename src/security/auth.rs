//! Static-key Basic authentication.

use std::collections::HashSet;

use axum::http::{header, HeaderMap};
use base64::{engine::general_purpose::STANDARD, Engine as _};

/// Value of the `WWW-Authenticate` header sent with 401 responses.
pub const CHALLENGE: &str = r#"Basic realm="cgi-gateway""#;

/// The set of accepted keys (Basic-Auth usernames).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    keys: HashSet<String>,
}

impl Credentials {
    pub fn new(keys: impl IntoIterator<Item = String>) -> Self {
        Self {
            keys: keys.into_iter().collect(),
        }
    }

    /// True when no keys are configured and every request is let through.
    pub fn is_open(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.keys.contains(key)
    }

    /// Check the request's Basic-Auth username against the key set.
    ///
    /// Missing or malformed headers and other schemes are rejected.
    pub fn authorize(&self, headers: &HeaderMap) -> bool {
        if self.is_open() {
            return true;
        }
        basic_auth_username(headers)
            .map(|user| self.keys.contains(&user))
            .unwrap_or(false)
    }
}

/// Extract the username from a `Basic` Authorization header.
///
/// Returns `None` unless the header is present, uses the Basic scheme,
/// decodes as base64 and contains a `:` separator.
pub fn basic_auth_username(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, payload) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("basic") {
        return None;
    }

    let decoded = STANDARD.decode(payload.trim()).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (user, _password) = decoded.split_once(':')?;
    Some(user.to_string())
}
