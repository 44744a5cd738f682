//! Configuration schema definitions.
//!
//! Field names follow the on-disk format:
//!
//! ```yaml
//! static_key: [alice]
//! entry:
//!   - path: /echo
//!     cmd: [/bin/cat]
//!     allow_parallel: true
//!     allow_sub_path: false
//!     hijack_tcp: true
//! ```

use serde::{Deserialize, Serialize};

/// Root configuration for the gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct GatewayConfig {
    /// Accepted Basic-Auth usernames. Empty means no authentication.
    pub static_key: Vec<String>,

    /// Route entries, in file order.
    pub entry: Vec<EntryConfig>,
}

/// A single route entry mapping a path to a command.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
pub struct EntryConfig {
    /// URL path prefix. Trailing slash is stripped at compile time.
    #[serde(default)]
    pub path: String,

    /// Executable followed by its arguments.
    #[serde(default)]
    pub cmd: Vec<String>,

    /// Allow concurrent invocations of this route.
    #[serde(default)]
    pub allow_parallel: bool,

    /// Accept requests for paths below `path`.
    #[serde(default)]
    pub allow_sub_path: bool,

    /// Upgrade the connection to a raw TCP stream instead of running CGI.
    #[serde(default)]
    pub hijack_tcp: bool,
}

impl EntryConfig {
    /// Convenience constructor used by tests and embedders.
    pub fn new(path: impl Into<String>, cmd: &[&str]) -> Self {
        Self {
            path: path.into(),
            cmd: cmd.iter().map(|s| s.to_string()).collect(),
            ..Self::default()
        }
    }

    pub fn parallel(mut self, allow: bool) -> Self {
        self.allow_parallel = allow;
        self
    }

    pub fn sub_path(mut self, allow: bool) -> Self {
        self.allow_sub_path = allow;
        self
    }

    pub fn hijack(mut self, hijack: bool) -> Self {
        self.hijack_tcp = hijack;
        self
    }
}
