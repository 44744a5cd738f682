//! Process settings read once at startup.
//!
//! Every option can be given on the command line or through the `APP_*`
//! environment variables. Unlike the route config these are never reloaded.

use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;

use clap::Parser;

/// Default size limit for CGI request bodies.
pub const DEFAULT_MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Error type for settings parsing.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SettingsError {
    #[error("cannot parse listen address {0:?}: expected <scheme>:<address>")]
    MissingScheme(String),

    #[error("unsupported listen scheme {0:?}")]
    UnsupportedScheme(String),

    #[error("listen address {0:?} has an empty address part")]
    EmptyAddress(String),
}

/// Where the gateway accepts connections.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListenAddr {
    /// TCP socket, `host:port`. An empty host binds all interfaces.
    Tcp(String),
    /// Unix domain socket path.
    Unix(PathBuf),
}

impl FromStr for ListenAddr {
    type Err = SettingsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (scheme, address) = s
            .split_once(':')
            .ok_or_else(|| SettingsError::MissingScheme(s.to_string()))?;

        if address.is_empty() {
            return Err(SettingsError::EmptyAddress(s.to_string()));
        }

        match scheme {
            "tcp" => {
                let address = if address.starts_with(':') {
                    format!("0.0.0.0{}", address)
                } else {
                    address.to_string()
                };
                Ok(ListenAddr::Tcp(address))
            }
            "unix" => Ok(ListenAddr::Unix(PathBuf::from(address))),
            other => Err(SettingsError::UnsupportedScheme(other.to_string())),
        }
    }
}

impl fmt::Display for ListenAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ListenAddr::Tcp(addr) => write!(f, "tcp:{}", addr),
            ListenAddr::Unix(path) => write!(f, "unix:{}", path.display()),
        }
    }
}

/// Command line / environment settings.
#[derive(Debug, Clone, Parser)]
#[command(name = "cgi-gateway")]
#[command(about = "Dispatch HTTP requests to CGI commands and raw TCP bridges", long_about = None)]
pub struct Settings {
    /// Route configuration file (YAML, or TOML by extension).
    #[arg(long = "config", env = "APP_CONFIG", default_value = "./config.yaml")]
    pub config_path: PathBuf,

    /// Listen address, `tcp:<host>:<port>` or `unix:<path>`.
    #[arg(long, env = "APP_LISTEN", default_value = "tcp::8080")]
    pub listen: ListenAddr,

    /// Reload automatically when the config file changes.
    #[arg(long, env = "APP_WATCH_CONFIG")]
    pub watch_config: bool,

    /// Serve Prometheus metrics on this address.
    #[arg(long = "metrics", env = "APP_METRICS")]
    pub metrics_address: Option<SocketAddr>,

    /// Maximum CGI request body size in bytes.
    #[arg(long = "max-body", env = "APP_MAX_BODY", default_value_t = DEFAULT_MAX_BODY_BYTES)]
    pub max_body_bytes: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            config_path: PathBuf::from("./config.yaml"),
            listen: ListenAddr::Tcp("0.0.0.0:8080".to_string()),
            watch_config: false,
            metrics_address: None,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}
