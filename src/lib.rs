//! CGI gateway library.
//!
//! Dispatches HTTP requests by path to configured commands, either as CGI
//! invocations or as raw byte streams bridged over an upgraded connection.
//! The routing table is hot-reloadable without disturbing in-flight requests.

pub mod config;
pub mod exec;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod routing;
pub mod security;
pub mod state;

pub use config::{GatewayConfig, Settings};
pub use http::GatewayServer;
pub use lifecycle::Shutdown;
pub use state::GatewayState;
