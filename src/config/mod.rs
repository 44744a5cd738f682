//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (YAML/TOML)
//!     → loader.rs (parse & deserialize)
//!     → GatewayConfig (plain data, no behavior)
//!     → routing::RoutingTable::compile (semantic checks)
//!
//! On reload trigger (SIGHUP, GET /reload, watcher.rs):
//!     loader.rs loads new config
//!     → compile new routing table
//!     → atomic swap inside GatewayState
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require full reload
//! - Missing lists and flags default to empty / false
//! - Process settings (listen address, config path) come from env.rs and
//!   are read once at startup, never reloaded

pub mod env;
pub mod loader;
pub mod schema;
pub mod watcher;

pub use env::{ListenAddr, Settings};
pub use loader::{load_config, ConfigError};
pub use schema::{EntryConfig, GatewayConfig};
