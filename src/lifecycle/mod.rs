//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (main.rs):
//!     Settings → logging → initial load (empty table on failure)
//!     → reload triggers → bind listener → serve
//!
//! Shutdown (shutdown.rs):
//!     Signal received → stop accepting → drain HTTP connections → exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → trigger graceful shutdown
//!     SIGHUP → trigger config reload
//! ```
//!
//! # Design Decisions
//! - Only binding the listener is fatal at startup
//! - Hijack sessions are not tracked by shutdown; their processes are
//!   never killed by the gateway

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
