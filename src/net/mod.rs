//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! APP_LISTEN (tcp:<addr> | unix:<path>)
//!     → listener.rs (bind, peer address connect info)
//!     → Hand off to HTTP layer
//!
//! Upgraded connections leave the HTTP layer:
//!     → connection.rs (session id, live-session count)
//! ```

pub mod connection;
pub mod listener;

pub use connection::{SessionGuard, SessionId, SessionTracker};
pub use listener::{GatewayListener, ListenerError, PeerAddr};
