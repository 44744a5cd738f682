//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request
//!     → auth.rs (Basic-Auth username ∈ static_key set)
//!     → 401 + WWW-Authenticate challenge on failure
//! ```
//!
//! # Design Decisions
//! - The credential set is part of the routing table, so a reload swaps
//!   routes and credentials together
//! - Only the username slot is checked; the password is ignored
//! - An empty set disables authentication

pub mod auth;

pub use auth::{basic_auth_username, Credentials, CHALLENGE};
