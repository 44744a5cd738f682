//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (path)
//!     → matcher.rs (normalize, segment-prefix match)
//!     → router.rs (table lookup)
//!     → Return: matched RouteHandler + sub-path remainder, or NoMatch
//!
//! Route Compilation (at every reload):
//!     GatewayConfig
//!     → normalize paths, validate commands
//!     → build one RouteHandler per entry
//!     → Freeze as immutable RoutingTable
//! ```
//!
//! # Design Decisions
//! - Tables are compiled whole and never patched; reload builds a new one
//! - Duplicate paths: last entry wins
//! - Longest matching prefix wins, matched on segment boundaries

pub mod matcher;
pub mod router;

pub use router::{RouteMatch, RoutingTable};
