//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP / Unix connection
//!     → server.rs (Axum setup, request ID, tracing)
//!     → dispatch: table snapshot → /reload | auth → method → route
//!     → exec::RouteHandler (CGI or hijack)
//!     → response.rs (request errors → status + text)
//! ```

pub mod response;
pub mod server;

pub use response::RequestError;
pub use server::{build_router, AppState, GatewayServer, RELOAD_PATH};
