//! HTTP server setup and request dispatch.
//!
//! # Responsibilities
//! - Create the Axum router and its middleware (tracing, request ID)
//! - Serve on a TCP or Unix listener with upgrade support
//! - Dispatch each request against one routing-table snapshot
//! - Handle `GET /reload`

use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{Method, Request, StatusCode},
    middleware::map_response,
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use tokio::sync::broadcast;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::exec::Invocation;
use crate::http::response::RequestError;
use crate::net::listener::{GatewayListener, PeerAddr};
use crate::observability::metrics;
use crate::routing::matcher::normalize_path;
use crate::routing::RoutingTable;
use crate::state::GatewayState;

/// Path of the administrative reload endpoint.
pub const RELOAD_PATH: &str = "/reload";

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<GatewayState>,
}

/// HTTP server for the gateway.
pub struct GatewayServer {
    router: Router,
    gateway: Arc<GatewayState>,
}

impl GatewayServer {
    pub fn new(gateway: Arc<GatewayState>) -> Self {
        let state = AppState {
            gateway: Arc::clone(&gateway),
        };
        Self {
            router: build_router(state),
            gateway,
        }
    }

    /// The Axum router, for in-process use.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn gateway(&self) -> &Arc<GatewayState> {
        &self.gateway
    }

    /// Serve until `shutdown` fires.
    ///
    /// Upgraded sessions are detached and keep running after this returns.
    pub async fn run(
        self,
        listener: GatewayListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        tracing::info!(address = %listener.describe(), "HTTP server starting");

        let signal = async move {
            let _ = shutdown.recv().await;
            tracing::info!("Shutdown signal received");
        };
        let app = self.router.into_make_service_with_connect_info::<PeerAddr>();

        match listener {
            GatewayListener::Tcp(listener) => {
                axum::serve(listener, app)
                    .with_graceful_shutdown(signal)
                    .await?;
            }
            #[cfg(unix)]
            GatewayListener::Unix(listener, path) => {
                let _cleanup = crate::net::listener::SocketFileGuard(path);
                axum::serve(listener, app)
                    .with_graceful_shutdown(signal)
                    .await?;
            }
        }

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Build the Axum router with all middleware layers.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/{*path}", any(dispatch))
        .route("/", any(dispatch))
        .with_state(state)
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(map_response(bare_switching_protocols))
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
}

/// The 101 head carries only `Upgrade` and `Connection`.
async fn bare_switching_protocols(mut response: Response) -> Response {
    if response.status() == StatusCode::SWITCHING_PROTOCOLS {
        response.headers_mut().remove("x-request-id");
    }
    response
}

/// Main gateway handler.
///
/// The table snapshot taken here is the only one this request sees.
async fn dispatch(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start = Instant::now();
    let table = state.gateway.table();
    let path = normalize_path(request.uri().path()).to_string();

    if path == RELOAD_PATH {
        return reload(&state, &table, request).await;
    }

    if !table.credentials().authorize(request.headers()) {
        tracing::debug!(path = %path, "Unauthorized request");
        metrics::record_request("none", StatusCode::UNAUTHORIZED.as_u16(), start);
        return RequestError::Unauthorized.into_response();
    }

    if request.method() != Method::GET && request.method() != Method::POST {
        metrics::record_request("none", StatusCode::METHOD_NOT_ALLOWED.as_u16(), start);
        return RequestError::MethodNotAllowed.into_response();
    }

    let Some(matched) = table.lookup(&path) else {
        tracing::debug!(path = %path, "No route matched");
        metrics::record_request("none", StatusCode::NOT_FOUND.as_u16(), start);
        return RequestError::NotFound.into_response();
    };

    let peer = request
        .extensions()
        .get::<ConnectInfo<PeerAddr>>()
        .and_then(|ConnectInfo(PeerAddr(addr))| *addr);
    let invocation = Invocation {
        route: matched.route,
        sub_path: matched.sub_path,
        peer,
    };

    let response = match matched.handler.handle(request, &invocation).await {
        Ok(response) => response,
        Err(e) => {
            if e.status().is_server_error() {
                tracing::error!(route = %matched.route, error = %e, "Request failed");
            } else {
                tracing::debug!(route = %matched.route, error = %e, "Request rejected");
            }
            e.into_response()
        }
    };

    metrics::record_request(matched.route, response.status().as_u16(), start);
    response
}

/// `GET /reload`: reload synchronously and report the outcome.
async fn reload(
    state: &AppState,
    table: &RoutingTable,
    request: Request<Body>,
) -> Response {
    if !table.credentials().authorize(request.headers()) {
        return RequestError::Unauthorized.into_response();
    }
    if request.method() != Method::GET {
        return RequestError::MethodNotAllowed.into_response();
    }

    let gateway = Arc::clone(&state.gateway);
    let result = tokio::task::spawn_blocking(move || gateway.reload()).await;

    match result {
        Ok(Ok(())) => (StatusCode::OK, "DONE\n").into_response(),
        Ok(Err(e)) => RequestError::Reload(e).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Reload task failed");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
