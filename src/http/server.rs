//! HTTP server setup.
//!
//! # Responsibilities
//! - Create the Axum router: widget aliases plus a passthrough fallback
//! - Wire up middleware (request ID, tracing, CORS, request timeout)
//! - Serve on a bound listener until shutdown is signalled
//!
//! # Design Decisions
//! - Widget aliases are exact, case-sensitive routes; everything else falls
//!   through to passthrough
//! - CORS wraps the handlers so errors and cache hits carry it too
//! - Shared state is a single immutable `Proxy` behind an `Arc`

use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Request, State};
use axum::middleware::map_response;
use axum::response::Response;
use axum::routing::any;
use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::config::ProxyConfig;
use crate::http::cors::add_cors_headers;
use crate::http::request::{propagate_request_id_layer, set_request_id_layer};
use crate::proxy::{handle_passthrough, handle_widget, Proxy};
use crate::upstream::UpstreamError;

/// Application state injected into handlers.
pub type AppState = Arc<Proxy>;

/// HTTP server for the widget proxy.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    /// Create a server backed by the production upstream client and cache.
    pub fn new(config: &ProxyConfig) -> Result<Self, UpstreamError> {
        let proxy = Proxy::from_config(config)?;
        Ok(Self::with_proxy(config, proxy))
    }

    /// Create a server around an already assembled proxy.
    pub fn with_proxy(config: &ProxyConfig, proxy: Proxy) -> Self {
        let router = Self::build_router(config, Arc::new(proxy));
        Self { router }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &ProxyConfig, state: AppState) -> Router {
        let mut router = Router::new();
        for path in &config.widget.paths {
            router = router.route(path, any(widget_handler));
        }

        router
            .fallback(passthrough_handler)
            .with_state(state)
            .layer(
                ServiceBuilder::new()
                    .layer(set_request_id_layer())
                    .layer(TraceLayer::new_for_http())
                    .layer(propagate_request_id_layer())
                    .layer(map_response(add_cors_headers))
                    .layer(TimeoutLayer::new(Duration::from_secs(
                        config.timeouts.request_secs,
                    ))),
            )
    }

    /// The fully layered router.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Serve until the shutdown channel fires, then drain in-flight requests.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received, draining connections");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

async fn widget_handler(State(proxy): State<AppState>, request: Request) -> Response {
    handle_widget(&proxy, request).await
}

async fn passthrough_handler(State(proxy): State<AppState>, request: Request) -> Response {
    handle_passthrough(&proxy, request).await
}
