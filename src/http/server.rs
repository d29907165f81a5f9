//! HTTP server setup and the CORS proxy handler.
//!
//! # Responsibilities
//! - Create Axum Router with the single catch-all handler
//! - Wire up middleware (tracing, overall timeout)
//! - Bind server to listener with graceful shutdown
//! - Dispatch each request: info page, 403, preflight, or forward + rewrite
//! - Observability (request ID span, metrics)

use axum::{
    body::Body,
    extract::State,
    http::{header::ORIGIN, Request},
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};
use tracing::Instrument;
use uuid::Uuid;

use crate::config::ProxyConfig;
use crate::http::classify::{classify, Disposition};
use crate::http::request::Forwarder;
use crate::http::response::{
    forbidden_page, info_page, preflight_response, rewrite_response, with_allow_origin,
};
use crate::lifecycle::shutdown;
use crate::observability::metrics;
use crate::security::AccessPolicy;

/// Failure to assemble the server from a configuration.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("invalid access policy pattern: {0}")]
    Policy(#[from] regex::Error),

    #[error("failed to build upstream client: {0}")]
    Client(#[from] reqwest::Error),
}

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub policy: Arc<AccessPolicy>,
    pub forwarder: Forwarder,
}

impl AppState {
    pub fn from_config(config: &ProxyConfig) -> Result<Self, ServerError> {
        Ok(Self {
            policy: Arc::new(AccessPolicy::from_config(&config.policy)?),
            forwarder: Forwarder::new(&config.timeouts, &config.limits)?,
        })
    }
}

/// HTTP server for the CORS proxy.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: ProxyConfig) -> Result<Self, ServerError> {
        let state = AppState::from_config(&config)?;
        let router = Self::build_router(&config, state);
        Ok(Self { router })
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &ProxyConfig, state: AppState) -> Router {
        Router::new()
            .route("/", any(cors_handler))
            .route("/{*path}", any(cors_handler))
            .with_state(state)
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(TraceLayer::new_for_http())
    }

    /// The fully layered router, for serving or for in-process tests.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Serve on `listener` until `shutdown` fires, then drain in-flight requests.
    pub async fn run(
        self,
        listener: TcpListener,
        shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown::wait(shutdown))
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Catch-all handler: only the query string is interpreted.
async fn cors_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let span = tracing::info_span!(
        "request",
        request_id = %Uuid::new_v4(),
        method = %request.method(),
        path = %request.uri().path(),
    );
    handle(state, request).instrument(span).await
}

async fn handle(state: AppState, request: Request<Body>) -> Response {
    let start_time = Instant::now();
    let method = request.method().clone();

    let disposition = classify(&method, request.uri(), request.headers(), &state.policy);
    let mut outcome = disposition.label();

    let response = match disposition {
        Disposition::Info => info_page(request.uri(), request.headers()),
        Disposition::Forbidden => {
            tracing::info!(
                origin = ?request.headers().get(ORIGIN),
                "Rejected by access policy"
            );
            forbidden_page()
        }
        Disposition::Preflight => preflight_response(request.headers()),
        Disposition::Forward { target } => {
            let origin = request.headers().get(ORIGIN).cloned();
            tracing::debug!(upstream = %target, "Forwarding request");

            match state.forwarder.forward(request, &target).await {
                Ok(upstream) => rewrite_response(upstream, origin.as_ref()),
                Err(e) => {
                    tracing::warn!(upstream = %target, error = %e, "Forwarding failed");
                    outcome = "upstream_error";
                    with_allow_origin(e.into_response(), origin.as_ref())
                }
            }
        }
    };

    tracing::debug!(status = %response.status(), outcome, "Request handled");
    metrics::record_request(method.as_str(), response.status().as_u16(), outcome, start_time);
    response
}
