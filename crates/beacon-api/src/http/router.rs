//! Router construction and server host for the API.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{Router, http::Request, routing::post};
use beacon_api_models::{HEADER_REQUEST_ID, MetaMethod};
use beacon_telemetry::build_sha;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::Span;

use crate::error::{ApiServerError, ApiServerResult};
use crate::http::meta::{meta_config, meta_status};
use crate::meta::MetaSource;

/// Shared state handed to every handler.
pub(crate) struct ApiState {
    pub(crate) meta: Arc<dyn MetaSource>,
}

/// Mount the meta procedures onto `base` and wrap the result with the
/// request-id and tracing layers.
///
/// `base` may be an empty `Router::new()`; routes already present on it are
/// kept as-is.
pub fn new_handler(base: Router, meta: Arc<dyn MetaSource>) -> Router {
    let state = Arc::new(ApiState { meta });
    let meta_routes: Router = MetaMethod::ALL
        .into_iter()
        .fold(Router::<Arc<ApiState>>::new(), |router, method| {
            let route = match method {
                MetaMethod::Status => post(meta_status),
                MetaMethod::Config => post(meta_config),
            };
            router.route(method.path(), route)
        })
        .with_state(state);

    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(|request: &Request<_>| {
            let request_id = request
                .headers()
                .get(HEADER_REQUEST_ID)
                .and_then(|value| value.to_str().ok())
                .unwrap_or("")
                .to_string();
            tracing::info_span!(
                "http.request",
                method = %request.method(),
                route = %request.uri().path(),
                request_id = %request_id,
                build_sha = %build_sha(),
                status_code = tracing::field::Empty,
                latency_ms = tracing::field::Empty
            )
        })
        .on_response(
            |response: &axum::response::Response, latency: Duration, span: &Span| {
                span.record("status_code", response.status().as_u16());
                let latency_ms = u64::try_from(latency.as_millis()).unwrap_or(u64::MAX);
                span.record("latency_ms", latency_ms);
            },
        );

    base.merge(meta_routes).layer(
        ServiceBuilder::new()
            .layer(beacon_telemetry::propagate_request_id_layer())
            .layer(beacon_telemetry::set_request_id_layer())
            .layer(trace_layer),
    )
}

/// Axum router wrapper that hosts the meta procedures.
pub struct ApiServer {
    router: Router,
}

impl ApiServer {
    /// Construct a server answering meta calls from `meta`.
    #[must_use]
    pub fn new(meta: Arc<dyn MetaSource>) -> Self {
        Self {
            router: new_handler(Router::new(), meta),
        }
    }

    /// Serve the API on the supplied address.
    ///
    /// # Errors
    ///
    /// Returns an error if the listener fails to bind or the server terminates unexpectedly.
    pub async fn serve(self, addr: SocketAddr) -> ApiServerResult<()> {
        tracing::info!("Starting API on {}", addr);
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ApiServerError::Bind { addr, source })?;
        axum::serve(listener, self.router.into_make_service())
            .await
            .map_err(|source| ApiServerError::Serve { source })
    }

    /// Borrow the assembled router.
    #[must_use]
    pub const fn router(&self) -> &Router {
        &self.router
    }
}
