//! Per-plane middleware chain (spec §4.10, C10):
//! `log → recover → timeout → authenticate → track-usage → rate-limit → dispatch`.
//!
//! `GET /health` and `GET /ready` bypass steps 5-7 (authenticate, usage
//! tracking, rate limit) but still pass through logging, recovery, and the
//! timeout, since those are ambient concerns, not authorization ones.

use crate::auth::{self, AuthError};
use crate::dispatch;
use crate::request_id;
use crate::state::GatewayState;
use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use gateway_core::principal::Principal;
use serde_json::json;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

/// Which plane a router is being built for. The two planes authenticate
/// differently but otherwise share this pipeline (spec §4.11).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Plane {
    ApiKey,
    Mtls,
}

/// A [`ReadinessProbe`] pings one external dependency. `/ready` succeeds
/// only when every registered probe succeeds (spec §6).
#[async_trait::async_trait]
pub trait ReadinessProbe: Send + Sync {
    fn name(&self) -> &'static str;
    async fn ping(&self) -> Result<(), ProbeError>;
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("{0}")]
pub struct ProbeError(pub String);

/// Request extension carrying the DER bytes of the client's leaf
/// certificate, injected by the mTLS listener's accept wrapper (spec §4.5
/// step 1).
#[derive(Debug, Clone)]
pub struct ClientCertDer(pub Vec<u8>);

/// Builds the router for one plane, given its authenticator and the
/// request timeout from configuration.
pub fn router(
    state: GatewayState,
    plane: Plane,
    request_timeout: Duration,
    probes: Vec<Arc<dyn ReadinessProbe>>,
) -> Router {
    let dispatch_router = Router::new()
        .route("/", post(post_root))
        .route_layer(middleware::from_fn_with_state(
            (state.clone(), plane),
            rate_limit_middleware,
        ))
        .route_layer(middleware::from_fn_with_state(
            (state.clone(), plane),
            usage_tracking_middleware,
        ))
        .route_layer(middleware::from_fn_with_state(
            (state.clone(), plane),
            authenticate_middleware,
        ))
        .with_state(state.clone());

    let health_router = Router::new()
        .route("/health", get(get_health))
        .route("/ready", get(get_ready))
        .with_state(probes);

    dispatch_router
        .merge(health_router)
        .layer(TimeoutLayer::new(request_timeout))
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(TraceLayer::new_for_http().make_span_with(make_request_span))
        .layer(middleware::from_fn(request_id::attribute))
}

/// Builds the per-request tracing span with the fields spec §9 names:
/// `{request_id, remote_ip, method, ...}`. `tenant` and `status` start empty
/// and are backfilled once known (spec §4.10 step 2: "tenant once known").
fn make_request_span(request: &Request<Body>) -> tracing::Span {
    tracing::info_span!(
        "request",
        request_id = %request_id::request_id_of(request),
        remote_ip = %request_id::remote_addr_of(request),
        method = %request.method(),
        path = %request.uri().path(),
        tenant = tracing::field::Empty,
    )
}

fn handle_panic(_err: Box<dyn std::any::Any + Send + 'static>) -> Response {
    tracing::error!("request handler panicked");
    let body = Json(json!({
        "jsonrpc": "2.0",
        "id": null,
        "error": { "code": -32603, "message": "internal server error" }
    }));
    (StatusCode::INTERNAL_SERVER_ERROR, body).into_response()
}

async fn authenticate_middleware(
    State((state, plane)): State<(GatewayState, Plane)>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let principal = match plane {
        Plane::ApiKey => {
            let secret = extract_api_key(&request);
            auth::api_key::authenticate(state.api_key_registry(), secret.as_deref())
        }
        Plane::Mtls => {
            // The mTLS acceptor injects `Option<ClientCertDer>` as the
            // extension type (absent when the handshake completed without a
            // peer certificate), not `ClientCertDer` directly.
            let leaf_der = request
                .extensions()
                .get::<Option<ClientCertDer>>()
                .and_then(|opt| opt.as_ref())
                .map(|c| c.0.as_slice());
            auth::mtls::authenticate(state.cert_registry(), leaf_der)
        }
    };

    match principal {
        Ok(principal) => {
            tracing::Span::current().record("tenant", tracing::field::display(&principal.tenant));
            request.extensions_mut().insert(principal);
            next.run(request).await
        }
        Err(err) => auth_error_response(err),
    }
}

fn auth_error_response(err: AuthError) -> Response {
    tracing::warn!(error = %err, "authentication failed");
    StatusCode::UNAUTHORIZED.into_response()
}

/// Extracts the API-key credential in priority order: `Authorization:
/// Bearer <token>`, `Authorization: ApiKey <token>`, `X-API-Key: <token>`
/// (spec §4.6).
fn extract_api_key(request: &Request<Body>) -> Option<String> {
    let headers = request.headers();
    if let Some(value) = headers.get(axum::http::header::AUTHORIZATION) {
        let value = value.to_str().ok()?;
        if let Some(token) = value.strip_prefix("Bearer ") {
            return Some(token.to_string());
        }
        if let Some(token) = value.strip_prefix("ApiKey ") {
            return Some(token.to_string());
        }
    }
    headers
        .get("x-api-key")
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
}

async fn usage_tracking_middleware(
    State((_state, plane)): State<(GatewayState, Plane)>,
    request: Request<Body>,
    next: Next,
) -> Response {
    // Spec §4.10 step 6: usage tracking applies to the API-key plane only.
    if plane == Plane::ApiKey {
        if let Some(principal) = request.extensions().get::<Principal>() {
            tracing::debug!(tenant = %principal.tenant, "usage.hit");
        }
    }
    next.run(request).await
}

async fn rate_limit_middleware(
    State((state, _plane)): State<(GatewayState, Plane)>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let Some(principal) = request.extensions().get::<Principal>() else {
        // Authentication runs upstream of this layer; absence here means a
        // bug in the pipeline wiring, not a client error.
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    };
    if state.rate_limiter().check(&principal.tenant) {
        next.run(request).await
    } else {
        StatusCode::TOO_MANY_REQUESTS.into_response()
    }
}

async fn post_root(
    State(state): State<GatewayState>,
    request: Request<Body>,
) -> Response {
    let principal = request
        .extensions()
        .get::<Principal>()
        .cloned()
        .expect("authenticate_middleware always populates Principal before this handler runs");
    let start = Instant::now();
    let body = match axum::body::to_bytes(request.into_body(), usize::MAX).await {
        Ok(bytes) => bytes,
        Err(_) => {
            return (
                StatusCode::OK,
                Json(json!({
                    "jsonrpc": "2.0",
                    "id": null,
                    "error": { "code": -32700, "message": "failed to read request body" }
                })),
            )
                .into_response();
        }
    };

    let response_envelope = dispatch::handle_body(&state, &principal, &body).await;
    tracing::info!(
        tenant = %principal.tenant,
        duration_ms = start.elapsed().as_millis() as u64,
        "request.dispatched"
    );

    // A batch of pure notifications produces no JSON-RPC response; the
    // transport still needs a status code, so an empty body is used rather
    // than a literal `null` (spec §4.8).
    match response_envelope {
        gateway_core::jsonrpc::RpcResponseEnvelope::Empty => {
            StatusCode::NO_CONTENT.into_response()
        }
        other => (StatusCode::OK, Json(other)).into_response(),
    }
}

async fn get_health() -> impl IntoResponse {
    Json(json!({ "status": "ok", "service": env!("CARGO_PKG_NAME") }))
}

async fn get_ready(State(probes): State<Vec<Arc<dyn ReadinessProbe>>>) -> Response {
    for probe in &probes {
        if let Err(e) = probe.ping().await {
            tracing::warn!(component = probe.name(), error = %e.0, "readiness probe failed");
            return (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "status": "error", "component": probe.name() })),
            )
                .into_response();
        }
    }
    (StatusCode::OK, Json(json!({ "status": "ok" }))).into_response()
}
