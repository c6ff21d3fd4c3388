//! Per-request id and remote-ip attribution (spec §4.10 step 1).
//!
//! A generated id is stashed into the request's extensions for downstream
//! consumption. The id is taken from an incoming
//! `X-Request-Id` header when the caller supplies one (so a client's
//! correlation id survives the hop), else synthesized as a v4 UUID, and is
//! always echoed back on the response so operators can correlate
//! client-side and gateway-side logs.

use axum::body::Body;
use axum::extract::{ConnectInfo, Request};
use axum::http::{HeaderName, HeaderValue};
use axum::middleware::Next;
use axum::response::Response;
use std::net::SocketAddr;
use uuid::Uuid;

pub static REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");

/// The request id attributed to one request.
#[derive(Debug, Clone)]
pub struct RequestId(pub String);

/// The remote peer address, captured once per accepted connection.
#[derive(Debug, Clone, Copy)]
pub struct RemoteAddr(pub SocketAddr);

impl std::fmt::Display for RemoteAddr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Reads (or synthesizes) the request id and remote address and stores them
/// as request extensions before calling downstream middleware; echoes the
/// id back as `X-Request-Id` on the way out.
pub async fn attribute(mut request: Request<Body>, next: Next) -> Response {
    let request_id = request
        .headers()
        .get(&REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    if let Some(ConnectInfo(addr)) = request.extensions().get::<ConnectInfo<SocketAddr>>() {
        request.extensions_mut().insert(RemoteAddr(*addr));
    }
    request.extensions_mut().insert(RequestId(request_id.clone()));

    let mut response = next.run(request).await;
    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER.clone(), value);
    }
    response
}

/// Reads the [`RequestId`] attached by [`attribute`], falling back to
/// `"-"` for contexts where the middleware hasn't run yet (e.g. building a
/// tracing span before this layer executes).
pub fn request_id_of(request: &Request<Body>) -> String {
    request
        .extensions()
        .get::<RequestId>()
        .map(|id| id.0.clone())
        .unwrap_or_else(|| "-".to_string())
}

/// Reads the [`RemoteAddr`] attached by [`attribute`].
pub fn remote_addr_of(request: &Request<Body>) -> String {
    request
        .extensions()
        .get::<RemoteAddr>()
        .map(|addr| addr.to_string())
        .unwrap_or_else(|| "-".to_string())
}
