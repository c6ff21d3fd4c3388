//! Integration tests exercising the JSON-RPC dispatcher through the real
//! axum pipeline (auth -> usage tracking -> rate limit -> dispatch), driven
//! with `tower::ServiceExt::oneshot` against an in-process router rather
//! than a bound socket (spec §4.10, §4.6).

use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::{json, Value};
use signer_gateway::backend::BackendClient;
use signer_gateway::pipeline::{self, Plane};
use signer_gateway::rate_limit::RateLimiter;
use signer_gateway::registry::api_key_registry::{digest_secret, ApiKeyRecord, ApiKeyRegistry};
use signer_gateway::registry::cert_registry::CertRegistry;
use signer_gateway::registry::key_registry::{Key, KeyAlgorithm, KeyRegistry};
use signer_gateway::state::GatewayState;
use std::time::Duration;
use tower::ServiceExt;

fn test_state() -> GatewayState {
    let key_registry = KeyRegistry::new();
    key_registry.upsert(Key {
        tenant: gateway_core::principal::TenantId::new("org_abc"),
        name: "primary".to_string(),
        address: gateway_core::hex_codec::NormalizedAddress::parse(
            "0x742d35cc6634c0532925a3b844bc9e7595f0f44e",
        )
        .unwrap(),
        algorithm: KeyAlgorithm::Secp256k1,
        backend_handle: "handle-1".to_string(),
        deleted: false,
    });

    let api_key_registry = ApiKeyRegistry::new();
    api_key_registry.upsert(ApiKeyRecord {
        tenant: gateway_core::principal::TenantId::new("org_abc"),
        key_id: "key-1".to_string(),
        secret_digest: digest_secret("sk_live_abc123"),
        revoked: false,
        expires_at: None,
    });

    let backend = BackendClient::try_new(
        "https://backend.invalid".parse().unwrap(),
        "test-credential".to_string(),
        Duration::from_secs(30),
    )
    .unwrap();

    GatewayState::new(
        key_registry,
        CertRegistry::new(),
        api_key_registry,
        backend,
        RateLimiter::new(100, 100),
    )
}

fn api_key_router(state: GatewayState) -> axum::Router {
    pipeline::router(state, Plane::ApiKey, Duration::from_secs(5), Vec::new())
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn missing_api_key_is_rejected() {
    let router = api_key_router(test_state());
    let request = Request::builder()
        .method("POST")
        .uri("/")
        .header("content-type", "application/json")
        .body(Body::from(
            json!({"jsonrpc": "2.0", "method": "eth_accounts", "id": 1}).to_string(),
        ))
        .unwrap();
    let response = router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn valid_api_key_lists_tenant_accounts() {
    let router = api_key_router(test_state());
    let request = Request::builder()
        .method("POST")
        .uri("/")
        .header("content-type", "application/json")
        .header("x-api-key", "sk_live_abc123")
        .body(Body::from(
            json!({"jsonrpc": "2.0", "method": "eth_accounts", "id": 1}).to_string(),
        ))
        .unwrap();
    let response = router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().get("x-request-id").is_some());
    let body = body_json(response).await;
    assert_eq!(
        body["result"],
        json!(["0x742d35cc6634c0532925a3b844bc9e7595f0f44e"])
    );
}

#[tokio::test]
async fn unknown_method_maps_to_json_rpc_error() {
    let router = api_key_router(test_state());
    let request = Request::builder()
        .method("POST")
        .uri("/")
        .header("content-type", "application/json")
        .header("x-api-key", "sk_live_abc123")
        .body(Body::from(
            json!({"jsonrpc": "2.0", "method": "eth_unknownMethod", "id": 1}).to_string(),
        ))
        .unwrap();
    let response = router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], json!(-32601));
}

#[tokio::test]
async fn rate_limit_exhaustion_returns_429() {
    let key_registry = KeyRegistry::new();
    let api_key_registry = ApiKeyRegistry::new();
    api_key_registry.upsert(ApiKeyRecord {
        tenant: gateway_core::principal::TenantId::new("org_abc"),
        key_id: "key-1".to_string(),
        secret_digest: digest_secret("sk_live_abc123"),
        revoked: false,
        expires_at: None,
    });
    let backend = BackendClient::try_new(
        "https://backend.invalid".parse().unwrap(),
        "test-credential".to_string(),
        Duration::from_secs(30),
    )
    .unwrap();
    let state = GatewayState::new(
        key_registry,
        CertRegistry::new(),
        api_key_registry,
        backend,
        RateLimiter::new(1, 1),
    );
    let router = api_key_router(state);

    let make_request = || {
        Request::builder()
            .method("POST")
            .uri("/")
            .header("content-type", "application/json")
            .header("x-api-key", "sk_live_abc123")
            .body(Body::from(
                json!({"jsonrpc": "2.0", "method": "eth_accounts", "id": 1}).to_string(),
            ))
            .unwrap()
    };

    let first = router.clone().oneshot(make_request()).await.unwrap();
    assert_eq!(first.status(), StatusCode::OK);
    let second = router.oneshot(make_request()).await.unwrap();
    assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn health_endpoint_bypasses_authentication() {
    let router = api_key_router(test_state());
    let request = Request::builder()
        .method("GET")
        .uri("/health")
        .body(Body::empty())
        .unwrap();
    let response = router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
