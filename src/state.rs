//! Shared state composed once at startup and cloned cheaply into both
//! planes' routers (spec §4.11: "both share the JSON-RPC dispatcher, rate
//! limiter, key registry, and backend client").

use crate::backend::BackendClient;
use crate::rate_limit::RateLimiter;
use crate::registry::api_key_registry::ApiKeyRegistry;
use crate::registry::cert_registry::CertRegistry;
use crate::registry::key_registry::KeyRegistry;
use std::sync::Arc;

#[derive(Clone)]
pub struct GatewayState(Arc<Inner>);

struct Inner {
    pub key_registry: KeyRegistry,
    pub cert_registry: CertRegistry,
    pub api_key_registry: ApiKeyRegistry,
    pub backend: BackendClient,
    pub rate_limiter: RateLimiter,
}

impl GatewayState {
    pub fn new(
        key_registry: KeyRegistry,
        cert_registry: CertRegistry,
        api_key_registry: ApiKeyRegistry,
        backend: BackendClient,
        rate_limiter: RateLimiter,
    ) -> Self {
        Self(Arc::new(Inner {
            key_registry,
            cert_registry,
            api_key_registry,
            backend,
            rate_limiter,
        }))
    }

    pub fn key_registry(&self) -> &KeyRegistry {
        &self.0.key_registry
    }

    pub fn cert_registry(&self) -> &CertRegistry {
        &self.0.cert_registry
    }

    pub fn api_key_registry(&self) -> &ApiKeyRegistry {
        &self.0.api_key_registry
    }

    pub fn backend(&self) -> &BackendClient {
        &self.0.backend
    }

    pub fn rate_limiter(&self) -> &RateLimiter {
        &self.0.rate_limiter
    }
}
