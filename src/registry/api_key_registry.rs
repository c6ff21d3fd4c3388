//! Registered API keys for the API-key plane.
//!
//! Keys are stored by a SHA-256 digest of the secret, never the secret
//! itself, mirroring the certificate registry's fingerprint-only storage.

use dashmap::DashMap;
use gateway_core::principal::TenantId;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::time::SystemTime;

#[derive(Debug, Clone)]
pub struct ApiKeyRecord {
    pub tenant: TenantId,
    pub key_id: String,
    pub secret_digest: String,
    pub revoked: bool,
    pub expires_at: Option<SystemTime>,
}

impl ApiKeyRecord {
    pub fn is_valid_at(&self, now: SystemTime) -> bool {
        !self.revoked && self.expires_at.is_none_or(|expiry| expiry > now)
    }
}

/// Hashes a raw API key secret for registry lookup.
pub fn digest_secret(secret: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(secret.as_bytes());
    hex::encode(hasher.finalize())
}

#[derive(Clone, Default)]
pub struct ApiKeyRegistry {
    by_digest: Arc<DashMap<String, ApiKeyRecord>>,
}

impl ApiKeyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn upsert(&self, record: ApiKeyRecord) -> Option<ApiKeyRecord> {
        self.by_digest.insert(record.secret_digest.clone(), record)
    }

    pub fn find_by_secret(&self, secret: &str) -> Option<ApiKeyRecord> {
        let digest = digest_secret(secret);
        self.by_digest.get(&digest).map(|entry| entry.clone())
    }
}
