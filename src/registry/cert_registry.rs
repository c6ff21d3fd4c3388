//! Registered mTLS client certificates, scoped per tenant.

use dashmap::DashMap;
use gateway_core::principal::TenantId;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

/// A registered client certificate record.
#[derive(Debug, Clone)]
pub struct CertificateRecord {
    pub tenant: TenantId,
    /// Lower-case hex SHA-256 fingerprint of the DER-encoded leaf certificate.
    pub fingerprint: String,
    /// Subject CN, expected to match the `org_<opaque>` pattern bound to
    /// `tenant`.
    pub subject_cn: String,
    pub serial: String,
    pub issued_at: SystemTime,
    pub expires_at: SystemTime,
    pub revoked_at: Option<SystemTime>,
    pub revocation_reason: Option<String>,
}

impl CertificateRecord {
    /// A certificate is valid when it has not been revoked and has not yet
    /// expired.
    pub fn is_valid_at(&self, now: SystemTime) -> bool {
        self.revoked_at.is_none() && self.expires_at > now
    }
}

/// In-memory registry of client certificate fingerprints, keyed for O(1)
/// lookup on the authentication hot path.
#[derive(Clone, Default)]
pub struct CertRegistry {
    by_fingerprint: Arc<DashMap<String, CertificateRecord>>,
}

impl CertRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn upsert(&self, record: CertificateRecord) -> Option<CertificateRecord> {
        self.by_fingerprint
            .insert(record.fingerprint.clone(), record)
    }

    pub fn find_by_fingerprint(&self, fingerprint: &str) -> Option<CertificateRecord> {
        self.by_fingerprint
            .get(fingerprint)
            .map(|entry| entry.clone())
    }

    pub fn revoke(&self, fingerprint: &str, reason: impl Into<String>) -> bool {
        if let Some(mut entry) = self.by_fingerprint.get_mut(fingerprint) {
            entry.revoked_at = Some(SystemTime::now());
            entry.revocation_reason = Some(reason.into());
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_record(expires_in: Duration) -> CertificateRecord {
        CertificateRecord {
            tenant: TenantId::new("org_abc"),
            fingerprint: "deadbeef".to_string(),
            subject_cn: "org_abc".to_string(),
            serial: "01".to_string(),
            issued_at: SystemTime::now(),
            expires_at: SystemTime::now() + expires_in,
            revoked_at: None,
            revocation_reason: None,
        }
    }

    #[test]
    fn unexpired_unrevoked_cert_is_valid() {
        let record = sample_record(Duration::from_secs(3600));
        assert!(record.is_valid_at(SystemTime::now()));
    }

    #[test]
    fn expired_cert_is_invalid() {
        let record = sample_record(Duration::from_secs(0));
        assert!(!record.is_valid_at(SystemTime::now() + Duration::from_secs(1)));
    }

    #[test]
    fn revoked_cert_is_invalid_even_before_expiry() {
        let mut record = sample_record(Duration::from_secs(3600));
        record.revoked_at = Some(SystemTime::now());
        assert!(!record.is_valid_at(SystemTime::now()));
    }

    #[test]
    fn registry_roundtrip() {
        let registry = CertRegistry::new();
        registry.upsert(sample_record(Duration::from_secs(3600)));
        assert!(registry.find_by_fingerprint("deadbeef").is_some());
        assert!(registry.find_by_fingerprint("notfound").is_none());
    }

    #[test]
    fn revoke_marks_record_invalid() {
        let registry = CertRegistry::new();
        registry.upsert(sample_record(Duration::from_secs(3600)));
        registry.revoke("deadbeef", "key compromise");
        let record = registry.find_by_fingerprint("deadbeef").unwrap();
        assert!(!record.is_valid_at(SystemTime::now()));
    }
}
