//! mTLS plane authenticator (spec §4.5, §4.6).
//!
//! Implements the six-step validity chain: a verified peer certificate must
//! be present, its SHA-256 fingerprint must resolve to a registry entry,
//! that entry must be neither revoked nor expired, and its subject CN must
//! match the `org_<opaque>` pattern bound to the resolved tenant.

use crate::auth::AuthError;
use crate::registry::cert_registry::CertRegistry;
use gateway_core::principal::{AuthMethod, Principal};
use sha2::{Digest, Sha256};
use std::time::SystemTime;
use x509_parser::prelude::*;

/// Authenticates a request on the mTLS plane from the DER bytes of the
/// client's leaf certificate, as extracted from the TLS handshake.
pub fn authenticate(
    registry: &CertRegistry,
    leaf_der: Option<&[u8]>,
) -> Result<Principal, AuthError> {
    let der = leaf_der.ok_or(AuthError::MissingCredential)?;
    let fingerprint = fingerprint_der(der);

    let record = registry
        .find_by_fingerprint(&fingerprint)
        .ok_or(AuthError::UnknownCredential)?;

    if record.revoked_at.is_some() {
        return Err(AuthError::Revoked);
    }
    if !record.is_valid_at(SystemTime::now()) {
        return Err(AuthError::Expired);
    }

    let subject_cn = parse_subject_cn(der).ok_or(AuthError::SubjectMismatch)?;
    if subject_cn != record.subject_cn || !is_tenant_bound_cn(&subject_cn, record.tenant.as_str())
    {
        return Err(AuthError::SubjectMismatch);
    }

    Ok(Principal::new(record.tenant, AuthMethod::Mtls).with_credential_id(fingerprint))
}

/// SHA-256 fingerprint of a DER-encoded certificate, as lower-case hex.
pub fn fingerprint_der(der: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(der);
    hex::encode(hasher.finalize())
}

fn parse_subject_cn(der: &[u8]) -> Option<String> {
    let (_, cert) = X509Certificate::from_der(der).ok()?;
    cert.subject()
        .iter_common_name()
        .next()
        .and_then(|cn| cn.as_str().ok())
        .map(|s| s.to_string())
}

/// Subject CNs bound to a tenant follow the `org_<opaque>` pattern, and must
/// equal the tenant id exactly (spec §4.5 step 6).
fn is_tenant_bound_cn(subject_cn: &str, tenant: &str) -> bool {
    subject_cn.starts_with("org_") && subject_cn == tenant
}
