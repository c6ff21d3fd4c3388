//! Plane-specific authenticators that each produce a [`gateway_core::principal::Principal`]
//! (spec §4.6).

pub mod api_key;
pub mod mtls;

/// Errors common to both authenticators. Each maps to HTTP 401 at the
/// pipeline boundary (spec §4.6).
#[derive(Debug, Clone, thiserror::Error)]
pub enum AuthError {
    #[error("missing credential")]
    MissingCredential,
    #[error("unknown credential")]
    UnknownCredential,
    #[error("credential revoked")]
    Revoked,
    #[error("credential expired")]
    Expired,
    #[error("certificate subject does not match bound tenant")]
    SubjectMismatch,
}
