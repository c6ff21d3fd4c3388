//! API-key plane authenticator (spec §4.6).

use crate::auth::AuthError;
use crate::registry::api_key_registry::ApiKeyRegistry;
use gateway_core::principal::{AuthMethod, Principal};
use std::time::SystemTime;

/// Header under which the API key secret travels.
pub const API_KEY_HEADER: &str = "x-api-key";

/// Authenticates a request on the API-key plane against a raw secret read
/// from the `x-api-key` header.
pub fn authenticate(
    registry: &ApiKeyRegistry,
    presented_secret: Option<&str>,
) -> Result<Principal, AuthError> {
    let secret = presented_secret.ok_or(AuthError::MissingCredential)?;
    let record = registry
        .find_by_secret(secret)
        .ok_or(AuthError::UnknownCredential)?;
    if record.revoked {
        return Err(AuthError::Revoked);
    }
    if !record.is_valid_at(SystemTime::now()) {
        return Err(AuthError::Expired);
    }
    Ok(Principal::new(record.tenant, AuthMethod::ApiKey).with_credential_id(record.key_id))
}
