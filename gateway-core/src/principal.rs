//! The authenticated-principal record carried through the request pipeline
//! (spec §3, §4.6).

use serde::{Deserialize, Serialize};
use std::fmt;

/// The tenant isolation boundary's opaque stable identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TenantId(String);

impl TenantId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Which authenticator produced the [`Principal`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthMethod {
    ApiKey,
    Mtls,
}

impl fmt::Display for AuthMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthMethod::ApiKey => write!(f, "api_key"),
            AuthMethod::Mtls => write!(f, "mtls"),
        }
    }
}

/// Per-request value produced by an authenticator and consumed by handlers
/// (spec §3). Carries the optional id of the credential record that
/// authenticated the request (an API key id or a certificate fingerprint).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub tenant: TenantId,
    pub method: AuthMethod,
    pub credential_id: Option<String>,
}

impl Principal {
    pub fn new(tenant: TenantId, method: AuthMethod) -> Self {
        Self {
            tenant,
            method,
            credential_id: None,
        }
    }

    pub fn with_credential_id(mut self, credential_id: impl Into<String>) -> Self {
        self.credential_id = Some(credential_id.into());
        self
    }
}
