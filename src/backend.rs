//! Client for the trust-isolated secrets backend.
//!
//! The gateway never holds private key material itself: it forwards a
//! 32-byte digest and a backend key handle to the secrets engine and gets
//! back a signature. This client is cheap to clone, shares a connection
//! pool, and distinguishes retryable transport failures from backend
//! signing refusals so the dispatcher can map each to the right JSON-RPC
//! error code.

use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

/// A client for the remote secrets/signing backend.
#[derive(Clone, Debug)]
pub struct BackendClient {
    sign_url: Url,
    client: Client,
    credential: String,
    timeout: Duration,
}

/// The signing mode requested of the backend, mirroring
/// [`gateway_core::tx::SignMode`] but expressed over the wire.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BackendSignMode {
    Legacy { chain_id: u64 },
    RawParity,
}

#[derive(Debug, Clone, Serialize)]
struct SignDigestRequest<'a> {
    key_handle: &'a str,
    digest: String,
    mode: BackendSignMode,
}

#[derive(Debug, Clone, Deserialize)]
struct SignDigestResponse {
    r: String,
    s: String,
    v: u64,
}

/// The (r, s, v) signature components returned by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackendSignature {
    pub r: alloy_primitives::U256,
    pub s: alloy_primitives::U256,
    pub v: u64,
}

/// Errors from a call to the secrets backend.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("secrets backend unavailable: {0}")]
    Unavailable(#[source] reqwest::Error),
    #[error("secrets backend timed out")]
    Timeout,
    #[error("secrets backend refused to sign: {reason}")]
    SigningFailed { reason: String },
    #[error("secrets backend returned a malformed response: {0}")]
    MalformedResponse(String),
}

impl BackendError {
    /// Distinguishes transport-level failures (worth a 5xx/retry upstream)
    /// from the backend explicitly declining to sign (spec §4.9 step 8).
    pub fn is_retryable(&self) -> bool {
        matches!(self, BackendError::Unavailable(_) | BackendError::Timeout)
    }
}

impl BackendClient {
    pub fn try_new(
        base_url: Url,
        credential: String,
        timeout: Duration,
    ) -> Result<Self, url::ParseError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .expect("reqwest client builder should never fail on default TLS config");
        let sign_url = base_url.join("./sign")?;
        Ok(Self {
            sign_url,
            client,
            credential,
            timeout,
        })
    }

    /// Sends a digest to the backend for signing and returns the raw
    /// signature components. Does not interpret or validate `digest` beyond
    /// forwarding it; callers are responsible for computing the correct
    /// signing hash for the operation in question.
    pub async fn sign_digest(
        &self,
        key_handle: &str,
        digest: alloy_primitives::B256,
        mode: BackendSignMode,
    ) -> Result<BackendSignature, BackendError> {
        let request = SignDigestRequest {
            key_handle,
            digest: format!("0x{}", hex::encode(digest.as_slice())),
            mode,
        };

        let http_response = self
            .client
            .post(self.sign_url.clone())
            .bearer_auth(&self.credential)
            .timeout(self.timeout)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    BackendError::Timeout
                } else {
                    BackendError::Unavailable(e)
                }
            })?;

        match http_response.status() {
            StatusCode::OK => {
                let body: SignDigestResponse = http_response
                    .json()
                    .await
                    .map_err(|e| BackendError::MalformedResponse(e.to_string()))?;
                parse_signature(&body)
            }
            StatusCode::UNPROCESSABLE_ENTITY | StatusCode::FORBIDDEN => {
                let reason = http_response
                    .text()
                    .await
                    .unwrap_or_else(|_| "no reason given".to_string());
                Err(BackendError::SigningFailed { reason })
            }
            status if status.is_server_error() => {
                Err(BackendError::Unavailable(
                    http_response.error_for_status().unwrap_err(),
                ))
            }
            status => Err(BackendError::MalformedResponse(format!(
                "unexpected status {status}"
            ))),
        }
    }
}

fn parse_signature(body: &SignDigestResponse) -> Result<BackendSignature, BackendError> {
    use alloy_primitives::U256;
    let r = U256::from_str_radix(body.r.trim_start_matches("0x"), 16)
        .map_err(|e| BackendError::MalformedResponse(format!("invalid r: {e}")))?;
    let s = U256::from_str_radix(body.s.trim_start_matches("0x"), 16)
        .map_err(|e| BackendError::MalformedResponse(format!("invalid s: {e}")))?;
    Ok(BackendSignature { r, s, v: body.v })
}
