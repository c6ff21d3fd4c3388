//! JSON-RPC 2.0 envelope types and the error-code taxonomy (spec §4.8).
//!
//! These types are transport-agnostic: they describe the wire shapes the
//! dispatcher parses and assembles, independent of how the HTTP body was
//! read or written.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// A JSON-RPC request id: a string, a number, or absent (a notification).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestId {
    String(String),
    Number(i64),
}

/// One JSON-RPC 2.0 request envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct RpcRequest {
    pub jsonrpc: String,
    pub method: String,
    #[serde(default)]
    pub params: Value,
    #[serde(default)]
    pub id: Option<RequestId>,
}

impl RpcRequest {
    /// A notification carries no `id` and expects no response.
    pub fn is_notification(&self) -> bool {
        self.id.is_none()
    }

    /// Validates the envelope shape per spec §4.8, independent of whether
    /// the method is known or the params are well-formed.
    pub fn validate_envelope(&self) -> Result<(), JsonRpcError> {
        if self.jsonrpc != "2.0" {
            return Err(JsonRpcError::invalid_request("jsonrpc must be \"2.0\""));
        }
        if self.method.is_empty() {
            return Err(JsonRpcError::invalid_request("method must not be empty"));
        }
        Ok(())
    }
}

/// Either a single request or a non-empty batch of requests.
#[derive(Debug, Clone)]
pub enum RpcRequestEnvelope {
    Single(RpcRequest),
    Batch(Vec<RpcRequest>),
}

impl<'de> Deserialize<'de> for RpcRequestEnvelope {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        match value {
            Value::Array(items) => {
                if items.is_empty() {
                    return Err(serde::de::Error::custom("batch request must not be empty"));
                }
                let requests = items
                    .into_iter()
                    .map(serde_json::from_value)
                    .collect::<Result<Vec<_>, _>>()
                    .map_err(serde::de::Error::custom)?;
                Ok(RpcRequestEnvelope::Batch(requests))
            }
            other => {
                let request = serde_json::from_value(other).map_err(serde::de::Error::custom)?;
                Ok(RpcRequestEnvelope::Single(request))
            }
        }
    }
}

/// One JSON-RPC 2.0 response envelope.
#[derive(Debug, Clone, Serialize)]
pub struct RpcResponse {
    pub jsonrpc: &'static str,
    pub id: Option<RequestId>,
    #[serde(flatten)]
    pub outcome: RpcOutcome,
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum RpcOutcome {
    Success { result: Value },
    Failure { error: JsonRpcError },
}

impl RpcResponse {
    pub fn success(id: Option<RequestId>, result: Value) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            outcome: RpcOutcome::Success { result },
        }
    }

    pub fn failure(id: Option<RequestId>, error: JsonRpcError) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            outcome: RpcOutcome::Failure { error },
        }
    }
}

/// Either a single response or an array of responses, matching the shape of
/// the incoming request (spec §4.8: "a single object ... only when the
/// request was a single object").
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum RpcResponseEnvelope {
    Single(RpcResponse),
    Batch(Vec<RpcResponse>),
    /// All requests in the batch were notifications: nothing to return.
    Empty,
}

/// The JSON-RPC error-code taxonomy from spec §4.8.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct JsonRpcError {
    pub code: i64,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonRpcError {
    pub const PARSE_ERROR: i64 = -32700;
    pub const INVALID_REQUEST: i64 = -32600;
    pub const METHOD_NOT_FOUND: i64 = -32601;
    pub const INVALID_PARAMS: i64 = -32602;
    pub const INTERNAL_ERROR: i64 = -32603;

    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn parse_error(message: impl Into<String>) -> Self {
        Self::new(Self::PARSE_ERROR, message)
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(Self::INVALID_REQUEST, message)
    }

    pub fn method_not_found(method: &str) -> Self {
        Self::new(Self::METHOD_NOT_FOUND, format!("method not found: {method}"))
    }

    pub fn invalid_params(message: impl Into<String>) -> Self {
        Self::new(Self::INVALID_PARAMS, message)
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new(Self::INTERNAL_ERROR, message)
    }

    /// The `-32603` error for an address with no registered key, worded per
    /// spec §4.9 step 3 so clients can pattern-match the prefix.
    pub fn no_key_found_for_address(address: &str) -> Self {
        Self::internal_error(format!("no key found for address {address}"))
    }
}

impl fmt::Display for JsonRpcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for JsonRpcError {}
