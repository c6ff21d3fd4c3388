//! JSON-RPC method registry and envelope assembly (spec §4.8, C8).
//!
//! Wraps [`gateway_core::jsonrpc`]'s transport-agnostic envelope types with
//! the concrete method table this gateway serves.

use crate::handlers::eth;
use crate::state::GatewayState;
use gateway_core::jsonrpc::{
    JsonRpcError, RpcRequest, RpcRequestEnvelope, RpcResponse, RpcResponseEnvelope,
};
use gateway_core::principal::Principal;
use serde_json::Value;

/// Parses a raw JSON-RPC body, dispatches every request it contains, and
/// assembles the matching response shape (spec §4.8: "batch responses ...
/// return a single object ... only when the request was a single object").
pub async fn handle_body(
    state: &GatewayState,
    principal: &Principal,
    body: &[u8],
) -> RpcResponseEnvelope {
    let envelope: Result<RpcRequestEnvelope, _> = serde_json::from_slice(body);
    match envelope {
        Ok(RpcRequestEnvelope::Single(request)) => {
            match dispatch_one(state, principal, request).await {
                Some(response) => RpcResponseEnvelope::Single(response),
                None => RpcResponseEnvelope::Empty,
            }
        }
        Ok(RpcRequestEnvelope::Batch(requests)) => {
            let mut responses = Vec::with_capacity(requests.len());
            for request in requests {
                if let Some(response) = dispatch_one(state, principal, request).await {
                    responses.push(response);
                }
            }
            if responses.is_empty() {
                RpcResponseEnvelope::Empty
            } else {
                RpcResponseEnvelope::Batch(responses)
            }
        }
        Err(e) => RpcResponseEnvelope::Single(RpcResponse::failure(
            None,
            JsonRpcError::parse_error(e.to_string()),
        )),
    }
}

/// Dispatches a single request. Returns `None` for notifications, which
/// produce no response regardless of outcome (spec §4.8).
async fn dispatch_one(
    state: &GatewayState,
    principal: &Principal,
    request: RpcRequest,
) -> Option<RpcResponse> {
    let id = request.id.clone();
    let is_notification = request.is_notification();

    let result = match request.validate_envelope() {
        Ok(()) => route(state, principal, &request.method, &request.params).await,
        Err(e) => Err(e),
    };

    if is_notification {
        return None;
    }

    Some(match result {
        Ok(value) => RpcResponse::success(id, value),
        Err(error) => RpcResponse::failure(id, error),
    })
}

async fn route(
    state: &GatewayState,
    principal: &Principal,
    method: &str,
    params: &Value,
) -> Result<Value, JsonRpcError> {
    match method {
        "eth_accounts" => eth::eth_accounts(state, principal),
        "eth_signTransaction" => eth::eth_sign_transaction(state, principal, params).await,
        "opsigner_signBlockPayload" => {
            eth::opsigner_sign_block_payload(state, principal, params).await
        }
        "opsigner_signBlockPayloadV2" => {
            eth::opsigner_sign_block_payload_v2(state, principal, params).await
        }
        other => Err(JsonRpcError::method_not_found(other)),
    }
}
