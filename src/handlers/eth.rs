//! Ethereum signing handlers: `eth_accounts`, `eth_signTransaction`,
//! `opsigner_signBlockPayload[V2]`.
//!
//! Each handler is stateless beyond the shared [`GatewayState`]; every
//! invocation is self-contained and carries the authenticated
//! [`Principal`] resolved upstream in the pipeline.

use crate::backend::BackendSignMode;
use crate::state::GatewayState;
use gateway_core::block_payload::{self, BlockPayloadArgs};
use gateway_core::hex_codec::{self, NormalizedAddress};
use gateway_core::jsonrpc::JsonRpcError;
use gateway_core::principal::Principal;
use gateway_core::tx::{SignMode, TransactionArgs};
use serde_json::Value;

/// `eth_accounts`: the sorted list of addresses known to the authenticated
/// tenant. An empty list is valid.
pub fn eth_accounts(state: &GatewayState, principal: &Principal) -> Result<Value, JsonRpcError> {
    let mut addresses = state
        .key_registry()
        .list_addresses(&principal.tenant)
        .into_iter()
        .map(|addr| addr.to_lower_hex())
        .collect::<Vec<_>>();
    addresses.sort();
    Ok(Value::Array(addresses.into_iter().map(Value::String).collect()))
}

/// Decodes transaction params, resolves the signing key, requests a
/// signature from the backend, and assembles the signed envelope.
pub async fn eth_sign_transaction(
    state: &GatewayState,
    principal: &Principal,
    params: &Value,
) -> Result<Value, JsonRpcError> {
    let args = TransactionArgs::from_params(params)
        .map_err(|e| JsonRpcError::invalid_params(e.to_string()))?;

    let from = NormalizedAddress::new(args.from);
    let key = state
        .key_registry()
        .find_by_address(&principal.tenant, &from)
        .ok_or_else(|| JsonRpcError::no_key_found_for_address(&from.to_lower_hex()))?;

    let chain_id = args.chain_id;
    let tx = args.into_transaction();
    let sign_mode = tx.sign_mode(chain_id);
    let digest = tx.signing_hash();

    let backend_mode = match sign_mode {
        SignMode::Legacy { chain_id } => BackendSignMode::Legacy { chain_id },
        SignMode::RawParity => BackendSignMode::RawParity,
    };

    let signature = state
        .backend()
        .sign_digest(&key.backend_handle, digest, backend_mode)
        .await
        .map_err(|e| JsonRpcError::internal_error(e.to_string()))?;

    // A backend that returns a legacy-style v >= 27 when raw parity was
    // requested is treated as raw parity anyway. For the legacy mode,
    // recover the raw parity bit from the EIP-155 `v = chain_id*2 + 35 +
    // parity` the backend returned -- alloy recomputes the wire `v` from
    // `chain_id` and this bit itself.
    let y_parity = match sign_mode {
        SignMode::RawParity if signature.v >= 27 => (signature.v - 27) != 0,
        SignMode::RawParity => signature.v != 0,
        SignMode::Legacy { chain_id } => {
            signature.v.saturating_sub(35 + chain_id * 2) != 0
        }
    };

    let envelope = tx.encode_signed(y_parity, signature.r, signature.s);

    tracing::info!(
        tenant = %principal.tenant,
        address = %from,
        "key.signed"
    );

    Ok(Value::String(hex_codec::encode_bytes(&envelope)))
}

/// `opsigner_signBlockPayload` (V1, `chainId` as a quantity).
pub async fn opsigner_sign_block_payload(
    state: &GatewayState,
    principal: &Principal,
    params: &Value,
) -> Result<Value, JsonRpcError> {
    let args = BlockPayloadArgs::from_params_v1(params)
        .map_err(|e| JsonRpcError::invalid_params(e.to_string()))?;
    sign_block_payload(state, principal, args).await
}

/// `opsigner_signBlockPayloadV2` (`chainId` as a 32-byte hash).
pub async fn opsigner_sign_block_payload_v2(
    state: &GatewayState,
    principal: &Principal,
    params: &Value,
) -> Result<Value, JsonRpcError> {
    let args = BlockPayloadArgs::from_params_v2(params)
        .map_err(|e| JsonRpcError::invalid_params(e.to_string()))?;
    sign_block_payload(state, principal, args).await
}

async fn sign_block_payload(
    state: &GatewayState,
    principal: &Principal,
    args: BlockPayloadArgs,
) -> Result<Value, JsonRpcError> {
    let sender = NormalizedAddress::new(args.sender_address);
    let key = state
        .key_registry()
        .find_by_address(&principal.tenant, &sender)
        .ok_or_else(|| JsonRpcError::no_key_found_for_address(&sender.to_lower_hex()))?;

    let digest = args.signing_hash();
    let signature = state
        .backend()
        .sign_digest(&key.backend_handle, digest, crate::backend::BackendSignMode::RawParity)
        .await
        .map_err(|e| JsonRpcError::internal_error(e.to_string()))?;

    let sig_bytes = block_payload::assemble_signature(signature.r, signature.s, signature.v);

    tracing::info!(
        tenant = %principal.tenant,
        address = %sender,
        "key.signed"
    );

    Ok(Value::String(hex_codec::encode_bytes(&sig_bytes)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::BackendClient;
    use crate::rate_limit::RateLimiter;
    use crate::registry::api_key_registry::ApiKeyRegistry;
    use crate::registry::cert_registry::CertRegistry;
    use crate::registry::key_registry::{Key, KeyAlgorithm, KeyRegistry};
    use gateway_core::principal::{AuthMethod, TenantId};

    fn empty_state() -> GatewayState {
        GatewayState::new(
            KeyRegistry::new(),
            CertRegistry::new(),
            ApiKeyRegistry::new(),
            BackendClient::try_new(
                "https://backend.invalid".parse().unwrap(),
                "test-credential".to_string(),
                std::time::Duration::from_secs(30),
            )
            .unwrap(),
            RateLimiter::new(100, 100),
        )
    }

    #[test]
    fn eth_accounts_is_sorted_and_lowercase() {
        let state = empty_state();
        let tenant = TenantId::new("org_abc");
        state.key_registry().upsert(Key {
            tenant: tenant.clone(),
            name: "b".to_string(),
            address: NormalizedAddress::parse("0xABCDEF0000000000000000000000000000EF12").unwrap(),
            algorithm: KeyAlgorithm::Secp256k1,
            backend_handle: "h2".to_string(),
            deleted: false,
        });
        state.key_registry().upsert(Key {
            tenant: tenant.clone(),
            name: "a".to_string(),
            address: NormalizedAddress::parse("0x742d35cc6634c0532925a3b844bc9e7595f0f44e").unwrap(),
            algorithm: KeyAlgorithm::Secp256k1,
            backend_handle: "h1".to_string(),
            deleted: false,
        });
        let principal = Principal::new(tenant, AuthMethod::ApiKey);
        let result = eth_accounts(&state, &principal).unwrap();
        let addresses: Vec<&str> = result.as_array().unwrap().iter().map(|v| v.as_str().unwrap()).collect();
        assert_eq!(
            addresses,
            vec![
                "0x742d35cc6634c0532925a3b844bc9e7595f0f44e",
                "0xabcdef0000000000000000000000000000ef12",
            ]
        );
    }

    #[test]
    fn eth_accounts_empty_for_unknown_tenant() {
        let state = empty_state();
        let principal = Principal::new(TenantId::new("org_none"), AuthMethod::ApiKey);
        let result = eth_accounts(&state, &principal).unwrap();
        assert_eq!(result.as_array().unwrap().len(), 0);
    }

    #[tokio::test]
    async fn eth_sign_transaction_unknown_from_yields_internal_error() {
        let state = empty_state();
        let principal = Principal::new(TenantId::new("org_abc"), AuthMethod::ApiKey);
        let params = serde_json::json!([{
            "from": "0x0000000000000000000000000000000000000001",
            "gas": "0x5208",
            "gasPrice": "0x1",
            "nonce": "0x0",
            "chainId": "0x1"
        }]);
        let err = eth_sign_transaction(&state, &principal, &params).await.unwrap_err();
        assert_eq!(err.code, JsonRpcError::INTERNAL_ERROR);
        assert!(err.message.contains("no key found for address"));
    }
}
