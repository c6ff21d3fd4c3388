//! `opsigner_signBlockPayload` / `opsigner_signBlockPayloadV2` digest
//! construction (spec §3, §4.9).

use crate::hex_codec::{self, HexCodecError};
use alloy_primitives::{keccak256, Address, B256, U256};
use serde_json::Value;

/// Error decoding `opsigner_signBlockPayload[V2]` parameters.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BlockPayloadArgsError {
    #[error("missing required field: {0}")]
    MissingField(&'static str),
    #[error("invalid field {field}: {source}")]
    InvalidField {
        field: &'static str,
        #[source]
        source: HexCodecError,
    },
    #[error("params must be a one-element array containing the block-payload object")]
    MalformedParams,
}

/// Decoded arguments for `opsigner_signBlockPayload` (V1, `chainId` as a
/// quantity) or `opsigner_signBlockPayloadV2` (`chainId` as a 32-byte hash).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockPayloadArgs {
    pub domain: B256,
    pub chain_id: B256,
    pub payload_hash: B256,
    pub sender_address: Address,
}

impl BlockPayloadArgs {
    /// Builds V1 args, right-aligning the numeric `chain_id` into a 32-byte
    /// big-endian field (spec §4.9).
    pub fn v1(domain: B256, chain_id: U256, payload_hash: B256, sender_address: Address) -> Self {
        Self {
            domain,
            chain_id: B256::from(chain_id),
            payload_hash,
            sender_address,
        }
    }

    /// Builds V2 args, where `chain_id` already arrives as a 32-byte hash.
    pub fn v2(domain: B256, chain_id: B256, payload_hash: B256, sender_address: Address) -> Self {
        Self {
            domain,
            chain_id,
            payload_hash,
            sender_address,
        }
    }

    /// Decodes the one-element parameter array for `opsigner_signBlockPayload`
    /// (V1, `chainId` as a quantity).
    pub fn from_params_v1(params: &Value) -> Result<Self, BlockPayloadArgsError> {
        let obj = Self::param_object(params)?;
        let domain = Self::required_hash32(obj, "domain")?;
        let chain_id = Self::required_field(obj, "chainId")?;
        let chain_id = hex_codec::decode_quantity_u256(chain_id)
            .map_err(|source| BlockPayloadArgsError::InvalidField { field: "chainId", source })?;
        let payload_hash = Self::required_hash32(obj, "payloadHash")?;
        let sender_address = Self::required_address(obj, "senderAddress")?;
        Ok(Self::v1(domain, chain_id, payload_hash, sender_address))
    }

    /// Decodes the one-element parameter array for `opsigner_signBlockPayloadV2`
    /// (`chainId` as a 32-byte hash).
    pub fn from_params_v2(params: &Value) -> Result<Self, BlockPayloadArgsError> {
        let obj = Self::param_object(params)?;
        let domain = Self::required_hash32(obj, "domain")?;
        let chain_id = Self::required_hash32(obj, "chainId")?;
        let payload_hash = Self::required_hash32(obj, "payloadHash")?;
        let sender_address = Self::required_address(obj, "senderAddress")?;
        Ok(Self::v2(domain, chain_id, payload_hash, sender_address))
    }

    fn param_object(params: &Value) -> Result<&serde_json::Map<String, Value>, BlockPayloadArgsError> {
        params
            .as_array()
            .and_then(|arr| arr.first())
            .and_then(|v| v.as_object())
            .ok_or(BlockPayloadArgsError::MalformedParams)
    }

    fn required_field<'a>(
        obj: &'a serde_json::Map<String, Value>,
        name: &'static str,
    ) -> Result<&'a str, BlockPayloadArgsError> {
        obj.get(name)
            .and_then(Value::as_str)
            .ok_or(BlockPayloadArgsError::MissingField(name))
    }

    fn required_hash32(
        obj: &serde_json::Map<String, Value>,
        name: &'static str,
    ) -> Result<B256, BlockPayloadArgsError> {
        let raw = Self::required_field(obj, name)?;
        hex_codec::decode_hash32(raw)
            .map_err(|source| BlockPayloadArgsError::InvalidField { field: name, source })
    }

    fn required_address(
        obj: &serde_json::Map<String, Value>,
        name: &'static str,
    ) -> Result<Address, BlockPayloadArgsError> {
        let raw = Self::required_field(obj, name)?;
        hex_codec::decode_address(raw)
            .map_err(|source| BlockPayloadArgsError::InvalidField { field: name, source })
    }

    /// `signingHash = keccak256(domain || chainId_32bytes || payloadHash)`.
    ///
    /// This treats every 32-byte `domain` value as valid input, per the
    /// REDESIGN note in spec §9 (the source's V1 handler silently ignored a
    /// non-zero `domain`; this implementation does not special-case it).
    pub fn signing_hash(&self) -> B256 {
        let mut buf = [0u8; 96];
        buf[0..32].copy_from_slice(self.domain.as_slice());
        buf[32..64].copy_from_slice(self.chain_id.as_slice());
        buf[64..96].copy_from_slice(self.payload_hash.as_slice());
        keccak256(buf)
    }
}

/// Assembles the 65-byte `r(32) || s(32) || v(1)` signature, normalizing a
/// legacy-style `v >= 27` down to raw parity (spec §4.9 step 7).
pub fn assemble_signature(r: U256, s: U256, v: u64) -> [u8; 65] {
    let parity: u8 = if v >= 27 { (v - 27) as u8 } else { v as u8 };
    let mut out = [0u8; 65];
    out[0..32].copy_from_slice(&r.to_be_bytes::<32>());
    out[32..64].copy_from_slice(&s.to_be_bytes::<32>());
    out[64] = parity;
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signing_hash_matches_concatenation_formula() {
        let domain = B256::repeat_byte(0x11);
        let chain_id = B256::from(U256::from(84532u64));
        let payload_hash = B256::repeat_byte(0x22);
        let args = BlockPayloadArgs::v2(domain, chain_id, payload_hash, Address::ZERO);

        let mut expected_input = Vec::with_capacity(96);
        expected_input.extend_from_slice(domain.as_slice());
        expected_input.extend_from_slice(chain_id.as_slice());
        expected_input.extend_from_slice(payload_hash.as_slice());
        let expected = keccak256(expected_input);

        assert_eq!(args.signing_hash(), expected);
    }

    #[test]
    fn v1_chain_id_is_right_aligned() {
        let args = BlockPayloadArgs::v1(
            B256::ZERO,
            U256::from(1u64),
            B256::ZERO,
            Address::ZERO,
        );
        let mut expected = [0u8; 32];
        expected[31] = 1;
        assert_eq!(args.chain_id.as_slice(), expected);
    }

    #[test]
    fn assemble_signature_normalizes_legacy_v() {
        let sig = assemble_signature(U256::from(1u64), U256::from(2u64), 28);
        assert_eq!(sig.len(), 65);
        assert_eq!(sig[64], 1);
    }

    #[test]
    fn assemble_signature_passes_through_raw_parity() {
        let sig = assemble_signature(U256::from(1u64), U256::from(2u64), 0);
        assert_eq!(sig[64], 0);
        let sig = assemble_signature(U256::from(1u64), U256::from(2u64), 1);
        assert_eq!(sig[64], 1);
    }

    #[test]
    fn from_params_v1_right_aligns_chain_id() {
        let params = serde_json::json!([{
            "domain": format!("0x{}", "11".repeat(32)),
            "chainId": "0xaa36a7",
            "payloadHash": format!("0x{}", "22".repeat(32)),
            "senderAddress": "0x742d35cc6634c0532925a3b844bc9e7595f0f44e",
        }]);
        let args = BlockPayloadArgs::from_params_v1(&params).unwrap();
        assert_eq!(args.chain_id.as_slice()[29..32], [0xaa, 0x36, 0xa7]);
    }

    #[test]
    fn from_params_v2_takes_chain_id_as_hash() {
        let params = serde_json::json!([{
            "domain": format!("0x{}", "00".repeat(32)),
            "chainId": format!("0x{}", "01".repeat(32)),
            "payloadHash": format!("0x{}", "02".repeat(32)),
            "senderAddress": "0x742d35cc6634c0532925a3b844bc9e7595f0f44e",
        }]);
        let args = BlockPayloadArgs::from_params_v2(&params).unwrap();
        assert_eq!(args.chain_id, B256::repeat_byte(0x01));
    }

    #[test]
    fn from_params_rejects_missing_field() {
        let params = serde_json::json!([{ "domain": format!("0x{}", "00".repeat(32)) }]);
        let err = BlockPayloadArgs::from_params_v1(&params).unwrap_err();
        assert!(matches!(err, BlockPayloadArgsError::MissingField("chainId")));
    }
}
