//! Typed representation of legacy and EIP-1559 Ethereum transactions.
//!
//! Legacy and EIP-1559 transactions are modeled as a closed, tagged variant
//! rather than one struct with optional fee fields -- per the design notes,
//! ambiguity at the wire layer invites signing the wrong transaction.

use crate::hex_codec::{self, HexCodecError};
use alloy_consensus::{SignableTransaction, Signed, TxEip1559, TxEnvelope, TxLegacy};
use alloy_eips::eip2718::Encodable2718;
use alloy_eips::eip2930::{AccessList, AccessListItem};
use alloy_primitives::{Address, B256, Bytes, Signature, TxKind, U256};
use serde_json::Value;

/// A fully-specified, not-yet-signed transaction.
///
/// Constructed from [`crate::jsonrpc::TransactionArgs`] after the fee-family
/// selection described in spec §3: exactly one of the fee families supplies
/// `maxFeePerGas`, selecting EIP-1559; otherwise the transaction is legacy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transaction {
    Legacy(TxLegacy),
    Eip1559(TxEip1559),
}

/// Which backend signing mode a transaction variant requires (spec §4.3/§4.9).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignMode {
    /// Backend returns `v = chain_id*2 + 35 + parity`.
    Legacy { chain_id: u64 },
    /// Backend returns `v` as the raw recovery parity, `0` or `1`.
    RawParity,
}

impl Transaction {
    /// The backend signing mode this variant requires.
    pub fn sign_mode(&self, chain_id: u64) -> SignMode {
        match self {
            Transaction::Legacy(_) => SignMode::Legacy { chain_id },
            Transaction::Eip1559(_) => SignMode::RawParity,
        }
    }

    /// The 32-byte digest the backend is asked to sign.
    pub fn signing_hash(&self) -> B256 {
        match self {
            Transaction::Legacy(tx) => tx.signature_hash(),
            Transaction::Eip1559(tx) => tx.signature_hash(),
        }
    }

    /// Attaches a signature and returns the canonical 2718 envelope bytes,
    /// ready for broadcast.
    ///
    /// `y_parity` is the raw recovery bit (`0` or `1`); for legacy
    /// transactions, alloy derives the EIP-155 `v` from `y_parity` and the
    /// transaction's embedded `chain_id` during encoding.
    pub fn encode_signed(self, y_parity: bool, r: U256, s: U256) -> Bytes {
        let signature = Signature::new(r, s, y_parity);
        let envelope: TxEnvelope = match self {
            Transaction::Legacy(tx) => tx.into_signed(signature).into(),
            Transaction::Eip1559(tx) => tx.into_signed(signature).into(),
        };
        Bytes::from(envelope.encoded_2718())
    }
}

/// Required and optional fields for constructing a [`Transaction`], decoded
/// from the `eth_signTransaction` JSON-RPC parameters (spec §3).
#[derive(Debug, Clone)]
pub struct TransactionArgs {
    pub from: Address,
    pub to: Option<Address>,
    pub gas: u64,
    pub fees: FeeFields,
    pub value: U256,
    pub nonce: u64,
    pub data: Vec<u8>,
    pub chain_id: u64,
    pub access_list: AccessList,
}

/// The fee family of a transaction, determining legacy vs EIP-1559 selection.
#[derive(Debug, Clone)]
pub enum FeeFields {
    Legacy {
        gas_price: u128,
    },
    Eip1559 {
        max_fee_per_gas: u128,
        max_priority_fee_per_gas: u128,
    },
}

/// Error constructing a [`Transaction`] from [`TransactionArgs`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransactionArgsError {
    #[error("missing required field: {0}")]
    MissingField(&'static str),
    #[error("invalid field {field}: {source}")]
    InvalidField {
        field: &'static str,
        #[source]
        source: HexCodecError,
    },
    #[error("exactly one of gasPrice or maxFeePerGas must be present")]
    AmbiguousFeeFamily,
    #[error("params must be a one-element array containing the transaction object")]
    MalformedParams,
}

/// Decodes a fee-field quantity into a `u128`, mapping an in-range-for-U256
/// but out-of-range-for-u128 value to a clean [`TransactionArgsError`]
/// instead of panicking (spec §8: no panics on syntactically valid input).
fn decode_fee_u128(s: &str, field: &'static str) -> Result<u128, TransactionArgsError> {
    let value = hex_codec::decode_quantity_u256(s)
        .map_err(|source| TransactionArgsError::InvalidField { field, source })?;
    value
        .try_to::<u128>()
        .map_err(|_| TransactionArgsError::InvalidField {
            field,
            source: HexCodecError::Overflow(s.to_string()),
        })
}

/// Decodes the optional `accessList` field (spec §3): an array of
/// `{address, storageKeys}` objects. Absent or `null` decodes to the empty
/// list, matching "an absent access list is encoded as the empty list"
/// (spec §4.2).
fn decode_access_list(
    obj: &serde_json::Map<String, Value>,
) -> Result<AccessList, TransactionArgsError> {
    let invalid = |msg: &str| HexCodecError::InvalidInput(msg.to_string());

    let items = match obj.get("accessList") {
        None | Some(Value::Null) => return Ok(AccessList::default()),
        Some(value) => value.as_array().ok_or_else(|| TransactionArgsError::InvalidField {
            field: "accessList",
            source: invalid("accessList must be an array"),
        })?,
    };

    let mut decoded = Vec::with_capacity(items.len());
    for item in items {
        let item_obj = item.as_object().ok_or_else(|| TransactionArgsError::InvalidField {
            field: "accessList",
            source: invalid("accessList entries must be objects"),
        })?;

        let address_str = item_obj
            .get("address")
            .and_then(Value::as_str)
            .ok_or(TransactionArgsError::MissingField("accessList[].address"))?;
        let address = hex_codec::decode_address(address_str).map_err(|source| {
            TransactionArgsError::InvalidField { field: "accessList[].address", source }
        })?;

        let storage_keys = item_obj
            .get("storageKeys")
            .and_then(Value::as_array)
            .ok_or(TransactionArgsError::MissingField("accessList[].storageKeys"))?
            .iter()
            .map(|key| {
                let key_str = key.as_str().ok_or_else(|| TransactionArgsError::InvalidField {
                    field: "accessList[].storageKeys",
                    source: invalid("storage key must be a hex string"),
                })?;
                hex_codec::decode_hash32(key_str).map_err(|source| {
                    TransactionArgsError::InvalidField { field: "accessList[].storageKeys", source }
                })
            })
            .collect::<Result<Vec<B256>, TransactionArgsError>>()?;

        decoded.push(AccessListItem { address, storage_keys });
    }

    Ok(AccessList(decoded))
}

impl TransactionArgs {
    /// Decodes `eth_signTransaction`'s one-element parameter array into
    /// [`TransactionArgs`] (spec §3, §4.9 step 2).
    ///
    /// `input` wins over `data` when both are present. Exactly one fee
    /// family must be present: `gasPrice` selects legacy, `maxFeePerGas`
    /// selects EIP-1559 (`maxPriorityFeePerGas` defaults to `0x0` if absent).
    pub fn from_params(params: &Value) -> Result<Self, TransactionArgsError> {
        let obj = params
            .as_array()
            .and_then(|arr| arr.first())
            .and_then(|v| v.as_object())
            .ok_or(TransactionArgsError::MalformedParams)?;

        let field = |name: &'static str| obj.get(name).and_then(Value::as_str);
        let required_hex = |name: &'static str| -> Result<&str, TransactionArgsError> {
            field(name).ok_or(TransactionArgsError::MissingField(name))
        };

        let from = hex_codec::decode_address(required_hex("from")?)
            .map_err(|source| TransactionArgsError::InvalidField { field: "from", source })?;

        let to = match field("to") {
            Some(s) if !s.is_empty() => Some(
                hex_codec::decode_address(s)
                    .map_err(|source| TransactionArgsError::InvalidField { field: "to", source })?,
            ),
            _ => None,
        };

        let gas = hex_codec::decode_quantity_u64(required_hex("gas")?)
            .map_err(|source| TransactionArgsError::InvalidField { field: "gas", source })?;

        let gas_price = field("gasPrice");
        let max_fee_per_gas = field("maxFeePerGas");
        let fees = match (gas_price, max_fee_per_gas) {
            (Some(gas_price), None) => FeeFields::Legacy {
                gas_price: decode_fee_u128(gas_price, "gasPrice")?,
            },
            (None, Some(max_fee_per_gas)) => FeeFields::Eip1559 {
                max_fee_per_gas: decode_fee_u128(max_fee_per_gas, "maxFeePerGas")?,
                max_priority_fee_per_gas: match field("maxPriorityFeePerGas") {
                    Some(s) => decode_fee_u128(s, "maxPriorityFeePerGas")?,
                    None => 0,
                },
            },
            _ => return Err(TransactionArgsError::AmbiguousFeeFamily),
        };

        let value = match field("value") {
            Some(s) => hex_codec::decode_quantity_u256(s)
                .map_err(|source| TransactionArgsError::InvalidField { field: "value", source })?,
            None => U256::ZERO,
        };

        let nonce = hex_codec::decode_quantity_u64(required_hex("nonce")?)
            .map_err(|source| TransactionArgsError::InvalidField { field: "nonce", source })?;

        // `input` wins over `data` when both are present.
        let data = match field("input").or_else(|| field("data")) {
            Some(s) => hex_codec::decode_bytes(s)
                .map_err(|source| TransactionArgsError::InvalidField { field: "data", source })?,
            None => Vec::new(),
        };

        let chain_id = hex_codec::decode_quantity_u64(required_hex("chainId")?)
            .map_err(|source| TransactionArgsError::InvalidField { field: "chainId", source })?;

        let access_list = decode_access_list(obj)?;

        Ok(TransactionArgs {
            from,
            to,
            gas,
            fees,
            value,
            nonce,
            data,
            chain_id,
            access_list,
        })
    }

    /// Builds the appropriately-tagged [`Transaction`] from the decoded
    /// arguments.
    pub fn into_transaction(self) -> Transaction {
        let to = match self.to {
            Some(addr) => TxKind::Call(addr),
            None => TxKind::Create,
        };
        match self.fees {
            FeeFields::Legacy { gas_price } => Transaction::Legacy(TxLegacy {
                chain_id: Some(self.chain_id),
                nonce: self.nonce,
                gas_price,
                gas_limit: self.gas,
                to,
                value: self.value,
                input: self.data.into(),
            }),
            FeeFields::Eip1559 {
                max_fee_per_gas,
                max_priority_fee_per_gas,
            } => Transaction::Eip1559(TxEip1559 {
                chain_id: self.chain_id,
                nonce: self.nonce,
                gas_limit: self.gas,
                max_fee_per_gas,
                max_priority_fee_per_gas,
                to,
                value: self.value,
                access_list: self.access_list,
                input: self.data.into(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::address;

    fn sample_args(fees: FeeFields) -> TransactionArgs {
        TransactionArgs {
            from: address!("0x742d35cc6634c0532925a3b844bc9e7595f0f44e"),
            to: Some(Address::ZERO),
            gas: 21_000,
            fees,
            value: U256::ZERO,
            nonce: 0,
            data: Vec::new(),
            chain_id: 42161,
            access_list: AccessList::default(),
        }
    }

    #[test]
    fn legacy_sign_mode_carries_chain_id() {
        let tx = sample_args(FeeFields::Legacy {
            gas_price: 1_000_000_000,
        })
        .into_transaction();
        assert!(matches!(tx.sign_mode(42161), SignMode::Legacy { chain_id: 42161 }));
    }

    #[test]
    fn eip1559_sign_mode_is_raw_parity() {
        let tx = sample_args(FeeFields::Eip1559 {
            max_fee_per_gas: 2_000_000_000,
            max_priority_fee_per_gas: 1_000_000_000,
        })
        .into_transaction();
        assert!(matches!(tx.sign_mode(11155111), SignMode::RawParity));
    }

    #[test]
    fn legacy_envelope_starts_without_type_prefix() {
        let tx = sample_args(FeeFields::Legacy {
            gas_price: 1_000_000_000,
        })
        .into_transaction();
        let encoded = tx.encode_signed(false, U256::from(1u64), U256::from(2u64));
        // A legacy tx's 2718 envelope is just its RLP list, which starts
        // with an RLP list-length prefix (0xc0-0xff), never 0x01/0x02/0x03/0x04.
        assert!(encoded[0] >= 0xc0);
    }

    #[test]
    fn eip1559_envelope_has_type_prefix() {
        let tx = sample_args(FeeFields::Eip1559 {
            max_fee_per_gas: 2_000_000_000,
            max_priority_fee_per_gas: 1_000_000_000,
        })
        .into_transaction();
        let encoded = tx.encode_signed(true, U256::from(1u64), U256::from(2u64));
        assert_eq!(encoded[0], 0x02);
    }

    #[test]
    fn from_params_decodes_legacy_s3() {
        let params = serde_json::json!([{
            "from": "0x742d35cc6634c0532925a3b844bc9e7595f0f44e",
            "to": "0x0000000000000000000000000000000000000000",
            "gas": "0x5208",
            "gasPrice": "0x3b9aca00",
            "value": "0x0",
            "nonce": "0x0",
            "data": "0x",
            "chainId": "0xa4b1"
        }]);
        let args = TransactionArgs::from_params(&params).unwrap();
        assert!(matches!(args.fees, FeeFields::Legacy { gas_price: 0x3b9aca00 }));
        assert_eq!(args.chain_id, 0xa4b1);
        let tx = args.into_transaction();
        assert!(matches!(tx, Transaction::Legacy(_)));
    }

    #[test]
    fn from_params_decodes_eip1559_s4() {
        let params = serde_json::json!([{
            "from": "0x742d35cc6634c0532925a3b844bc9e7595f0f44e",
            "to": "0x0000000000000000000000000000000000000000",
            "gas": "0x5208",
            "maxFeePerGas": "0x77359400",
            "maxPriorityFeePerGas": "0x3b9aca00",
            "value": "0x0",
            "nonce": "0x0",
            "chainId": "0xaa36a7"
        }]);
        let args = TransactionArgs::from_params(&params).unwrap();
        assert!(matches!(args.fees, FeeFields::Eip1559 { .. }));
        let tx = args.into_transaction();
        assert!(matches!(tx, Transaction::Eip1559(_)));
    }

    #[test]
    fn from_params_rejects_both_fee_families() {
        let params = serde_json::json!([{
            "from": "0x742d35cc6634c0532925a3b844bc9e7595f0f44e",
            "gas": "0x5208",
            "gasPrice": "0x1",
            "maxFeePerGas": "0x1",
            "nonce": "0x0",
            "chainId": "0x1"
        }]);
        let err = TransactionArgs::from_params(&params).unwrap_err();
        assert!(matches!(err, TransactionArgsError::AmbiguousFeeFamily));
    }

    #[test]
    fn from_params_input_wins_over_data() {
        let params = serde_json::json!([{
            "from": "0x742d35cc6634c0532925a3b844bc9e7595f0f44e",
            "gas": "0x5208",
            "gasPrice": "0x1",
            "nonce": "0x0",
            "chainId": "0x1",
            "data": "0xaa",
            "input": "0xbb"
        }]);
        let args = TransactionArgs::from_params(&params).unwrap();
        assert_eq!(args.data, vec![0xbb]);
    }

    #[test]
    fn from_params_decodes_access_list() {
        let params = serde_json::json!([{
            "from": "0x742d35cc6634c0532925a3b844bc9e7595f0f44e",
            "gas": "0x5208",
            "maxFeePerGas": "0x1",
            "nonce": "0x0",
            "chainId": "0x1",
            "accessList": [{
                "address": "0x0000000000000000000000000000000000000001",
                "storageKeys": [format!("0x{}", "00".repeat(32))]
            }]
        }]);
        let args = TransactionArgs::from_params(&params).unwrap();
        assert_eq!(args.access_list.0.len(), 1);
        assert_eq!(args.access_list.0[0].storage_keys.len(), 1);
    }

    #[test]
    fn from_params_absent_access_list_is_empty() {
        let params = serde_json::json!([{
            "from": "0x742d35cc6634c0532925a3b844bc9e7595f0f44e",
            "gas": "0x5208",
            "gasPrice": "0x1",
            "nonce": "0x0",
            "chainId": "0x1"
        }]);
        let args = TransactionArgs::from_params(&params).unwrap();
        assert!(args.access_list.0.is_empty());
    }

    #[test]
    fn from_params_rejects_fee_above_u128_max() {
        let params = serde_json::json!([{
            "from": "0x742d35cc6634c0532925a3b844bc9e7595f0f44e",
            "gas": "0x5208",
            "gasPrice": format!("0x{}", "f".repeat(40)),
            "nonce": "0x0",
            "chainId": "0x1"
        }]);
        let err = TransactionArgs::from_params(&params).unwrap_err();
        assert!(matches!(
            err,
            TransactionArgsError::InvalidField { field: "gasPrice", .. }
        ));
    }
}
