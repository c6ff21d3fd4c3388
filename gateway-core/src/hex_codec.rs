//! Ethereum hex encoding and decoding.
//!
//! Two conventions are supported, matching the wire format used across the
//! `eth_*` and `opsigner_*` JSON-RPC methods:
//!
//! - **Data hex**: an exact byte string (addresses, hashes, calldata). Always
//!   an even number of hex digits after the `0x` prefix, except the
//!   zero-length case.
//! - **Quantity hex**: a big integer with no leading zeros (`0x0` for zero).
//!
//! All encoders emit the `0x` prefix in lower case.

use alloy_primitives::{Address, B256, U256};
use std::fmt;

/// Errors produced while decoding hex-encoded Ethereum values.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HexCodecError {
    /// The input was not valid hex, or did not carry the `0x` prefix.
    #[error("invalid hex input: {0}")]
    InvalidInput(String),
    /// The input decoded to a value too large for the requested width.
    #[error("quantity overflows target width: {0}")]
    Overflow(String),
}

fn strip_0x(s: &str) -> Result<&str, HexCodecError> {
    s.strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .ok_or_else(|| HexCodecError::InvalidInput(s.to_string()))
}

/// Decodes a `0x`-prefixed, 40-hex-digit Ethereum address.
pub fn decode_address(s: &str) -> Result<Address, HexCodecError> {
    let stripped = strip_0x(s)?;
    if stripped.len() != 40 {
        return Err(HexCodecError::InvalidInput(s.to_string()));
    }
    let bytes =
        hex::decode(stripped).map_err(|_| HexCodecError::InvalidInput(s.to_string()))?;
    Ok(Address::from_slice(&bytes))
}

/// Encodes an Ethereum address as lower-case `0x`-prefixed hex.
pub fn encode_address(address: &Address) -> String {
    format!("0x{}", hex::encode(address.as_slice()))
}

/// Decodes a `0x`-prefixed, 64-hex-digit 32-byte hash.
pub fn decode_hash32(s: &str) -> Result<B256, HexCodecError> {
    let stripped = strip_0x(s)?;
    if stripped.len() != 64 {
        return Err(HexCodecError::InvalidInput(s.to_string()));
    }
    let bytes =
        hex::decode(stripped).map_err(|_| HexCodecError::InvalidInput(s.to_string()))?;
    Ok(B256::from_slice(&bytes))
}

/// Encodes a 32-byte hash as lower-case `0x`-prefixed hex.
pub fn encode_hash32(hash: &B256) -> String {
    format!("0x{}", hex::encode(hash.as_slice()))
}

/// Decodes a quantity-form hex string into a `u64`.
///
/// `"0x"` decodes to `0`. A value that exceeds `u64::MAX` is an overflow
/// error, not a truncation.
pub fn decode_quantity_u64(s: &str) -> Result<u64, HexCodecError> {
    let stripped = strip_0x(s)?;
    if stripped.is_empty() {
        return Ok(0);
    }
    if !stripped.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(HexCodecError::InvalidInput(s.to_string()));
    }
    if stripped.len() > 16 {
        // More than 16 hex digits can still be zero-padded, but most aren't.
        let trimmed = stripped.trim_start_matches('0');
        if trimmed.is_empty() {
            return Ok(0);
        }
        if trimmed.len() > 16 {
            return Err(HexCodecError::Overflow(s.to_string()));
        }
        return u64::from_str_radix(trimmed, 16)
            .map_err(|_| HexCodecError::Overflow(s.to_string()));
    }
    u64::from_str_radix(stripped, 16).map_err(|_| HexCodecError::InvalidInput(s.to_string()))
}

/// Decodes a quantity-form hex string into an arbitrary-precision [`U256`].
///
/// `"0x"` decodes to `0`.
pub fn decode_quantity_u256(s: &str) -> Result<U256, HexCodecError> {
    let stripped = strip_0x(s)?;
    if stripped.is_empty() {
        return Ok(U256::ZERO);
    }
    U256::from_str_radix(stripped, 16).map_err(|_| HexCodecError::InvalidInput(s.to_string()))
}

/// Encodes a `u64` in quantity form (no leading zeros, `0x0` for zero).
pub fn encode_quantity_u64(value: u64) -> String {
    format!("0x{:x}", value)
}

/// Encodes a [`U256`] in quantity form (no leading zeros, `0x0` for zero).
pub fn encode_quantity_u256(value: &U256) -> String {
    if value.is_zero() {
        "0x0".to_string()
    } else {
        format!("0x{:x}", value)
    }
}

/// Encodes an optional [`U256`] in quantity form; `None` encodes as `0x0`,
/// matching the legacy "null big integer encodes as 0x0" rule.
pub fn encode_quantity_u256_opt(value: Option<&U256>) -> String {
    match value {
        Some(v) => encode_quantity_u256(v),
        None => "0x0".to_string(),
    }
}

/// Decodes a data-hex byte string.
///
/// `"0x"` decodes to an empty byte vector. An odd number of hex digits is
/// left-padded with one `0` nibble before decoding -- a legacy quirk of the
/// upstream codec that is preserved here deliberately (see spec's Open
/// Questions): callers that need strict byte-multiple validation should
/// check `s.len() % 2` themselves before calling this function.
pub fn decode_bytes(s: &str) -> Result<Vec<u8>, HexCodecError> {
    let stripped = strip_0x(s)?;
    if stripped.is_empty() {
        return Ok(Vec::new());
    }
    if !stripped.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(HexCodecError::InvalidInput(s.to_string()));
    }
    let padded = if stripped.len() % 2 == 1 {
        format!("0{stripped}")
    } else {
        stripped.to_string()
    };
    hex::decode(&padded).map_err(|_| HexCodecError::InvalidInput(s.to_string()))
}

/// Encodes a byte string as lower-case `0x`-prefixed data hex.
pub fn encode_bytes(bytes: &[u8]) -> String {
    format!("0x{}", hex::encode(bytes))
}

/// A lower-case-normalized Ethereum address, used as a key-registry lookup key.
///
/// Two addresses that differ only in case compare equal under this type,
/// satisfying the address-canonicalization invariant in spec §8.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NormalizedAddress(Address);

impl NormalizedAddress {
    pub fn new(address: Address) -> Self {
        Self(address)
    }

    pub fn address(&self) -> Address {
        self.0
    }

    /// Parses from any-case `0x`-prefixed hex and normalizes.
    pub fn parse(s: &str) -> Result<Self, HexCodecError> {
        Ok(Self(decode_address(s)?))
    }

    pub fn to_lower_hex(&self) -> String {
        encode_address(&self.0)
    }
}

impl fmt::Display for NormalizedAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_lower_hex())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_quantity_zero() {
        assert_eq!(decode_quantity_u64("0x").unwrap(), 0);
        assert_eq!(decode_quantity_u256("0x").unwrap(), U256::ZERO);
    }

    #[test]
    fn decode_quantity_u64_overflow() {
        let err = decode_quantity_u64("0x10000000000000000").unwrap_err();
        assert!(matches!(err, HexCodecError::Overflow(_)));
    }

    #[test]
    fn decode_quantity_u64_exact_max() {
        assert_eq!(decode_quantity_u64("0xffffffffffffffff").unwrap(), u64::MAX);
    }

    #[test]
    fn decode_quantity_u64_long_zero_padding_is_zero() {
        assert_eq!(decode_quantity_u64("0x000000000000000000").unwrap(), 0);
    }

    #[test]
    fn decode_bytes_odd_length_is_left_padded() {
        // "0xabc" -> pad to "0x0abc" -> [0x0a, 0xbc]
        let bytes = decode_bytes("0xabc").unwrap();
        assert_eq!(bytes, vec![0x0a, 0xbc]);
    }

    #[test]
    fn decode_bytes_empty() {
        assert_eq!(decode_bytes("0x").unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn address_case_insensitive_equality() {
        let lower = NormalizedAddress::parse("0x742d35cc6634c0532925a3b844bc9e7595f0f44e").unwrap();
        let upper = NormalizedAddress::parse("0x742D35CC6634C0532925A3B844BC9E7595F0F44E").unwrap();
        let mixed = NormalizedAddress::parse("0x742d35Cc6634C0532925A3b844Bc9e7595f0F44e").unwrap();
        assert_eq!(lower.address(), upper.address());
        assert_eq!(lower.address(), mixed.address());
    }

    #[test]
    fn encode_quantity_null_is_zero() {
        assert_eq!(encode_quantity_u256_opt(None), "0x0");
    }

    #[test]
    fn invalid_address_length_rejected() {
        assert!(decode_address("0x1234").is_err());
    }
}
