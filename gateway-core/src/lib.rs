//! Shared codec, transaction model, and JSON-RPC protocol types for the
//! remote signing gateway.
//!
//! This crate is transport- and backend-agnostic: it has no knowledge of
//! axum, tokio, or the secrets backend. The binary crate composes these
//! types into the dispatcher, handlers, and pipeline described in spec
//! §§4.8-4.11.
//!
//! # Modules
//!
//! - [`hex_codec`] -- Ethereum data-hex and quantity-hex encode/decode (C1).
//! - [`tx`] -- legacy and EIP-1559 transaction construction and signing (C2).
//! - [`block_payload`] -- `opsigner_signBlockPayload[V2]` digest construction.
//! - [`jsonrpc`] -- JSON-RPC 2.0 envelopes and the error-code taxonomy (C8).
//! - [`principal`] -- the authenticated-principal record (tenant + method).

pub mod block_payload;
pub mod hex_codec;
pub mod jsonrpc;
pub mod principal;
pub mod tx;
