//! Remote signing gateway: dual-plane JSON-RPC server for Ethereum operator
//! workloads backed by a trust-isolated secrets engine.
//!
//! # Modules
//!
//! - [`config`] — configuration loading (CLI + JSON file, `LiteralOrEnv` secrets).
//! - [`backend`] — client for the external signing backend (C3).
//! - [`registry`] — tenant-scoped key, certificate, and API-key lookup tables (C4, C5).
//! - [`auth`] — the API-key and mTLS authenticators (C6).
//! - [`rate_limit`] — per-tenant token-bucket rate limiting (C7).
//! - [`dispatch`] — the JSON-RPC method registry and envelope assembly (C8).
//! - [`handlers`] — the `eth_*`/`opsigner_*` method handlers (C9).
//! - [`pipeline`] — the per-plane middleware chain (C10).
//! - [`server`] — the dual-plane listener setup (C11).
//! - [`probes`] — readiness probes for the external relational and rate-limit stores.
//! - [`telemetry`], [`sig_down`] — ambient logging/tracing and graceful shutdown.

pub mod auth;
pub mod backend;
pub mod config;
pub mod dispatch;
pub mod handlers;
pub mod pipeline;
pub mod probes;
pub mod rate_limit;
pub mod registry;
pub mod request_id;
pub mod server;
pub mod sig_down;
pub mod state;
pub mod telemetry;
