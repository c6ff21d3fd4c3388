//! Tenant-scoped lookup tables: registered signing keys (C4), mTLS client
//! certificates (C5), and API keys, shared across both planes via `Arc`.

pub mod api_key_registry;
pub mod cert_registry;
pub mod key_registry;
