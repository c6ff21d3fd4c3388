//! Registered signing keys, scoped per tenant.
//!
//! A key is identified to callers by its Ethereum address but is never
//! materialized as key bytes inside the gateway process -- the registry only
//! stores the backend handle the secrets engine uses to locate it.

use dashmap::DashMap;
use gateway_core::hex_codec::NormalizedAddress;
use gateway_core::principal::TenantId;
use std::sync::Arc;

/// A registered signing key record.
#[derive(Debug, Clone)]
pub struct Key {
    pub tenant: TenantId,
    pub name: String,
    pub address: NormalizedAddress,
    pub algorithm: KeyAlgorithm,
    pub backend_handle: String,
    pub deleted: bool,
}

/// The only signing algorithm currently supported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAlgorithm {
    Secp256k1,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct TenantAddress(TenantId, String);

/// In-memory, tenant-scoped registry of signing keys.
///
/// Backed by a relational store in production; this in-process cache keeps
/// lookups off the request hot path and is refreshed by whatever process
/// owns key provisioning. `(tenant, address)` is unique among non-deleted
/// entries.
#[derive(Clone, Default)]
pub struct KeyRegistry {
    by_tenant_address: Arc<DashMap<TenantAddress, Key>>,
}

impl KeyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a key record. Returns the previous record, if any.
    pub fn upsert(&self, key: Key) -> Option<Key> {
        let index = TenantAddress(key.tenant.clone(), key.address.to_lower_hex());
        self.by_tenant_address.insert(index, key)
    }

    /// Looks up a key by tenant and address, case-insensitively, excluding
    /// soft-deleted entries.
    pub fn find_by_address(&self, tenant: &TenantId, address: &NormalizedAddress) -> Option<Key> {
        let index = TenantAddress(tenant.clone(), address.to_lower_hex());
        self.by_tenant_address
            .get(&index)
            .filter(|entry| !entry.deleted)
            .map(|entry| entry.clone())
    }

    /// Lists all non-deleted addresses registered to a tenant (used by
    /// `eth_accounts`).
    pub fn list_addresses(&self, tenant: &TenantId) -> Vec<NormalizedAddress> {
        self.by_tenant_address
            .iter()
            .filter(|entry| &entry.key().0 == tenant && !entry.value().deleted)
            .map(|entry| entry.value().address.clone())
            .collect()
    }

    /// Marks a key deleted without removing its record, preserving the
    /// uniqueness history for audit purposes.
    pub fn soft_delete(&self, tenant: &TenantId, address: &NormalizedAddress) -> bool {
        let index = TenantAddress(tenant.clone(), address.to_lower_hex());
        if let Some(mut entry) = self.by_tenant_address.get_mut(&index) {
            entry.deleted = true;
            true
        } else {
            false
        }
    }
}
