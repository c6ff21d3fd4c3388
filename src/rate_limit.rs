//! Per-tenant token-bucket rate limiting, shared across both planes (spec §4.7).

use dashmap::DashMap;
use gateway_core::principal::TenantId;
use governor::{Quota, RateLimiter as GovernorRateLimiter};
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use std::num::NonZeroU32;
use std::sync::Arc;

type Bucket = GovernorRateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// A token-bucket rate limiter keyed per tenant, independent of which plane
/// (API-key or mTLS) the request arrived on (spec §4.7: "shared across
/// planes").
#[derive(Clone)]
pub struct RateLimiter {
    rps: NonZeroU32,
    burst: NonZeroU32,
    buckets: Arc<DashMap<TenantId, Arc<Bucket>>>,
}

impl RateLimiter {
    pub fn new(rps: u32, burst: u32) -> Self {
        let rps = NonZeroU32::new(rps.max(1)).expect("rps.max(1) is always nonzero");
        let burst = NonZeroU32::new(burst.max(1)).expect("burst.max(1) is always nonzero");
        Self {
            rps,
            burst,
            buckets: Arc::new(DashMap::new()),
        }
    }

    /// Checks whether a request from `tenant` may proceed, consuming one
    /// token if so. Creates the tenant's bucket lazily on first use.
    pub fn check(&self, tenant: &TenantId) -> bool {
        let bucket = self
            .buckets
            .entry(tenant.clone())
            .or_insert_with(|| Arc::new(self.new_bucket()))
            .clone();
        bucket.check().is_ok()
    }

    fn new_bucket(&self) -> Bucket {
        let quota = Quota::per_second(self.rps).allow_burst(self.burst);
        GovernorRateLimiter::direct(quota)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn burst_allows_configured_count_before_rejecting() {
        let limiter = RateLimiter::new(1, 2);
        let tenant = TenantId::new("org_abc");
        assert!(limiter.check(&tenant));
        assert!(limiter.check(&tenant));
        assert!(!limiter.check(&tenant));
    }

    #[test]
    fn tenants_have_independent_buckets() {
        let limiter = RateLimiter::new(1, 1);
        let a = TenantId::new("org_a");
        let b = TenantId::new("org_b");
        assert!(limiter.check(&a));
        assert!(!limiter.check(&a));
        assert!(limiter.check(&b));
    }
}
