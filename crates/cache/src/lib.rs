//! Key-value snapshot cache.
//!
//! Stores serialized product, plan and coupon snapshots under namespaced
//! string keys. The cache is populated exclusively by the periodic
//! refresh jobs; the read path never writes back, so entries can lag the
//! source of truth by up to one refresh interval.

pub mod error;
pub mod memory;
pub mod redis;

use std::time::Duration;

use async_trait::async_trait;

pub use error::CacheError;
pub use memory::InMemoryCache;
pub use redis::RedisCache;

/// Cache key for a product snapshot.
pub fn product_key(id: impl std::fmt::Display) -> String {
    format!("product:{id}")
}

/// Cache key for a plan snapshot.
pub fn plan_key(code: impl std::fmt::Display) -> String {
    format!("lago:plan:{code}")
}

/// Cache key for a coupon snapshot.
pub fn coupon_key(code: impl std::fmt::Display) -> String {
    format!("lago:coupon:{code}")
}

/// Get/set access to the snapshot cache.
#[async_trait]
pub trait SnapshotCache: Send + Sync {
    /// Looks up a value; `Ok(None)` on a miss.
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    /// Stores a value, optionally with a TTL.
    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>)
    -> Result<(), CacheError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_namespaced_per_kind() {
        assert_eq!(product_key("p1"), "product:p1");
        assert_eq!(plan_key("plan_basic"), "lago:plan:plan_basic");
        assert_eq!(coupon_key("SAVE10"), "lago:coupon:SAVE10");
    }
}
