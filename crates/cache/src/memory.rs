//! In-memory cache for tests.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use async_trait::async_trait;

use crate::{CacheError, SnapshotCache};

#[derive(Debug, Default)]
struct InMemoryCacheState {
    entries: HashMap<String, (String, Option<Instant>)>,
    fail_on_get: bool,
}

/// In-memory snapshot cache with TTL support and a failure switch.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCache {
    state: Arc<RwLock<InMemoryCacheState>>,
}

impl InMemoryCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures reads to fail, simulating a cache outage.
    pub fn set_fail_on_get(&self, fail: bool) {
        self.state.write().unwrap().fail_on_get = fail;
    }

    /// Returns the number of live entries.
    pub fn len(&self) -> usize {
        self.state.read().unwrap().entries.len()
    }

    /// Returns true when the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl SnapshotCache for InMemoryCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let state = self.state.read().unwrap();
        if state.fail_on_get {
            return Err(CacheError::Backend("injected get failure".to_string()));
        }
        Ok(state.entries.get(key).and_then(|(value, expires)| {
            match expires {
                Some(at) if *at <= Instant::now() => None,
                _ => Some(value.clone()),
            }
        }))
    }

    async fn set(
        &self,
        key: &str,
        value: &str,
        ttl: Option<Duration>,
    ) -> Result<(), CacheError> {
        let expires = ttl.map(|t| Instant::now() + t);
        self.state
            .write()
            .unwrap()
            .entries
            .insert(key.to_string(), (value.to_string(), expires));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn set_then_get() {
        let cache = InMemoryCache::new();
        cache.set("product:p1", "{}", None).await.unwrap();

        assert_eq!(
            cache.get("product:p1").await.unwrap(),
            Some("{}".to_string())
        );
        assert_eq!(cache.get("product:p2").await.unwrap(), None);
    }

    #[tokio::test]
    async fn expired_entries_read_as_misses() {
        let cache = InMemoryCache::new();
        cache
            .set("k", "v", Some(Duration::from_nanos(1)))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;

        assert_eq!(cache.get("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn fail_on_get_surfaces_backend_error() {
        let cache = InMemoryCache::new();
        cache.set_fail_on_get(true);
        assert!(cache.get("k").await.is_err());
    }
}
