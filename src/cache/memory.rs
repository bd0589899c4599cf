use std::num::NonZeroUsize;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use lru::LruCache;
use tokio::sync::Mutex;

use super::DirectionsCache;
use crate::providers::directions::RouteSummary;

struct Entry {
    value: RouteSummary,
    expires_at: Option<Instant>,
}

impl Entry {
    fn expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// Fixed-capacity LRU cache with a uniform TTL.
///
/// A zero TTL means entries never expire. When the cache is full, an
/// expired entry is evicted in preference to the least-recently-used one.
pub struct MemoryCache {
    entries: Mutex<LruCache<String, Entry>>,
    capacity: NonZeroUsize,
    ttl: Duration,
}

impl MemoryCache {
    pub fn new(capacity: NonZeroUsize, ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            capacity,
            ttl,
        }
    }

    pub async fn get(&self, key: &str) -> Option<RouteSummary> {
        let now = Instant::now();
        let mut entries = self.entries.lock().await;
        let expired = entries.peek(key)?.expired(now);
        if expired {
            entries.pop(key);
            return None;
        }
        // get() marks the entry most recently used.
        entries.get(key).map(|entry| entry.value.clone())
    }

    pub async fn put(&self, key: &str, value: RouteSummary) {
        let now = Instant::now();
        let mut entries = self.entries.lock().await;
        if entries.contains(key) {
            entries.pop(key);
        } else if entries.len() == self.capacity.get() {
            let stale = entries
                .iter()
                .find(|(_, entry)| entry.expired(now))
                .map(|(k, _)| k.clone());
            match stale {
                Some(k) => {
                    entries.pop(&k);
                }
                None => {
                    entries.pop_lru();
                }
            }
        }
        let expires_at = (!self.ttl.is_zero()).then(|| now + self.ttl);
        entries.push(key.to_string(), Entry { value, expires_at });
    }

    /// Drop every expired entry.
    pub async fn clean_expired(&self) {
        let now = Instant::now();
        let mut entries = self.entries.lock().await;
        let stale: Vec<String> = entries
            .iter()
            .filter(|(_, entry)| entry.expired(now))
            .map(|(k, _)| k.clone())
            .collect();
        for key in stale {
            entries.pop(&key);
        }
    }

    /// Current live entries, most recently used first.
    pub async fn entries(&self) -> Vec<(String, RouteSummary)> {
        let now = Instant::now();
        let entries = self.entries.lock().await;
        entries
            .iter()
            .filter(|(_, entry)| !entry.expired(now))
            .map(|(k, entry)| (k.clone(), entry.value.clone()))
            .collect()
    }
}

#[async_trait]
impl DirectionsCache for MemoryCache {
    async fn get(&self, key: &str) -> Option<RouteSummary> {
        MemoryCache::get(self, key).await
    }

    async fn put(&self, key: &str, value: &RouteSummary) {
        MemoryCache::put(self, key, value.clone()).await;
    }

    async fn clean_expired(&self) {
        MemoryCache::clean_expired(self).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cap(n: usize) -> NonZeroUsize {
        NonZeroUsize::new(n).unwrap()
    }

    fn summary(meters: i64, seconds: i64) -> RouteSummary {
        RouteSummary {
            distance_meters: meters,
            duration_seconds: seconds,
        }
    }

    #[tokio::test]
    async fn put_then_get_returns_value() {
        let cache = MemoryCache::new(cap(4), Duration::ZERO);
        cache.put("a|b", summary(1000, 60)).await;
        let hit = cache.get("a|b").await.unwrap();
        assert_eq!(hit.distance_meters, 1000);
        assert_eq!(hit.duration_seconds, 60);
        assert!(cache.get("b|a").await.is_none());
    }

    #[tokio::test]
    async fn lru_evicts_first_inserted_without_reads() {
        let cache = MemoryCache::new(cap(3), Duration::ZERO);
        cache.put("k1", summary(1, 1)).await;
        cache.put("k2", summary(2, 2)).await;
        cache.put("k3", summary(3, 3)).await;
        cache.put("k4", summary(4, 4)).await;
        assert!(cache.get("k1").await.is_none());
        assert!(cache.get("k2").await.is_some());
        assert!(cache.get("k4").await.is_some());
    }

    #[tokio::test]
    async fn reading_refreshes_recency() {
        let cache = MemoryCache::new(cap(2), Duration::ZERO);
        cache.put("k1", summary(1, 1)).await;
        cache.put("k2", summary(2, 2)).await;
        cache.get("k1").await;
        cache.put("k3", summary(3, 3)).await;
        // k2 is the least recently used after the read of k1.
        assert!(cache.get("k1").await.is_some());
        assert!(cache.get("k2").await.is_none());
    }

    #[tokio::test]
    async fn rewriting_a_key_does_not_evict_others() {
        let cache = MemoryCache::new(cap(2), Duration::ZERO);
        cache.put("k1", summary(1, 1)).await;
        cache.put("k2", summary(2, 2)).await;
        cache.put("k1", summary(10, 10)).await;
        assert_eq!(cache.get("k1").await.unwrap().distance_meters, 10);
        assert!(cache.get("k2").await.is_some());
    }

    #[tokio::test]
    async fn expired_entries_are_absent_and_cleaned() {
        let cache = MemoryCache::new(cap(4), Duration::from_millis(10));
        cache.put("k1", summary(1, 1)).await;
        tokio::time::sleep(Duration::from_millis(25)).await;
        assert!(cache.get("k1").await.is_none());

        cache.put("k2", summary(2, 2)).await;
        tokio::time::sleep(Duration::from_millis(25)).await;
        cache.put("k3", summary(3, 3)).await;
        cache.clean_expired().await;
        let entries = cache.entries().await;
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].0, "k3");
    }

    #[tokio::test]
    async fn expired_entry_evicted_before_lru_at_capacity() {
        let cache = MemoryCache::new(cap(2), Duration::from_millis(10));
        cache.put("stale", summary(1, 1)).await;
        tokio::time::sleep(Duration::from_millis(25)).await;
        // "stale" is expired; "fresh" is the LRU candidate but survives.
        cache.put("fresh", summary(2, 2)).await;
        tokio::time::sleep(Duration::from_millis(2)).await;
        cache.put("newer", summary(3, 3)).await;
        assert!(cache.get("fresh").await.is_some());
        assert!(cache.get("newer").await.is_some());
    }

    #[tokio::test]
    async fn zero_ttl_never_expires() {
        let cache = MemoryCache::new(cap(2), Duration::ZERO);
        cache.put("k1", summary(1, 1)).await;
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(cache.get("k1").await.is_some());
        assert_eq!(cache.entries().await.len(), 1);
    }
}
