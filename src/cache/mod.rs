//! Read-through cache for directions lookups.
//!
//! Two backends behind one capability: a process-local LRU with TTL, and a
//! SQLite-backed table for deployments that want hits to survive restarts.
//! The cache is best-effort everywhere: a backend failure degrades to a
//! provider call and is never surfaced to the request.

pub mod memory;
pub mod sqlite;

use std::num::NonZeroUsize;
use std::sync::Arc;

use async_trait::async_trait;
use sqlx::SqlitePool;

use crate::config::{CacheConfig, CacheKind};
use crate::providers::directions::RouteSummary;

pub use memory::MemoryCache;
pub use sqlite::SqliteCache;

#[async_trait]
pub trait DirectionsCache: Send + Sync {
    async fn get(&self, key: &str) -> Option<RouteSummary>;
    async fn put(&self, key: &str, value: &RouteSummary);
    /// Drop expired entries. Backends whose rows are swept externally do
    /// nothing here.
    async fn clean_expired(&self) {}
}

/// Build the configured cache backend, or `None` when caching is disabled.
pub fn from_config(config: &CacheConfig, pool: &SqlitePool) -> Option<Arc<dyn DirectionsCache>> {
    if !config.enable {
        return None;
    }
    match config.kind {
        CacheKind::Memory => {
            let capacity = NonZeroUsize::new(config.mem_capacity).unwrap_or(NonZeroUsize::MIN);
            Some(Arc::new(MemoryCache::new(capacity, config.ttl)))
        }
        CacheKind::Sqlite => Some(Arc::new(SqliteCache::new(pool.clone(), config.ttl))),
    }
}
