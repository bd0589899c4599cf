use std::time::Duration;

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use sqlx::SqlitePool;

use super::DirectionsCache;
use crate::providers::directions::RouteSummary;

/// Persistent cache backend over the `directions_cache` table.
///
/// Reads filter out rows older than the TTL; physical deletion happens in
/// the task manager's sweep loop via [`evict_expired`].
pub struct SqliteCache {
    pool: SqlitePool,
    ttl: Duration,
}

impl SqliteCache {
    pub fn new(pool: SqlitePool, ttl: Duration) -> Self {
        Self { pool, ttl }
    }

    fn cutoff(&self) -> String {
        let ttl = chrono::Duration::from_std(self.ttl).unwrap_or_else(|_| chrono::Duration::zero());
        (Utc::now() - ttl).to_rfc3339_opts(SecondsFormat::Millis, true)
    }
}

#[async_trait]
impl DirectionsCache for SqliteCache {
    async fn get(&self, key: &str) -> Option<RouteSummary> {
        let result: Result<Option<(i64, i64)>, sqlx::Error> = sqlx::query_as(
            "SELECT distance_meters, duration_seconds FROM directions_cache \
             WHERE key = ?1 AND created_at >= ?2",
        )
        .bind(key)
        .bind(self.cutoff())
        .fetch_optional(&self.pool)
        .await;

        match result {
            Ok(row) => row.map(|(distance_meters, duration_seconds)| RouteSummary {
                distance_meters,
                duration_seconds,
            }),
            Err(e) => {
                tracing::warn!(key, error = %e, "Directions cache read failed");
                None
            }
        }
    }

    async fn put(&self, key: &str, value: &RouteSummary) {
        let now = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
        let result = sqlx::query(
            r#"
            INSERT INTO directions_cache (key, distance_meters, duration_seconds, created_at)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(key) DO UPDATE SET
                distance_meters = excluded.distance_meters,
                duration_seconds = excluded.duration_seconds,
                created_at = excluded.created_at
            "#,
        )
        .bind(key)
        .bind(value.distance_meters)
        .bind(value.duration_seconds)
        .bind(&now)
        .execute(&self.pool)
        .await;

        if let Err(e) = result {
            tracing::warn!(key, error = %e, "Directions cache write failed");
        }
    }
}

/// Delete cache rows older than the TTL. Returns the number of rows removed.
pub async fn evict_expired(pool: &SqlitePool, ttl: Duration) -> Result<u64, sqlx::Error> {
    let ttl = chrono::Duration::from_std(ttl).unwrap_or_else(|_| chrono::Duration::zero());
    let cutoff = (Utc::now() - ttl).to_rfc3339_opts(SecondsFormat::Millis, true);
    let result = sqlx::query("DELETE FROM directions_cache WHERE created_at < ?1")
        .bind(cutoff)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_pool() -> SqlitePool {
        // One connection: a pooled ":memory:" database is per-connection.
        let pool = sqlx::sqlite::SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        sqlx::migrate!("./migrations").run(&pool).await.unwrap();
        pool
    }

    #[tokio::test]
    async fn put_then_get_round_trips() {
        let cache = SqliteCache::new(test_pool().await, Duration::from_secs(3600));
        let value = RouteSummary {
            distance_meters: 10_000,
            duration_seconds: 900,
        };
        cache.put("a|b", &value).await;
        let hit = cache.get("a|b").await.unwrap();
        assert_eq!(hit.distance_meters, 10_000);
        assert_eq!(hit.duration_seconds, 900);
        assert!(cache.get("b|a").await.is_none());
    }

    #[tokio::test]
    async fn put_overwrites_existing_key() {
        let cache = SqliteCache::new(test_pool().await, Duration::from_secs(3600));
        cache
            .put(
                "a|b",
                &RouteSummary {
                    distance_meters: 1,
                    duration_seconds: 1,
                },
            )
            .await;
        cache
            .put(
                "a|b",
                &RouteSummary {
                    distance_meters: 2,
                    duration_seconds: 2,
                },
            )
            .await;
        assert_eq!(cache.get("a|b").await.unwrap().distance_meters, 2);
    }

    #[tokio::test]
    async fn reads_filter_rows_older_than_ttl() {
        let pool = test_pool().await;
        let cache = SqliteCache::new(pool.clone(), Duration::from_millis(10));
        cache
            .put(
                "a|b",
                &RouteSummary {
                    distance_meters: 1,
                    duration_seconds: 1,
                },
            )
            .await;
        tokio::time::sleep(Duration::from_millis(25)).await;
        assert!(cache.get("a|b").await.is_none());

        let removed = evict_expired(&pool, Duration::from_millis(10)).await.unwrap();
        assert_eq!(removed, 1);
    }
}
