use std::time::Duration;

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use thiserror::Error;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::SchedulingRequest;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum TaskStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl TaskStatus {
    fn parse(raw: &str) -> Option<TaskStatus> {
        match raw {
            "PENDING" => Some(TaskStatus::Pending),
            "PROCESSING" => Some(TaskStatus::Processing),
            "COMPLETED" => Some(TaskStatus::Completed),
            "FAILED" => Some(TaskStatus::Failed),
            _ => None,
        }
    }
}

/// A persisted scheduling task.
#[derive(Debug, Clone)]
pub struct TaskRecord {
    /// Internal row id, used by the dispatcher and workers.
    pub id: i64,
    /// Public UUID handed back to the caller on enqueue.
    pub task_id: String,
    pub request_body: String,
    pub status: TaskStatus,
    pub error_message: Option<String>,
    pub response_body: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Error)]
pub enum TaskError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("Duplicate task id: {0}")]
    Duplicate(String),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Unknown task status: {0}")]
    UnknownStatus(String),
    #[error("Claimed task {0} disappeared from the store")]
    ClaimedTaskMissing(i64),
    #[error("Worker failed: {0}")]
    Worker(String),
}

/// Durable task queue over the `tasks` table.
#[derive(Clone)]
pub struct TaskStore {
    pool: SqlitePool,
}

impl TaskStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Persist a request as a PENDING task and return its public id.
    pub async fn create_task(&self, request: &SchedulingRequest) -> Result<String, TaskError> {
        let task_id = Uuid::new_v4().to_string();
        let body = serde_json::to_string(request)?;
        let now = now_string();
        let result = sqlx::query(
            "INSERT INTO tasks (task_id, request_body, status, created_at, updated_at) \
             VALUES (?1, ?2, 'PENDING', ?3, ?3)",
        )
        .bind(&task_id)
        .bind(&body)
        .bind(&now)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(task_id),
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                Err(TaskError::Duplicate(task_id))
            }
            Err(e) => Err(e.into()),
        }
    }

    pub async fn get_task(&self, task_id: &str) -> Result<Option<TaskRecord>, TaskError> {
        let row = sqlx::query("SELECT * FROM tasks WHERE task_id = ?1")
            .bind(task_id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(record_from_row).transpose()
    }

    /// Load a task by internal id, as claimed by the dispatcher.
    pub async fn load(&self, id: i64) -> Result<Option<TaskRecord>, TaskError> {
        let row = sqlx::query("SELECT * FROM tasks WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(record_from_row).transpose()
    }

    /// Atomically claim up to `limit` PENDING tasks, oldest first, marking
    /// them PROCESSING. The single-statement update guarantees two
    /// dispatchers never claim the same row.
    pub async fn claim_batch(&self, limit: u32) -> Result<Vec<i64>, TaskError> {
        let now = now_string();
        let rows = sqlx::query(
            r#"
            UPDATE tasks SET status = 'PROCESSING', updated_at = ?1
            WHERE id IN (
                SELECT id FROM tasks WHERE status = 'PENDING' ORDER BY id LIMIT ?2
            )
            RETURNING id
            "#,
        )
        .bind(&now)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| row.try_get("id").map_err(TaskError::from))
            .collect()
    }

    pub async fn complete_task(&self, id: i64, response_body: &str) -> Result<(), TaskError> {
        sqlx::query(
            "UPDATE tasks SET status = 'COMPLETED', response_body = ?2, updated_at = ?3 \
             WHERE id = ?1",
        )
        .bind(id)
        .bind(response_body)
        .bind(now_string())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn fail_task(&self, id: i64, error_message: &str) -> Result<(), TaskError> {
        sqlx::query(
            "UPDATE tasks SET status = 'FAILED', error_message = ?2, updated_at = ?3 \
             WHERE id = ?1",
        )
        .bind(id)
        .bind(error_message)
        .bind(now_string())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Delete tasks untouched for longer than `ttl`, whatever their status.
    pub async fn evict_expired(&self, ttl: Duration) -> Result<u64, TaskError> {
        let ttl = chrono::Duration::from_std(ttl).unwrap_or_else(|_| chrono::Duration::zero());
        let cutoff = (Utc::now() - ttl).to_rfc3339_opts(SecondsFormat::Millis, true);
        let result = sqlx::query("DELETE FROM tasks WHERE updated_at < ?1")
            .bind(cutoff)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Task counts by status, for the health endpoint.
    pub async fn counts_by_status(&self) -> Result<Vec<(String, i64)>, TaskError> {
        let rows: Vec<(String, i64)> =
            sqlx::query_as("SELECT status, COUNT(*) FROM tasks GROUP BY status")
                .fetch_all(&self.pool)
                .await?;
        Ok(rows)
    }
}

fn record_from_row(row: SqliteRow) -> Result<TaskRecord, TaskError> {
    let status_raw: String = row.try_get("status")?;
    let status =
        TaskStatus::parse(&status_raw).ok_or_else(|| TaskError::UnknownStatus(status_raw))?;
    Ok(TaskRecord {
        id: row.try_get("id")?,
        task_id: row.try_get("task_id")?,
        request_body: row.try_get("request_body")?,
        status,
        error_message: row.try_get("error_message")?,
        response_body: row.try_get("response_body")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn now_string() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_store() -> TaskStore {
        // One connection: a pooled ":memory:" database is per-connection.
        let pool = sqlx::sqlite::SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        sqlx::migrate!("./migrations").run(&pool).await.unwrap();
        TaskStore::new(pool)
    }

    fn request() -> SchedulingRequest {
        serde_json::from_value(serde_json::json!({
            "date": "January 15, 2025",
            "bookings": [],
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn created_task_is_pending() {
        let store = test_store().await;
        let task_id = store.create_task(&request()).await.unwrap();

        let record = store.get_task(&task_id).await.unwrap().unwrap();
        assert_eq!(record.status, TaskStatus::Pending);
        assert_eq!(record.task_id, task_id);
        assert!(record.response_body.is_none());
        assert!(record.error_message.is_none());

        let parsed: SchedulingRequest = serde_json::from_str(&record.request_body).unwrap();
        assert_eq!(parsed.date, "January 15, 2025");
    }

    #[tokio::test]
    async fn unknown_task_is_none() {
        let store = test_store().await;
        assert!(store.get_task("no-such-task").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn claim_marks_processing_and_respects_limit() {
        let store = test_store().await;
        for _ in 0..3 {
            store.create_task(&request()).await.unwrap();
        }

        let first = store.claim_batch(2).await.unwrap();
        assert_eq!(first.len(), 2);
        for id in &first {
            let record = store.load(*id).await.unwrap().unwrap();
            assert_eq!(record.status, TaskStatus::Processing);
        }

        // Already-claimed tasks are not handed out again.
        let second = store.claim_batch(10).await.unwrap();
        assert_eq!(second.len(), 1);
        assert!(first.iter().all(|id| !second.contains(id)));

        assert!(store.claim_batch(10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn claims_are_oldest_first() {
        let store = test_store().await;
        let mut ids = Vec::new();
        for _ in 0..3 {
            let task_id = store.create_task(&request()).await.unwrap();
            ids.push(store.get_task(&task_id).await.unwrap().unwrap().id);
        }
        let claimed = store.claim_batch(2).await.unwrap();
        assert_eq!(claimed, ids[..2].to_vec());
    }

    #[tokio::test]
    async fn complete_and_fail_are_terminal() {
        let store = test_store().await;
        let a = store.create_task(&request()).await.unwrap();
        let b = store.create_task(&request()).await.unwrap();
        let claimed = store.claim_batch(2).await.unwrap();

        store.complete_task(claimed[0], "{\"ok\":true}").await.unwrap();
        store.fail_task(claimed[1], "routing unavailable").await.unwrap();

        let done = store.get_task(&a).await.unwrap().unwrap();
        assert_eq!(done.status, TaskStatus::Completed);
        assert_eq!(done.response_body.as_deref(), Some("{\"ok\":true}"));

        let failed = store.get_task(&b).await.unwrap().unwrap();
        assert_eq!(failed.status, TaskStatus::Failed);
        assert_eq!(failed.error_message.as_deref(), Some("routing unavailable"));

        // Terminal rows are never claimable again.
        assert!(store.claim_batch(10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn eviction_removes_stale_tasks() {
        let store = test_store().await;
        store.create_task(&request()).await.unwrap();
        tokio::time::sleep(Duration::from_millis(25)).await;
        let fresh = store.create_task(&request()).await.unwrap();

        let removed = store.evict_expired(Duration::from_millis(10)).await.unwrap();
        assert_eq!(removed, 1);
        assert!(store.get_task(&fresh).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn counts_group_by_status() {
        let store = test_store().await;
        store.create_task(&request()).await.unwrap();
        store.create_task(&request()).await.unwrap();
        let claimed = store.claim_batch(1).await.unwrap();
        store.complete_task(claimed[0], "{}").await.unwrap();

        let counts = store.counts_by_status().await.unwrap();
        let get = |status: &str| {
            counts
                .iter()
                .find(|(s, _)| s == status)
                .map(|(_, n)| *n)
                .unwrap_or(0)
        };
        assert_eq!(get("PENDING"), 1);
        assert_eq!(get("COMPLETED"), 1);
        assert_eq!(get("PROCESSING"), 0);
    }
}
