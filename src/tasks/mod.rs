//! Asynchronous task pipeline: a durable queue, a polling dispatcher and a
//! bounded worker pool running the scheduler per task.

pub mod store;

pub use store::{TaskError, TaskRecord, TaskStatus, TaskStore};

use std::sync::Arc;
use std::time::Duration;

use sqlx::SqlitePool;
use tokio::sync::Semaphore;
use tokio::time::MissedTickBehavior;
use tracing::{error, info};

use crate::cache::{sqlite as cache_sqlite, DirectionsCache};
use crate::config::{CacheConfig, CacheKind, Config, ProcessorConfig, SchedulingDefaults};
use crate::models::SchedulingRequest;
use crate::providers::directions::Directions;
use crate::scheduler::{Scheduler, SchedulingContext};

/// Owns the dispatch and sweep loops. One instance per process, started
/// explicitly from `main`.
pub struct TaskManager {
    store: TaskStore,
    pool: SqlitePool,
    directions: Arc<dyn Directions>,
    defaults: SchedulingDefaults,
    processor: ProcessorConfig,
    task_ttl: Duration,
    cache: CacheConfig,
    cache_handle: Option<Arc<dyn DirectionsCache>>,
    /// Bounds how many claimed tasks execute at once.
    workers: Arc<Semaphore>,
}

impl TaskManager {
    pub fn new(
        pool: SqlitePool,
        directions: Arc<dyn Directions>,
        cache_handle: Option<Arc<dyn DirectionsCache>>,
        config: &Config,
    ) -> Self {
        Self {
            store: TaskStore::new(pool.clone()),
            pool,
            directions,
            defaults: config.scheduling,
            processor: config.processor,
            task_ttl: config.task_ttl,
            cache: config.cache.clone(),
            cache_handle,
            workers: Arc::new(Semaphore::new(config.processor.thread_number)),
        }
    }

    /// Get a store handle for the API handlers.
    pub fn store(&self) -> TaskStore {
        self.store.clone()
    }

    /// Start the dispatch and TTL sweep loops.
    pub async fn start(self: Arc<Self>) {
        info!(
            interval_ms = self.processor.interval.as_millis() as u64,
            batch_size = self.processor.batch_size,
            workers = self.processor.thread_number,
            "Starting task manager"
        );

        let dispatch_self = self.clone();
        let dispatch_handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(dispatch_self.processor.interval);
            // A slow batch must not queue extra ticks behind it.
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                interval.tick().await;
                dispatch_self.dispatch_once().await;
            }
        });

        let sweep_self = self.clone();
        let sweep_handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(60));
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                interval.tick().await;
                sweep_self.sweep_expired().await;
            }
        });

        // Both loops run forever.
        let _ = tokio::join!(dispatch_handle, sweep_handle);
    }

    /// One dispatch tick: claim a batch and run every claimed task through
    /// the worker pool, logging each outcome independently.
    pub async fn dispatch_once(&self) {
        let claimed = match self.store.claim_batch(self.processor.batch_size).await {
            Ok(ids) => ids,
            Err(e) => {
                error!(error = %e, "Failed to claim pending tasks");
                return;
            }
        };
        if claimed.is_empty() {
            return;
        }
        info!(count = claimed.len(), "Claimed pending tasks");

        let work: Vec<_> = claimed
            .into_iter()
            .map(|doc_id| {
                let workers = self.workers.clone();
                async move {
                    // Acquire a pool slot before running (bounds concurrency).
                    let _permit = workers
                        .acquire()
                        .await
                        .expect("Semaphore closed unexpectedly");
                    (doc_id, self.run_task(doc_id).await)
                }
            })
            .collect();

        for (doc_id, result) in futures::future::join_all(work).await {
            match result {
                Ok(()) => info!(doc_id, "Task completed"),
                Err(e) => error!(doc_id, error = %e, "Task failed"),
            }
        }
    }

    async fn run_task(&self, doc_id: i64) -> Result<(), TaskError> {
        let record = self
            .store
            .load(doc_id)
            .await?
            .ok_or(TaskError::ClaimedTaskMissing(doc_id))?;

        match self.execute(&record).await {
            Ok(response_body) => self.store.complete_task(doc_id, &response_body).await,
            Err(message) => {
                self.store.fail_task(doc_id, &message).await?;
                Err(TaskError::Worker(message))
            }
        }
    }

    /// Run the scheduler for one claimed task. Any failure, including a
    /// malformed stored request, becomes the task's error message.
    async fn execute(&self, record: &TaskRecord) -> Result<String, String> {
        let request: SchedulingRequest =
            serde_json::from_str(&record.request_body).map_err(|e| e.to_string())?;
        let context = SchedulingContext::from_request(&request, self.defaults);
        let scheduler = Scheduler::new(self.directions.clone(), context);
        let response = scheduler
            .run(request.bookings)
            .await
            .map_err(|e| e.to_string())?;
        serde_json::to_string(&response).map_err(|e| e.to_string())
    }

    /// Delete tasks and persistent cache rows past their TTL.
    async fn sweep_expired(&self) {
        match self.store.evict_expired(self.task_ttl).await {
            Ok(0) => {}
            Ok(count) => info!(count, "Evicted expired tasks"),
            Err(e) => error!(error = %e, "Task eviction failed"),
        }

        if let Some(cache) = &self.cache_handle {
            cache.clean_expired().await;
        }
        if self.cache.enable && self.cache.kind == CacheKind::Sqlite {
            match cache_sqlite::evict_expired(&self.pool, self.cache.ttl).await {
                Ok(0) => {}
                Ok(count) => info!(count, "Evicted expired cache entries"),
                Err(e) => error!(error = %e, "Cache eviction failed"),
            }
        }
    }
}
