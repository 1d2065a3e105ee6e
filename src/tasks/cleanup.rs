//! TTL Cleanup and GC Task
//!
//! Background task that periodically removes expired cache entries and
//! lets the pressure-paced garbage collector run when its cool-down has
//! elapsed.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cache::CacheEngine;

/// Spawns a background task that periodically sweeps expired entries and
/// paces the garbage collector.
///
/// Each tick runs one cleanup pass: the expired sweep always executes;
/// a smart or full GC cycle runs only when the pressure-dependent
/// cool-down (or the full-GC horizon) has elapsed.
///
/// # Arguments
/// * `engine` - Shared cache engine
/// * `check_interval` - Interval between cleanup ticks
///
/// # Returns
/// A JoinHandle for the spawned task, which can be used to abort the
/// task during graceful shutdown.
pub fn spawn_cleanup_task(engine: Arc<CacheEngine>, check_interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!(
            interval_ms = check_interval.as_millis() as u64,
            "Starting cleanup task"
        );

        loop {
            // Sleep for the configured interval
            tokio::time::sleep(check_interval).await;

            let (removed, gc_report) = engine.run_cleanup_tick().await;

            if removed > 0 {
                info!(removed, "TTL cleanup removed expired entries");
            } else {
                debug!("TTL cleanup: no expired entries found");
            }
            if let Some(report) = gc_report {
                info!(
                    freed_bytes = report.freed_bytes,
                    entries_removed = report.entries_removed,
                    duration_ms = report.duration_ms,
                    "GC cycle completed"
                );
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{EngineOptions, GetOptions, ManualClock, SetOptions, StoreOptions};
    use serde_json::json;

    #[tokio::test]
    async fn test_cleanup_task_removes_expired_entries() {
        let clock = Arc::new(ManualClock::starting_at(0));
        let engine = Arc::new(CacheEngine::new(EngineOptions {
            store: StoreOptions {
                clock: clock.clone(),
                ..StoreOptions::default()
            },
            ..EngineOptions::default()
        }));

        engine
            .set("expire_soon", json!("value"), Some(1), SetOptions::default())
            .await
            .unwrap();

        // Entry is past its TTL on the injected clock
        clock.set(2_000);

        let handle = spawn_cleanup_task(engine.clone(), Duration::from_millis(50));
        tokio::time::sleep(Duration::from_millis(200)).await;

        assert_eq!(engine.stats().await.total_entries, 0);
        assert_eq!(
            engine
                .get("expire_soon", GetOptions::default())
                .await
                .unwrap(),
            None
        );

        handle.abort();
    }

    #[tokio::test]
    async fn test_cleanup_task_preserves_valid_entries() {
        let engine = Arc::new(CacheEngine::with_defaults());

        engine
            .set("long_lived", json!("value"), Some(3600), SetOptions::default())
            .await
            .unwrap();

        let handle = spawn_cleanup_task(engine.clone(), Duration::from_millis(50));
        tokio::time::sleep(Duration::from_millis(200)).await;

        assert_eq!(
            engine
                .get("long_lived", GetOptions::default())
                .await
                .unwrap(),
            Some(json!("value"))
        );

        handle.abort();
    }

    #[tokio::test]
    async fn test_cleanup_task_can_be_aborted() {
        let engine = Arc::new(CacheEngine::with_defaults());

        let handle = spawn_cleanup_task(engine, Duration::from_millis(50));

        handle.abort();

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(handle.is_finished(), "Task should be finished after abort");
    }
}
