//! Stats and Recalibration Task
//!
//! Background task that keeps memory accounting honest and the pressure
//! level current. Runs at least once per second so tracked usage never
//! drifts far from the true sum of entry sizes.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::debug;

use crate::cache::CacheEngine;

/// Spawns a background task that periodically recalibrates memory usage
/// and recomputes the memory pressure level.
///
/// # Arguments
/// * `engine` - Shared cache engine
/// * `stats_interval` - Interval between stats ticks
///
/// # Returns
/// A JoinHandle for the spawned task, aborted during graceful shutdown.
pub fn spawn_stats_task(engine: Arc<CacheEngine>, stats_interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(stats_interval).await;

            let (stats, pressure) = engine.run_stats_tick().await;
            debug!(
                entries = stats.total_entries,
                memory = stats.memory_usage,
                hit_rate = format!("{:.2}", stats.hit_rate()),
                pressure = ?pressure,
                "Stats tick"
            );
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{GetOptions, SetOptions};
    use serde_json::json;

    #[tokio::test]
    async fn test_stats_task_keeps_accounting_exact() {
        let engine = Arc::new(CacheEngine::with_defaults());

        engine
            .set("k", json!("value"), None, SetOptions::default())
            .await
            .unwrap();
        engine.get("k", GetOptions::default()).await.unwrap();

        let handle = spawn_stats_task(engine.clone(), Duration::from_millis(50));
        tokio::time::sleep(Duration::from_millis(150)).await;

        let stats = engine.stats().await;
        assert_eq!(stats.total_entries, 1);
        assert!(stats.memory_usage > 0);

        handle.abort();
    }

    #[tokio::test]
    async fn test_stats_task_can_be_aborted() {
        let engine = Arc::new(CacheEngine::with_defaults());

        let handle = spawn_stats_task(engine, Duration::from_millis(50));
        handle.abort();

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(handle.is_finished());
    }
}
