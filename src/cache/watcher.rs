//! File Watcher Module
//!
//! Per-path watchers that invalidate dependent cache entries when the
//! watched file changes. Each watcher is a polling task comparing the
//! file's mtime between ticks; a change locks the store and deletes
//! every registered dependent.
//!
//! Watchers survive invalidation so later entries can register against
//! the same path. They are owned exclusively by the engine and torn down
//! on destroy.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, UNIX_EPOCH};

use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::cache::store::CacheStore;

// == Defaults ==
/// Default interval between mtime polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

// == Watcher Registry ==
/// Per-path watcher tasks keyed by watched path.
pub struct WatcherRegistry {
    watchers: Mutex<HashMap<PathBuf, JoinHandle<()>>>,
    poll_interval: Duration,
}

impl std::fmt::Debug for WatcherRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatcherRegistry")
            .field("watched", &self.watched_count())
            .field("poll_interval", &self.poll_interval)
            .finish()
    }
}

impl WatcherRegistry {
    // == Constructor ==
    pub fn new(poll_interval: Duration) -> Self {
        Self {
            watchers: Mutex::new(HashMap::new()),
            poll_interval,
        }
    }

    // == Watch ==
    /// Starts a watcher for `path` unless one is already running.
    ///
    /// Returns true when a new watcher was started. Registration never
    /// fails the calling operation; an unreadable path is simply watched
    /// for its first appearance.
    pub fn watch(&self, path: PathBuf, store: Arc<tokio::sync::Mutex<CacheStore>>) -> bool {
        let mut watchers = self.watchers.lock().expect("watcher registry poisoned");
        if watchers.contains_key(&path) {
            return false;
        }

        let interval = self.poll_interval;
        let task_path = path.clone();
        let handle = tokio::spawn(async move {
            let mut last_seen = file_mtime_ms(&task_path);
            if last_seen.is_none() {
                warn!(path = %task_path.display(), "Watched path not readable yet");
            }
            loop {
                tokio::time::sleep(interval).await;
                let current = file_mtime_ms(&task_path);
                let changed = match (last_seen, current) {
                    (Some(prev), Some(cur)) => cur > prev,
                    (Some(_), None) => true, // deleted
                    (None, Some(_)) => true, // appeared
                    (None, None) => false,
                };
                if changed {
                    let invalidated = store
                        .lock()
                        .await
                        .invalidate_dependents(&task_path);
                    debug!(
                        path = %task_path.display(),
                        invalidated,
                        "Watched file changed"
                    );
                    last_seen = current;
                }
            }
        });

        debug!(path = %path.display(), "Watcher started");
        watchers.insert(path, handle);
        true
    }

    // == Unwatch ==
    /// Stops the watcher for `path`. Returns whether one was running.
    /// Idempotent.
    pub fn unwatch(&self, path: &Path) -> bool {
        let mut watchers = self.watchers.lock().expect("watcher registry poisoned");
        match watchers.remove(path) {
            Some(handle) => {
                handle.abort();
                debug!(path = %path.display(), "Watcher stopped");
                true
            }
            None => false,
        }
    }

    // == Stop All ==
    /// Aborts every watcher task.
    pub fn stop_all(&self) {
        let mut watchers = self.watchers.lock().expect("watcher registry poisoned");
        for (_, handle) in watchers.drain() {
            handle.abort();
        }
    }

    // == Introspection ==
    /// Number of paths currently watched.
    pub fn watched_count(&self) -> usize {
        self.watchers.lock().expect("watcher registry poisoned").len()
    }
}

impl Drop for WatcherRegistry {
    fn drop(&mut self) {
        self.stop_all();
    }
}

// == Utility Functions ==
/// File mtime in Unix milliseconds; None when the path is unreadable.
fn file_mtime_ms(path: &Path) -> Option<u64> {
    std::fs::metadata(path)
        .ok()?
        .modified()
        .ok()?
        .duration_since(UNIX_EPOCH)
        .ok()
        .map(|d| d.as_millis() as u64)
}
