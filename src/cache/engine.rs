//! Cache Engine Module
//!
//! The public façade over the cache store: a fair FIFO mutex serializes
//! every structural operation, while watcher registration, old-version
//! cleanup, and loader execution happen outside the critical section.

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::debug;

use crate::cache::flight::{FlightRegistry, LoadOutcome};
use crate::cache::keys;
use crate::cache::pressure::{GcReport, PressureLevel};
use crate::cache::stats::CacheStats;
use crate::cache::store::{
    BatchDeleteOutcome, BatchGetOutcome, BatchSetOutcome, CacheStore, GetOptions, SetManyItem,
    SetOptions, StoreOptions,
};
use crate::cache::watcher::{WatcherRegistry, DEFAULT_POLL_INTERVAL};
use crate::error::Result;

// == Defaults ==
/// How long a loader's "no value" outcome is remembered.
pub const DEFAULT_NULL_VALUE_TTL_MS: u64 = 300_000;

/// How long a loader failure is remembered.
pub const ERROR_NULL_VALUE_TTL_MS: u64 = 60_000;

// == Engine Options ==
/// Construction-time knobs for the engine.
pub struct EngineOptions {
    /// Inner store configuration
    pub store: StoreOptions,
    /// Negative-cache TTL for loaders that return no value
    pub null_value_ttl_ms: u64,
    /// Negative-cache TTL for loaders that fail
    pub error_null_ttl_ms: u64,
    /// Poll interval of the per-path file watchers
    pub watch_poll_interval: Duration,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            store: StoreOptions::default(),
            null_value_ttl_ms: DEFAULT_NULL_VALUE_TTL_MS,
            error_null_ttl_ms: ERROR_NULL_VALUE_TTL_MS,
            watch_poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

// == Cache Engine ==
/// Composed cache façade: store + single-flight registry + watchers.
///
/// Clone-cheap internals (everything is behind `Arc`) so the engine can
/// be shared across handlers and background tasks.
pub struct CacheEngine {
    store: Arc<Mutex<CacheStore>>,
    flights: FlightRegistry,
    watchers: Arc<WatcherRegistry>,
    null_value_ttl_ms: u64,
    error_null_ttl_ms: u64,
    version_aware: bool,
}

impl std::fmt::Debug for CacheEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheEngine")
            .field("version_aware", &self.version_aware)
            .field("watchers", &self.watchers)
            .field("flights", &self.flights)
            .finish()
    }
}

impl CacheEngine {
    // == Constructor ==
    /// Creates a new engine from options.
    pub fn new(opts: EngineOptions) -> Self {
        let version_aware = opts.store.version_aware;
        Self {
            store: Arc::new(Mutex::new(CacheStore::new(opts.store))),
            flights: FlightRegistry::new(),
            watchers: Arc::new(WatcherRegistry::new(opts.watch_poll_interval)),
            null_value_ttl_ms: opts.null_value_ttl_ms,
            error_null_ttl_ms: opts.error_null_ttl_ms,
            version_aware,
        }
    }

    /// Engine with default options; used by tests.
    pub fn with_defaults() -> Self {
        Self::new(EngineOptions::default())
    }

    // == Set ==
    /// Stores a key-value pair.
    ///
    /// Watcher registration and old-version cleanup are scheduled after
    /// the critical section so slow file-system work never blocks other
    /// callers.
    pub async fn set(
        &self,
        key: &str,
        value: Value,
        ttl_seconds: Option<u64>,
        options: SetOptions,
    ) -> Result<()> {
        let effective = {
            let mut store = self.store.lock().await;
            store.set(key, value, ttl_seconds, options.clone())?
        };

        if options.source_file.is_some() && !options.dependencies.is_empty() {
            self.register_watchers(&options);
        }
        if self.version_aware {
            self.schedule_version_cleanup(keys::base_key(&effective).to_string());
        }
        Ok(())
    }

    /// Starts watchers for the option's source file and dependencies.
    fn register_watchers(&self, options: &SetOptions) {
        for path in options
            .source_file
            .iter()
            .chain(options.dependencies.iter())
        {
            self.watchers.watch(path.clone(), self.store.clone());
        }
    }

    /// Spawns a task that trims a base key down to its two most recent
    /// versions.
    fn schedule_version_cleanup(&self, base: String) {
        let store = self.store.clone();
        tokio::spawn(async move {
            let removed = store.lock().await.cleanup_old_versions(&base);
            if removed > 0 {
                debug!(base = %base, removed, "Version cleanup finished");
            }
        });
    }

    // == Get ==
    /// Retrieves a value; `Ok(None)` means no live value exists.
    pub async fn get(&self, key: &str, options: GetOptions) -> Result<Option<Value>> {
        self.store.lock().await.get(key, options)
    }

    // == TTL Inspection ==
    /// Remaining TTL in milliseconds; reports misses as `KeyNotFound`
    /// or `EntryExpired` instead of an absent value.
    pub async fn ttl_remaining(&self, key: &str, version: Option<&str>) -> Result<u64> {
        self.store.lock().await.ttl_remaining(key, version)
    }

    // == Delete ==
    /// Removes an entry; returns whether a deletion happened.
    pub async fn delete(&self, key: &str) -> Result<bool> {
        self.store.lock().await.delete(key)
    }

    // == Clear ==
    /// Drops all entries and resets statistics.
    pub async fn clear(&self) -> Result<()> {
        self.store.lock().await.clear()
    }

    // == Batch Operations ==
    /// Stores many items under one lock acquisition.
    pub async fn set_many(&self, items: Vec<SetManyItem>) -> BatchSetOutcome {
        let watch_options: Vec<SetOptions> = items
            .iter()
            .filter(|i| i.options.source_file.is_some() && !i.options.dependencies.is_empty())
            .map(|i| i.options.clone())
            .collect();
        let bases: Vec<String> = items
            .iter()
            .map(|i| keys::base_key(&i.key).to_string())
            .collect();

        let outcome = {
            let mut store = self.store.lock().await;
            store.set_many(items)
        };

        for options in &watch_options {
            self.register_watchers(options);
        }
        if self.version_aware {
            for base in bases {
                self.schedule_version_cleanup(base);
            }
        }
        outcome
    }

    /// Retrieves many keys under one lock acquisition.
    pub async fn get_many(&self, keys: &[String], options: GetOptions) -> BatchGetOutcome {
        self.store.lock().await.get_many(keys, options)
    }

    /// Deletes many keys under one lock acquisition.
    pub async fn delete_many(&self, keys: &[String]) -> BatchDeleteOutcome {
        self.store.lock().await.delete_many(keys)
    }

    // == Protected Get ==
    /// Single-flight read-through: returns the cached value, a remembered
    /// absence, or the outcome of one coalesced loader invocation.
    ///
    /// Loader results are written back through the internal fast-path
    /// set; empty and failed loads leave a negative record so concurrent
    /// and near-future callers short-circuit.
    pub async fn get_with_protection<F, Fut>(
        &self,
        key: &str,
        loader: F,
        options: GetOptions,
    ) -> Result<Option<Value>>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<Option<Value>>> + Send + 'static,
    {
        {
            let mut store = self.store.lock().await;
            if let Some(value) = store.get(key, options.clone())? {
                return Ok(Some(value));
            }
            if store.is_null_cached(key) {
                debug!(key, "Negative cache short-circuit");
                return Ok(None);
            }
        }

        let store = self.store.clone();
        let owned_key = key.to_string();
        let get_options = options.clone();
        let null_ttl = self.null_value_ttl_ms;
        let error_ttl = self.error_null_ttl_ms;

        let (flight, _leading) = self.flights.join_or_register(key, move || {
            async move {
                // Double-check: a concurrent writer may have landed while
                // this flight was being registered
                {
                    let mut store = store.lock().await;
                    match store.get(&owned_key, get_options) {
                        Ok(Some(value)) => return LoadOutcome::Value(value),
                        Ok(None) => {}
                        Err(e) => return LoadOutcome::Failed(e),
                    }
                }

                match loader().await {
                    Ok(Some(value)) => {
                        let mut store = store.lock().await;
                        if let Err(e) = store.insert_loaded(&owned_key, value.clone()) {
                            return LoadOutcome::Failed(e);
                        }
                        LoadOutcome::Value(value)
                    }
                    Ok(None) => {
                        store.lock().await.mark_null(&owned_key, null_ttl);
                        LoadOutcome::Absent
                    }
                    Err(e) => {
                        store.lock().await.mark_null(&owned_key, error_ttl);
                        LoadOutcome::Failed(e)
                    }
                }
            }
            .boxed()
        });

        let outcome = flight.await;
        self.flights.complete(key);

        match outcome {
            LoadOutcome::Value(value) => Ok(Some(value)),
            LoadOutcome::Absent => Ok(None),
            LoadOutcome::Failed(e) => Err(e),
        }
    }

    // == Stats ==
    /// Snapshot of current statistics.
    pub async fn stats(&self) -> CacheStats {
        self.store.lock().await.stats()
    }

    /// Current memory pressure level.
    pub async fn pressure(&self) -> PressureLevel {
        self.store.lock().await.pressure()
    }

    // == GC ==
    /// Runs an explicit GC cycle; the aggressive flag forces the
    /// eviction phases regardless of pressure.
    pub async fn force_gc(&self, aggressive: bool) -> GcReport {
        self.store.lock().await.force_gc(aggressive)
    }

    /// Applies partial pressure-threshold overrides.
    pub async fn set_memory_pressure_thresholds(
        &self,
        low: Option<f64>,
        medium: Option<f64>,
        high: Option<f64>,
        critical: Option<f64>,
    ) {
        self.store
            .lock()
            .await
            .set_pressure_thresholds(low, medium, high, critical);
    }

    // == File Watchers ==
    /// Starts watching `path`; when `key` is given, the key is also
    /// registered as a dependent so changes invalidate it.
    ///
    /// Returns true when a new watcher was started.
    pub async fn setup_file_watcher(&self, path: PathBuf, key: Option<String>) -> bool {
        if let Some(key) = key {
            self.store.lock().await.add_dependent(path.clone(), key);
        }
        self.watchers.watch(path, self.store.clone())
    }

    /// Stops watching `path`. Returns whether a watcher was running.
    pub async fn stop_file_watcher(&self, path: &std::path::Path) -> bool {
        self.watchers.unwatch(path)
    }

    // == Periodic Entry Points ==
    /// One cleanup tick: expired sweep, negative-record sweep, plus a
    /// paced GC cycle.
    pub async fn run_cleanup_tick(&self) -> (usize, Option<GcReport>) {
        let mut store = self.store.lock().await;
        let removed = store.cleanup_expired();
        store.sweep_null_values();
        let report = store.maybe_gc();
        (removed, report)
    }

    /// One stats tick: recalibrates memory accounting and refreshes the
    /// pressure level.
    pub async fn run_stats_tick(&self) -> (CacheStats, PressureLevel) {
        let mut store = self.store.lock().await;
        store.recalibrate();
        let level = store.update_pressure();
        (store.stats(), level)
    }

    // == Destroy ==
    /// Stops all watchers and drops all cached state. Periodic tasks
    /// spawned by the host are aborted by the host.
    pub async fn destroy(&self) {
        self.watchers.stop_all();
        self.flights.clear();
        self.store.lock().await.purge();
        debug!("Engine destroyed");
    }
}
