//! Cache Store Module
//!
//! The inner cache engine: HashMap storage combined with LRU tracking,
//! TTL expiration, byte-size accounting, version-aware key resolution,
//! dependency invalidation, opportunistic value encryption, and the
//! pressure-driven garbage collector.
//!
//! `CacheStore` is a synchronous state machine; the async façade in
//! `engine.rs` serializes all calls through one fair mutex, so every
//! method here runs to completion without interleaving.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Instant, UNIX_EPOCH};

use serde_json::Value;
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::cache::access::{AccessController, Operation};
use crate::cache::clock::{Clock, SystemClock};
use crate::cache::crypto::ValueEncryptor;
use crate::cache::entry::{CacheEntry, StoredValue};
use crate::cache::estimator::SizeEstimator;
use crate::cache::keys;
use crate::cache::lru::LruTracker;
use crate::cache::nullcache::NullValueCache;
use crate::cache::pressure::{
    eviction_weight, GcReport, PressureLevel, PressureThresholds, AGGRESSIVE_EVICTION_TARGET,
    FULL_GC_INTERVAL_MS, HOT_KEY_IDLE_MS, SMART_EVICTION_TARGET,
};
use crate::cache::stats::CacheStats;
use crate::cache::MAX_KEY_LENGTH;
use crate::error::{CacheError, Result};

// == Options ==
/// Per-call options for `set`.
#[derive(Debug, Clone, Default)]
pub struct SetOptions {
    /// Version tag; in version-aware mode a missing tag is derived from
    /// the clock
    pub version: Option<String>,
    /// Files whose modification invalidates the entry
    pub dependencies: Vec<PathBuf>,
    /// Primary producing file
    pub source_file: Option<PathBuf>,
}

/// Per-call options for `get`.
#[derive(Debug, Clone, Default)]
pub struct GetOptions {
    /// Look up this exact version instead of the latest
    pub version: Option<String>,
    /// Override the dependency-validation default (on in version-aware
    /// mode, off otherwise)
    pub validate_dependencies: Option<bool>,
}

// == Batch Outcomes ==
/// Result of a batch `set_many`.
#[derive(Debug, Default)]
pub struct BatchSetOutcome {
    /// Effective keys written
    pub success: Vec<String>,
    /// Items dropped, with the reason
    pub failed: Vec<(String, String)>,
}

/// Result of a batch `get_many`.
#[derive(Debug, Default)]
pub struct BatchGetOutcome {
    /// Found (key, value) pairs
    pub found: Vec<(String, Value)>,
    /// Keys with no live entry
    pub missing: Vec<String>,
}

/// Result of a batch `delete_many`.
#[derive(Debug, Default)]
pub struct BatchDeleteOutcome {
    pub success: Vec<String>,
    pub failed: Vec<String>,
}

/// One item of a `set_many` batch.
#[derive(Debug, Clone)]
pub struct SetManyItem {
    pub key: String,
    pub value: Value,
    pub ttl_seconds: Option<u64>,
    pub options: SetOptions,
}

// == Removal Accounting ==
/// Why an entry left the map; drives which counter moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Removal {
    Expired,
    Evicted,
    Invalidated,
    Explicit,
}

// == Hot Keys ==
/// Per-base-key access counter consumed by auxiliary GC cleanup.
#[derive(Debug, Clone, Copy, Default)]
struct HotKey {
    count: u64,
    last_access: u64,
}

// == Store Options ==
/// Construction-time knobs for the store.
pub struct StoreOptions {
    /// Maximum number of entries the cache can hold
    pub max_entries: usize,
    /// Maximum total byte usage
    pub max_memory: u64,
    /// Default TTL in seconds for entries without explicit TTL
    pub default_ttl: u64,
    /// Store keys as `"<base>@<version>"` and resolve latest on read
    pub version_aware: bool,
    /// Millisecond time source
    pub clock: Arc<dyn Clock>,
    /// Size estimator for memory accounting
    pub estimator: SizeEstimator,
    /// Encryptor for sensitive values; None disables encryption
    pub encryptor: Option<ValueEncryptor>,
    /// Access controller consulted by every public operation
    pub access: AccessController,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            max_entries: 1000,
            max_memory: 100 * 1024 * 1024,
            default_ttl: 300,
            version_aware: false,
            clock: Arc::new(SystemClock),
            estimator: SizeEstimator::default(),
            encryptor: None,
            access: AccessController::allow_all(),
        }
    }
}

// == Cache Store ==
/// Main cache storage with LRU eviction, TTL support, and version-aware
/// invalidation.
pub struct CacheStore {
    /// Key-value storage, keyed by effective key
    entries: HashMap<String, CacheEntry>,
    /// LRU access tracker over effective keys
    lru: LruTracker,
    /// Performance statistics
    stats: CacheStats,
    /// Keys recently known to resolve to no value
    null_values: NullValueCache,
    /// Reverse index: watched path -> effective keys depending on it
    dependency_graph: HashMap<PathBuf, HashSet<String>>,
    /// Per-base-key access counters
    hot_keys: HashMap<String, HotKey>,
    /// Pressure-level boundaries
    thresholds: PressureThresholds,
    /// Pressure level as of the last stats tick
    pressure: PressureLevel,
    /// Last smart/forced GC cycle, Unix ms
    last_gc_ms: u64,
    /// Last full GC cycle, Unix ms
    last_full_gc_ms: u64,
    opts: StoreOptions,
}

impl std::fmt::Debug for CacheStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheStore")
            .field("entries", &self.entries.len())
            .field("memory_usage", &self.stats.memory_usage)
            .field("pressure", &self.pressure)
            .finish()
    }
}

impl CacheStore {
    // == Constructor ==
    /// Creates a new CacheStore with the given options.
    pub fn new(opts: StoreOptions) -> Self {
        let now = opts.clock.now_ms();
        Self {
            entries: HashMap::new(),
            lru: LruTracker::new(),
            stats: CacheStats::new(),
            null_values: NullValueCache::new(),
            dependency_graph: HashMap::new(),
            hot_keys: HashMap::new(),
            thresholds: PressureThresholds::default(),
            pressure: PressureLevel::Low,
            last_gc_ms: now,
            last_full_gc_ms: now,
            opts,
        }
    }

    /// Creates a store with default options except for capacity limits,
    /// mirroring the common test setup.
    pub fn with_limits(max_entries: usize, default_ttl: u64) -> Self {
        Self::new(StoreOptions {
            max_entries,
            default_ttl,
            ..StoreOptions::default()
        })
    }

    fn now(&self) -> u64 {
        self.opts.clock.now_ms()
    }

    // == Set ==
    /// Stores a key-value pair with optional TTL and version/dependency
    /// metadata. Returns the effective key actually written.
    ///
    /// If the key already exists, the value is overwritten and TTL is
    /// reset. If the cache is over capacity, least recently used entries
    /// are evicted; when even eviction cannot make room, the call fails
    /// and the entry is not inserted.
    pub fn set(
        &mut self,
        key: &str,
        value: Value,
        ttl_seconds: Option<u64>,
        options: SetOptions,
    ) -> Result<String> {
        self.validate_key(key)?;
        if ttl_seconds == Some(0) {
            return Err(CacheError::InvalidInput(
                "TTL must be at least 1 second".to_string(),
            ));
        }
        self.opts.access.check(Operation::Set, key)?;

        let now = self.now();

        // Effective key: versioned stores derive a tag from the clock
        // when the caller did not supply one
        let (effective, version) = if self.opts.version_aware {
            let version = options
                .version
                .clone()
                .unwrap_or_else(|| now.to_string());
            (keys::effective_key(key, &version), Some(version))
        } else {
            (key.to_string(), options.version.clone())
        };

        // Content fingerprint is taken on the plaintext form
        let hash = content_hash(&value);

        // Opportunistic encryption of sensitive pairs
        let (stored, size) = match &self.opts.encryptor {
            Some(enc) if enc.is_sensitive(key, &value) => {
                let record = enc.encrypt(&value)?;
                let size = self
                    .opts
                    .estimator
                    .estimate_raw(&effective, record.len())
                    .total;
                (StoredValue::Encrypted(record), size)
            }
            _ => {
                let size = self.opts.estimator.estimate(&effective, &value).total;
                (StoredValue::Plain(value), size)
            }
        };

        let old = self.entries.get(&effective);
        let replacing = old.is_some();
        let old_size = old.map(|e| e.size).unwrap_or(0);

        self.ensure_capacity(&effective, size, old_size, replacing)?;

        // Detach the old generation from the dependency graph before the
        // new metadata takes its place
        if let Some(old_entry) = self.entries.remove(&effective) {
            self.detach_from_graph(&effective, &old_entry);
            self.stats.sub_memory(old_entry.size);
        }

        let mut entry = CacheEntry::new(stored, ttl_seconds.unwrap_or(self.opts.default_ttl), size, now);
        entry.version = version;
        entry.hash = Some(hash);
        entry.dependencies = options.dependencies.clone();
        entry.source_file = options.source_file.clone();
        if let Some(ref source) = options.source_file {
            entry.file_timestamp = file_mtime_ms(source);
            if entry.file_timestamp.is_none() {
                warn!(path = %source.display(), "Source file not readable at insert");
            }
        }

        for path in options
            .source_file
            .iter()
            .chain(options.dependencies.iter())
        {
            self.dependency_graph
                .entry(path.clone())
                .or_default()
                .insert(effective.clone());
        }

        self.entries.insert(effective.clone(), entry);
        self.stats.add_memory(size);
        self.lru.touch(&effective);
        self.stats.set_total_entries(self.entries.len());

        // A real value supersedes any negative record
        self.null_values.remove(key);
        self.null_values.remove(&effective);

        debug!(key = %effective, size, "Entry cached");
        Ok(effective)
    }

    // == Get ==
    /// Retrieves a value by key.
    ///
    /// Returns `Ok(None)` on miss: unknown key, elapsed TTL, stale source
    /// file, or changed dependency (each of the latter also deletes the
    /// entry). Decryption failures are reported as errors and leave the
    /// entry in place.
    pub fn get(&mut self, key: &str, options: GetOptions) -> Result<Option<Value>> {
        let started = Instant::now();
        self.opts.access.check(Operation::Get, keys::base_key(key))?;

        let now = self.now();

        let effective = match self.resolve_effective_key(key, options.version.as_deref()) {
            Some(k) => k,
            None => {
                self.stats.record_miss();
                return Ok(None);
            }
        };

        let (expired, source_check, dependencies, created) = {
            let Some(entry) = self.entries.get(&effective) else {
                self.stats.record_miss();
                return Ok(None);
            };
            (
                entry.is_expired(now),
                entry
                    .source_file
                    .clone()
                    .zip(entry.file_timestamp),
                entry.dependencies.clone(),
                entry.created,
            )
        };

        // Freshness checks, in order; any failure deletes the entry and
        // counts as a miss
        if expired {
            self.remove_entry(&effective, Removal::Expired);
            self.stats.record_miss();
            return Ok(None);
        }
        if let Some((source, stamp)) = source_check {
            // Unreadable or touched after insertion both invalidate
            let fresh = matches!(file_mtime_ms(&source), Some(mtime) if mtime <= stamp);
            if !fresh {
                self.remove_entry(&effective, Removal::Invalidated);
                self.stats.record_miss();
                return Ok(None);
            }
        }
        let validate_deps = options
            .validate_dependencies
            .unwrap_or(self.opts.version_aware);
        if validate_deps && !dependencies.is_empty() {
            let stale = dependencies
                .iter()
                .any(|dep| !matches!(file_mtime_ms(dep), Some(mtime) if mtime <= created));
            if stale {
                self.remove_entry(&effective, Removal::Invalidated);
                self.stats.record_miss();
                return Ok(None);
            }
        }

        // Hit path
        let entry = self
            .entries
            .get_mut(&effective)
            .expect("entry checked above");
        entry.touch(now);
        let payload = entry.value.clone();
        self.lru.touch(&effective);
        self.stats.record_hit();

        let base = keys::base_key(&effective).to_string();
        let counter = self.hot_keys.entry(base).or_default();
        counter.count += 1;
        counter.last_access = now;

        let value = match payload {
            StoredValue::Plain(v) => v,
            StoredValue::Encrypted(ref record) => {
                let enc = self.opts.encryptor.as_ref().ok_or_else(|| {
                    CacheError::Unknown(format!(
                        "Entry '{key}' is encrypted but no cipher key is configured"
                    ))
                })?;
                enc.decrypt(record).map_err(|e| {
                    CacheError::Unknown(format!("Failed to decrypt entry '{key}': {e}"))
                })?
            }
        };

        self.stats
            .record_access_time(started.elapsed().as_secs_f64() * 1_000_000.0);
        Ok(Some(value))
    }

    /// Resolves the caller key to the stored effective key.
    ///
    /// With an explicit version the lookup is exact. In version-aware
    /// mode without one, the live entry with the greatest `created`
    /// among `"<key>@..."` wins.
    fn resolve_effective_key(&self, key: &str, version: Option<&str>) -> Option<String> {
        if let Some(v) = version {
            let candidate = keys::effective_key(key, v);
            return self.entries.contains_key(&candidate).then_some(candidate);
        }
        // Exact match first; loader-written entries carry no version tag
        // even in version-aware mode
        if self.entries.contains_key(key) {
            return Some(key.to_string());
        }
        if !self.opts.version_aware {
            return None;
        }
        self.entries
            .iter()
            .filter(|(k, _)| keys::is_version_of(k, key))
            .max_by_key(|(_, e)| e.created)
            .map(|(k, _)| k.clone())
    }

    // == TTL Inspection ==
    /// Remaining TTL in milliseconds for a key's live entry.
    ///
    /// Unlike `get`, this explicit check reports misses as errors:
    /// `KeyNotFound` when no entry exists, `EntryExpired` (after
    /// removing the corpse) when the TTL has elapsed.
    pub fn ttl_remaining(&mut self, key: &str, version: Option<&str>) -> Result<u64> {
        self.opts.access.check(Operation::Get, keys::base_key(key))?;

        let now = self.now();
        let effective = self
            .resolve_effective_key(key, version)
            .ok_or_else(|| CacheError::KeyNotFound(key.to_string()))?;
        let (expired, remaining) = {
            let entry = self
                .entries
                .get(&effective)
                .ok_or_else(|| CacheError::KeyNotFound(key.to_string()))?;
            (entry.is_expired(now), entry.ttl_remaining_ms(now))
        };

        if expired {
            self.remove_entry(&effective, Removal::Expired);
            return Err(CacheError::EntryExpired(key.to_string()));
        }
        Ok(remaining)
    }

    // == Delete ==
    /// Removes an entry by key; returns whether a deletion happened.
    ///
    /// In version-aware mode a bare base key removes every live version.
    pub fn delete(&mut self, key: &str) -> Result<bool> {
        self.opts.access.check(Operation::Delete, keys::base_key(key))?;

        if self.entries.contains_key(key) {
            self.remove_entry(key, Removal::Explicit);
            return Ok(true);
        }
        if self.opts.version_aware {
            let versions: Vec<String> = self
                .entries
                .keys()
                .filter(|k| keys::is_version_of(k, key))
                .cloned()
                .collect();
            if !versions.is_empty() {
                for v in &versions {
                    self.remove_entry(v, Removal::Explicit);
                }
                return Ok(true);
            }
        }
        Ok(false)
    }

    // == Clear ==
    /// Drops all entries and resets every counter, including the
    /// historical hit/miss totals.
    pub fn clear(&mut self) -> Result<()> {
        self.opts.access.check(Operation::Clear, "")?;

        self.entries.clear();
        self.lru.clear();
        self.null_values.clear();
        self.dependency_graph.clear();
        self.hot_keys.clear();
        self.stats.clear();
        Ok(())
    }

    // == Purge ==
    /// Unconditionally drops all state. Access control does not apply;
    /// this is the teardown path, not a user-facing operation.
    pub fn purge(&mut self) {
        self.entries.clear();
        self.lru.clear();
        self.null_values.clear();
        self.dependency_graph.clear();
        self.hot_keys.clear();
        self.stats.clear();
    }

    // == Batch Operations ==
    /// Stores many items under a single critical section.
    ///
    /// An upfront capacity pre-check evicts proactively and drops items
    /// that cannot fit even then, so one oversized item does not abort
    /// the whole batch.
    pub fn set_many(&mut self, items: Vec<SetManyItem>) -> BatchSetOutcome {
        let mut outcome = BatchSetOutcome::default();

        // Pre-check: estimate the batch, evict ahead of time, and peel
        // off items that will never fit
        let mut workable = Vec::with_capacity(items.len());
        let mut needed: u64 = 0;
        for item in items {
            let size = self.opts.estimator.estimate(&item.key, &item.value).total;
            if size > self.opts.max_memory {
                outcome
                    .failed
                    .push((item.key, "exceeds maximum cache memory".to_string()));
                continue;
            }
            needed += size;
            workable.push(item);
        }
        while self.stats.memory_usage + needed > self.opts.max_memory {
            let Some(victim) = self.lru.peek_oldest().cloned() else {
                break;
            };
            self.remove_entry(&victim, Removal::Evicted);
        }

        for item in workable {
            match self.set(&item.key, item.value, item.ttl_seconds, item.options) {
                Ok(effective) => outcome.success.push(effective),
                Err(e) => outcome.failed.push((item.key, e.to_string())),
            }
        }
        outcome
    }

    /// Retrieves many keys under a single critical section.
    pub fn get_many(&mut self, keys: &[String], options: GetOptions) -> BatchGetOutcome {
        let mut outcome = BatchGetOutcome::default();
        for key in keys {
            match self.get(key, options.clone()) {
                Ok(Some(value)) => outcome.found.push((key.clone(), value)),
                _ => outcome.missing.push(key.clone()),
            }
        }
        outcome
    }

    /// Deletes many keys under a single critical section.
    pub fn delete_many(&mut self, keys: &[String]) -> BatchDeleteOutcome {
        let mut outcome = BatchDeleteOutcome::default();
        for key in keys {
            match self.delete(key) {
                Ok(true) => outcome.success.push(key.clone()),
                _ => outcome.failed.push(key.clone()),
            }
        }
        outcome
    }

    // == Dependency Invalidation ==
    /// Deletes every entry registered against `path` and clears its
    /// dependent set. Internal: access control does not apply.
    ///
    /// Returns the number of entries invalidated. The path's watcher (if
    /// any) stays registered for future dependents.
    pub fn invalidate_dependents(&mut self, path: &Path) -> usize {
        let Some(dependents) = self.dependency_graph.remove(path) else {
            return 0;
        };
        let count = dependents.len();
        for key in dependents {
            self.remove_entry(&key, Removal::Invalidated);
        }
        if count > 0 {
            debug!(path = %path.display(), count, "Invalidated dependents");
        }
        count
    }

    /// Registers `key` as a dependent of `path` without writing an
    /// entry; used by the standalone watcher setup operation.
    pub fn add_dependent(&mut self, path: PathBuf, key: String) {
        self.dependency_graph.entry(path).or_default().insert(key);
    }

    // == Version Cleanup ==
    /// Retains the two most recent versions (by `created`) of a base key
    /// and removes the rest. Returns how many entries were removed.
    pub fn cleanup_old_versions(&mut self, base: &str) -> usize {
        let mut versions: Vec<(String, u64)> = self
            .entries
            .iter()
            .filter(|(k, _)| keys::is_version_of(k, base))
            .map(|(k, e)| (k.clone(), e.created))
            .collect();
        if versions.len() <= 2 {
            return 0;
        }
        versions.sort_by_key(|(_, created)| *created);
        let stale = versions.len() - 2;
        for (key, _) in versions.into_iter().take(stale) {
            self.remove_entry(&key, Removal::Explicit);
        }
        debug!(base, removed = stale, "Old versions cleaned up");
        stale
    }

    // == Null-Value Records ==
    /// Whether `key` is currently marked as known-absent.
    pub fn is_null_cached(&mut self, key: &str) -> bool {
        let now = self.now();
        self.null_values.contains(key, now)
    }

    /// Marks `key` as known-absent for `ttl_ms`.
    pub fn mark_null(&mut self, key: &str, ttl_ms: u64) {
        let now = self.now();
        self.null_values.insert(key.to_string(), ttl_ms, now);
    }

    /// Drops expired negative records; returns how many were removed.
    pub fn sweep_null_values(&mut self) -> usize {
        let now = self.now();
        self.null_values.sweep(now)
    }

    // == Fast-Path Insert ==
    /// Inserts a loader result without access control or version
    /// handling; reuses the adaptive size estimator and the capacity
    /// policy.
    pub fn insert_loaded(&mut self, key: &str, value: Value) -> Result<()> {
        let size = self.opts.estimator.estimate(key, &value).total;
        let old = self.entries.get(key);
        let replacing = old.is_some();
        let old_size = old.map(|e| e.size).unwrap_or(0);
        self.ensure_capacity(key, size, old_size, replacing)?;

        if let Some(old_entry) = self.entries.remove(key) {
            self.detach_from_graph(key, &old_entry);
            self.stats.sub_memory(old_entry.size);
        }
        let now = self.now();
        let entry = CacheEntry::new(StoredValue::Plain(value), self.opts.default_ttl, size, now);
        self.entries.insert(key.to_string(), entry);
        self.stats.add_memory(size);
        self.lru.touch(key);
        self.stats.set_total_entries(self.entries.len());
        self.null_values.remove(key);
        Ok(())
    }

    // == Expired Sweep ==
    /// Removes all expired entries from the cache.
    ///
    /// Returns the number of entries removed.
    pub fn cleanup_expired(&mut self) -> usize {
        let now = self.now();
        let expired_keys: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired(now))
            .map(|(key, _)| key.clone())
            .collect();

        let count = expired_keys.len();
        for key in expired_keys {
            self.remove_entry(&key, Removal::Expired);
        }
        count
    }

    // == Garbage Collection ==
    /// Runs a GC cycle if the pressure-dependent cool-down has elapsed,
    /// or a full cycle if the full-GC horizon has passed.
    pub fn maybe_gc(&mut self) -> Option<GcReport> {
        let now = self.now();
        if now.saturating_sub(self.last_full_gc_ms) >= FULL_GC_INTERVAL_MS {
            return Some(self.full_gc());
        }
        if now.saturating_sub(self.last_gc_ms) >= self.pressure.gc_cooldown_ms() {
            return Some(self.smart_gc());
        }
        None
    }

    /// Smart GC cycle: expired sweep, then weight-based eviction under
    /// High pressure, then largest-first eviction under Critical
    /// pressure, then auxiliary cleanup.
    pub fn smart_gc(&mut self) -> GcReport {
        let started = Instant::now();
        let now = self.now();
        let usage_at_start = self.stats.memory_usage;
        let mut removed = self.cleanup_expired();
        let mut freed = usage_at_start.saturating_sub(self.stats.memory_usage);

        if self.pressure >= PressureLevel::High {
            let target = (usage_at_start as f64 * SMART_EVICTION_TARGET) as u64;
            let (count, bytes) = self.evict_by_weight(now, target.saturating_sub(freed));
            removed += count;
            freed += bytes;
        }
        if self.pressure >= PressureLevel::Critical {
            let target = (usage_at_start as f64 * AGGRESSIVE_EVICTION_TARGET) as u64;
            let (count, bytes) = self.evict_largest(target.saturating_sub(freed));
            removed += count;
            freed += bytes;
        }

        self.auxiliary_cleanup(now);
        self.last_gc_ms = now;

        let report = GcReport {
            freed_bytes: freed,
            duration_ms: started.elapsed().as_millis() as u64,
            entries_removed: removed,
        };
        debug!(
            freed = report.freed_bytes,
            removed = report.entries_removed,
            pressure = ?self.pressure,
            "GC cycle finished"
        );
        report
    }

    /// Full GC cycle: expired sweep, auxiliary purge, size
    /// recalibration, and an LRU rebuild to repair bookkeeping drift.
    pub fn full_gc(&mut self) -> GcReport {
        let started = Instant::now();
        let now = self.now();
        let usage_at_start = self.stats.memory_usage;

        let removed = self.cleanup_expired();
        self.hot_keys.clear();
        self.null_values.sweep(now);
        self.recalibrate();

        // Rebuild the recency list by descending last-access time
        let mut order: Vec<(String, u64)> = self
            .entries
            .iter()
            .map(|(k, e)| (k.clone(), e.last_accessed))
            .collect();
        order.sort_by(|a, b| b.1.cmp(&a.1));
        self.lru.rebuild(order.into_iter().map(|(k, _)| k));

        self.last_gc_ms = now;
        self.last_full_gc_ms = now;

        GcReport {
            freed_bytes: usage_at_start.saturating_sub(self.stats.memory_usage),
            duration_ms: started.elapsed().as_millis() as u64,
            entries_removed: removed,
        }
    }

    /// Explicitly requested GC cycle.
    ///
    /// The aggressive flag forces the weight-based and largest-first
    /// phases regardless of the current pressure level.
    pub fn force_gc(&mut self, aggressive: bool) -> GcReport {
        let started = Instant::now();
        let now = self.now();
        let usage_at_start = self.stats.memory_usage;
        let mut removed = self.cleanup_expired();
        let mut freed = usage_at_start.saturating_sub(self.stats.memory_usage);

        if aggressive {
            let smart_target = (usage_at_start as f64 * SMART_EVICTION_TARGET) as u64;
            let (count, bytes) = self.evict_by_weight(now, smart_target.saturating_sub(freed));
            removed += count;
            freed += bytes;

            let hard_target = (usage_at_start as f64 * AGGRESSIVE_EVICTION_TARGET) as u64;
            let (count, bytes) = self.evict_largest(hard_target.saturating_sub(freed));
            removed += count;
            freed += bytes;
        }

        self.auxiliary_cleanup(now);
        self.recalibrate();
        self.last_gc_ms = now;

        GcReport {
            freed_bytes: freed,
            duration_ms: started.elapsed().as_millis() as u64,
            entries_removed: removed,
        }
    }

    /// Evicts entries in ascending eviction-weight order until
    /// `target_bytes` have been freed. Returns (count, bytes).
    fn evict_by_weight(&mut self, now: u64, target_bytes: u64) -> (usize, u64) {
        if target_bytes == 0 {
            return (0, 0);
        }
        let mut weighted: Vec<(String, f64, u64)> = self
            .entries
            .iter()
            .map(|(k, e)| {
                (
                    k.clone(),
                    eviction_weight(now, e.last_accessed, e.access_count, e.size),
                    e.size,
                )
            })
            .collect();
        weighted.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));

        let mut freed = 0u64;
        let mut count = 0usize;
        for (key, _, size) in weighted {
            if freed >= target_bytes {
                break;
            }
            self.remove_entry(&key, Removal::Evicted);
            freed += size;
            count += 1;
        }
        (count, freed)
    }

    /// Evicts the largest entries first until `target_bytes` have been
    /// freed. Returns (count, bytes).
    fn evict_largest(&mut self, target_bytes: u64) -> (usize, u64) {
        if target_bytes == 0 {
            return (0, 0);
        }
        let mut by_size: Vec<(String, u64)> = self
            .entries
            .iter()
            .map(|(k, e)| (k.clone(), e.size))
            .collect();
        by_size.sort_by(|a, b| b.1.cmp(&a.1));

        let mut freed = 0u64;
        let mut count = 0usize;
        for (key, size) in by_size {
            if freed >= target_bytes {
                break;
            }
            self.remove_entry(&key, Removal::Evicted);
            freed += size;
            count += 1;
        }
        (count, freed)
    }

    /// Drops idle hot-key counters and expired negative records.
    fn auxiliary_cleanup(&mut self, now: u64) {
        self.hot_keys
            .retain(|_, hk| now.saturating_sub(hk.last_access) < HOT_KEY_IDLE_MS);
        self.null_values.sweep(now);
    }

    // == Recalibration ==
    /// Recomputes memory usage as the exact sum of entry sizes; returns
    /// the absolute drift that was corrected.
    pub fn recalibrate(&mut self) -> u64 {
        let exact: u64 = self.entries.values().map(|e| e.size).sum();
        let drift = exact.abs_diff(self.stats.memory_usage);
        if drift > 0 {
            warn!(drift, "Memory accounting drift corrected");
        }
        self.stats.set_memory(exact);
        self.stats.set_total_entries(self.entries.len());
        drift
    }

    // == Pressure ==
    /// Recomputes the pressure level from current usage.
    pub fn update_pressure(&mut self) -> PressureLevel {
        let ratio = if self.opts.max_memory == 0 {
            1.0
        } else {
            self.stats.memory_usage as f64 / self.opts.max_memory as f64
        };
        self.pressure = self.thresholds.level_for(ratio);
        self.pressure
    }

    /// Current pressure level (as of the last stats tick).
    pub fn pressure(&self) -> PressureLevel {
        self.pressure
    }

    /// Applies partial threshold overrides.
    pub fn set_pressure_thresholds(
        &mut self,
        low: Option<f64>,
        medium: Option<f64>,
        high: Option<f64>,
        critical: Option<f64>,
    ) {
        self.thresholds.merge(low, medium, high, critical);
        self.update_pressure();
    }

    // == Stats ==
    /// Returns current cache statistics.
    pub fn stats(&self) -> CacheStats {
        let mut stats = self.stats.clone();
        stats.set_total_entries(self.entries.len());
        stats
    }

    // == Introspection ==
    /// Returns the current number of entries in the cache.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether an effective key currently has a live entry.
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Whether the store runs in version-aware mode.
    pub fn version_aware(&self) -> bool {
        self.opts.version_aware
    }

    /// Snapshot of keys in LRU order, least recent first. Test support.
    pub fn keys_by_recency(&self) -> Vec<String> {
        self.lru.keys_from_tail()
    }

    // == Internals ==
    fn validate_key(&self, key: &str) -> Result<()> {
        if key.is_empty() {
            return Err(CacheError::InvalidInput("Key cannot be empty".to_string()));
        }
        if key.len() > MAX_KEY_LENGTH {
            return Err(CacheError::InvalidInput(format!(
                "Key exceeds maximum length of {MAX_KEY_LENGTH} bytes"
            )));
        }
        Ok(())
    }

    /// Makes room for a new entry of `new_size` bytes, evicting from the
    /// LRU tail. Fails without inserting when no amount of eviction can
    /// fit the entry.
    fn ensure_capacity(
        &mut self,
        effective: &str,
        new_size: u64,
        old_size: u64,
        replacing: bool,
    ) -> Result<()> {
        if new_size > self.opts.max_memory {
            return Err(CacheError::MemoryLimitExceeded(format!(
                "Entry of {new_size} bytes exceeds cache maximum of {} bytes",
                self.opts.max_memory
            )));
        }
        if self.opts.max_entries == 0 {
            return Err(CacheError::CacheFull(
                "Cache is configured with zero capacity".to_string(),
            ));
        }

        loop {
            let over_memory =
                self.stats.memory_usage + new_size > self.opts.max_memory + old_size;
            let over_entries = !replacing && self.entries.len() >= self.opts.max_entries;
            if !over_memory && !over_entries {
                return Ok(());
            }
            match self.lru.peek_oldest().cloned() {
                Some(victim) if victim == effective => {
                    // The key being replaced cannot evict itself; it is
                    // about to move to the head anyway
                    self.lru.touch(effective);
                }
                Some(victim) => {
                    self.remove_entry(&victim, Removal::Evicted);
                }
                None => {
                    return Err(CacheError::MemoryLimitExceeded(
                        "Cache cannot make room for new entry".to_string(),
                    ));
                }
            }
        }
    }

    /// Removes an entry and all bookkeeping attached to it.
    fn remove_entry(&mut self, key: &str, reason: Removal) {
        let Some(entry) = self.entries.remove(key) else {
            return;
        };
        self.stats.sub_memory(entry.size);
        self.lru.remove(key);
        self.detach_from_graph(key, &entry);
        match reason {
            Removal::Expired => self.stats.record_expired(),
            Removal::Evicted => self.stats.record_eviction(),
            Removal::Invalidated | Removal::Explicit => {}
        }
        self.stats.set_total_entries(self.entries.len());
    }

    /// Drops `key` from the dependent sets of the entry's watched paths.
    fn detach_from_graph(&mut self, key: &str, entry: &CacheEntry) {
        for path in entry.source_file.iter().chain(entry.dependencies.iter()) {
            if let Some(set) = self.dependency_graph.get_mut(path) {
                set.remove(key);
                if set.is_empty() {
                    self.dependency_graph.remove(path);
                }
            }
        }
    }
}

// == Utility Functions ==
/// Short hex fingerprint of a value's JSON encoding.
fn content_hash(value: &Value) -> String {
    let encoded = serde_json::to_vec(value).unwrap_or_default();
    let digest = Sha256::digest(&encoded);
    hex::encode(&digest[..8])
}

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
