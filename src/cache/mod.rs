//! Cache Module
//!
//! Provides in-memory caching with TTL expiration, LRU eviction,
//! version-aware invalidation, opportunistic encryption, and a
//! memory-pressure-driven garbage collector.

mod access;
mod clock;
mod crypto;
mod engine;
mod entry;
mod estimator;
mod flight;
mod keys;
mod lru;
mod nullcache;
mod pressure;
mod stats;
mod store;
mod watcher;

#[cfg(test)]
mod property_tests;

// Re-export public types
pub use access::{AccessController, Operation};
pub use clock::{Clock, ManualClock, SystemClock};
pub use crypto::{CipherRecord, ValueEncryptor, BUILTIN_SENSITIVE_PATTERNS};
pub use engine::{CacheEngine, EngineOptions, DEFAULT_NULL_VALUE_TTL_MS, ERROR_NULL_VALUE_TTL_MS};
pub use entry::{CacheEntry, StoredValue};
pub use estimator::{SizeEstimate, SizeEstimator, DEFAULT_MAX_SIZE_FOR_PRECISE};
pub use flight::{FlightRegistry, LoadOutcome};
pub use keys::{base_key, effective_key, is_version_of, split_versioned, VERSION_SEPARATOR};
pub use lru::LruTracker;
pub use nullcache::NullValueCache;
pub use pressure::{GcReport, PressureLevel, PressureThresholds};
pub use stats::CacheStats;
pub use store::{
    BatchDeleteOutcome, BatchGetOutcome, BatchSetOutcome, CacheStore, GetOptions, SetManyItem,
    SetOptions, StoreOptions,
};
pub use watcher::{WatcherRegistry, DEFAULT_POLL_INTERVAL};

// == Public Constants ==
/// Maximum allowed key length in bytes
pub const MAX_KEY_LENGTH: usize = 256;
