//! Response DTOs for the cache server API
//!
//! Defines the structure of outgoing HTTP response bodies.

use serde::Serialize;
use serde_json::Value;

use crate::cache::{
    BatchDeleteOutcome, BatchGetOutcome, BatchSetOutcome, CacheStats, GcReport, PressureLevel,
};

/// Response body for the GET operation (GET /get/:key)
#[derive(Debug, Clone, Serialize)]
pub struct GetResponse {
    /// The requested key
    pub key: String,
    /// The stored value
    pub value: Value,
}

impl GetResponse {
    /// Creates a new GetResponse
    pub fn new(key: impl Into<String>, value: Value) -> Self {
        Self {
            key: key.into(),
            value,
        }
    }
}

/// Response body for the SET operation (PUT /set)
#[derive(Debug, Clone, Serialize)]
pub struct SetResponse {
    /// Success message
    pub message: String,
    /// The key that was set
    pub key: String,
}

impl SetResponse {
    /// Creates a new SetResponse
    pub fn new(key: impl Into<String>) -> Self {
        let key = key.into();
        Self {
            message: format!("Key '{}' set successfully", key),
            key,
        }
    }
}

/// Response body for the DELETE operation (DELETE /del/:key)
#[derive(Debug, Clone, Serialize)]
pub struct DeleteResponse {
    /// Success message
    pub message: String,
    /// The key that was deleted
    pub key: String,
    /// Whether an entry was actually removed
    pub deleted: bool,
}

impl DeleteResponse {
    /// Creates a new DeleteResponse
    pub fn new(key: impl Into<String>, deleted: bool) -> Self {
        let key = key.into();
        let message = if deleted {
            format!("Key '{}' deleted successfully", key)
        } else {
            format!("Key '{}' was not present", key)
        };
        Self {
            message,
            key,
            deleted,
        }
    }
}

/// Response body for the CLEAR operation (POST /clear)
#[derive(Debug, Clone, Serialize)]
pub struct ClearResponse {
    pub message: String,
}

impl ClearResponse {
    pub fn new() -> Self {
        Self {
            message: "Cache cleared".to_string(),
        }
    }
}

impl Default for ClearResponse {
    fn default() -> Self {
        Self::new()
    }
}

/// Response body for the stats endpoint (GET /stats)
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    /// Number of cache hits
    pub hits: u64,
    /// Number of cache misses
    pub misses: u64,
    /// Number of evictions
    pub evictions: u64,
    /// Number of TTL removals
    pub expired_removals: u64,
    /// Current number of entries in cache
    pub total_entries: usize,
    /// Current byte usage
    pub memory_usage: u64,
    /// Hit rate (hits / (hits + misses))
    pub hit_rate: f64,
    /// Moving-average get latency in microseconds
    pub avg_access_time_us: f64,
    /// Current memory pressure level
    pub pressure: PressureLevel,
}

impl StatsResponse {
    /// Creates a new StatsResponse from a stats snapshot.
    pub fn new(stats: &CacheStats, pressure: PressureLevel) -> Self {
        Self {
            hits: stats.hits,
            misses: stats.misses,
            evictions: stats.evictions,
            expired_removals: stats.expired_removals,
            total_entries: stats.total_entries,
            memory_usage: stats.memory_usage,
            hit_rate: stats.hit_rate(),
            avg_access_time_us: stats.avg_access_time_us,
            pressure,
        }
    }
}

/// Response body for the GC endpoint (POST /gc)
#[derive(Debug, Clone, Serialize)]
pub struct GcResponse {
    pub freed_bytes: u64,
    pub duration_ms: u64,
    pub entries_removed: usize,
}

impl From<GcReport> for GcResponse {
    fn from(report: GcReport) -> Self {
        Self {
            freed_bytes: report.freed_bytes,
            duration_ms: report.duration_ms,
            entries_removed: report.entries_removed,
        }
    }
}

/// One failed item of a batch SET
#[derive(Debug, Clone, Serialize)]
pub struct FailedItem {
    pub key: String,
    pub reason: String,
}

/// Response body for the batch SET operation (POST /batch/set)
#[derive(Debug, Clone, Serialize)]
pub struct BatchSetResponse {
    pub success: Vec<String>,
    pub failed: Vec<FailedItem>,
}

impl From<BatchSetOutcome> for BatchSetResponse {
    fn from(outcome: BatchSetOutcome) -> Self {
        Self {
            success: outcome.success,
            failed: outcome
                .failed
                .into_iter()
                .map(|(key, reason)| FailedItem { key, reason })
                .collect(),
        }
    }
}

/// One found item of a batch GET
#[derive(Debug, Clone, Serialize)]
pub struct FoundItem {
    pub key: String,
    pub value: Value,
}

/// Response body for the batch GET operation (POST /batch/get)
#[derive(Debug, Clone, Serialize)]
pub struct BatchGetResponse {
    pub found: Vec<FoundItem>,
    pub missing: Vec<String>,
}

impl From<BatchGetOutcome> for BatchGetResponse {
    fn from(outcome: BatchGetOutcome) -> Self {
        Self {
            found: outcome
                .found
                .into_iter()
                .map(|(key, value)| FoundItem { key, value })
                .collect(),
            missing: outcome.missing,
        }
    }
}

/// Response body for the batch DELETE operation (POST /batch/delete)
#[derive(Debug, Clone, Serialize)]
pub struct BatchDeleteResponse {
    pub success: Vec<String>,
    pub failed: Vec<String>,
}

impl From<BatchDeleteOutcome> for BatchDeleteResponse {
    fn from(outcome: BatchDeleteOutcome) -> Self {
        Self {
            success: outcome.success,
            failed: outcome.failed,
        }
    }
}

/// Response body for the TTL inspection endpoint (GET /ttl/:key)
#[derive(Debug, Clone, Serialize)]
pub struct TtlResponse {
    pub key: String,
    /// Remaining time to live in milliseconds
    pub ttl_remaining_ms: u64,
}

impl TtlResponse {
    pub fn new(key: impl Into<String>, ttl_remaining_ms: u64) -> Self {
        Self {
            key: key.into(),
            ttl_remaining_ms,
        }
    }
}

/// Response body for watcher operations (PUT/DELETE /watch)
#[derive(Debug, Clone, Serialize)]
pub struct WatchResponse {
    pub message: String,
    pub changed: bool,
}

impl WatchResponse {
    pub fn new(message: impl Into<String>, changed: bool) -> Self {
        Self {
            message: message.into(),
            changed,
        }
    }
}

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Error response body for all error conditions
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Error message describing what went wrong
    pub error: String,
}

impl ErrorResponse {
    /// Creates a new ErrorResponse
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}
