//! Error types for the cache engine and server
//!
//! Provides unified error handling using thiserror. Every kind carries a
//! stable numeric code grouped by family (1xxx input/configuration,
//! 2xxx capacity, 3xxx lifecycle, 4xxx versioning, 5xxx concurrency,
//! 6xxx security, 7xxx system).
//!
//! All payloads are plain strings so errors stay `Clone`; the
//! single-flight registry shares failure outcomes between coalesced
//! callers.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for the cache engine and server.
#[derive(Error, Debug, Clone)]
pub enum CacheError {
    /// Malformed key, value, or TTL
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Bad configuration record
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// Even after eviction, the new item will not fit in memory
    #[error("Memory limit exceeded: {0}")]
    MemoryLimitExceeded(String),

    /// Entry-count cap cannot be satisfied
    #[error("Cache full: {0}")]
    CacheFull(String),

    /// Key not found in cache
    #[error("Key not found: {0}")]
    KeyNotFound(String),

    /// Entry exists but its TTL has elapsed
    #[error("Entry expired: {0}")]
    EntryExpired(String),

    /// Conflicting version tag for a versioned write
    #[error("Version conflict: {0}")]
    VersionConflict(String),

    /// A registered dependency changed under the entry
    #[error("Dependency changed: {0}")]
    DependencyChanged(String),

    /// The engine mutex could not be acquired
    #[error("Lock acquisition failed: {0}")]
    LockAcquisitionFailed(String),

    /// Reserved; not expected under the mutex discipline
    #[error("Concurrent modification: {0}")]
    ConcurrentModification(String),

    /// Access control denied the operation
    #[error("Access denied: {0}")]
    AccessDenied(String),

    /// Encryption or decryption failed
    #[error("Encryption error: {0}")]
    EncryptionError(String),

    /// Watcher or stat failure
    #[error("File system error: {0}")]
    FileSystemError(String),

    /// An operation exceeded its deadline
    #[error("Timeout: {0}")]
    TimeoutError(String),

    /// Unexpected internal condition
    #[error("Internal error: {0}")]
    Unknown(String),
}

impl CacheError {
    // == Numeric Codes ==
    /// Stable numeric code, grouped by error family.
    pub fn code(&self) -> u16 {
        match self {
            CacheError::InvalidInput(_) => 1001,
            CacheError::ConfigurationError(_) => 1002,
            CacheError::MemoryLimitExceeded(_) => 2001,
            CacheError::CacheFull(_) => 2002,
            CacheError::KeyNotFound(_) => 3001,
            CacheError::EntryExpired(_) => 3002,
            CacheError::VersionConflict(_) => 4001,
            CacheError::DependencyChanged(_) => 4002,
            CacheError::LockAcquisitionFailed(_) => 5001,
            CacheError::ConcurrentModification(_) => 5002,
            CacheError::AccessDenied(_) => 6001,
            CacheError::EncryptionError(_) => 6002,
            CacheError::FileSystemError(_) => 7001,
            CacheError::TimeoutError(_) => 7002,
            CacheError::Unknown(_) => 7999,
        }
    }
}

// == IntoResponse Implementation ==
impl IntoResponse for CacheError {
    fn into_response(self) -> Response {
        let status = match &self {
            CacheError::InvalidInput(_) | CacheError::ConfigurationError(_) => {
                StatusCode::BAD_REQUEST
            }
            CacheError::MemoryLimitExceeded(_) | CacheError::CacheFull(_) => {
                StatusCode::INSUFFICIENT_STORAGE
            }
            CacheError::KeyNotFound(_) | CacheError::EntryExpired(_) => StatusCode::NOT_FOUND,
            CacheError::VersionConflict(_) | CacheError::ConcurrentModification(_) => {
                StatusCode::CONFLICT
            }
            CacheError::DependencyChanged(_) => StatusCode::GONE,
            CacheError::AccessDenied(_) => StatusCode::FORBIDDEN,
            CacheError::LockAcquisitionFailed(_) | CacheError::TimeoutError(_) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            CacheError::EncryptionError(_)
            | CacheError::FileSystemError(_)
            | CacheError::Unknown(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({
            "error": self.to_string(),
            "code": self.code(),
        }));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the cache engine and server.
pub type Result<T> = std::result::Result<T, CacheError>;

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_grouped_by_family() {
        assert_eq!(CacheError::InvalidInput("x".into()).code(), 1001);
        assert_eq!(CacheError::MemoryLimitExceeded("x".into()).code(), 2001);
        assert_eq!(CacheError::KeyNotFound("x".into()).code(), 3001);
        assert_eq!(CacheError::VersionConflict("x".into()).code(), 4001);
        assert_eq!(CacheError::LockAcquisitionFailed("x".into()).code(), 5001);
        assert_eq!(CacheError::AccessDenied("x".into()).code(), 6001);
        assert_eq!(CacheError::Unknown("x".into()).code(), 7999);
    }

    #[test]
    fn test_errors_are_cloneable() {
        let err = CacheError::AccessDenied("op".into());
        let copy = err.clone();
        assert_eq!(err.code(), copy.code());
        assert_eq!(err.to_string(), copy.to_string());
    }

    #[test]
    fn test_display_includes_context() {
        let err = CacheError::MemoryLimitExceeded("need 100 bytes".into());
        assert!(err.to_string().contains("need 100 bytes"));
    }
}
