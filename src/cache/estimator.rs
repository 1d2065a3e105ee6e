//! Size Estimator Module
//!
//! Computes a byte size for (key, value) pairs used in memory accounting.
//!
//! Two strategies share one result shape: a fast flat approximation based
//! on encoding length, and a precise recursive walk of the value tree.
//! Adaptive selection runs fast first and upgrades to precise only for
//! small values, where the extra walk is cheap.

use serde_json::Value;

// == Constants ==
/// Fixed per-entry metadata overhead in bytes.
pub const METADATA_OVERHEAD: u64 = 32;

/// Fallback size when a composite value cannot be encoded.
const UNENCODABLE_FALLBACK: u64 = 1024;

/// Default ceiling above which the adaptive strategy keeps the fast
/// estimate instead of walking the value.
pub const DEFAULT_MAX_SIZE_FOR_PRECISE: u64 = 10 * 1024;

// == Size Estimate ==
/// Byte-size breakdown for a (key, value) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizeEstimate {
    /// Bytes attributed to the key
    pub key_bytes: u64,
    /// Bytes attributed to the value
    pub value_bytes: u64,
    /// Fixed metadata overhead
    pub overhead: u64,
    /// Total accountable size
    pub total: u64,
}

impl SizeEstimate {
    fn new(key_bytes: u64, value_bytes: u64) -> Self {
        Self {
            key_bytes,
            value_bytes,
            overhead: METADATA_OVERHEAD,
            total: key_bytes + value_bytes + METADATA_OVERHEAD,
        }
    }
}

// == Size Estimator ==
/// Adaptive (key, value) size estimator.
#[derive(Debug, Clone)]
pub struct SizeEstimator {
    /// Always use the precise walk, regardless of value size
    precise: bool,
    /// Fast-estimate ceiling above which precise mode is skipped
    max_size_for_precise: u64,
}

impl Default for SizeEstimator {
    fn default() -> Self {
        Self {
            precise: false,
            max_size_for_precise: DEFAULT_MAX_SIZE_FOR_PRECISE,
        }
    }
}

impl SizeEstimator {
    // == Constructor ==
    /// Creates an estimator.
    ///
    /// # Arguments
    /// * `precise` - When true, every estimate uses the recursive walk
    pub fn new(precise: bool) -> Self {
        Self {
            precise,
            ..Self::default()
        }
    }

    // == Estimate ==
    /// Estimates the accountable size of a (key, value) pair.
    ///
    /// Adaptive selection: precise mode if configured; otherwise run the
    /// fast estimate first and upgrade to the precise walk only when the
    /// fast value size stays under the ceiling.
    pub fn estimate(&self, key: &str, value: &Value) -> SizeEstimate {
        if self.precise {
            return self.estimate_precise(key, value);
        }
        let fast = self.estimate_fast(key, value);
        if fast.value_bytes > self.max_size_for_precise {
            return fast;
        }
        self.estimate_precise(key, value)
    }

    // == Raw Bytes ==
    /// Sizes an already-opaque payload (e.g. a cipher record) where only
    /// the byte length is known.
    pub fn estimate_raw(&self, key: &str, payload_len: u64) -> SizeEstimate {
        SizeEstimate::new(key.len() as u64 * 2, payload_len)
    }

    // == Fast Estimator ==
    /// Flat encoding-length approximation.
    ///
    /// Strings count two bytes per byte of content, scalars use fixed
    /// widths, and composites fall back to their JSON encoding length.
    pub fn estimate_fast(&self, key: &str, value: &Value) -> SizeEstimate {
        let key_bytes = key.len() as u64 * 2;
        let value_bytes = match value {
            Value::Null => 4,
            Value::Bool(_) => 4,
            Value::Number(_) => 8,
            Value::String(s) => s.len() as u64 * 2,
            composite => match serde_json::to_string(composite) {
                Ok(text) => text.len() as u64 * 2,
                Err(_) => UNENCODABLE_FALLBACK,
            },
        };
        SizeEstimate::new(key_bytes, value_bytes)
    }

    // == Precise Estimator ==
    /// Recursive structural walk of the value tree.
    ///
    /// Strings are charged their UTF-16 width (surrogate pairs count
    /// double), arrays a 24-byte header plus children, objects a 32-byte
    /// header plus per-property name, child, and slot costs.
    pub fn estimate_precise(&self, key: &str, value: &Value) -> SizeEstimate {
        let key_bytes = utf16_bytes(key);
        let value_bytes = walk(value);
        SizeEstimate::new(key_bytes, value_bytes)
    }
}

/// Recursively sizes a single value node.
fn walk(value: &Value) -> u64 {
    match value {
        Value::Null => 4,
        Value::Bool(_) => 4,
        Value::Number(_) => 8,
        Value::String(s) => utf16_bytes(s),
        Value::Array(items) => 24 + items.iter().map(walk).sum::<u64>(),
        Value::Object(map) => {
            32 + map
                .iter()
                .map(|(name, child)| utf16_bytes(name) + walk(child) + 16)
                .sum::<u64>()
        }
    }
}

/// UTF-16 byte count of a string (code units x 2, surrogate pairs
/// counted as two units).
fn utf16_bytes(s: &str) -> u64 {
    s.encode_utf16().count() as u64 * 2
}
