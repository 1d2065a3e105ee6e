//! Memory Pressure Module
//!
//! Pressure-level state driving the garbage collector: usage thresholds,
//! per-level GC cool-downs, and the report returned by a GC cycle.

use serde::Serialize;

// == Pressure Level ==
/// Memory pressure buckets derived from the usage ratio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PressureLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl PressureLevel {
    /// Minimum pause between GC cycles at this pressure level, in
    /// milliseconds.
    pub fn gc_cooldown_ms(&self) -> u64 {
        match self {
            PressureLevel::Low => 120_000,
            PressureLevel::Medium => 30_000,
            PressureLevel::High => 15_000,
            PressureLevel::Critical => 5_000,
        }
    }
}

// == Thresholds ==
/// Usage-ratio boundaries between pressure levels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PressureThresholds {
    /// Usage at or below this ratio is Low pressure
    pub low: f64,
    /// ... at or below this ratio is Medium pressure
    pub medium: f64,
    /// ... at or below this ratio is High pressure
    pub high: f64,
    /// Above `high` is Critical; this value is kept for reporting
    pub critical: f64,
}

impl Default for PressureThresholds {
    fn default() -> Self {
        Self {
            low: 0.50,
            medium: 0.70,
            high: 0.85,
            critical: 0.95,
        }
    }
}

impl PressureThresholds {
    /// Classifies a usage ratio into a pressure level.
    pub fn level_for(&self, usage_ratio: f64) -> PressureLevel {
        if usage_ratio <= self.low {
            PressureLevel::Low
        } else if usage_ratio <= self.medium {
            PressureLevel::Medium
        } else if usage_ratio <= self.high {
            PressureLevel::High
        } else {
            PressureLevel::Critical
        }
    }

    /// Applies partial overrides, keeping the current value where the
    /// override is absent.
    pub fn merge(
        &mut self,
        low: Option<f64>,
        medium: Option<f64>,
        high: Option<f64>,
        critical: Option<f64>,
    ) {
        if let Some(v) = low {
            self.low = v;
        }
        if let Some(v) = medium {
            self.medium = v;
        }
        if let Some(v) = high {
            self.high = v;
        }
        if let Some(v) = critical {
            self.critical = v;
        }
    }
}

// == GC Pacing ==
/// A full GC cycle is forced once this much time has passed since the
/// last one, regardless of pressure.
pub const FULL_GC_INTERVAL_MS: u64 = 600_000;

/// Hot-key counters idle for this long are dropped during auxiliary
/// cleanup.
pub const HOT_KEY_IDLE_MS: u64 = 24 * 60 * 60 * 1000;

/// Fraction of current usage the smart-eviction phase tries to free.
pub const SMART_EVICTION_TARGET: f64 = 0.20;

/// Fraction of current usage the aggressive phase tries to free.
pub const AGGRESSIVE_EVICTION_TARGET: f64 = 0.40;

// == Eviction Weight ==
/// Smart-eviction weight for one entry; entries with the lowest weight
/// are evicted first.
///
/// Blends recency, access frequency, and inverse size:
/// `0.4 * time_recency + 0.4 * frequency + 0.2 * size_inverse`.
pub fn eviction_weight(now: u64, last_accessed: u64, access_count: u64, size: u64) -> f64 {
    let age_ms = now.saturating_sub(last_accessed) as f64;
    let time_recency = (1.0 - age_ms / 86_400_000.0).max(0.0);
    let frequency = ((access_count.saturating_add(1) as f64).ln() / 10.0).min(1.0);
    let size_inverse = (1.0 - size as f64 / 1_048_576.0).max(0.0);
    0.4 * time_recency + 0.4 * frequency + 0.2 * size_inverse
}

// == GC Report ==
/// Outcome of one GC cycle.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct GcReport {
    /// Bytes reclaimed
    pub freed_bytes: u64,
    /// Wall time the cycle took, in milliseconds
    pub duration_ms: u64,
    /// Entries removed (expired + evicted)
    pub entries_removed: usize,
}
