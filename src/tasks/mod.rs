//! Background Tasks Module
//!
//! Contains background tasks that run periodically during server
//! operation.
//!
//! # Tasks
//! - TTL Cleanup / GC: Removes expired cache entries at configured
//!   intervals and paces the pressure-driven garbage collector
//! - Stats: Recalibrates memory accounting and refreshes the pressure
//!   level

mod cleanup;
mod stats;

pub use cleanup::spawn_cleanup_task;
pub use stats::spawn_stats_task;
