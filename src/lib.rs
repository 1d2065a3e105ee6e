//! memvault - An in-process key/value cache engine
//!
//! Provides bounded caching with LRU eviction, TTL expiration,
//! version-aware invalidation, opportunistic encryption of sensitive
//! values, single-flight loading with negative caching, and a
//! memory-pressure-driven garbage collector, fronted by an HTTP API.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod tasks;

pub use api::AppState;
pub use cache::CacheEngine;
pub use config::Config;
pub use tasks::{spawn_cleanup_task, spawn_stats_task};
