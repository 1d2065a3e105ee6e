//! Single-Flight Registry Module
//!
//! Coalesces concurrent loads of the same key onto one shared future.
//! The first caller registers the load; everyone else awaits the same
//! future and observes the same outcome.

use std::collections::HashMap;
use std::sync::Mutex;

use futures::future::{BoxFuture, Shared};
use futures::FutureExt;
use serde_json::Value;

use crate::error::CacheError;

// == Load Outcome ==
/// Result of one coalesced load, cloneable so every waiter gets a copy.
#[derive(Debug, Clone)]
pub enum LoadOutcome {
    /// The loader produced a value (already cached by the leader)
    Value(Value),
    /// The loader reported no value
    Absent,
    /// The loader failed
    Failed(CacheError),
}

/// Shared handle on an in-flight load.
pub type SharedLoad = Shared<BoxFuture<'static, LoadOutcome>>;

// == Flight Registry ==
/// Per-key in-flight loads. At most one future per key.
#[derive(Default)]
pub struct FlightRegistry {
    flights: Mutex<HashMap<String, SharedLoad>>,
}

impl std::fmt::Debug for FlightRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlightRegistry")
            .field("in_flight", &self.len())
            .finish()
    }
}

impl FlightRegistry {
    // == Constructor ==
    pub fn new() -> Self {
        Self::default()
    }

    // == Join or Register ==
    /// Returns the in-flight future for `key`, creating and registering
    /// one from `make` if none exists.
    ///
    /// The boolean is true when the caller's future was registered (the
    /// caller leads the load), false when it joined an existing flight.
    pub fn join_or_register<F>(&self, key: &str, make: F) -> (SharedLoad, bool)
    where
        F: FnOnce() -> BoxFuture<'static, LoadOutcome>,
    {
        let mut flights = self.flights.lock().expect("flight registry poisoned");
        if let Some(existing) = flights.get(key) {
            return (existing.clone(), false);
        }
        let shared = make().shared();
        flights.insert(key.to_string(), shared.clone());
        (shared, true)
    }

    // == Complete ==
    /// Drops the registered future for `key`. Idempotent; every waiter
    /// calls this after the flight lands.
    pub fn complete(&self, key: &str) {
        self.flights
            .lock()
            .expect("flight registry poisoned")
            .remove(key);
    }

    // == Introspection ==
    /// Whether `key` currently has a registered flight.
    pub fn contains(&self, key: &str) -> bool {
        self.flights
            .lock()
            .expect("flight registry poisoned")
            .contains_key(key)
    }

    /// Number of keys with a registered flight.
    pub fn len(&self) -> usize {
        self.flights.lock().expect("flight registry poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // == Clear ==
    /// Drops every registered flight; waiters already holding a shared
    /// handle still resolve.
    pub fn clear(&self) {
        self.flights
            .lock()
            .expect("flight registry poisoned")
            .clear();
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn load_future(counter: Arc<AtomicUsize>) -> BoxFuture<'static, LoadOutcome> {
        async move {
            counter.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
            LoadOutcome::Value(json!(42))
        }
        .boxed()
    }

    #[tokio::test]
    async fn test_second_caller_joins_existing_flight() {
        let registry = FlightRegistry::new();
        let counter = Arc::new(AtomicUsize::new(0));

        let (first, led_first) = {
            let counter = counter.clone();
            registry.join_or_register("k", move || load_future(counter))
        };
        let (second, led_second) = {
            let counter = counter.clone();
            registry.join_or_register("k", move || load_future(counter))
        };

        assert!(led_first);
        assert!(!led_second);
        assert_eq!(registry.len(), 1);

        let (a, b) = tokio::join!(first, second);
        assert!(matches!(a, LoadOutcome::Value(_)));
        assert!(matches!(b, LoadOutcome::Value(_)));
        // Only the registered future ever ran
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_distinct_keys_fly_separately() {
        let registry = FlightRegistry::new();
        let counter = Arc::new(AtomicUsize::new(0));

        let c1 = counter.clone();
        let c2 = counter.clone();
        let (a, _) = registry.join_or_register("a", move || load_future(c1));
        let (b, _) = registry.join_or_register("b", move || load_future(c2));

        tokio::join!(a, b);
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_complete_clears_the_slot() {
        let registry = FlightRegistry::new();
        let counter = Arc::new(AtomicUsize::new(0));

        let c = counter.clone();
        let (flight, _) = registry.join_or_register("k", move || load_future(c));
        flight.await;
        registry.complete("k");
        registry.complete("k"); // idempotent

        assert!(!registry.contains("k"));

        // A fresh registration runs a fresh load
        let c = counter.clone();
        let (flight, led) = registry.join_or_register("k", move || load_future(c));
        assert!(led);
        flight.await;
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_failed_outcome_is_shared() {
        let registry = FlightRegistry::new();

        let (first, _) = registry.join_or_register("k", || {
            async { LoadOutcome::Failed(CacheError::Unknown("loader exploded".into())) }.boxed()
        });
        let (second, _) = registry.join_or_register("k", || unreachable!());

        let (a, b) = tokio::join!(first, second);
        assert!(matches!(a, LoadOutcome::Failed(_)));
        assert!(matches!(b, LoadOutcome::Failed(_)));
    }
}
