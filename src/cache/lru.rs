//! LRU Tracker Module
//!
//! Implements Least Recently Used tracking for cache eviction.
//!
//! Keys are held in a doubly-linked list threaded through a HashMap:
//! - Head = Most recently used
//! - Tail = Least recently used
//!
//! All operations (touch, remove, evict) are O(1).

use std::collections::HashMap;

// == Node ==
/// Intrusive list node: neighbor keys in recency order.
#[derive(Debug, Default, Clone)]
struct Node {
    /// Key on the more-recent side (towards head)
    prev: Option<String>,
    /// Key on the less-recent side (towards tail)
    next: Option<String>,
}

// == LRU Tracker ==
/// Tracks access order for LRU eviction strategy.
#[derive(Debug, Default)]
pub struct LruTracker {
    nodes: HashMap<String, Node>,
    head: Option<String>,
    tail: Option<String>,
}

impl LruTracker {
    // == Constructor ==
    /// Creates a new empty LRU tracker.
    pub fn new() -> Self {
        Self::default()
    }

    // == Touch ==
    /// Marks a key as recently used (moves to head).
    ///
    /// If the key exists it is unlinked first; either way it ends up at
    /// the head of the list.
    pub fn touch(&mut self, key: &str) {
        if self.head.as_deref() == Some(key) {
            return;
        }
        self.unlink(key);
        self.push_head(key.to_string());
    }

    // == Remove ==
    /// Removes a key from the tracker. No-op if the key is untracked.
    pub fn remove(&mut self, key: &str) {
        self.unlink(key);
        self.nodes.remove(key);
    }

    // == Evict Oldest ==
    /// Returns and removes the least recently used key.
    ///
    /// Returns None if the tracker is empty.
    pub fn evict_oldest(&mut self) -> Option<String> {
        let key = self.tail.clone()?;
        self.remove(&key);
        Some(key)
    }

    // == Peek Oldest ==
    /// Returns the least recently used key without removing it.
    pub fn peek_oldest(&self) -> Option<&String> {
        self.tail.as_ref()
    }

    // == Peek Newest ==
    /// Returns the most recently used key without removing it.
    pub fn peek_newest(&self) -> Option<&String> {
        self.head.as_ref()
    }

    // == Length ==
    /// Returns the number of tracked keys.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    // == Is Empty ==
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    // == Contains ==
    /// Checks if a key is being tracked.
    pub fn contains(&self, key: &str) -> bool {
        self.nodes.contains_key(key)
    }

    // == Clear ==
    /// Drops all tracked keys.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.head = None;
        self.tail = None;
    }

    // == Keys From Tail ==
    /// Returns all tracked keys ordered least-recent first.
    pub fn keys_from_tail(&self) -> Vec<String> {
        let mut out = Vec::with_capacity(self.nodes.len());
        let mut cursor = self.tail.clone();
        while let Some(key) = cursor {
            cursor = self.nodes.get(&key).and_then(|n| n.prev.clone());
            out.push(key);
        }
        out
    }

    // == Rebuild ==
    /// Replaces the list with the given keys, most-recent first.
    ///
    /// Used by the full GC pass to repair any bookkeeping drift.
    pub fn rebuild<I>(&mut self, keys_most_recent_first: I)
    where
        I: IntoIterator<Item = String>,
    {
        self.clear();
        let mut prev: Option<String> = None;
        for key in keys_most_recent_first {
            if self.nodes.contains_key(&key) {
                continue;
            }
            self.nodes.insert(
                key.clone(),
                Node {
                    prev: prev.clone(),
                    next: None,
                },
            );
            match prev {
                Some(ref p) => {
                    if let Some(node) = self.nodes.get_mut(p) {
                        node.next = Some(key.clone());
                    }
                }
                None => self.head = Some(key.clone()),
            }
            prev = Some(key);
        }
        self.tail = prev;
    }

    // == Internals ==
    /// Detaches a key from the list, patching neighbor links. The node
    /// entry itself stays in the map until `remove` drops it.
    fn unlink(&mut self, key: &str) {
        let Some(node) = self.nodes.get(key).cloned() else {
            return;
        };
        match node.prev {
            Some(ref prev) => {
                if let Some(p) = self.nodes.get_mut(prev) {
                    p.next = node.next.clone();
                }
            }
            None => self.head = node.next.clone(),
        }
        match node.next {
            Some(ref next) => {
                if let Some(n) = self.nodes.get_mut(next) {
                    n.prev = node.prev.clone();
                }
            }
            None => self.tail = node.prev.clone(),
        }
        if let Some(n) = self.nodes.get_mut(key) {
            n.prev = None;
            n.next = None;
        }
    }

    /// Links a key at the head of the list.
    fn push_head(&mut self, key: String) {
        let old_head = self.head.replace(key.clone());
        if let Some(ref h) = old_head {
            if let Some(node) = self.nodes.get_mut(h) {
                node.prev = Some(key.clone());
            }
        }
        self.nodes.insert(
            key.clone(),
            Node {
                prev: None,
                next: old_head,
            },
        );
        if self.tail.is_none() {
            self.tail = Some(key);
        }
    }
}
