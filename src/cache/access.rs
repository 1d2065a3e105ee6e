//! Access Control Module
//!
//! Per-operation, per-key access decisions: an allowed-operations set, a
//! restricted-key set, and restricted key patterns.

use std::collections::HashSet;

use regex::Regex;

use crate::error::{CacheError, Result};

// == Operation ==
/// Cache operations subject to access control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Get,
    Set,
    Delete,
    Clear,
}

impl Operation {
    /// All operations, used as the default allow set.
    pub const ALL: [Operation; 4] = [
        Operation::Get,
        Operation::Set,
        Operation::Delete,
        Operation::Clear,
    ];

    /// Stable lowercase name used in configuration and error messages.
    pub fn name(&self) -> &'static str {
        match self {
            Operation::Get => "get",
            Operation::Set => "set",
            Operation::Delete => "delete",
            Operation::Clear => "clear",
        }
    }

    /// Parses an operation from its configuration name.
    pub fn parse(name: &str) -> Option<Operation> {
        match name.trim().to_lowercase().as_str() {
            "get" => Some(Operation::Get),
            "set" => Some(Operation::Set),
            "delete" => Some(Operation::Delete),
            "clear" => Some(Operation::Clear),
            _ => None,
        }
    }
}

// == Access Controller ==
/// Answers "is this operation allowed on this key".
#[derive(Debug, Default)]
pub struct AccessController {
    allowed_operations: HashSet<Operation>,
    restricted_keys: HashSet<String>,
    restricted_patterns: Vec<Regex>,
}

impl AccessController {
    // == Constructor ==
    /// Creates a controller.
    ///
    /// # Arguments
    /// * `allowed_operations` - Operations permitted at all
    /// * `restricted_keys` - Exact keys denied to every operation
    /// * `restricted_patterns` - Key patterns denied to every operation
    pub fn new(
        allowed_operations: HashSet<Operation>,
        restricted_keys: HashSet<String>,
        restricted_patterns: Vec<Regex>,
    ) -> Self {
        Self {
            allowed_operations,
            restricted_keys,
            restricted_patterns,
        }
    }

    /// Controller that allows everything; used when no access control is
    /// configured.
    pub fn allow_all() -> Self {
        Self {
            allowed_operations: Operation::ALL.into_iter().collect(),
            restricted_keys: HashSet::new(),
            restricted_patterns: Vec::new(),
        }
    }

    // == Check ==
    /// Returns Ok(()) when the operation is allowed on the key, and
    /// `AccessDenied` otherwise.
    ///
    /// Key-less operations (clear) pass an empty key; restriction sets
    /// only apply to keyed operations.
    pub fn check(&self, operation: Operation, key: &str) -> Result<()> {
        if !self.allowed_operations.contains(&operation) {
            return Err(CacheError::AccessDenied(format!(
                "Operation '{}' is not allowed",
                operation.name()
            )));
        }
        if !key.is_empty() {
            if self.restricted_keys.contains(key) {
                return Err(CacheError::AccessDenied(format!(
                    "Key '{key}' is restricted"
                )));
            }
            if let Some(pattern) = self.restricted_patterns.iter().find(|p| p.is_match(key)) {
                return Err(CacheError::AccessDenied(format!(
                    "Key '{key}' matches restricted pattern '{pattern}'"
                )));
            }
        }
        Ok(())
    }
}
