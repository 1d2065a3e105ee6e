//! Configuration Module
//!
//! Handles loading and managing server configuration from environment
//! variables, and building the engine options from a validated record.

use std::collections::HashSet;
use std::env;
use std::sync::Arc;
use std::time::Duration;

use regex::Regex;

use crate::cache::{
    AccessController, CacheEngine, EngineOptions, Operation, SizeEstimator, StoreOptions,
    SystemClock, ValueEncryptor,
};
use crate::error::{CacheError, Result};

// == Config ==
/// Server configuration parameters.
///
/// All values can be configured via environment variables with sensible
/// defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Maximum number of entries the cache can hold
    pub max_entries: usize,
    /// Maximum total byte usage
    pub max_memory: u64,
    /// Default TTL in seconds for entries without explicit TTL
    pub default_ttl: u64,
    /// Cleanup/GC tick interval in milliseconds
    pub check_interval_ms: u64,
    /// Stats/recalibration tick interval in milliseconds
    pub stats_interval_ms: u64,
    /// Always use the precise size estimator
    pub precise_memory_calculation: bool,
    /// Store keys as `"<base>@<version>"` and resolve latest on read
    pub version_aware_mode: bool,
    /// Encrypt values whose key or content matches a sensitive pattern
    pub encryption_enabled: bool,
    /// 64-character hex cipher key; a random key is generated when
    /// encryption is enabled without one
    pub encryption_key: Option<String>,
    /// Extra sensitivity patterns on top of the built-in set
    pub sensitive_patterns: Vec<String>,
    /// Operations permitted at all (default: every operation)
    pub allowed_operations: Vec<String>,
    /// Exact keys denied to every operation
    pub restricted_keys: Vec<String>,
    /// Key regexes denied to every operation
    pub restricted_patterns: Vec<String>,
    /// Negative-cache TTL in seconds
    pub null_value_ttl: u64,
    /// File-watcher poll interval in milliseconds
    pub watch_poll_interval_ms: u64,
    /// HTTP server port
    pub server_port: u16,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `MAX_ENTRIES` - Maximum cache entries (default: 1000)
    /// - `MAX_MEMORY_BYTES` - Maximum byte usage (default: 100 MiB)
    /// - `DEFAULT_TTL` - Default TTL in seconds (default: 300)
    /// - `CHECK_INTERVAL_MS` - Cleanup/GC tick interval (default: 60000)
    /// - `STATS_INTERVAL_MS` - Stats tick interval (default: 1000)
    /// - `PRECISE_MEMORY_CALCULATION` - Always walk values (default: false)
    /// - `VERSION_AWARE_MODE` - Versioned keys (default: false)
    /// - `ENCRYPTION_ENABLED` - Encrypt sensitive values (default: false)
    /// - `ENCRYPTION_KEY` - 64-char hex cipher key (default: generated)
    /// - `SENSITIVE_PATTERNS` - Comma-separated extra patterns
    /// - `ALLOWED_OPERATIONS` - Comma-separated operation names
    /// - `RESTRICTED_KEYS` - Comma-separated denied keys
    /// - `RESTRICTED_PATTERNS` - Comma-separated denied key regexes
    /// - `NULL_VALUE_TTL` - Negative-cache TTL in seconds (default: 300)
    /// - `WATCH_POLL_INTERVAL_MS` - Watcher poll interval (default: 500)
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    pub fn from_env() -> Self {
        Self {
            max_entries: env_parse("MAX_ENTRIES", 1000),
            max_memory: env_parse("MAX_MEMORY_BYTES", 100 * 1024 * 1024),
            default_ttl: env_parse("DEFAULT_TTL", 300),
            check_interval_ms: env_parse("CHECK_INTERVAL_MS", 60_000),
            stats_interval_ms: env_parse("STATS_INTERVAL_MS", 1_000),
            precise_memory_calculation: env_flag("PRECISE_MEMORY_CALCULATION"),
            version_aware_mode: env_flag("VERSION_AWARE_MODE"),
            encryption_enabled: env_flag("ENCRYPTION_ENABLED"),
            encryption_key: env::var("ENCRYPTION_KEY").ok().filter(|k| !k.is_empty()),
            sensitive_patterns: env_list("SENSITIVE_PATTERNS"),
            allowed_operations: env_list("ALLOWED_OPERATIONS"),
            restricted_keys: env_list("RESTRICTED_KEYS"),
            restricted_patterns: env_list("RESTRICTED_PATTERNS"),
            null_value_ttl: env_parse("NULL_VALUE_TTL", 300),
            watch_poll_interval_ms: env_parse("WATCH_POLL_INTERVAL_MS", 500),
            server_port: env_parse("SERVER_PORT", 3000),
        }
    }

    // == Validation ==
    /// Checks the record for values the engine cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.max_entries == 0 {
            return Err(CacheError::ConfigurationError(
                "MAX_ENTRIES must be at least 1".to_string(),
            ));
        }
        if self.max_memory == 0 {
            return Err(CacheError::ConfigurationError(
                "MAX_MEMORY_BYTES must be at least 1".to_string(),
            ));
        }
        if self.default_ttl == 0 {
            return Err(CacheError::ConfigurationError(
                "DEFAULT_TTL must be at least 1 second".to_string(),
            ));
        }
        if let Some(key) = &self.encryption_key {
            if key.len() != 64 || hex::decode(key).is_err() {
                return Err(CacheError::ConfigurationError(
                    "ENCRYPTION_KEY must be 64 hex characters".to_string(),
                ));
            }
        }
        for op in &self.allowed_operations {
            if Operation::parse(op).is_none() {
                return Err(CacheError::ConfigurationError(format!(
                    "Unknown operation '{op}' in ALLOWED_OPERATIONS"
                )));
            }
        }
        for pattern in &self.restricted_patterns {
            if let Err(e) = Regex::new(pattern) {
                return Err(CacheError::ConfigurationError(format!(
                    "Invalid pattern '{pattern}': {e}"
                )));
            }
        }
        Ok(())
    }

    // == Engine Construction ==
    /// Builds the engine options from a validated record.
    pub fn build_engine_options(&self) -> Result<EngineOptions> {
        self.validate()?;

        let allowed: HashSet<Operation> = if self.allowed_operations.is_empty() {
            Operation::ALL.into_iter().collect()
        } else {
            self.allowed_operations
                .iter()
                .filter_map(|op| Operation::parse(op))
                .collect()
        };
        let restricted_keys: HashSet<String> = self.restricted_keys.iter().cloned().collect();
        let restricted_patterns: Vec<Regex> = self
            .restricted_patterns
            .iter()
            .map(|p| Regex::new(p).expect("patterns checked by validate"))
            .collect();

        let encryptor = if self.encryption_enabled {
            Some(match &self.encryption_key {
                Some(hex_key) => {
                    ValueEncryptor::from_hex_key(hex_key, &self.sensitive_patterns)?
                }
                None => ValueEncryptor::new(
                    &ValueEncryptor::generate_key(),
                    &self.sensitive_patterns,
                )?,
            })
        } else {
            None
        };

        Ok(EngineOptions {
            store: StoreOptions {
                max_entries: self.max_entries,
                max_memory: self.max_memory,
                default_ttl: self.default_ttl,
                version_aware: self.version_aware_mode,
                clock: Arc::new(SystemClock),
                estimator: SizeEstimator::new(self.precise_memory_calculation),
                encryptor,
                access: AccessController::new(allowed, restricted_keys, restricted_patterns),
            },
            null_value_ttl_ms: self.null_value_ttl * 1000,
            watch_poll_interval: Duration::from_millis(self.watch_poll_interval_ms),
            ..EngineOptions::default()
        })
    }

    /// Builds a ready engine from a validated record.
    pub fn build_engine(&self) -> Result<CacheEngine> {
        Ok(CacheEngine::new(self.build_engine_options()?))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_entries: 1000,
            max_memory: 100 * 1024 * 1024,
            default_ttl: 300,
            check_interval_ms: 60_000,
            stats_interval_ms: 1_000,
            precise_memory_calculation: false,
            version_aware_mode: false,
            encryption_enabled: false,
            encryption_key: None,
            sensitive_patterns: Vec::new(),
            allowed_operations: Vec::new(),
            restricted_keys: Vec::new(),
            restricted_patterns: Vec::new(),
            null_value_ttl: 300,
            watch_poll_interval_ms: 500,
            server_port: 3000,
        }
    }
}

// == Env Helpers ==
fn env_parse<T: std::str::FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_flag(name: &str) -> bool {
    matches!(
        env::var(name).unwrap_or_default().to_lowercase().as_str(),
        "1" | "true" | "yes"
    )
}

fn env_list(name: &str) -> Vec<String> {
    env::var(name)
        .unwrap_or_default()
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.max_entries, 1000);
        assert_eq!(config.max_memory, 100 * 1024 * 1024);
        assert_eq!(config.default_ttl, 300);
        assert_eq!(config.check_interval_ms, 60_000);
        assert_eq!(config.stats_interval_ms, 1_000);
        assert_eq!(config.null_value_ttl, 300);
        assert_eq!(config.server_port, 3000);
        assert!(!config.version_aware_mode);
        assert!(!config.encryption_enabled);
    }

    #[test]
    fn test_config_default_validates() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_config_rejects_zero_limits() {
        let config = Config {
            max_entries: 0,
            ..Config::default()
        };
        assert!(matches!(
            config.validate(),
            Err(CacheError::ConfigurationError(_))
        ));

        let config = Config {
            max_memory: 0,
            ..Config::default()
        };
        assert!(config.validate().is_err());

        let config = Config {
            default_ttl: 0,
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_rejects_bad_cipher_key() {
        let config = Config {
            encryption_enabled: true,
            encryption_key: Some("not-hex".to_string()),
            ..Config::default()
        };
        assert!(matches!(
            config.validate(),
            Err(CacheError::ConfigurationError(_))
        ));

        let config = Config {
            encryption_enabled: true,
            encryption_key: Some("ab".repeat(32)),
            ..Config::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_rejects_unknown_operation() {
        let config = Config {
            allowed_operations: vec!["get".to_string(), "drop".to_string()],
            ..Config::default()
        };
        assert!(matches!(
            config.validate(),
            Err(CacheError::ConfigurationError(_))
        ));
    }

    #[test]
    fn test_config_rejects_invalid_pattern() {
        let config = Config {
            restricted_patterns: vec!["[unclosed".to_string()],
            ..Config::default()
        };
        assert!(matches!(
            config.validate(),
            Err(CacheError::ConfigurationError(_))
        ));
    }

    #[test]
    fn test_build_engine_options() {
        let config = Config {
            version_aware_mode: true,
            encryption_enabled: true,
            null_value_ttl: 60,
            ..Config::default()
        };

        let opts = config.build_engine_options().unwrap();
        assert!(opts.store.version_aware);
        assert!(opts.store.encryptor.is_some());
        assert_eq!(opts.null_value_ttl_ms, 60_000);
    }
}
