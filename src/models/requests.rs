//! Request DTOs for the cache server API
//!
//! Defines the structure of incoming HTTP request bodies and query
//! parameters.

use std::path::PathBuf;

use serde::Deserialize;
use serde_json::Value;

use crate::cache::{GetOptions, SetManyItem, SetOptions, MAX_KEY_LENGTH};

/// Request body for the SET operation (PUT /set)
///
/// # Fields
/// - `key`: The cache key to store the value under
/// - `value`: The value to store (any JSON)
/// - `ttl`: Optional TTL in seconds (uses default if not specified)
/// - `version`: Optional version tag (version-aware mode)
/// - `dependencies`: Optional file paths that invalidate the entry
/// - `source_file`: Optional primary producing file
#[derive(Debug, Clone, Deserialize)]
pub struct SetRequest {
    /// The cache key
    pub key: String,
    /// The value to store
    pub value: Value,
    /// Optional TTL in seconds
    #[serde(default)]
    pub ttl: Option<u64>,
    /// Optional version tag
    #[serde(default)]
    pub version: Option<String>,
    /// Optional dependency paths
    #[serde(default)]
    pub dependencies: Vec<String>,
    /// Optional source file path
    #[serde(default)]
    pub source_file: Option<String>,
}

impl SetRequest {
    /// Validates the request data.
    ///
    /// Returns an error message if validation fails, None if valid.
    pub fn validate(&self) -> Option<String> {
        if self.key.is_empty() {
            return Some("Key cannot be empty".to_string());
        }
        if self.key.len() > MAX_KEY_LENGTH {
            return Some(format!(
                "Key exceeds maximum length of {MAX_KEY_LENGTH} characters"
            ));
        }
        if self.ttl == Some(0) {
            return Some("TTL must be at least 1 second".to_string());
        }
        None
    }

    /// Converts the request's metadata fields into engine set options.
    pub fn to_options(&self) -> SetOptions {
        SetOptions {
            version: self.version.clone(),
            dependencies: self.dependencies.iter().map(PathBuf::from).collect(),
            source_file: self.source_file.as_ref().map(PathBuf::from),
        }
    }

    /// Converts the request into one batch item.
    pub fn into_item(self) -> SetManyItem {
        let options = self.to_options();
        SetManyItem {
            key: self.key,
            value: self.value,
            ttl_seconds: self.ttl,
            options,
        }
    }
}

/// Query parameters for the GET operation (GET /get/:key)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GetQuery {
    /// Look up this exact version instead of the latest
    #[serde(default)]
    pub version: Option<String>,
    /// Override the dependency-validation default
    #[serde(default)]
    pub validate_dependencies: Option<bool>,
}

impl GetQuery {
    pub fn to_options(&self) -> GetOptions {
        GetOptions {
            version: self.version.clone(),
            validate_dependencies: self.validate_dependencies,
        }
    }
}

/// Request body for the batch SET operation (POST /batch/set)
#[derive(Debug, Clone, Deserialize)]
pub struct SetManyRequest {
    pub items: Vec<SetRequest>,
}

/// Request body for the batch GET operation (POST /batch/get)
#[derive(Debug, Clone, Deserialize)]
pub struct GetManyRequest {
    pub keys: Vec<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub validate_dependencies: Option<bool>,
}

impl GetManyRequest {
    pub fn to_options(&self) -> GetOptions {
        GetOptions {
            version: self.version.clone(),
            validate_dependencies: self.validate_dependencies,
        }
    }
}

/// Request body for the batch DELETE operation (POST /batch/delete)
#[derive(Debug, Clone, Deserialize)]
pub struct DeleteManyRequest {
    pub keys: Vec<String>,
}

/// Request body for the GC operation (POST /gc)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GcRequest {
    /// Force the eviction phases regardless of pressure
    #[serde(default)]
    pub aggressive: bool,
}

/// Request body for watcher setup/teardown (PUT/DELETE /watch)
#[derive(Debug, Clone, Deserialize)]
pub struct WatchRequest {
    /// File path to watch
    pub path: String,
    /// Optional cache key to invalidate when the path changes
    #[serde(default)]
    pub key: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_set_request_deserialize() {
        let json = r#"{"key": "test", "value": "hello"}"#;
        let req: SetRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.key, "test");
        assert_eq!(req.value, json!("hello"));
        assert!(req.ttl.is_none());
        assert!(req.dependencies.is_empty());
    }

    #[test]
    fn test_set_request_with_metadata() {
        let json = r#"{
            "key": "doc",
            "value": {"body": "text"},
            "ttl": 60,
            "version": "7",
            "dependencies": ["dep.txt"],
            "source_file": "f.txt"
        }"#;
        let req: SetRequest = serde_json::from_str(json).unwrap();

        assert_eq!(req.ttl, Some(60));
        let options = req.to_options();
        assert_eq!(options.version.as_deref(), Some("7"));
        assert_eq!(options.dependencies, vec![PathBuf::from("dep.txt")]);
        assert_eq!(options.source_file, Some(PathBuf::from("f.txt")));
    }

    #[test]
    fn test_validate_empty_key() {
        let req = SetRequest {
            key: "".to_string(),
            value: json!("test"),
            ttl: None,
            version: None,
            dependencies: Vec::new(),
            source_file: None,
        };
        assert!(req.validate().is_some());
    }

    #[test]
    fn test_validate_zero_ttl() {
        let req = SetRequest {
            key: "k".to_string(),
            value: json!(1),
            ttl: Some(0),
            version: None,
            dependencies: Vec::new(),
            source_file: None,
        };
        assert!(req.validate().is_some());
    }

    #[test]
    fn test_validate_valid_request() {
        let req = SetRequest {
            key: "valid_key".to_string(),
            value: json!({"nested": true}),
            ttl: Some(60),
            version: None,
            dependencies: Vec::new(),
            source_file: None,
        };
        assert!(req.validate().is_none());
    }

    #[test]
    fn test_get_query_defaults() {
        let query: GetQuery = serde_json::from_str("{}").unwrap();
        let options = query.to_options();
        assert!(options.version.is_none());
        assert!(options.validate_dependencies.is_none());
    }

    #[test]
    fn test_gc_request_default_not_aggressive() {
        let req: GcRequest = serde_json::from_str("{}").unwrap();
        assert!(!req.aggressive);
    }
}
