//! API Handlers
//!
//! HTTP request handlers for each cache server endpoint.

use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Json,
};

use crate::cache::CacheEngine;
use crate::config::Config;
use crate::error::{CacheError, Result};
use crate::models::{
    BatchDeleteResponse, BatchGetResponse, BatchSetResponse, ClearResponse, DeleteManyRequest,
    DeleteResponse, GcRequest, GcResponse, GetManyRequest, GetQuery, GetResponse, HealthResponse,
    SetManyRequest, SetRequest, SetResponse, StatsResponse, TtlResponse, WatchRequest,
    WatchResponse,
};

/// Application state shared across all handlers.
///
/// Holds the cache engine; the engine serializes its own state, so the
/// state is cheaply cloneable.
#[derive(Clone)]
pub struct AppState {
    /// The shared cache engine
    pub engine: Arc<CacheEngine>,
}

impl AppState {
    /// Creates a new AppState around an engine.
    pub fn new(engine: CacheEngine) -> Self {
        Self {
            engine: Arc::new(engine),
        }
    }

    /// Creates a new AppState from configuration.
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self::new(config.build_engine()?))
    }
}

/// Handler for PUT /set
///
/// Stores a key-value pair in the cache with optional TTL and
/// version/dependency metadata.
pub async fn set_handler(
    State(state): State<AppState>,
    Json(req): Json<SetRequest>,
) -> Result<Json<SetResponse>> {
    // Validate request
    if let Some(error_msg) = req.validate() {
        return Err(CacheError::InvalidInput(error_msg));
    }

    let options = req.to_options();
    state
        .engine
        .set(&req.key, req.value, req.ttl, options)
        .await?;

    Ok(Json(SetResponse::new(req.key)))
}

/// Handler for GET /get/:key
///
/// Retrieves a value from the cache by key. Supports `version` and
/// `validate_dependencies` query parameters.
pub async fn get_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Query(query): Query<GetQuery>,
) -> Result<Json<GetResponse>> {
    match state.engine.get(&key, query.to_options()).await? {
        Some(value) => Ok(Json(GetResponse::new(key, value))),
        None => Err(CacheError::KeyNotFound(key)),
    }
}

/// Handler for GET /ttl/:key
///
/// Explicit freshness check: reports the remaining TTL, or an error for
/// unknown and expired keys.
pub async fn ttl_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Query(query): Query<GetQuery>,
) -> Result<Json<TtlResponse>> {
    let remaining = state
        .engine
        .ttl_remaining(&key, query.version.as_deref())
        .await?;
    Ok(Json(TtlResponse::new(key, remaining)))
}

/// Handler for DELETE /del/:key
///
/// Deletes a key from the cache.
pub async fn delete_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<DeleteResponse>> {
    let deleted = state.engine.delete(&key).await?;
    Ok(Json(DeleteResponse::new(key, deleted)))
}

/// Handler for POST /clear
///
/// Drops all entries and resets statistics.
pub async fn clear_handler(State(state): State<AppState>) -> Result<Json<ClearResponse>> {
    state.engine.clear().await?;
    Ok(Json(ClearResponse::new()))
}

/// Handler for POST /batch/set
///
/// Stores many items; items that fail validation or capacity checks are
/// reported individually without failing the batch.
pub async fn set_many_handler(
    State(state): State<AppState>,
    Json(req): Json<SetManyRequest>,
) -> Json<BatchSetResponse> {
    let mut invalid = Vec::new();
    let mut items = Vec::with_capacity(req.items.len());
    for item in req.items {
        match item.validate() {
            Some(reason) => invalid.push((item.key, reason)),
            None => items.push(item.into_item()),
        }
    }

    let mut outcome = state.engine.set_many(items).await;
    outcome.failed.extend(invalid);

    Json(BatchSetResponse::from(outcome))
}

/// Handler for POST /batch/get
pub async fn get_many_handler(
    State(state): State<AppState>,
    Json(req): Json<GetManyRequest>,
) -> Json<BatchGetResponse> {
    let outcome = state.engine.get_many(&req.keys, req.to_options()).await;
    Json(BatchGetResponse::from(outcome))
}

/// Handler for POST /batch/delete
pub async fn delete_many_handler(
    State(state): State<AppState>,
    Json(req): Json<DeleteManyRequest>,
) -> Json<BatchDeleteResponse> {
    let outcome = state.engine.delete_many(&req.keys).await;
    Json(BatchDeleteResponse::from(outcome))
}

/// Handler for GET /stats
///
/// Returns current cache statistics and the memory pressure level.
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    let stats = state.engine.stats().await;
    let pressure = state.engine.pressure().await;
    Json(StatsResponse::new(&stats, pressure))
}

/// Handler for POST /gc
///
/// Runs an explicit GC cycle. The optional body selects aggressive mode.
pub async fn gc_handler(
    State(state): State<AppState>,
    body: Option<Json<GcRequest>>,
) -> Json<GcResponse> {
    let aggressive = body.map(|Json(req)| req.aggressive).unwrap_or(false);
    let report = state.engine.force_gc(aggressive).await;
    Json(GcResponse::from(report))
}

/// Handler for PUT /watch
///
/// Starts a file watcher, optionally registering a key as a dependent.
pub async fn watch_setup_handler(
    State(state): State<AppState>,
    Json(req): Json<WatchRequest>,
) -> Json<WatchResponse> {
    let started = state
        .engine
        .setup_file_watcher(PathBuf::from(&req.path), req.key)
        .await;
    let message = if started {
        format!("Watching '{}'", req.path)
    } else {
        format!("Already watching '{}'", req.path)
    };
    Json(WatchResponse::new(message, started))
}

/// Handler for DELETE /watch
///
/// Stops a file watcher.
pub async fn watch_stop_handler(
    State(state): State<AppState>,
    Json(req): Json<WatchRequest>,
) -> Json<WatchResponse> {
    let stopped = state
        .engine
        .stop_file_watcher(std::path::Path::new(&req.path))
        .await;
    let message = if stopped {
        format!("Stopped watching '{}'", req.path)
    } else {
        format!("'{}' was not being watched", req.path)
    };
    Json(WatchResponse::new(message, stopped))
}

/// Handler for GET /health
///
/// Returns health status of the server.
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn test_state() -> AppState {
        AppState::new(CacheEngine::with_defaults())
    }

    fn set_request(key: &str, value: serde_json::Value) -> SetRequest {
        SetRequest {
            key: key.to_string(),
            value,
            ttl: None,
            version: None,
            dependencies: Vec::new(),
            source_file: None,
        }
    }

    #[tokio::test]
    async fn test_set_and_get_handler() {
        let state = test_state();

        let result = set_handler(
            State(state.clone()),
            Json(set_request("test_key", json!("test_value"))),
        )
        .await;
        assert!(result.is_ok());

        let result = get_handler(
            State(state.clone()),
            Path("test_key".to_string()),
            Query(GetQuery::default()),
        )
        .await;
        let response = result.unwrap();
        assert_eq!(response.value, json!("test_value"));
    }

    #[tokio::test]
    async fn test_get_nonexistent_key() {
        let state = test_state();

        let result = get_handler(
            State(state),
            Path("nonexistent".to_string()),
            Query(GetQuery::default()),
        )
        .await;
        assert!(matches!(result, Err(CacheError::KeyNotFound(_))));
    }

    #[tokio::test]
    async fn test_delete_handler_reports_outcome() {
        let state = test_state();

        set_handler(
            State(state.clone()),
            Json(set_request("to_delete", json!("value"))),
        )
        .await
        .unwrap();

        let response = delete_handler(State(state.clone()), Path("to_delete".to_string()))
            .await
            .unwrap();
        assert!(response.deleted);

        let response = delete_handler(State(state), Path("to_delete".to_string()))
            .await
            .unwrap();
        assert!(!response.deleted);
    }

    #[tokio::test]
    async fn test_clear_handler() {
        let state = test_state();

        set_handler(State(state.clone()), Json(set_request("k", json!(1))))
            .await
            .unwrap();
        clear_handler(State(state.clone())).await.unwrap();

        let stats = stats_handler(State(state)).await;
        assert_eq!(stats.total_entries, 0);
    }

    #[tokio::test]
    async fn test_batch_handlers() {
        let state = test_state();

        let response = set_many_handler(
            State(state.clone()),
            Json(SetManyRequest {
                items: vec![
                    set_request("a", json!(1)),
                    set_request("b", json!(2)),
                    set_request("", json!(3)), // invalid: empty key
                ],
            }),
        )
        .await;
        assert_eq!(response.success.len(), 2);
        assert_eq!(response.failed.len(), 1);

        let response = get_many_handler(
            State(state.clone()),
            Json(GetManyRequest {
                keys: vec!["a".to_string(), "zz".to_string()],
                version: None,
                validate_dependencies: None,
            }),
        )
        .await;
        assert_eq!(response.found.len(), 1);
        assert_eq!(response.missing, vec!["zz".to_string()]);

        let response = delete_many_handler(
            State(state),
            Json(DeleteManyRequest {
                keys: vec!["a".to_string(), "b".to_string()],
            }),
        )
        .await;
        assert_eq!(response.success.len(), 2);
    }

    #[tokio::test]
    async fn test_stats_handler() {
        let state = test_state();

        let response = stats_handler(State(state)).await;
        assert_eq!(response.hits, 0);
        assert_eq!(response.misses, 0);
        assert_eq!(response.total_entries, 0);
    }

    #[tokio::test]
    async fn test_gc_handler_default_body() {
        let state = test_state();

        let response = gc_handler(State(state), None).await;
        assert_eq!(response.entries_removed, 0);
    }

    #[tokio::test]
    async fn test_set_invalid_request() {
        let state = test_state();

        let result = set_handler(State(state), Json(set_request("", json!("value")))).await;
        assert!(matches!(result, Err(CacheError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_health_handler() {
        let response = health_handler().await;
        assert_eq!(response.status, "healthy");
    }
}
