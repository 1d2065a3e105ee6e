//! API Module
//!
//! HTTP handlers and routing for the cache server REST API.
//!
//! # Endpoints
//! - `PUT /set` - Store a key-value pair
//! - `GET /get/:key` - Retrieve a value by key
//! - `GET /ttl/:key` - Inspect a key's remaining TTL
//! - `DELETE /del/:key` - Delete a key
//! - `POST /clear` - Drop all entries
//! - `POST /batch/set` / `POST /batch/get` / `POST /batch/delete` - Batches
//! - `GET /stats` - Get cache statistics
//! - `POST /gc` - Run a GC cycle
//! - `PUT /watch` / `DELETE /watch` - Manage file watchers
//! - `GET /health` - Health check endpoint

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
