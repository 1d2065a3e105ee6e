//! Request and Response models for the cache server API
//!
//! This module defines the DTOs (Data Transfer Objects) used for
//! serializing/deserializing HTTP request and response bodies.

pub mod requests;
pub mod responses;

// Re-export commonly used types
pub use requests::{
    DeleteManyRequest, GcRequest, GetManyRequest, GetQuery, SetManyRequest, SetRequest,
    WatchRequest,
};
pub use responses::{
    BatchDeleteResponse, BatchGetResponse, BatchSetResponse, ClearResponse, DeleteResponse,
    ErrorResponse, FailedItem, FoundItem, GcResponse, GetResponse, HealthResponse, SetResponse,
    StatsResponse, TtlResponse, WatchResponse,
};
