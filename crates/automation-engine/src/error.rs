//! Error types for the automation engine

use crate::dispatch::DispatchError;
use homestead_cache::CacheError;
use homestead_core::StoreError;
use thiserror::Error;

/// Errors that can occur in the automation engine
///
/// Mutation-boundary calls surface these to the caller. The evaluation
/// paths (sensor events, schedule ticks) never propagate them: transient
/// infrastructure failures are logged and the cycle simply fires nothing.
#[derive(Error, Debug)]
pub enum EngineError {
    /// Required connection or setting missing at startup
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Malformed rule payload rejected at the mutation boundary
    #[error("validation error: {0}")]
    Validation(String),

    /// Rule or device absent on a mutation call
    #[error("not found: {0}")]
    NotFound(String),

    /// Cache store failure
    #[error("cache error: {0}")]
    Cache(#[from] CacheError),

    /// Durable store failure
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Broker dispatch failure
    #[error("dispatch error: {0}")]
    Dispatch(#[from] DispatchError),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
