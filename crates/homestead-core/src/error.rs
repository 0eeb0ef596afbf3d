//! Error types for the durable store

use thiserror::Error;

/// Errors surfaced by rule/device store implementations
#[derive(Error, Debug)]
pub enum StoreError {
    /// Device absent from the store
    #[error("device not found: {0}")]
    DeviceNotFound(String),

    /// Rule document absent from the store
    #[error("rule not found: {0}")]
    RuleNotFound(String),

    /// IO error (file-backed store)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
