//! Cache error type

use thiserror::Error;

/// A cache backend failure
///
/// All backend failures collapse into one transient variant: callers on the
/// evaluation path treat an unreachable cache as "no matches this cycle"
/// rather than an error to propagate.
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("cache backend error: {0}")]
    Backend(String),
}

impl From<redis::RedisError> for CacheError {
    fn from(e: redis::RedisError) -> Self {
        CacheError::Backend(e.to_string())
    }
}
