//! Error types for cache invalidation operations

use thiserror::Error;

/// Cache invalidation errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InvalidationError {
    /// Every publisher for the channel has been dropped
    #[error("Invalidation channel closed")]
    Closed,

    /// Invalid cache key or message received
    #[error("Invalid message format: {0}")]
    InvalidMessage(String),

    /// Callback execution failed
    #[error("Callback execution failed: {0}")]
    CallbackFailed(String),
}
