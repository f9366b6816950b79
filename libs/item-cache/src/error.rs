//! Error types for the item cache.

use thiserror::Error;

/// Errors returned by [`ItemCache::get_or_create`](crate::ItemCache::get_or_create).
///
/// `E` is the error type of the caller-supplied create function. It is
/// cloned to every caller that was waiting on the failed creation.
#[derive(Debug, Clone, Error)]
pub enum CacheError<E> {
    /// The create function failed.
    #[error("item creation failed: {0}")]
    Create(E),

    /// The caller's cancellation token fired before an item was available.
    #[error("operation cancelled")]
    Cancelled,

    /// The caller that owned the in-flight creation went away before finishing it.
    #[error("in-flight creation for key '{0}' was abandoned")]
    Abandoned(String),

    /// The create function produced an item for a different key.
    #[error("created item key '{actual}' does not match requested key '{expected}'")]
    KeyMismatch { expected: String, actual: String },
}
