//! Cache error types.

use thiserror::Error;

/// Errors from the snapshot cache.
///
/// Callers on the read path treat any cache error like a miss and fall
/// back to the source of truth.
#[derive(Debug, Error)]
pub enum CacheError {
    /// The backend rejected or failed the operation.
    #[error("cache backend error: {0}")]
    Backend(String),
}
