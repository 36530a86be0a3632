//! Cache-specific error types.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;

/// Errors that can occur while managing local repository clones.
#[derive(Debug, Error)]
pub enum CacheError {
    /// The repository reference could not be parsed. Not retryable; the
    /// caller must fix the input.
    #[error("Invalid repository reference '{0}'. Use 'owner/repo' or 'https://github.com/owner/repo'")]
    InvalidReference(String),

    /// Another operation is currently cloning or updating this path.
    /// Retryable after a delay.
    #[error("Repository at '{}' is currently being cloned or updated", .0.display())]
    InProgress(PathBuf),

    /// Eviction could not free enough space for the requested clone.
    /// Not retryable without a configuration change or manual cleanup.
    #[error("Storage limit exceeded: need {needed_bytes} bytes but the cache limit is {limit_bytes} bytes")]
    StorageExceeded { needed_bytes: u64, limit_bytes: u64 },

    /// The initial clone failed. Retryable.
    #[error("Clone failed: {0}")]
    CloneFailed(String),

    /// Both pull and reclone failed for a stale repository. Retryable; both
    /// underlying failures are preserved.
    #[error("Update failed: pull error: {pull_error}; reclone error: {reclone_error}")]
    UpdateFailed {
        pull_error: String,
        reclone_error: String,
    },

    /// I/O error outside the best-effort cleanup paths.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl CacheError {
    /// Whether retrying the same request later could succeed without any
    /// configuration or input change.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::InProgress(_) | Self::CloneFailed(_) | Self::UpdateFailed { .. } | Self::Io(_)
        )
    }
}
