//! Error types for snapshot persistence.
//!
//! Every filesystem failure is reported as [`StoreError::Io`] with the
//! operation and path that failed, so a log line alone is enough to find
//! the broken file.

use std::path::PathBuf;

use stronghold_world::Violation;

/// Errors that can occur while saving or restoring snapshots.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A filesystem operation failed.
    #[error("failed to {op} {}: {source}", path.display())]
    Io {
        /// What was being done (`"write"`, `"rename"`, `"read"`, ...).
        op: &'static str,
        /// The file or directory involved.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The world could not be encoded, or a snapshot could not be decoded.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The encoded snapshot exceeds the configured size limit.
    #[error("snapshot is {size} bytes, limit is {limit}")]
    TooLarge {
        /// Encoded size in bytes.
        size: u64,
        /// Configured maximum.
        limit: u64,
    },

    /// A snapshot decoded but its contents break world invariants.
    #[error("snapshot {} is inconsistent ({} violations)", path.display(), violations.len())]
    Corrupt {
        /// The snapshot file.
        path: PathBuf,
        /// Every violation found.
        violations: Vec<Violation>,
    },
}

/// Build a closure that wraps an [`std::io::Error`] with context.
pub(crate) fn io(
    op: &'static str,
    path: impl Into<PathBuf>,
) -> impl FnOnce(std::io::Error) -> StoreError {
    let path = path.into();
    move |source| StoreError::Io { op, path, source }
}
