//! Error types for the server binary.
//!
//! [`ServerError`] is the top-level error type that wraps every failure
//! mode of startup and shutdown.

/// Top-level error for the server binary.
///
/// Each variant wraps a specific subsystem error, providing a single
/// error type that `main` can propagate with `?`.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Server config or balance catalog loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: stronghold_core::config::ConfigError,
    },

    /// Restoring the latest snapshot failed.
    #[error("store error: {source}")]
    Store {
        /// The underlying store error.
        #[from]
        source: stronghold_store::StoreError,
    },

    /// The game API could not bind or stopped with an I/O error.
    #[error("api error: {source}")]
    Api {
        /// The underlying API server error.
        #[from]
        source: stronghold_api::ServerError,
    },

    /// The final snapshot could not be written.
    #[error("runner error: {source}")]
    Runner {
        /// The underlying runner error.
        #[from]
        source: stronghold_core::runner::RunnerError,
    },

    /// A background task panicked or was cancelled.
    #[error("task failed: {source}")]
    Task {
        /// The underlying join error.
        #[from]
        source: tokio::task::JoinError,
    },
}
