//! Error types for gaze-client.

use thiserror::Error;

/// Main error type for all gaze-client operations.
#[derive(Debug, Error)]
pub enum GazeError {
    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Transport failure (connect refused, socket error, closed channel).
    #[error("Transport error: {0}")]
    Transport(String),

    /// A command was issued while no transport is open.
    #[error("Not connected")]
    NotConnected,

    /// `connect()` was called while a transport is already active.
    #[error("Already connected")]
    AlreadyConnected,

    /// Spawning transport I/O requires a tokio runtime context.
    #[error("No tokio runtime available")]
    NoRuntime,

    /// A point older than the newest buffered point was fed to a smoother.
    #[error("Out-of-order sample: {received} ms after {previous} ms")]
    OutOfOrderSample {
        /// Timestamp of the newest buffered point.
        previous: u64,
        /// Timestamp of the rejected point.
        received: u64,
    },

    /// Invalid configuration value.
    #[error("Config error: {0}")]
    Config(String),
}

/// Result type alias using GazeError.
pub type Result<T> = std::result::Result<T, GazeError>;
