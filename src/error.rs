//! Error types for the break timer and its collaborators

use thiserror::Error;

/// Result type alias for timer transitions.
pub type TimerResult<T> = Result<T, TimerError>;

/// Errors raised by the durable key-value store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Filesystem failure while reading or writing a record
    #[error("Storage IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Stored record is not valid JSON for the expected type
    #[error("Storage serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Key contains characters that cannot be mapped to a record
    #[error("Invalid storage key: {0}")]
    InvalidKey(String),
}

/// Errors surfaced by timer transitions.
///
/// Only [`TimerError::QuotaDenied`] reflects an external refusal; the other
/// variants report a transition that was rejected and left the state as it was.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimerError {
    /// The usage limiter refused another start or manual break
    #[error("Usage limit reached: {reason}")]
    QuotaDenied { reason: String },

    /// Pause, reset and manual breaks are locked while snoozing
    #[error("Not allowed while a snooze is in progress")]
    SnoozeInProgress,

    #[error("No snooze is in progress")]
    NotSnoozing,

    #[error("Snooze must be between 1 and {max} minutes, got {minutes}")]
    InvalidSnooze { minutes: u32, max: u32 },

    #[error("Invalid settings: {0}")]
    InvalidSettings(String),
}

/// Errors raised while operating on the shared application state.
#[derive(Debug, Error)]
pub enum StateError {
    #[error(transparent)]
    Timer(#[from] TimerError),

    /// The timer mutex was poisoned by a panicking holder
    #[error("Failed to lock timer state: {0}")]
    Lock(String),
}
