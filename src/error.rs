//! Error types for linewire.

use thiserror::Error;

/// Main error type for fallible linewire calls.
#[derive(Debug, Error)]
pub enum LinewireError {
    /// I/O error on the underlying stream.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The writer task is gone; the outbound channel is closed.
    #[error("Channel closed")]
    ChannelClosed,
}

/// Result type alias using LinewireError.
pub type Result<T> = std::result::Result<T, LinewireError>;

/// Failures surfaced on the event stream.
///
/// Unlike [`LinewireError`], these describe the stream being read or
/// written rather than a call the caller just made. Decode failures are
/// per-record and recoverable; input/output failures are terminal for
/// their side, and the two sides are always distinguishable.
#[derive(Debug, Error)]
pub enum StreamError {
    /// A record matched the structured pattern but could not be decoded.
    ///
    /// Carries the offending raw record so callers can log or salvage it.
    /// Processing of subsequent records continues.
    #[error("decode error: {reason}")]
    Decode {
        /// Human-readable failure description from the codec.
        reason: String,
        /// The raw record that failed to decode, delimiter stripped.
        raw: String,
    },

    /// The input stream failed while reading.
    #[error("input stream error: {0}")]
    Input(std::io::Error),

    /// The output stream failed while writing.
    #[error("output stream error: {0}")]
    Output(std::io::Error),
}
