//! Recoverable failures of the recording pipeline.

use thiserror::Error;

/// Errors stored in the session's `last_error`.
///
/// None of these stop the controller: the failed cycle is abandoned and the
/// caller may start a new recording right away.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecorderError {
    /// Microphone missing, busy or permission denied. Recording never started.
    #[error("Could not access microphone: {0}")]
    Acquisition(String),

    /// The capture could not hand over its recorded data.
    #[error("Could not finish recording: {0}")]
    Flush(String),

    /// Recorded data could not be decoded into PCM.
    #[error("Could not decode recording: {0}")]
    Decode(String),

    /// The playback output failed.
    #[error("Playback failed: {0}")]
    Playback(String),

    /// Writing the recording to disk failed.
    #[error("Could not save recording: {0}")]
    Export(String),
}

impl From<std::io::Error> for RecorderError {
    fn from(e: std::io::Error) -> Self {
        RecorderError::Export(e.to_string())
    }
}
