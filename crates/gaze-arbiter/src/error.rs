//! Error types for gaze arbitration.

use gaze_models::{FrameId, SlotHandle, Topic};
use thiserror::Error;

/// Result type for gaze operations.
pub type GazeResult<T> = Result<T, GazeError>;

/// Errors that can occur in the arbitration core.
///
/// None of these are fatal for the driver loop: contributors treat them as
/// "no candidate this tick" and the driver only logs them.
#[derive(Debug, Error)]
pub enum GazeError {
    #[error("Reference frame unavailable: {0}")]
    FrameUnavailable(FrameId),

    #[error("Contributor '{name}' already registered on topic '{topic}'")]
    AlreadyRegistered { topic: Topic, name: String },

    #[error("Unknown contributor slot: {0}")]
    UnknownSlot(SlotHandle),

    #[error("Contributor '{0}' has not been started")]
    NotStarted(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Malformed event: {0}")]
    MalformedEvent(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl GazeError {
    /// Create a frame-unavailable error.
    pub fn frame_unavailable(frame: &FrameId) -> Self {
        Self::FrameUnavailable(frame.clone())
    }

    /// Create an invalid-configuration error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig(message.into())
    }

    /// Create a malformed-event error.
    pub fn malformed_event(message: impl Into<String>) -> Self {
        Self::MalformedEvent(message.into())
    }

    /// Errors that clear themselves once the world changes (retry next tick).
    pub fn is_transient(&self) -> bool {
        matches!(self, GazeError::FrameUnavailable(_))
    }
}
