// error_handling.rs - Error taxonomy for playback, rendering surfaces and record loading

use thiserror::Error;

/// Failures reported by a rendering surface
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SurfaceError {
    #[error("Entity not found for event {0}")]
    EntityNotFound(String),

    #[error("Scene unavailable: {0}")]
    SceneUnavailable(String),
}

pub type SurfaceResult<T> = std::result::Result<T, SurfaceError>;

/// Playback request failures; every variant is recoverable
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PlaybackError {
    #[error("No path data to animate for event {event_id}: {waypoints} waypoint(s)")]
    NoData { event_id: String, waypoints: usize },

    #[error("No markers found for event {0}")]
    MissingEntity(String),

    #[error("Invalid playback parameters: {0}")]
    InvalidParameters(String),

    #[error("Surface error: {0}")]
    Surface(#[from] SurfaceError),
}

impl PlaybackError {
    /// Notice shown to the user when a request is rejected
    pub fn user_notice(&self) -> String {
        match self {
            PlaybackError::NoData { .. } => "No path data to animate.".to_string(),
            PlaybackError::MissingEntity(_) => "No markers found for this event".to_string(),
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, PlaybackError>;

/// Record source failures (file reads, malformed JSON)
#[derive(Error, Debug)]
pub enum RecordLoadError {
    #[error("Failed to read records from {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed record payload: {0}")]
    Json(#[from] serde_json::Error),
}

/// Configuration file or value failures
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed config: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid config value: {0}")]
    Invalid(String),
}
