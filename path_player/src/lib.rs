// lib.rs - Library exports for event-path-player
// Event path playback for a 2D map and a 3D globe, plus its control server

pub mod animation;
pub mod config;
pub mod error_handling;
pub mod frame_driver;
pub mod http_server;
pub mod normalize;
pub mod record_store;
pub mod types;

// Re-export commonly used types
pub use animation::{
    AnimationClock, ControlState, FrameClock, HeadlessSurface, ManualClock, MonotonicClock, PathTimeline, Phase,
    PlaybackNotice, RenderSurface, SessionBuilder, SurfaceKind, SurfacePlayer, TimingConfig, ViewerSession,
};
pub use config::{PlayerConfig, SurfaceConfig};
pub use error_handling::{ConfigError, PlaybackError, RecordLoadError, SurfaceError};
pub use types::{EventLocationRecord, EventSummary, GeoPosition, Waypoint};
