// animation/surface.rs - Rendering-surface seam shared by the 2D map and the 3D globe

use serde::Serialize;

use super::{Orientation, SurfaceKind};
use crate::error_handling::SurfaceResult;
use crate::types::{GeoPosition, Waypoint};

/// Handle to the marker (2D) or model (3D) moved during playback
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct EntityId(pub String);

impl EntityId {
    pub fn for_event(kind: SurfaceKind, event_id: &str) -> Self {
        match kind {
            SurfaceKind::Flat => EntityId(format!("marker-{event_id}")),
            SurfaceKind::Globe => EntityId(format!("animation-{event_id}")),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Everything the playback core asks of a map/globe.
///
/// Implementations own the actual map objects; the core only issues commands.
/// Any call may fail transiently (e.g. the scene is not ready); per-frame
/// failures are logged by the caller and playback carries on.
pub trait RenderSurface: Send {
    fn kind(&self) -> SurfaceKind;

    // Static (non-animated) rendering of the selected event

    /// Draw the event's full path and one marker per waypoint.
    /// Entities from the previous scene are gone afterwards.
    fn render_static_path(&mut self, event_id: &str, waypoints: &[Waypoint]) -> SurfaceResult<()>;

    /// Entities from the previous scene are gone afterwards
    fn clear_static_path(&mut self) -> SurfaceResult<()>;

    // Playback entity lifecycle

    /// Resolve the marker/model for `event_id` and apply the playback style.
    /// Fails with `EntityNotFound` if the event is not rendered.
    fn acquire_entity(&mut self, event_id: &str) -> SurfaceResult<EntityId>;

    /// Restore the entity to its pre-animation style
    fn release_entity(&mut self, entity: &EntityId) -> SurfaceResult<()>;

    fn set_entity_position(&mut self, entity: &EntityId, position: GeoPosition) -> SurfaceResult<()>;

    /// Only meaningful on surfaces that render a model
    fn set_entity_orientation(&mut self, _entity: &EntityId, _orientation: Orientation) -> SurfaceResult<()> {
        Ok(())
    }

    // Trail and final path

    fn append_trail_point(&mut self, position: GeoPosition) -> SurfaceResult<()>;

    fn clear_trail(&mut self) -> SurfaceResult<()>;

    /// Remove the progress trail and draw the persistent full path
    fn replace_trail_with_final_path(&mut self, waypoints: &[GeoPosition]) -> SurfaceResult<()>;

    fn clear_final_path(&mut self) -> SurfaceResult<()>;

    // Waypoint markers

    fn flash_marker(&mut self, index: usize, duration_ms: f64) -> SurfaceResult<()>;

    fn restore_marker(&mut self, index: usize) -> SurfaceResult<()>;

    // Camera

    /// Track `entity`, or release tracking with `None`
    fn set_camera_follow(&mut self, _entity: Option<&EntityId>) -> SurfaceResult<()> {
        Ok(())
    }

    /// JSON view of what is drawn, for surfaces that can report it
    fn scene_snapshot(&self) -> Option<serde_json::Value> {
        None
    }
}
