// animation/headless.rs - In-memory rendering surface that records scene state
//
// Backs the CLI replay and the control server, where no map library is
// attached; the recorded scene is what a Leaflet/Cesium view would show.

use serde::Serialize;

use super::{EntityId, Orientation, RenderSurface, SurfaceKind};
use crate::error_handling::{SurfaceError, SurfaceResult};
use crate::types::{GeoPosition, Waypoint};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarkerState {
    pub position: GeoPosition,
    pub color: String,
    pub flashed: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntityState {
    pub id: EntityId,
    pub position: GeoPosition,
    pub orientation: Option<Orientation>,
    /// Playback styling applied (blue marker / visible model)
    pub animating: bool,
}

/// Everything currently drawn on the surface
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SceneState {
    pub kind: SurfaceKind,
    #[serde(rename = "staticEvent")]
    pub static_event: Option<String>,
    #[serde(rename = "staticPath")]
    pub static_path: Vec<GeoPosition>,
    pub markers: Vec<MarkerState>,
    pub entity: Option<EntityState>,
    pub trail: Vec<GeoPosition>,
    #[serde(rename = "finalPath")]
    pub final_path: Option<Vec<GeoPosition>>,
    #[serde(rename = "cameraFollow")]
    pub camera_follow: Option<EntityId>,
}

impl SceneState {
    fn empty(kind: SurfaceKind) -> Self {
        Self {
            kind,
            static_event: None,
            static_path: Vec::new(),
            markers: Vec::new(),
            entity: None,
            trail: Vec::new(),
            final_path: None,
            camera_follow: None,
        }
    }
}

pub struct HeadlessSurface {
    state: SceneState,
}

impl HeadlessSurface {
    pub fn new(kind: SurfaceKind) -> Self {
        Self { state: SceneState::empty(kind) }
    }

    pub fn state(&self) -> &SceneState {
        &self.state
    }

    fn entity_mut(&mut self, entity: &EntityId) -> SurfaceResult<&mut EntityState> {
        match self.state.entity.as_mut() {
            Some(state) if &state.id == entity => Ok(state),
            _ => Err(SurfaceError::EntityNotFound(entity.as_str().to_string())),
        }
    }
}

impl RenderSurface for HeadlessSurface {
    fn kind(&self) -> SurfaceKind {
        self.state.kind
    }

    fn render_static_path(&mut self, event_id: &str, waypoints: &[Waypoint]) -> SurfaceResult<()> {
        let color = waypoints
            .first()
            .map(|w| w.record.severity().color())
            .unwrap_or("blue")
            .to_string();

        self.state.static_event = Some(event_id.to_string());
        self.state.static_path = waypoints.iter().map(|w| w.position).collect();
        self.state.markers = waypoints
            .iter()
            .map(|w| MarkerState { position: w.position, color: color.clone(), flashed: false })
            .collect();
        self.state.entity = None;
        log::debug!("[{}] static path for {} ({} waypoints)", self.state.kind, event_id, waypoints.len());
        Ok(())
    }

    fn clear_static_path(&mut self) -> SurfaceResult<()> {
        self.state.static_event = None;
        self.state.static_path.clear();
        self.state.markers.clear();
        self.state.entity = None;
        Ok(())
    }

    fn acquire_entity(&mut self, event_id: &str) -> SurfaceResult<EntityId> {
        let start = match (&self.state.static_event, self.state.markers.first()) {
            (Some(rendered), Some(marker)) if rendered == event_id => marker.position,
            _ => return Err(SurfaceError::EntityNotFound(event_id.to_string())),
        };

        let id = EntityId::for_event(self.state.kind, event_id);
        self.state.entity = Some(EntityState {
            id: id.clone(),
            position: start,
            orientation: self.state.kind.has_orientation().then(Orientation::default),
            animating: true,
        });
        log::debug!("[{}] acquired {}", self.state.kind, id.as_str());
        Ok(id)
    }

    fn release_entity(&mut self, entity: &EntityId) -> SurfaceResult<()> {
        let kind = self.state.kind;
        let home = self.state.markers.first().map(|m| m.position);
        match kind {
            // the model only exists for the playback
            SurfaceKind::Globe => {
                self.entity_mut(entity)?;
                self.state.entity = None;
            }
            SurfaceKind::Flat => {
                let state = self.entity_mut(entity)?;
                state.animating = false;
                if let Some(home) = home {
                    state.position = home;
                }
            }
        }
        log::debug!("[{}] released {}", kind, entity.as_str());
        Ok(())
    }

    fn set_entity_position(&mut self, entity: &EntityId, position: GeoPosition) -> SurfaceResult<()> {
        self.entity_mut(entity)?.position = position;
        Ok(())
    }

    fn set_entity_orientation(&mut self, entity: &EntityId, orientation: Orientation) -> SurfaceResult<()> {
        if self.state.kind.has_orientation() {
            self.entity_mut(entity)?.orientation = Some(orientation);
        }
        Ok(())
    }

    fn append_trail_point(&mut self, position: GeoPosition) -> SurfaceResult<()> {
        self.state.trail.push(position);
        Ok(())
    }

    fn clear_trail(&mut self) -> SurfaceResult<()> {
        self.state.trail.clear();
        Ok(())
    }

    fn replace_trail_with_final_path(&mut self, waypoints: &[GeoPosition]) -> SurfaceResult<()> {
        self.state.trail.clear();
        self.state.final_path = Some(waypoints.to_vec());
        log::debug!("[{}] final path with {} points", self.state.kind, waypoints.len());
        Ok(())
    }

    fn clear_final_path(&mut self) -> SurfaceResult<()> {
        self.state.final_path = None;
        Ok(())
    }

    fn flash_marker(&mut self, index: usize, duration_ms: f64) -> SurfaceResult<()> {
        if let Some(marker) = self.state.markers.get_mut(index) {
            marker.flashed = true;
            log::debug!("[{}] flash marker {} for {}ms", self.state.kind, index, duration_ms);
        }
        Ok(())
    }

    fn restore_marker(&mut self, index: usize) -> SurfaceResult<()> {
        if let Some(marker) = self.state.markers.get_mut(index) {
            marker.flashed = false;
        }
        Ok(())
    }

    fn set_camera_follow(&mut self, entity: Option<&EntityId>) -> SurfaceResult<()> {
        if self.state.kind.has_orientation() {
            self.state.camera_follow = entity.cloned();
        }
        Ok(())
    }

    fn scene_snapshot(&self) -> Option<serde_json::Value> {
        serde_json::to_value(&self.state).ok()
    }
}
