// animation/camera.rs - Camera follow of the moving model, with manual-tool suspension

use super::{EntityId, RenderSurface};
use crate::error_handling::SurfaceResult;

/// Tracks which entity the viewport should follow and whether a manual
/// pan/measurement tool currently overrides it.
///
/// No-op on surfaces without a tracking camera.
#[derive(Debug, Default)]
pub struct CameraFollow {
    target: Option<EntityId>,
    tool_engaged: bool,
    tracking: bool,
}

impl CameraFollow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Follow `entity` for the lifetime of a playback
    pub fn follow(&mut self, surface: &mut dyn RenderSurface, entity: &EntityId) -> SurfaceResult<()> {
        self.target = Some(entity.clone());
        if self.tool_engaged {
            log::debug!("camera follow of {} deferred, manual tool engaged", entity.as_str());
            return Ok(());
        }
        self.apply(surface, true)
    }

    /// Drop the target and stop tracking
    pub fn release(&mut self, surface: &mut dyn RenderSurface) -> SurfaceResult<()> {
        self.target = None;
        if self.tracking {
            self.apply(surface, false)?;
        }
        Ok(())
    }

    pub fn engage_tool(&mut self, surface: &mut dyn RenderSurface) -> SurfaceResult<()> {
        self.tool_engaged = true;
        if self.tracking {
            self.apply(surface, false)?;
        }
        Ok(())
    }

    /// Restore tracking if a playback still holds a target
    pub fn disengage_tool(&mut self, surface: &mut dyn RenderSurface) -> SurfaceResult<()> {
        self.tool_engaged = false;
        if self.target.is_some() && !self.tracking {
            self.apply(surface, true)?;
        }
        Ok(())
    }

    fn apply(&mut self, surface: &mut dyn RenderSurface, track: bool) -> SurfaceResult<()> {
        if !surface.kind().has_orientation() {
            return Ok(());
        }
        let entity = if track { self.target.as_ref() } else { None };
        surface.set_camera_follow(entity)?;
        self.tracking = entity.is_some();
        Ok(())
    }

    pub fn is_tracking(&self) -> bool {
        self.tracking
    }

    pub fn tool_engaged(&self) -> bool {
        self.tool_engaged
    }

    pub fn target(&self) -> Option<&EntityId> {
        self.target.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::{HeadlessSurface, SurfaceKind};

    fn entity() -> EntityId {
        EntityId::for_event(SurfaceKind::Globe, "e")
    }

    #[test]
    fn test_tool_suspends_and_restores_tracking() {
        let mut surface = HeadlessSurface::new(SurfaceKind::Globe);
        let mut camera = CameraFollow::new();

        camera.follow(&mut surface, &entity()).unwrap();
        assert!(camera.is_tracking());
        assert_eq!(surface.state().camera_follow, Some(entity()));

        camera.engage_tool(&mut surface).unwrap();
        assert!(!camera.is_tracking());
        assert_eq!(surface.state().camera_follow, None);

        camera.disengage_tool(&mut surface).unwrap();
        assert!(camera.is_tracking());
        assert_eq!(surface.state().camera_follow, Some(entity()));
    }

    #[test]
    fn test_disengage_without_playback_does_not_track() {
        let mut surface = HeadlessSurface::new(SurfaceKind::Globe);
        let mut camera = CameraFollow::new();

        camera.follow(&mut surface, &entity()).unwrap();
        camera.release(&mut surface).unwrap();
        camera.engage_tool(&mut surface).unwrap();
        camera.disengage_tool(&mut surface).unwrap();

        assert!(!camera.is_tracking());
        assert_eq!(surface.state().camera_follow, None);
    }

    #[test]
    fn test_follow_deferred_while_tool_engaged() {
        let mut surface = HeadlessSurface::new(SurfaceKind::Globe);
        let mut camera = CameraFollow::new();

        camera.engage_tool(&mut surface).unwrap();
        camera.follow(&mut surface, &entity()).unwrap();
        assert!(!camera.is_tracking());

        camera.disengage_tool(&mut surface).unwrap();
        assert!(camera.is_tracking());
    }

    #[test]
    fn test_flat_surface_never_tracks() {
        let mut surface = HeadlessSurface::new(SurfaceKind::Flat);
        let mut camera = CameraFollow::new();
        camera.follow(&mut surface, &EntityId::for_event(SurfaceKind::Flat, "e")).unwrap();
        assert!(!camera.is_tracking());
        assert!(camera.target().is_some());
    }
}
