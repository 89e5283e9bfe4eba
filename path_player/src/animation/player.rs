// animation/player.rs - Drives one rendering surface through a playback lifecycle
//
// The clock decides where the entity is; the player turns each frame sample
// into surface commands (entity, trail, marker flashes, camera) and owns the
// teardown of everything it drew.

use serde::Serialize;

use super::{
    AnimationClock, CameraFollow, EntityId, FrameSample, PathTimeline, Phase, RenderSurface, SurfaceKind,
    TrailSampler,
};
use crate::config::SurfaceConfig;
use crate::error_handling::{PlaybackError, Result, SurfaceError, SurfaceResult};
use crate::types::{GeoPosition, Waypoint};

/// Notification produced by a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "index", rename_all = "camelCase")]
pub enum PlaybackNotice {
    WaypointReached(usize),
    Completed,
}

#[derive(Debug, Clone, Copy)]
struct PendingFlash {
    index: usize,
    restore_at_ms: f64,
}

pub struct SurfacePlayer {
    surface: Box<dyn RenderSurface>,
    config: SurfaceConfig,
    flash_duration_ms: f64,

    clock: AnimationClock,
    trail: TrailSampler,
    camera: CameraFollow,
    entity: Option<EntityId>,
    flashes: Vec<PendingFlash>,
}

impl SurfacePlayer {
    pub fn new(surface: Box<dyn RenderSurface>, config: SurfaceConfig, flash_duration_ms: f64) -> Self {
        let kind = surface.kind();
        Self {
            surface,
            config,
            flash_duration_ms,
            clock: AnimationClock::new(),
            trail: TrailSampler::new(kind, config.trail_spacing_m),
            camera: CameraFollow::new(),
            entity: None,
            flashes: Vec::new(),
        }
    }

    pub fn kind(&self) -> SurfaceKind {
        self.surface.kind()
    }

    // ========================================================================
    // STATIC RENDERING
    // ========================================================================

    pub fn render_static_path(&mut self, event_id: &str, waypoints: &[Waypoint]) -> SurfaceResult<()> {
        self.surface.render_static_path(event_id, waypoints)?;
        self.forget_replaced_entity();
        Ok(())
    }

    pub fn clear_static_path(&mut self) -> SurfaceResult<()> {
        self.surface.clear_static_path()?;
        self.forget_replaced_entity();
        Ok(())
    }

    // A redraw outside a live run drops the entity left behind by a completed one
    fn forget_replaced_entity(&mut self) {
        if !self.clock.phase().is_active() {
            self.entity = None;
        }
    }

    // ========================================================================
    // LIFECYCLE
    // ========================================================================

    /// Start animating `waypoints`, tearing down any previous run first.
    ///
    /// `NoData` and a bad multiplier are rejected before the current run is touched.
    pub fn start(&mut self, event_id: &str, waypoints: Vec<Waypoint>, speed_multiplier: f64, now_ms: f64) -> Result<()> {
        if waypoints.len() < 2 {
            log::warn!("[{}] refusing playback of {}: {} waypoint(s)", self.kind(), event_id, waypoints.len());
            return Err(PlaybackError::NoData { event_id: event_id.to_string(), waypoints: waypoints.len() });
        }
        super::clock::validate_multiplier(speed_multiplier)?;

        self.stop();

        let entity = self.surface.acquire_entity(event_id).map_err(|err| match err {
            SurfaceError::EntityNotFound(_) => PlaybackError::MissingEntity(event_id.to_string()),
            other => PlaybackError::Surface(other),
        })?;

        let timeline = PathTimeline::build(waypoints, self.kind(), &self.config.timing);
        let start = timeline.waypoints()[0].position;
        let total_ms = timeline.total_duration_ms();
        let segments = timeline.segments().len();

        if let Err(err) = self.clock.start(event_id, timeline, speed_multiplier, now_ms) {
            self.release_entity_logged(&entity);
            return Err(err);
        }
        self.entity = Some(entity.clone());

        self.trail.clear();
        self.trail.offer_waypoint(start);
        self.log_failure("playback setup", |surface| {
            surface.clear_final_path()?;
            surface.clear_trail()?;
            surface.set_entity_position(&entity, start)?;
            surface.append_trail_point(start)
        });
        if let Err(err) = self.camera.follow(self.surface.as_mut(), &entity) {
            log::warn!("[{}] camera follow failed: {}", self.kind(), err);
        }

        log::info!(
            "[{}] playback of {} started: {} segments, {:.0}ms at {}x",
            self.kind(),
            event_id,
            segments,
            total_ms,
            speed_multiplier
        );
        Ok(())
    }

    pub fn pause(&mut self, now_ms: f64) -> bool {
        let paused = self.clock.pause(now_ms);
        if paused {
            log::info!("[{}] playback paused", self.kind());
        }
        paused
    }

    pub fn resume(&mut self, now_ms: f64) -> bool {
        let resumed = self.clock.resume(now_ms).is_some();
        if resumed {
            log::info!("[{}] playback resumed", self.kind());
        }
        resumed
    }

    /// Tear down the run and everything it drew. Returns false when already Idle.
    pub fn stop(&mut self) -> bool {
        if !self.clock.stop() {
            return false;
        }

        for flash in std::mem::take(&mut self.flashes) {
            self.log_failure("marker restore", |surface| surface.restore_marker(flash.index));
        }
        self.trail.clear();
        self.log_failure("trail teardown", |surface| {
            surface.clear_trail()?;
            surface.clear_final_path()
        });
        if let Some(entity) = self.entity.take() {
            self.release_entity_logged(&entity);
        }
        if let Err(err) = self.camera.release(self.surface.as_mut()) {
            log::warn!("[{}] camera release failed: {}", self.kind(), err);
        }

        log::info!("[{}] playback stopped", self.kind());
        true
    }

    pub fn set_speed(&mut self, factor: f64, now_ms: f64) -> Result<()> {
        self.clock.set_speed_multiplier(factor, now_ms)?;
        log::debug!("[{}] speed multiplier set to {}", self.kind(), factor);
        Ok(())
    }

    // ========================================================================
    // FRAME
    // ========================================================================

    /// Advance to `now_ms` and push the result to the surface.
    ///
    /// Pending marker flashes expire here whatever the phase. Surface failures
    /// are logged and never interrupt the playback.
    pub fn on_frame(&mut self, now_ms: f64) -> Vec<PlaybackNotice> {
        self.expire_flashes(now_ms);

        let mut notices = Vec::new();
        let Some(ticket) = self.clock.pending_ticket() else {
            return notices;
        };
        let Some(sample) = self.clock.advance(ticket, now_ms) else {
            return notices;
        };

        self.present(&sample);

        if let Some(index) = sample.reached_waypoint {
            let duration_ms = self.flash_duration_ms;
            self.log_failure("marker flash", |surface| surface.flash_marker(index, duration_ms));
            self.flashes.push(PendingFlash { index, restore_at_ms: now_ms + self.flash_duration_ms });
            log::debug!("[{}] reached waypoint {}", self.kind(), index);
            notices.push(PlaybackNotice::WaypointReached(index));
        }

        if sample.completed {
            self.finish();
            notices.push(PlaybackNotice::Completed);
        }
        notices
    }

    fn present(&mut self, sample: &FrameSample) {
        let Some(entity) = self.entity.clone() else {
            return;
        };
        let kind = self.kind();

        let kept = if sample.reached_waypoint.is_some() {
            self.trail.offer_waypoint(sample.position)
        } else {
            self.trail.offer(sample.position)
        };

        let result = (|| {
            self.surface.set_entity_position(&entity, sample.position)?;
            if kind.has_orientation() {
                self.surface.set_entity_orientation(&entity, sample.orientation)?;
            }
            if kept {
                self.surface.append_trail_point(sample.position)?;
            }
            Ok::<(), SurfaceError>(())
        })();
        if let Err(err) = result {
            log::warn!("[{}] frame update failed, continuing: {}", kind, err);
        }
    }

    /// Completed: final path replaces the trail, camera lets go, entity stays put
    fn finish(&mut self) {
        let path: Vec<GeoPosition> = self
            .clock
            .timeline()
            .map(|t| t.waypoints().iter().map(|w| w.position).collect())
            .unwrap_or_default();

        self.trail.clear();
        self.log_failure("final path", |surface| surface.replace_trail_with_final_path(&path));
        if let Err(err) = self.camera.release(self.surface.as_mut()) {
            log::warn!("[{}] camera release failed: {}", self.kind(), err);
        }
        log::info!(
            "[{}] playback of {} completed",
            self.kind(),
            self.clock.event_id().unwrap_or("?")
        );
    }

    fn expire_flashes(&mut self, now_ms: f64) {
        if self.flashes.is_empty() {
            return;
        }
        let (due, pending): (Vec<PendingFlash>, Vec<PendingFlash>) =
            self.flashes.drain(..).partition(|f| f.restore_at_ms <= now_ms);
        self.flashes = pending;
        for flash in due {
            self.log_failure("marker restore", |surface| surface.restore_marker(flash.index));
        }
    }

    fn release_entity_logged(&mut self, entity: &EntityId) {
        self.log_failure("entity release", |surface| surface.release_entity(entity));
    }

    fn log_failure<F>(&mut self, what: &str, op: F)
    where
        F: FnOnce(&mut dyn RenderSurface) -> SurfaceResult<()>,
    {
        let kind = self.kind();
        if let Err(err) = op(self.surface.as_mut()) {
            log::warn!("[{}] {} failed: {}", kind, what, err);
        }
    }

    // ========================================================================
    // MANUAL TOOL
    // ========================================================================

    pub fn engage_tool(&mut self) {
        if let Err(err) = self.camera.engage_tool(self.surface.as_mut()) {
            log::warn!("[{}] suspending camera follow failed: {}", self.kind(), err);
        }
    }

    pub fn disengage_tool(&mut self) {
        if let Err(err) = self.camera.disengage_tool(self.surface.as_mut()) {
            log::warn!("[{}] restoring camera follow failed: {}", self.kind(), err);
        }
    }

    // ========================================================================
    // ACCESSORS
    // ========================================================================

    pub fn phase(&self) -> Phase {
        self.clock.phase()
    }

    pub fn event_id(&self) -> Option<&str> {
        self.clock.event_id()
    }

    pub fn speed_multiplier(&self) -> f64 {
        self.clock.speed_multiplier()
    }

    pub fn clock(&self) -> &AnimationClock {
        &self.clock
    }

    pub fn entity(&self) -> Option<&EntityId> {
        self.entity.as_ref()
    }

    pub fn trail_points(&self) -> &[GeoPosition] {
        self.trail.points()
    }

    pub fn camera(&self) -> &CameraFollow {
        &self.camera
    }

    pub fn config(&self) -> &SurfaceConfig {
        &self.config
    }

    pub fn surface(&self) -> &dyn RenderSurface {
        self.surface.as_ref()
    }
}
