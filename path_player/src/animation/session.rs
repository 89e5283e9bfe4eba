// animation/session.rs - Viewer session: selection, active surface and the two surface players

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

use super::{
    build_path, event_summaries, records_for_event, HeadlessSurface, Phase, PlaybackNotice, RenderSurface,
    SurfaceKind, SurfacePlayer,
};
use crate::config::PlayerConfig;
use crate::error_handling::{PlaybackError, Result};
use crate::types::{EventLocationRecord, EventSummary, GeoPosition, Waypoint};

// ============================================================================
// FRAME CLOCKS
// ============================================================================

/// Wall-clock source for frame timestamps, in milliseconds
pub trait FrameClock: Send + Sync {
    fn now_ms(&self) -> f64;
}

/// Milliseconds since construction
#[derive(Debug)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self { origin: Instant::now() }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameClock for MonotonicClock {
    fn now_ms(&self) -> f64 {
        self.origin.elapsed().as_secs_f64() * 1000.0
    }
}

/// Clock moved by hand; used by headless replays and tests
#[derive(Debug, Default)]
pub struct ManualClock {
    bits: AtomicU64,
}

impl ManualClock {
    pub fn new(start_ms: f64) -> Self {
        Self { bits: AtomicU64::new(start_ms.to_bits()) }
    }

    pub fn set(&self, now_ms: f64) {
        self.bits.store(now_ms.to_bits(), Ordering::SeqCst);
    }

    pub fn advance(&self, delta_ms: f64) {
        self.set(self.now_ms() + delta_ms);
    }
}

impl FrameClock for ManualClock {
    fn now_ms(&self) -> f64 {
        f64::from_bits(self.bits.load(Ordering::SeqCst))
    }
}

// ============================================================================
// SESSION STATE
// ============================================================================

/// Which playback controls are enabled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ControlState {
    pub play: bool,
    pub pause: bool,
    pub resume: bool,
    pub stop: bool,
}

/// Serializable readout of the session
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    #[serde(rename = "sessionId")]
    pub session_id: Uuid,
    #[serde(rename = "activeSurface")]
    pub active_surface: SurfaceKind,
    #[serde(rename = "selectedEvent")]
    pub selected_event: Option<String>,
    pub phase: Phase,
    pub controls: ControlState,
    #[serde(rename = "speedMultiplier")]
    pub speed_multiplier: f64,
    #[serde(rename = "segmentIndex")]
    pub segment_index: usize,
    pub fraction: f64,
    pub position: Option<GeoPosition>,
    #[serde(rename = "manualTool")]
    pub manual_tool: bool,
    pub scene: Option<serde_json::Value>,
}

pub type WaypointCallback = Box<dyn Fn(SurfaceKind, usize) + Send + Sync>;
pub type CompletionCallback = Box<dyn Fn(SurfaceKind, &str) + Send + Sync>;

/// Owns both surface players and everything the UI reads or drives.
///
/// Only the active surface ever runs a playback; switching surfaces stops it.
pub struct ViewerSession {
    id: Uuid,
    clock: Arc<dyn FrameClock>,
    records: Vec<EventLocationRecord>,
    selected: Option<String>,
    active: SurfaceKind,
    flat: SurfacePlayer,
    globe: SurfacePlayer,
    speed_multiplier: f64,
    manual_tool: bool,
    static_render_pending: bool,
    on_waypoint_reached: Option<WaypointCallback>,
    on_completed: Option<CompletionCallback>,
}

impl ViewerSession {
    pub fn builder(config: PlayerConfig) -> SessionBuilder {
        SessionBuilder::new(config)
    }

    // ========================================================================
    // SELECTION AND SURFACES
    // ========================================================================

    /// Select an event (or clear the selection) and redraw the active surface
    pub fn select_event(&mut self, event_id: Option<&str>) {
        self.flat.stop();
        self.globe.stop();
        self.static_render_pending = false;
        self.selected = event_id.map(str::to_string);
        log::info!("Selected event {:?}", self.selected);
        self.render_selection();
    }

    /// Make `kind` the active surface; an active run is stopped, not migrated
    pub fn switch_surface(&mut self, kind: SurfaceKind) {
        if kind == self.active {
            return;
        }
        let previous = self.active_player_mut();
        previous.stop();
        if let Err(err) = previous.clear_static_path() {
            log::warn!("[{}] clearing static path failed: {}", previous.kind(), err);
        }

        self.active = kind;
        self.static_render_pending = false;
        log::info!("Switched to {} surface", kind);
        self.render_selection();
    }

    fn render_selection(&mut self) {
        let active = self.active;
        let result = match self.selected.clone() {
            Some(event_id) => {
                let waypoints = self.waypoints_for(&event_id);
                self.player_mut(active).render_static_path(&event_id, &waypoints)
            }
            None => self.player_mut(active).clear_static_path(),
        };
        if let Err(err) = result {
            log::warn!("[{}] static render failed: {}", active, err);
        }
    }

    /// Install a refreshed snapshot, deferring the redraw while a playback
    /// owns the surface's entities
    pub fn replace_records(&mut self, records: Vec<EventLocationRecord>) {
        log::info!("Record snapshot replaced: {} records", records.len());
        self.records = records;
        if self.selected.is_none() {
            return;
        }
        if self.phase().is_active() {
            log::debug!("Static redraw deferred until playback ends");
            self.static_render_pending = true;
        } else {
            self.render_selection();
        }
    }

    fn flush_pending_render(&mut self) {
        if std::mem::take(&mut self.static_render_pending) {
            self.render_selection();
        }
    }

    // ========================================================================
    // PLAYBACK CONTROLS
    // ========================================================================

    /// Select `event_id` if needed and play it on the active surface.
    ///
    /// An event without a playable path is rejected before the selection or
    /// a live run is touched.
    pub fn start_playback(&mut self, event_id: &str) -> Result<()> {
        let waypoints = self.waypoints_for(event_id);
        if waypoints.len() < 2 {
            log::warn!("[{}] refusing playback of {}: {} waypoint(s)", self.active, event_id, waypoints.len());
            return Err(PlaybackError::NoData { event_id: event_id.to_string(), waypoints: waypoints.len() });
        }
        if self.selected.as_deref() != Some(event_id) {
            self.select_event(Some(event_id));
        }
        let speed = self.speed_multiplier;
        let now = self.clock.now_ms();
        self.active_player_mut().start(event_id, waypoints, speed, now)
    }

    pub fn pause(&mut self) -> bool {
        let now = self.clock.now_ms();
        self.active_player_mut().pause(now)
    }

    pub fn resume(&mut self) -> bool {
        let now = self.clock.now_ms();
        self.active_player_mut().resume(now)
    }

    pub fn stop(&mut self) -> bool {
        let stopped = self.active_player_mut().stop();
        if stopped {
            self.flush_pending_render();
        }
        stopped
    }

    /// Applies to the current run without a jump and to every later run
    pub fn set_speed_multiplier(&mut self, factor: f64) -> Result<()> {
        let now = self.clock.now_ms();
        self.flat.set_speed(factor, now)?;
        self.globe.set_speed(factor, now)?;
        self.speed_multiplier = factor;
        Ok(())
    }

    pub fn engage_manual_tool(&mut self) {
        self.manual_tool = true;
        self.globe.engage_tool();
    }

    pub fn disengage_manual_tool(&mut self) {
        self.manual_tool = false;
        self.globe.disengage_tool();
    }

    /// Advance the active playback to the current clock reading
    pub fn frame(&mut self) -> Vec<PlaybackNotice> {
        let now = self.clock.now_ms();
        let active = self.active;
        let notices = self.player_mut(active).on_frame(now);

        for notice in &notices {
            match notice {
                PlaybackNotice::WaypointReached(index) => {
                    if let Some(callback) = &self.on_waypoint_reached {
                        callback(active, *index);
                    }
                }
                PlaybackNotice::Completed => {
                    let event_id = self.selected.clone().unwrap_or_default();
                    if let Some(callback) = &self.on_completed {
                        callback(active, &event_id);
                    }
                }
            }
        }
        if notices.contains(&PlaybackNotice::Completed) {
            self.flush_pending_render();
        }
        notices
    }

    // ========================================================================
    // READOUT
    // ========================================================================

    pub fn phase(&self) -> Phase {
        self.active_player().phase()
    }

    pub fn controls(&self) -> ControlState {
        let phase = self.phase();
        let playable = self
            .selected
            .as_deref()
            .map(|id| self.records.iter().filter(|r| r.event_id == id).count() >= 2)
            .unwrap_or(false);

        ControlState {
            play: playable && !phase.is_active(),
            pause: phase == Phase::Running,
            resume: phase == Phase::Paused,
            stop: phase != Phase::Idle,
        }
    }

    pub fn events(&self) -> Vec<EventSummary> {
        event_summaries(&self.records)
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let player = self.active_player();
        let clock = player.clock();
        let now = self.clock.now_ms();
        SessionSnapshot {
            session_id: self.id,
            active_surface: self.active,
            selected_event: self.selected.clone(),
            phase: player.phase(),
            controls: self.controls(),
            speed_multiplier: self.speed_multiplier,
            segment_index: clock.segment_index(),
            fraction: clock.fraction_at(now),
            position: clock.position(),
            manual_tool: self.manual_tool,
            scene: player.surface().scene_snapshot(),
        }
    }

    fn waypoints_for(&self, event_id: &str) -> Vec<Waypoint> {
        build_path(&records_for_event(&self.records, event_id))
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn records(&self) -> &[EventLocationRecord] {
        &self.records
    }

    pub fn selected_event(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn active_surface(&self) -> SurfaceKind {
        self.active
    }

    pub fn speed_multiplier(&self) -> f64 {
        self.speed_multiplier
    }

    pub fn manual_tool_engaged(&self) -> bool {
        self.manual_tool
    }

    pub fn now_ms(&self) -> f64 {
        self.clock.now_ms()
    }

    pub fn player(&self, kind: SurfaceKind) -> &SurfacePlayer {
        match kind {
            SurfaceKind::Flat => &self.flat,
            SurfaceKind::Globe => &self.globe,
        }
    }

    pub fn active_player(&self) -> &SurfacePlayer {
        self.player(self.active)
    }

    fn player_mut(&mut self, kind: SurfaceKind) -> &mut SurfacePlayer {
        match kind {
            SurfaceKind::Flat => &mut self.flat,
            SurfaceKind::Globe => &mut self.globe,
        }
    }

    fn active_player_mut(&mut self) -> &mut SurfacePlayer {
        self.player_mut(self.active)
    }

    pub fn set_on_waypoint_reached(&mut self, callback: WaypointCallback) {
        self.on_waypoint_reached = Some(callback);
    }

    pub fn set_on_completed(&mut self, callback: CompletionCallback) {
        self.on_completed = Some(callback);
    }
}

// ============================================================================
// BUILDER
// ============================================================================

pub struct SessionBuilder {
    config: PlayerConfig,
    flat_surface: Option<Box<dyn RenderSurface>>,
    globe_surface: Option<Box<dyn RenderSurface>>,
    clock: Option<Arc<dyn FrameClock>>,
    records: Vec<EventLocationRecord>,
    surface: SurfaceKind,
    on_waypoint_reached: Option<WaypointCallback>,
    on_completed: Option<CompletionCallback>,
}

impl SessionBuilder {
    pub fn new(config: PlayerConfig) -> Self {
        Self {
            config,
            flat_surface: None,
            globe_surface: None,
            clock: None,
            records: Vec::new(),
            surface: SurfaceKind::Globe,
            on_waypoint_reached: None,
            on_completed: None,
        }
    }

    pub fn flat_surface(mut self, surface: Box<dyn RenderSurface>) -> Self {
        self.flat_surface = Some(surface);
        self
    }

    pub fn globe_surface(mut self, surface: Box<dyn RenderSurface>) -> Self {
        self.globe_surface = Some(surface);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn FrameClock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn records(mut self, records: Vec<EventLocationRecord>) -> Self {
        self.records = records;
        self
    }

    pub fn surface(mut self, kind: SurfaceKind) -> Self {
        self.surface = kind;
        self
    }

    pub fn on_waypoint_reached<F>(mut self, callback: F) -> Self
    where
        F: Fn(SurfaceKind, usize) + Send + Sync + 'static,
    {
        self.on_waypoint_reached = Some(Box::new(callback));
        self
    }

    pub fn on_completed<F>(mut self, callback: F) -> Self
    where
        F: Fn(SurfaceKind, &str) + Send + Sync + 'static,
    {
        self.on_completed = Some(Box::new(callback));
        self
    }

    pub fn build(self) -> ViewerSession {
        let flash_ms = self.config.flash_duration_ms;
        let flat_surface = self
            .flat_surface
            .unwrap_or_else(|| Box::new(HeadlessSurface::new(SurfaceKind::Flat)));
        let globe_surface = self
            .globe_surface
            .unwrap_or_else(|| Box::new(HeadlessSurface::new(SurfaceKind::Globe)));

        let session = ViewerSession {
            id: Uuid::new_v4(),
            clock: self.clock.unwrap_or_else(|| Arc::new(MonotonicClock::new())),
            records: self.records,
            selected: None,
            active: self.surface,
            flat: SurfacePlayer::new(flat_surface, self.config.flat, flash_ms),
            globe: SurfacePlayer::new(globe_surface, self.config.globe, flash_ms),
            speed_multiplier: self.config.default_speed_multiplier,
            manual_tool: false,
            static_render_pending: false,
            on_waypoint_reached: self.on_waypoint_reached,
            on_completed: self.on_completed,
        };
        log::info!("Viewer session {} created on the {} surface", session.id, session.active);
        session
    }
}
