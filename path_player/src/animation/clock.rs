// animation/clock.rs - Frame-driven playback clock for one surface
//
// The clock is a plain state machine: every method takes the current
// wall-clock reading, so tests drive it with a manual clock and no renderer.

use super::{orientation_between, Interpolate, Orientation, PathTimeline, Phase};
use crate::error_handling::{PlaybackError, Result};
use crate::types::GeoPosition;

/// Registration of the pending per-frame callback.
///
/// Pause, stop and completion invalidate the current ticket; a frame that
/// presents a stale ticket is ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameTicket {
    generation: u64,
}

/// What one frame displays
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameSample {
    pub position: GeoPosition,
    pub orientation: Orientation,
    pub segment_index: usize,
    /// Interpolation fraction within `segment_index`, in [0, 1]
    pub fraction: f64,
    /// Waypoint index reached (and snapped to) on this frame
    pub reached_waypoint: Option<usize>,
    pub completed: bool,
}

/// Single-run playback clock
#[derive(Debug)]
pub struct AnimationClock {
    timeline: Option<PathTimeline>,
    event_id: Option<String>,
    phase: Phase,

    segment_index: usize,
    /// Progress time already consumed in the current segment, in unscaled
    /// segment milliseconds (i.e. already multiplied by the speed in effect)
    elapsed_ms_in_segment: f64,
    /// Wall-clock time from which running time is not yet folded into
    /// `elapsed_ms_in_segment`
    anchor_ms: f64,
    speed_multiplier: f64,

    generation: u64,
    registration: Option<FrameTicket>,
    position: Option<GeoPosition>,
}

impl AnimationClock {
    pub fn new() -> Self {
        Self {
            timeline: None,
            event_id: None,
            phase: Phase::Idle,
            segment_index: 0,
            elapsed_ms_in_segment: 0.0,
            anchor_ms: 0.0,
            speed_multiplier: 1.0,
            generation: 0,
            registration: None,
            position: None,
        }
    }

    /// Begin a run over `timeline`. Any previous run is discarded; the caller
    /// is responsible for tearing down its visuals first.
    pub fn start(
        &mut self,
        event_id: &str,
        timeline: PathTimeline,
        speed_multiplier: f64,
        now_ms: f64,
    ) -> Result<FrameTicket> {
        validate_multiplier(speed_multiplier)?;
        if timeline.segments().is_empty() {
            return Err(PlaybackError::NoData {
                event_id: event_id.to_string(),
                waypoints: timeline.waypoints().len(),
            });
        }

        self.stop();
        self.position = timeline.waypoints().first().map(|w| w.position);
        self.timeline = Some(timeline);
        self.event_id = Some(event_id.to_string());
        self.speed_multiplier = speed_multiplier;
        self.anchor_ms = now_ms;
        self.phase = Phase::Running;
        Ok(self.register())
    }

    /// Running -> Paused. Returns false (and changes nothing) from any other phase.
    pub fn pause(&mut self, now_ms: f64) -> bool {
        if self.phase != Phase::Running {
            return false;
        }
        self.fold_running_time(now_ms);
        self.invalidate();
        self.phase = Phase::Paused;
        true
    }

    /// Paused -> Running, continuing from the accumulated progress
    pub fn resume(&mut self, now_ms: f64) -> Option<FrameTicket> {
        if self.phase != Phase::Paused {
            return None;
        }
        self.anchor_ms = now_ms;
        self.phase = Phase::Running;
        Some(self.register())
    }

    /// Back to Idle from any phase. Returns false when already Idle.
    pub fn stop(&mut self) -> bool {
        if self.phase == Phase::Idle {
            return false;
        }
        self.invalidate();
        self.timeline = None;
        self.event_id = None;
        self.phase = Phase::Idle;
        self.segment_index = 0;
        self.elapsed_ms_in_segment = 0.0;
        self.position = None;
        true
    }

    /// Change playback speed without moving the displayed position.
    ///
    /// Running time up to `now_ms` is folded in at the old multiplier, so the
    /// new one only applies to time that has not elapsed yet.
    pub fn set_speed_multiplier(&mut self, factor: f64, now_ms: f64) -> Result<()> {
        validate_multiplier(factor)?;
        if self.phase == Phase::Running {
            self.fold_running_time(now_ms);
        }
        self.speed_multiplier = factor;
        Ok(())
    }

    /// Advance to `now_ms`. Returns `None` for a stale ticket or when not Running.
    pub fn advance(&mut self, ticket: FrameTicket, now_ms: f64) -> Option<FrameSample> {
        if self.registration != Some(ticket) || self.phase != Phase::Running {
            return None;
        }

        let (segment, start, end, segment_count) = {
            let timeline = self.timeline.as_ref()?;
            let segment = *timeline.segment(self.segment_index)?;
            let waypoints = timeline.waypoints();
            (
                segment,
                waypoints[segment.start_index].position,
                waypoints[segment.end_index()].position,
                timeline.segments().len(),
            )
        };

        let fraction = self.fraction_for(segment.duration_ms, now_ms);
        let orientation = orientation_between(start, end);
        let mut sample = FrameSample {
            position: start.interpolate(&end, fraction),
            orientation,
            segment_index: self.segment_index,
            fraction,
            reached_waypoint: None,
            completed: false,
        };

        if fraction >= 1.0 {
            sample.position = end;
            sample.reached_waypoint = Some(segment.end_index());

            self.segment_index += 1;
            self.elapsed_ms_in_segment = 0.0;
            self.anchor_ms = now_ms;

            if self.segment_index >= segment_count {
                self.segment_index = segment_count - 1;
                self.invalidate();
                self.phase = Phase::Completed;
                sample.completed = true;
            }
        }

        self.position = Some(sample.position);
        Some(sample)
    }

    /// Fraction of the current segment that would be displayed at `now_ms`
    pub fn fraction_at(&self, now_ms: f64) -> f64 {
        if self.phase == Phase::Completed {
            return 1.0;
        }
        self.timeline
            .as_ref()
            .and_then(|t| t.segment(self.segment_index))
            .map(|s| self.fraction_for(s.duration_ms, now_ms))
            .unwrap_or(0.0)
    }

    fn fraction_for(&self, duration_ms: f64, now_ms: f64) -> f64 {
        let mut progressed = self.elapsed_ms_in_segment;
        if self.phase == Phase::Running {
            progressed += (now_ms - self.anchor_ms).max(0.0) * self.speed_multiplier;
        }
        if duration_ms <= 0.0 {
            return 1.0;
        }
        (progressed / duration_ms).clamp(0.0, 1.0)
    }

    fn fold_running_time(&mut self, now_ms: f64) {
        self.elapsed_ms_in_segment += (now_ms - self.anchor_ms).max(0.0) * self.speed_multiplier;
        self.anchor_ms = now_ms;
    }

    fn register(&mut self) -> FrameTicket {
        self.generation += 1;
        let ticket = FrameTicket { generation: self.generation };
        self.registration = Some(ticket);
        ticket
    }

    fn invalidate(&mut self) {
        self.generation += 1;
        self.registration = None;
    }

    /// Ticket of the pending frame registration, if any
    pub fn pending_ticket(&self) -> Option<FrameTicket> {
        self.registration
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn event_id(&self) -> Option<&str> {
        self.event_id.as_deref()
    }

    pub fn timeline(&self) -> Option<&PathTimeline> {
        self.timeline.as_ref()
    }

    pub fn segment_index(&self) -> usize {
        self.segment_index
    }

    pub fn elapsed_ms_in_segment(&self) -> f64 {
        self.elapsed_ms_in_segment
    }

    pub fn speed_multiplier(&self) -> f64 {
        self.speed_multiplier
    }

    /// Last displayed position of the moving entity
    pub fn position(&self) -> Option<GeoPosition> {
        self.position
    }
}

impl Default for AnimationClock {
    fn default() -> Self {
        Self::new()
    }
}

pub(crate) fn validate_multiplier(factor: f64) -> Result<()> {
    if factor.is_finite() && factor > 0.0 {
        Ok(())
    } else {
        Err(PlaybackError::InvalidParameters(format!(
            "speed multiplier must be a positive number, got {factor}"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::{SurfaceKind, TimingConfig};
    use crate::types::{EventLocationRecord, Waypoint};

    /// Three waypoints on the equator; min_total pins every segment to 1000ms
    fn timeline() -> PathTimeline {
        let config = TimingConfig {
            speed_mps: 1.0e12,
            min_segment_ms: 1000.0,
            max_segment_ms: 4000.0,
            min_total_ms: 0.0,
            time_based: false,
        };
        let waypoints = [0.0, 1.0, 2.0]
            .iter()
            .map(|lon| Waypoint::from_record(EventLocationRecord::new("e", 0.0, *lon)))
            .collect();
        PathTimeline::build(waypoints, SurfaceKind::Flat, &config)
    }

    #[test]
    fn test_single_waypoint_rejected() {
        let mut clock = AnimationClock::new();
        let single = PathTimeline::build(
            vec![Waypoint::from_record(EventLocationRecord::new("e", 0.0, 0.0))],
            SurfaceKind::Flat,
            &TimingConfig::flat(),
        );
        let err = clock.start("e", single, 1.0, 0.0).unwrap_err();
        assert!(matches!(err, PlaybackError::NoData { waypoints: 1, .. }));
        assert_eq!(clock.phase(), Phase::Idle);
    }

    #[test]
    fn test_interpolates_midway() {
        let mut clock = AnimationClock::new();
        let ticket = clock.start("e", timeline(), 1.0, 0.0).unwrap();
        let sample = clock.advance(ticket, 500.0).unwrap();
        assert!((sample.fraction - 0.5).abs() < 1e-12);
        assert!((sample.position.longitude - 0.5).abs() < 1e-9);
        assert_eq!(sample.reached_waypoint, None);
    }

    #[test]
    fn test_pause_resume_continuity() {
        let mut paused = AnimationClock::new();
        let ticket = paused.start("e", timeline(), 1.0, 0.0).unwrap();
        paused.advance(ticket, 300.0);
        assert!(paused.pause(300.0));
        assert_eq!(paused.pending_ticket(), None);
        let ticket = paused.resume(10_300.0).unwrap();
        let a = paused.advance(ticket, 10_700.0).unwrap();

        let mut straight = AnimationClock::new();
        let ticket = straight.start("e", timeline(), 1.0, 0.0).unwrap();
        let b = straight.advance(ticket, 700.0).unwrap();

        assert!((a.fraction - b.fraction).abs() < 1e-12);
        assert_eq!(a.position, b.position);
    }

    #[test]
    fn test_large_delta_snaps_to_segment_end() {
        let mut clock = AnimationClock::new();
        let ticket = clock.start("e", timeline(), 1.0, 0.0).unwrap();
        let sample = clock.advance(ticket, 2_750.0).unwrap();

        assert_eq!(sample.position, GeoPosition::new(0.0, 1.0, 0.0));
        assert_eq!(sample.reached_waypoint, Some(1));
        assert_eq!(clock.segment_index(), 1);
        assert_eq!(clock.elapsed_ms_in_segment(), 0.0);
        // overflow is not carried into the next segment
        assert_eq!(clock.fraction_at(2_750.0), 0.0);
    }

    #[test]
    fn test_completion() {
        let mut clock = AnimationClock::new();
        let ticket = clock.start("e", timeline(), 1.0, 0.0).unwrap();
        clock.advance(ticket, 1_000.0).unwrap();
        let last = clock.advance(ticket, 2_000.0).unwrap();

        assert!(last.completed);
        assert_eq!(last.reached_waypoint, Some(2));
        assert_eq!(last.position, GeoPosition::new(0.0, 2.0, 0.0));
        assert_eq!(clock.phase(), Phase::Completed);
        assert_eq!(clock.pending_ticket(), None);
        assert!(clock.advance(ticket, 3_000.0).is_none());
        assert_eq!(clock.position(), Some(GeoPosition::new(0.0, 2.0, 0.0)));
    }

    #[test]
    fn test_speed_change_is_continuous() {
        let mut clock = AnimationClock::new();
        let ticket = clock.start("e", timeline(), 1.0, 0.0).unwrap();
        clock.advance(ticket, 200.0);

        let before = clock.fraction_at(400.0);
        clock.set_speed_multiplier(4.0, 400.0).unwrap();
        assert!((clock.fraction_at(400.0) - before).abs() < 1e-12);

        // 400ms at 1x + 100ms at 4x
        let sample = clock.advance(ticket, 500.0).unwrap();
        assert!((sample.fraction - 0.8).abs() < 1e-12);
    }

    #[test]
    fn test_speed_change_while_paused() {
        let mut clock = AnimationClock::new();
        let ticket = clock.start("e", timeline(), 1.0, 0.0).unwrap();
        clock.advance(ticket, 250.0);
        clock.pause(250.0);
        clock.set_speed_multiplier(2.0, 5_000.0).unwrap();
        assert!((clock.fraction_at(5_000.0) - 0.25).abs() < 1e-12);

        let ticket = clock.resume(6_000.0).unwrap();
        let sample = clock.advance(ticket, 6_100.0).unwrap();
        assert!((sample.fraction - 0.45).abs() < 1e-12);
    }

    #[test]
    fn test_invalid_multiplier_rejected() {
        let mut clock = AnimationClock::new();
        for bad in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            assert!(clock.set_speed_multiplier(bad, 0.0).is_err());
        }
        assert!(clock.start("e", timeline(), 0.0, 0.0).is_err());
        assert_eq!(clock.speed_multiplier(), 1.0);
    }

    #[test]
    fn test_stale_tickets_are_ignored() {
        let mut clock = AnimationClock::new();
        let first = clock.start("e", timeline(), 1.0, 0.0).unwrap();
        clock.pause(100.0);
        assert!(clock.advance(first, 200.0).is_none());

        let second = clock.resume(200.0).unwrap();
        assert_ne!(first, second);
        assert!(clock.advance(first, 300.0).is_none());
        assert!(clock.advance(second, 300.0).is_some());

        clock.stop();
        assert!(clock.advance(second, 400.0).is_none());
    }

    #[test]
    fn test_phase_guards_and_idempotent_stop() {
        let mut clock = AnimationClock::new();
        assert!(!clock.pause(0.0));
        assert!(clock.resume(0.0).is_none());
        assert!(!clock.stop());

        clock.start("e", timeline(), 1.0, 0.0).unwrap();
        assert!(clock.resume(10.0).is_none());
        assert!(clock.pause(10.0));
        assert!(!clock.pause(20.0));
        assert!(clock.stop());
        assert!(!clock.stop());
        assert_eq!(clock.phase(), Phase::Idle);
        assert_eq!(clock.event_id(), None);
        assert!(clock.timeline().is_none());
    }
}
