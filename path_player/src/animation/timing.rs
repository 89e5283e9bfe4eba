// animation/timing.rs - Segment timing model and the per-playback timeline

use serde::{Deserialize, Serialize};

use super::SurfaceKind;
use crate::types::Waypoint;

/// Named, overridable timing parameters of one surface
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    /// Constant travel speed for distance-based timing
    pub speed_mps: f64,
    pub min_segment_ms: f64,
    pub max_segment_ms: f64,
    /// Floor on the whole traversal in distance mode
    pub min_total_ms: f64,
    /// Use recorded event-time gaps when both endpoints have timestamps
    pub time_based: bool,
}

impl TimingConfig {
    pub const MIN_SEGMENT_MS: f64 = 200.0;
    pub const MAX_SEGMENT_MS: f64 = 4000.0;
    pub const MIN_TOTAL_MS: f64 = 5000.0;

    /// 3D globe defaults
    pub fn globe() -> Self {
        Self {
            speed_mps: 1000.0,
            min_segment_ms: Self::MIN_SEGMENT_MS,
            max_segment_ms: Self::MAX_SEGMENT_MS,
            min_total_ms: Self::MIN_TOTAL_MS,
            time_based: false,
        }
    }

    /// 2D map defaults; the map animates far faster than the globe
    pub fn flat() -> Self {
        Self { speed_mps: 14_000.0, ..Self::globe() }
    }

    pub fn for_surface(kind: SurfaceKind) -> Self {
        match kind {
            SurfaceKind::Flat => Self::flat(),
            SurfaceKind::Globe => Self::globe(),
        }
    }

    pub fn with_speed(mut self, speed_mps: f64) -> Self {
        self.speed_mps = speed_mps;
        self
    }

    pub fn with_time_based(mut self, enabled: bool) -> Self {
        self.time_based = enabled;
        self
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self::globe()
    }
}

/// Traversal of one waypoint-to-waypoint leg
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    pub start_index: usize,
    pub duration_ms: f64,
}

impl Segment {
    #[inline]
    pub fn end_index(&self) -> usize {
        self.start_index + 1
    }
}

/// Compute one duration per consecutive waypoint pair.
///
/// Distance mode: the whole path takes `max(min_total_ms, D / speed)` and each
/// segment gets its distance share of that, floored at `min_segment_ms`. When
/// `D == 0` every segment gets the floor. Time mode overrides a segment with
/// its clamped timestamp gap when both endpoints carry a time.
pub fn segment_durations(waypoints: &[Waypoint], kind: SurfaceKind, config: &TimingConfig) -> Vec<f64> {
    if waypoints.len() < 2 {
        return Vec::new();
    }

    let distances: Vec<f64> = waypoints
        .windows(2)
        .map(|pair| kind.distance_meters(pair[0].position, pair[1].position))
        .collect();
    let total_distance: f64 = distances.iter().sum();

    let mut durations: Vec<f64> = if total_distance > 0.0 && config.speed_mps > 0.0 {
        let total_ms = (total_distance / config.speed_mps * 1000.0).max(config.min_total_ms);
        distances
            .iter()
            .map(|d| (d / total_distance * total_ms).max(config.min_segment_ms))
            .collect()
    } else {
        vec![config.min_segment_ms; distances.len()]
    };

    if config.time_based {
        for (i, pair) in waypoints.windows(2).enumerate() {
            if let (Some(t1), Some(t2)) = (pair[0].record.event_time_ms(), pair[1].record.event_time_ms()) {
                durations[i] = ((t2 - t1) as f64).clamp(config.min_segment_ms, config.max_segment_ms);
            }
        }
    }

    durations
}

/// Waypoints and segment schedule of one playback; immutable once built
#[derive(Debug, Clone)]
pub struct PathTimeline {
    waypoints: Vec<Waypoint>,
    segments: Vec<Segment>,
    cumulative_start_ms: Vec<f64>,
}

impl PathTimeline {
    pub fn build(waypoints: Vec<Waypoint>, kind: SurfaceKind, config: &TimingConfig) -> Self {
        let segments: Vec<Segment> = segment_durations(&waypoints, kind, config)
            .into_iter()
            .enumerate()
            .map(|(start_index, duration_ms)| Segment { start_index, duration_ms })
            .collect();

        let mut offset = 0.0;
        let cumulative_start_ms = segments
            .iter()
            .map(|s| {
                let start = offset;
                offset += s.duration_ms;
                start
            })
            .collect();

        Self { waypoints, segments, cumulative_start_ms }
    }

    pub fn waypoints(&self) -> &[Waypoint] {
        &self.waypoints
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn segment(&self, index: usize) -> Option<&Segment> {
        self.segments.get(index)
    }

    pub fn cumulative_start_ms(&self) -> &[f64] {
        &self.cumulative_start_ms
    }

    /// Unscaled traversal time of the whole path
    pub fn total_duration_ms(&self) -> f64 {
        self.segments.iter().map(|s| s.duration_ms).sum()
    }
}
