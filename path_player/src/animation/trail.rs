// animation/trail.rs - Progressive trail sampled at a minimum spacing

use super::SurfaceKind;
use crate::types::GeoPosition;

/// Decides which interpolated positions become trail points.
///
/// A position is kept when it lies at least `min_spacing_m` from the last kept
/// point; waypoints are always kept so the trail passes through every vertex.
#[derive(Debug, Clone)]
pub struct TrailSampler {
    kind: SurfaceKind,
    min_spacing_m: f64,
    points: Vec<GeoPosition>,
}

impl TrailSampler {
    pub fn new(kind: SurfaceKind, min_spacing_m: f64) -> Self {
        Self {
            kind,
            min_spacing_m: min_spacing_m.max(0.0),
            points: Vec::new(),
        }
    }

    /// Offer an interpolated position; returns true if it was kept
    pub fn offer(&mut self, position: GeoPosition) -> bool {
        let keep = match self.points.last() {
            None => true,
            Some(last) => self.kind.distance_meters(*last, position) >= self.min_spacing_m,
        };
        if keep {
            self.points.push(position);
        }
        keep
    }

    /// Always keep a reached waypoint unless it repeats the last point exactly
    pub fn offer_waypoint(&mut self, position: GeoPosition) -> bool {
        if self.points.last() == Some(&position) {
            return false;
        }
        self.points.push(position);
        true
    }

    pub fn points(&self) -> &[GeoPosition] {
        &self.points
    }

    pub fn clear(&mut self) {
        self.points.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spacing_bounds_point_count() {
        let mut trail = TrailSampler::new(SurfaceKind::Flat, 100.0);
        // ~11m steps along the equator
        for i in 0..100 {
            trail.offer(GeoPosition::new(0.0, i as f64 * 0.0001, 0.0));
        }
        assert!(trail.points().len() < 20, "kept {}", trail.points().len());
        assert!(trail.points().len() > 5);
    }

    #[test]
    fn test_waypoints_always_kept() {
        let mut trail = TrailSampler::new(SurfaceKind::Globe, 1_000.0);
        assert!(trail.offer(GeoPosition::new(0.0, 0.0, 0.0)));
        assert!(!trail.offer(GeoPosition::new(0.0, 0.00001, 0.0)));
        assert!(trail.offer_waypoint(GeoPosition::new(0.0, 0.00002, 0.0)));
        assert!(!trail.offer_waypoint(GeoPosition::new(0.0, 0.00002, 0.0)));
        assert_eq!(trail.points().len(), 2);

        trail.clear();
        assert!(trail.points().is_empty());
    }
}
