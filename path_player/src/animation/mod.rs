// animation/mod.rs - Path playback system shared by the 2D map and the 3D globe

pub mod path_builder;
pub mod timing;
pub mod clock;
pub mod trail;
pub mod camera;
pub mod surface;
pub mod headless;
pub mod player;
pub mod session;

pub use path_builder::*;
pub use timing::*;
pub use clock::*;
pub use trail::*;
pub use camera::*;
pub use surface::*;
pub use headless::*;
pub use player::*;
pub use session::*;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::types::GeoPosition;

// ============================================================================
// PLAYBACK STATE
// ============================================================================

/// Playback phase of one surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Phase {
    #[default]
    Idle,
    Running,
    Paused,
    Completed,
}

impl Phase {
    /// Running or Paused: the playback owns the surface's entities
    #[inline]
    pub fn is_active(self) -> bool {
        matches!(self, Phase::Running | Phase::Paused)
    }
}

/// The two independent rendering contexts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SurfaceKind {
    /// Leaflet-style 2D map
    #[serde(rename = "2d")]
    Flat,
    /// Cesium-style 3D globe
    #[serde(rename = "3d")]
    Globe,
}

impl SurfaceKind {
    /// Only the globe renders a model with heading/pitch and a tracking camera
    #[inline]
    pub fn has_orientation(self) -> bool {
        self == SurfaceKind::Globe
    }

    /// Distance metric used for timing and trail spacing on this surface
    pub fn distance_meters(self, a: GeoPosition, b: GeoPosition) -> f64 {
        match self {
            SurfaceKind::Flat => haversine_meters(a, b),
            SurfaceKind::Globe => (geodetic_to_ecef(b) - geodetic_to_ecef(a)).length(),
        }
    }
}

impl fmt::Display for SurfaceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SurfaceKind::Flat => write!(f, "2d"),
            SurfaceKind::Globe => write!(f, "3d"),
        }
    }
}

impl FromStr for SurfaceKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "2d" | "flat" | "map" => Ok(SurfaceKind::Flat),
            "3d" | "globe" => Ok(SurfaceKind::Globe),
            other => Err(format!("unknown surface '{other}' (expected 2d or 3d)")),
        }
    }
}

// ============================================================================
// CORE MATH TYPES
// ============================================================================

/// Earth-fixed cartesian vector in meters
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    #[inline]
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    #[inline]
    pub const fn zero() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }

    #[inline]
    pub fn length(self) -> f64 {
        self.dot(self).sqrt()
    }

    #[inline]
    pub fn normalize(self) -> Vec3 {
        let len = self.length();
        if len > 1e-12 {
            self / len
        } else {
            Vec3::zero()
        }
    }

    #[inline]
    pub fn dot(self, other: Vec3) -> f64 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }
}

impl std::ops::Add for Vec3 {
    type Output = Vec3;
    #[inline]
    fn add(self, other: Vec3) -> Vec3 {
        Vec3::new(self.x + other.x, self.y + other.y, self.z + other.z)
    }
}

impl std::ops::Sub for Vec3 {
    type Output = Vec3;
    #[inline]
    fn sub(self, other: Vec3) -> Vec3 {
        Vec3::new(self.x - other.x, self.y - other.y, self.z - other.z)
    }
}

impl std::ops::Mul<f64> for Vec3 {
    type Output = Vec3;
    #[inline]
    fn mul(self, scalar: f64) -> Vec3 {
        Vec3::new(self.x * scalar, self.y * scalar, self.z * scalar)
    }
}

impl std::ops::Div<f64> for Vec3 {
    type Output = Vec3;
    #[inline]
    fn div(self, scalar: f64) -> Vec3 {
        let inv = 1.0 / scalar;
        Vec3::new(self.x * inv, self.y * inv, self.z * inv)
    }
}

/// Heading (clockwise from north) and pitch (positive up), radians
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Orientation {
    pub heading: f64,
    pub pitch: f64,
}

// ============================================================================
// INTERPOLATION
// ============================================================================

/// Types the playback clock can interpolate between waypoints
pub trait Interpolate: Copy {
    fn interpolate(&self, other: &Self, t: f64) -> Self;
}

impl Interpolate for f64 {
    #[inline]
    fn interpolate(&self, other: &Self, t: f64) -> Self {
        lerp(*self, *other, t)
    }
}

impl Interpolate for GeoPosition {
    /// Linear in latitude/longitude/altitude, crossing the antimeridian the short way
    fn interpolate(&self, other: &Self, t: f64) -> Self {
        let t = t.clamp(0.0, 1.0);
        let mut d_lon = other.longitude - self.longitude;
        if d_lon > 180.0 {
            d_lon -= 360.0;
        } else if d_lon < -180.0 {
            d_lon += 360.0;
        }
        GeoPosition::new(
            lerp(self.latitude, other.latitude, t),
            wrap_longitude(self.longitude + d_lon * t),
            lerp(self.altitude_m, other.altitude_m, t),
        )
    }
}

/// Linear interpolation
#[inline]
pub fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t.clamp(0.0, 1.0)
}

#[inline]
fn wrap_longitude(lon: f64) -> f64 {
    if lon > 180.0 {
        lon - 360.0
    } else if lon < -180.0 {
        lon + 360.0
    } else {
        lon
    }
}

// ============================================================================
// GEODESY
// ============================================================================

/// Mean earth radius for great-circle distances
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

const WGS84_A: f64 = 6_378_137.0;
const WGS84_E2: f64 = 6.694_379_990_141_33e-3;

/// Great-circle distance on lat/lon, altitude ignored
pub fn haversine_meters(a: GeoPosition, b: GeoPosition) -> f64 {
    let lat1 = a.latitude.to_radians();
    let lat2 = b.latitude.to_radians();
    let d_lat = lat2 - lat1;
    let d_lon = (b.longitude - a.longitude).to_radians();
    let s = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * s.sqrt().min(1.0).asin()
}

/// WGS84 geodetic -> earth-centered earth-fixed
pub fn geodetic_to_ecef(p: GeoPosition) -> Vec3 {
    let lat = p.latitude.to_radians();
    let lon = p.longitude.to_radians();
    let (sin_lat, cos_lat) = lat.sin_cos();
    let (sin_lon, cos_lon) = lon.sin_cos();
    let n = WGS84_A / (1.0 - WGS84_E2 * sin_lat * sin_lat).sqrt();
    Vec3::new(
        (n + p.altitude_m) * cos_lat * cos_lon,
        (n + p.altitude_m) * cos_lat * sin_lon,
        (n * (1.0 - WGS84_E2) + p.altitude_m) * sin_lat,
    )
}

/// Heading/pitch of the segment `from -> to`, measured in the local
/// east-north-up frame at `from`. Coincident points give a level, north heading.
pub fn orientation_between(from: GeoPosition, to: GeoPosition) -> Orientation {
    let dir = (geodetic_to_ecef(to) - geodetic_to_ecef(from)).normalize();
    if dir == Vec3::zero() {
        return Orientation::default();
    }

    let lat = from.latitude.to_radians();
    let lon = from.longitude.to_radians();
    let (sin_lat, cos_lat) = lat.sin_cos();
    let (sin_lon, cos_lon) = lon.sin_cos();
    let east = Vec3::new(-sin_lon, cos_lon, 0.0);
    let north = Vec3::new(-sin_lat * cos_lon, -sin_lat * sin_lon, cos_lat);
    let up = Vec3::new(cos_lat * cos_lon, cos_lat * sin_lon, sin_lat);

    let e = dir.dot(east);
    let n = dir.dot(north);
    let u = dir.dot(up).clamp(-1.0, 1.0);

    let mut heading = e.atan2(n);
    if heading < 0.0 {
        heading += std::f64::consts::TAU;
    }
    Orientation { heading, pitch: u.asin() }
}
