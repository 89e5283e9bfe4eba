// types.rs - Shared type definitions for event records and positions
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Geodetic position in degrees / meters above the ellipsoid
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct GeoPosition {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(rename = "altitudeMeters")]
    pub altitude_m: f64,
}

impl GeoPosition {
    pub const fn new(latitude: f64, longitude: f64, altitude_m: f64) -> Self {
        Self { latitude, longitude, altitude_m }
    }
}

/// Severity buckets used for the default visual treatment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    Low,
    Medium,
    High,
    Unknown,
}

impl Severity {
    pub fn from_level(level: i64) -> Self {
        match level {
            1 => Severity::Low,
            2 => Severity::Medium,
            3 => Severity::High,
            _ => Severity::Unknown,
        }
    }

    /// Marker/path color name on both surfaces
    pub fn color(self) -> &'static str {
        match self {
            Severity::Low => "green",
            Severity::Medium => "yellow",
            Severity::High => "red",
            Severity::Unknown => "blue",
        }
    }
}

/// Canonical event-location record produced by the normalizer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventLocationRecord {
    #[serde(rename = "eventId")]
    pub event_id: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(rename = "altitudeMeters")]
    pub altitude_m: f64,
    #[serde(rename = "severityLevel")]
    pub severity_level: i64,
    #[serde(rename = "eventTime")]
    pub event_time: Option<DateTime<Utc>>,
    #[serde(rename = "sequenceIndex")]
    pub sequence_index: Option<i64>,

    #[serde(rename = "eventName")]
    pub event_name: String,
    #[serde(rename = "eventDescription")]
    pub event_description: String,
    pub status: String,
    #[serde(rename = "locationName")]
    pub location_name: String,
    #[serde(rename = "radiusKm")]
    pub radius_km: f64,
    pub images: Vec<String>,
    pub videos: Vec<String>,
    pub audios: Vec<String>,
}

impl EventLocationRecord {
    /// Minimal record with defaults for every descriptive field
    pub fn new(event_id: impl Into<String>, latitude: f64, longitude: f64) -> Self {
        Self {
            event_id: event_id.into(),
            latitude,
            longitude,
            altitude_m: 0.0,
            severity_level: 1,
            event_time: None,
            sequence_index: None,
            event_name: "Unknown Event".to_string(),
            event_description: String::new(),
            status: "unknown".to_string(),
            location_name: String::new(),
            radius_km: 0.0,
            images: Vec::new(),
            videos: Vec::new(),
            audios: Vec::new(),
        }
    }

    pub fn with_altitude(mut self, altitude_m: f64) -> Self {
        self.altitude_m = altitude_m;
        self
    }

    pub fn with_sequence(mut self, index: i64) -> Self {
        self.sequence_index = Some(index);
        self
    }

    pub fn with_time(mut self, time: DateTime<Utc>) -> Self {
        self.event_time = Some(time);
        self
    }

    pub fn with_severity(mut self, level: i64) -> Self {
        self.severity_level = level;
        self
    }

    pub fn position(&self) -> GeoPosition {
        GeoPosition::new(self.latitude, self.longitude, self.altitude_m)
    }

    pub fn severity(&self) -> Severity {
        Severity::from_level(self.severity_level)
    }

    /// Event time in epoch milliseconds, if present
    pub fn event_time_ms(&self) -> Option<i64> {
        self.event_time.map(|t| t.timestamp_millis())
    }
}

/// One geolocated point of an event's ordered path
#[derive(Debug, Clone, PartialEq)]
pub struct Waypoint {
    pub position: GeoPosition,
    pub record: EventLocationRecord,
}

impl Waypoint {
    pub fn from_record(record: EventLocationRecord) -> Self {
        Self { position: record.position(), record }
    }
}

/// One entry of the event selection list
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventSummary {
    #[serde(rename = "eventId")]
    pub event_id: String,
    #[serde(rename = "eventName")]
    pub event_name: String,
    #[serde(rename = "latestTime")]
    pub latest_time: Option<DateTime<Utc>>,
    #[serde(rename = "locationCount")]
    pub location_count: usize,
    #[serde(rename = "severityLevel")]
    pub severity_level: i64,
}

impl EventSummary {
    /// Dropdown label, e.g. "Convoy - 2024-05-01 10:00:00 UTC (3 locations)"
    pub fn label(&self) -> String {
        let time = self
            .latest_time
            .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
            .unwrap_or_else(|| "no-time".to_string());
        let plural = if self.location_count == 1 { "" } else { "s" };
        format!("{} - {} ({} location{})", self.event_name, time, self.location_count, plural)
    }
}
