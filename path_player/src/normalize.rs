// normalize.rs - Record normalizer: heterogeneous API payloads -> EventLocationRecord
//
// Every alias the backend has been seen to use lives in the tables below; the
// rest of the crate only ever sees the canonical record.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde_json::{Map, Value};

use crate::types::EventLocationRecord;

// ============================================================================
// FIELD ALIAS TABLE
// ============================================================================

const EVENT_ID_KEYS: &[&str] = &["event_id", "id", "pk"];
const EVENT_NAME_KEYS: &[&str] = &["event_name", "name"];
const DESCRIPTION_KEYS: &[&str] = &["event_description", "description"];
const SEVERITY_KEYS: &[&str] = &["severity_level", "severity"];
const STATUS_KEYS: &[&str] = &["status"];
const LOCATION_NAME_KEYS: &[&str] = &["location_name", "location", "place"];
const LATITUDE_KEYS: &[&str] = &["latitude", "lat", "y"];
const LONGITUDE_KEYS: &[&str] = &["longitude", "lon", "lng", "x"];
const ALTITUDE_KEYS: &[&str] = &["altitude_m", "alt"];
const RADIUS_KEYS: &[&str] = &["radius_km", "radius"];
const TIME_KEYS: &[&str] = &["event_time", "time", "timestamp"];
const SEQUENCE_KEYS: &[&str] = &["sequence_index", "sequence", "seq"];

/// Parent fields copied onto each nested location of an event-detail payload
const INHERITED_KEYS: &[&str] = &[
    "event_name",
    "event_description",
    "severity_level",
    "status",
    "images",
    "videos",
    "audios",
];

// ============================================================================
// PUBLIC API
// ============================================================================

/// Convert one raw API record into the canonical form.
///
/// Total: never panics, returns `None` when the payload is not an object,
/// lacks usable coordinates, or has no event identifier.
pub fn normalize(raw: &Value) -> Option<EventLocationRecord> {
    let obj = raw.as_object()?;

    let latitude = first(obj, LATITUDE_KEYS).and_then(parse_float)?;
    let longitude = first(obj, LONGITUDE_KEYS).and_then(parse_float)?;
    if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
        return None;
    }

    let event_id = first(obj, EVENT_ID_KEYS).map(as_text).unwrap_or_default();
    if event_id.is_empty() {
        return None;
    }

    Some(EventLocationRecord {
        event_id,
        latitude,
        longitude,
        altitude_m: first(obj, ALTITUDE_KEYS).and_then(parse_float).unwrap_or(0.0),
        severity_level: first(obj, SEVERITY_KEYS).and_then(parse_int).unwrap_or(1),
        event_time: first(obj, TIME_KEYS).and_then(parse_time),
        sequence_index: first(obj, SEQUENCE_KEYS).and_then(parse_int),
        event_name: first(obj, EVENT_NAME_KEYS)
            .map(as_text)
            .unwrap_or_else(|| "Unknown Event".to_string()),
        event_description: first(obj, DESCRIPTION_KEYS).map(as_text).unwrap_or_default(),
        status: first(obj, STATUS_KEYS)
            .map(as_text)
            .unwrap_or_else(|| "unknown".to_string()),
        location_name: first(obj, LOCATION_NAME_KEYS).map(as_text).unwrap_or_default(),
        radius_km: first(obj, RADIUS_KEYS).and_then(parse_float).unwrap_or(0.0),
        images: media_list(obj.get("images")),
        videos: media_list(obj.get("videos")),
        audios: media_list(obj.get("audios")),
    })
}

/// Normalize an event-detail payload, flattening a nested `locations` array.
///
/// Each location takes its event id from the parent, whichever alias the
/// parent uses, and ignores any id of its own. Severity and media are
/// inherited unless the location sets them; its own
/// `event_time` wins over the parent's. The position of a location within the
/// array becomes its `sequence_index` unless the location carries one.
pub fn normalize_event_detail(raw: &Value) -> Vec<EventLocationRecord> {
    let Some(obj) = raw.as_object() else {
        return Vec::new();
    };

    let Some(locations) = obj.get("locations").and_then(Value::as_array) else {
        return normalize(raw).into_iter().collect();
    };

    let event_id = first(obj, EVENT_ID_KEYS).cloned();

    locations
        .iter()
        .enumerate()
        .filter_map(|(index, loc)| {
            let mut merged = loc.as_object().cloned().unwrap_or_default();
            for key in EVENT_ID_KEYS {
                merged.remove(*key);
            }
            if let Some(id) = &event_id {
                merged.insert("event_id".to_string(), id.clone());
            }
            for key in INHERITED_KEYS {
                if let Some(value) = obj.get(*key) {
                    merged.entry(key.to_string()).or_insert_with(|| value.clone());
                }
            }
            if first(&merged, TIME_KEYS).is_none() {
                if let Some(time) = first(obj, TIME_KEYS) {
                    merged.insert("event_time".to_string(), time.clone());
                }
            }
            if first(&merged, SEQUENCE_KEYS).is_none() {
                merged.insert("sequence_index".to_string(), Value::from(index as i64));
            }
            normalize(&Value::Object(merged))
        })
        .collect()
}

/// One page of a (possibly paginated) listing
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    pub items: Vec<Value>,
    pub next: Option<String>,
}

/// Split a listing response into its items and the next-page link.
///
/// Accepts a bare array, `{results, next}`, `{data, next}` or a single event
/// object.
pub fn extract_page(page: &Value) -> Page {
    match page {
        Value::Array(items) => Page { items: items.clone(), next: None },
        Value::Object(obj) => {
            let next = obj.get("next").and_then(Value::as_str).map(str::to_string);
            if let Some(items) = obj.get("results").and_then(Value::as_array) {
                Page { items: items.clone(), next }
            } else if let Some(items) = obj.get("data").and_then(Value::as_array) {
                Page { items: items.clone(), next }
            } else if obj.contains_key("event_id") || obj.contains_key("id") {
                Page { items: vec![page.clone()], next: None }
            } else {
                Page::default()
            }
        }
        _ => Page::default(),
    }
}

/// Normalize every item of a listing, flattening nested locations
pub fn normalize_all(items: &[Value]) -> Vec<EventLocationRecord> {
    items.iter().flat_map(normalize_event_detail).collect()
}

// ============================================================================
// FIELD PARSERS
// ============================================================================

/// First alias present with a non-null value
fn first<'a>(obj: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|key| obj.get(*key))
        .find(|value| !value.is_null())
}

fn parse_float(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    parsed.is_finite().then_some(parsed)
}

fn parse_int(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>().ok().or_else(|| {
                s.parse::<f64>()
                    .ok()
                    .filter(|f| f.is_finite())
                    .map(|f| f.trunc() as i64)
            })
        }
        _ => None,
    }
}

fn as_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => String::new(),
    }
}

/// RFC 3339, naive "YYYY-MM-DD HH:MM:SS" (taken as UTC) or epoch milliseconds
fn parse_time(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => {
            let s = s.trim();
            if let Ok(t) = DateTime::parse_from_rfc3339(s) {
                return Some(t.with_timezone(&Utc));
            }
            ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"]
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
                .map(|naive| Utc.from_utc_datetime(&naive))
        }
        Value::Number(n) => n
            .as_i64()
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single()),
        _ => None,
    }
}

/// Media entries are either plain URLs or objects with a `url`/`file` field
fn media_list(value: Option<&Value>) -> Vec<String> {
    let Some(Value::Array(items)) = value else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| match item {
            Value::String(s) => Some(s.clone()),
            Value::Object(obj) => obj
                .get("url")
                .or_else(|| obj.get("file"))
                .and_then(Value::as_str)
                .map(str::to_string),
            _ => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_canonical_record() {
        let rec = normalize(&json!({
            "event_id": 7,
            "event_name": "Convoy",
            "latitude": "33.5",
            "longitude": 73.1,
            "altitude_m": 1200,
            "severity_level": "3",
            "event_time": "2024-05-01T10:00:00Z",
            "sequence": 2,
            "images": ["a.jpg", {"url": "b.jpg"}, 5],
        }))
        .unwrap();

        assert_eq!(rec.event_id, "7");
        assert_eq!(rec.event_name, "Convoy");
        assert_eq!(rec.latitude, 33.5);
        assert_eq!(rec.longitude, 73.1);
        assert_eq!(rec.altitude_m, 1200.0);
        assert_eq!(rec.severity_level, 3);
        assert_eq!(rec.sequence_index, Some(2));
        assert_eq!(rec.event_time_ms(), Some(1_714_557_600_000));
        assert_eq!(rec.images, vec!["a.jpg".to_string(), "b.jpg".to_string()]);
    }

    #[test]
    fn test_aliases_and_defaults() {
        let rec = normalize(&json!({"pk": "e9", "lat": 1.0, "lng": 2.0})).unwrap();
        assert_eq!(rec.event_id, "e9");
        assert_eq!(rec.altitude_m, 0.0);
        assert_eq!(rec.severity_level, 1);
        assert_eq!(rec.event_name, "Unknown Event");
        assert_eq!(rec.status, "unknown");
        assert!(rec.event_time.is_none());
        assert!(rec.sequence_index.is_none());

        let rec = normalize(&json!({"id": 1, "y": 10.0, "x": 20.0, "time": "2024-01-01 00:00:00"})).unwrap();
        assert_eq!((rec.latitude, rec.longitude), (10.0, 20.0));
        assert!(rec.event_time.is_some());
    }

    #[test]
    fn test_unusable_input_is_dropped() {
        assert!(normalize(&json!(null)).is_none());
        assert!(normalize(&json!([1, 2])).is_none());
        assert!(normalize(&json!({"event_id": "a", "latitude": 1.0})).is_none());
        assert!(normalize(&json!({"event_id": "a", "latitude": "north", "longitude": 1.0})).is_none());
        assert!(normalize(&json!({"event_id": "a", "latitude": 95.0, "longitude": 1.0})).is_none());
        assert!(normalize(&json!({"latitude": 1.0, "longitude": 1.0})).is_none());
    }

    #[test]
    fn test_garbage_fields_fall_back() {
        let rec = normalize(&json!({
            "event_id": "a",
            "latitude": 1.0,
            "longitude": 1.0,
            "altitude_m": "high",
            "severity": {"nested": true},
            "event_time": "yesterday",
        }))
        .unwrap();
        assert_eq!(rec.altitude_m, 0.0);
        assert_eq!(rec.severity_level, 1);
        assert!(rec.event_time.is_none());
    }

    #[test]
    fn test_event_detail_flattening() {
        let records = normalize_event_detail(&json!({
            "event_id": "E",
            "event_name": "Flight",
            "severity_level": 2,
            "event_time": "2024-05-01T10:00:00Z",
            "locations": [
                {"lat": 1.0, "lon": 1.0},
                {"lat": 2.0, "lon": 2.0, "event_time": "2024-05-01T10:05:00Z"},
                {"location_name": "nowhere"},
            ]
        }));

        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|r| r.event_id == "E" && r.severity_level == 2));
        assert_eq!(records[0].sequence_index, Some(0));
        assert_eq!(records[1].sequence_index, Some(1));
        assert_eq!(records[0].event_time_ms(), Some(1_714_557_600_000));
        assert_eq!(records[1].event_time_ms(), Some(1_714_557_900_000));
    }

    #[test]
    fn test_locations_take_parent_id_alias() {
        let records = normalize_event_detail(&json!({
            "id": "E7",
            "locations": [
                {"id": 101, "lat": 1.0, "lon": 1.0},
                {"id": 102, "lat": 2.0, "lon": 2.0},
                {"pk": 103, "lat": 3.0, "lon": 3.0},
            ]
        }));
        let ids: Vec<&str> = records.iter().map(|r| r.event_id.as_str()).collect();
        assert_eq!(ids, vec!["E7", "E7", "E7"]);

        let records = normalize_event_detail(&json!({
            "pk": 8,
            "locations": [{"lat": 1.0, "lon": 1.0}, {"lat": 2.0, "lon": 2.0}]
        }));
        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|r| r.event_id == "8"));

        let orphans = normalize_event_detail(&json!({
            "name": "no id",
            "locations": [{"id": 1, "lat": 1.0, "lon": 1.0}]
        }));
        assert!(orphans.is_empty());
    }

    #[test]
    fn test_extract_page_shapes() {
        let page = extract_page(&json!({"results": [{"id": 1}], "next": "http://x/?page=2"}));
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.next.as_deref(), Some("http://x/?page=2"));

        let page = extract_page(&json!({"data": [{"id": 1}, {"id": 2}]}));
        assert_eq!(page.items.len(), 2);
        assert!(page.next.is_none());

        assert_eq!(extract_page(&json!([{"id": 1}])).items.len(), 1);
        assert_eq!(extract_page(&json!({"event_id": 3})).items.len(), 1);
        assert!(extract_page(&json!({"detail": "nope"})).items.is_empty());
        assert!(extract_page(&json!("text")).items.is_empty());
    }
}
