// animation/path_builder.rs - Groups records by event and orders each group into a path

use std::collections::HashMap;

use crate::types::{EventLocationRecord, EventSummary, Waypoint};

/// Order one event's records into waypoints.
///
/// `sequence_index` is authoritative when every record carries one; otherwise
/// records are ordered by `event_time` with missing times treated as the
/// epoch. Both sorts are stable, so ties keep their input order.
pub fn build_path(records: &[EventLocationRecord]) -> Vec<Waypoint> {
    let mut sorted: Vec<&EventLocationRecord> = records.iter().collect();

    if !sorted.is_empty() && sorted.iter().all(|r| r.sequence_index.is_some()) {
        sorted.sort_by_key(|r| r.sequence_index.unwrap_or_default());
    } else {
        sorted.sort_by_key(|r| r.event_time_ms().unwrap_or(0));
    }

    sorted.into_iter().cloned().map(Waypoint::from_record).collect()
}

/// Records of one event, in snapshot order
pub fn records_for_event(records: &[EventLocationRecord], event_id: &str) -> Vec<EventLocationRecord> {
    records.iter().filter(|r| r.event_id == event_id).cloned().collect()
}

/// Group a snapshot by `event_id`, keeping first-seen event order
pub fn group_by_event(records: &[EventLocationRecord]) -> Vec<(String, Vec<EventLocationRecord>)> {
    let mut order: Vec<String> = Vec::new();
    let mut groups: HashMap<&str, Vec<EventLocationRecord>> = HashMap::new();

    for record in records {
        let group = groups.entry(record.event_id.as_str()).or_insert_with(|| {
            order.push(record.event_id.clone());
            Vec::new()
        });
        group.push(record.clone());
    }

    order
        .into_iter()
        .map(|id| {
            let group = groups.remove(id.as_str()).unwrap_or_default();
            (id, group)
        })
        .collect()
}

/// One summary per event for selection lists; the latest record names the event
pub fn event_summaries(records: &[EventLocationRecord]) -> Vec<EventSummary> {
    group_by_event(records)
        .into_iter()
        .filter_map(|(event_id, group)| {
            let latest = group.last()?;
            Some(EventSummary {
                event_id,
                event_name: latest.event_name.clone(),
                latest_time: group.iter().filter_map(|r| r.event_time).max(),
                location_count: group.len(),
                severity_level: latest.severity_level,
            })
        })
        .collect()
}
