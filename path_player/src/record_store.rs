// record_store.rs - Loads record snapshots from disk and refreshes the session

use serde_json::Value;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::task::JoinHandle;

use crate::error_handling::RecordLoadError;
use crate::frame_driver::SharedSession;
use crate::normalize::{extract_page, normalize_all};
use crate::types::EventLocationRecord;

/// Normalize a listing payload; items that fail normalization are dropped
pub fn parse_records(json: &str) -> Result<Vec<EventLocationRecord>, RecordLoadError> {
    let payload: Value = serde_json::from_str(json)?;
    let page = extract_page(&payload);
    if let Some(next) = &page.next {
        log::debug!("Ignoring next-page link {} in file snapshot", next);
    }

    let records = normalize_all(&page.items);
    if records.len() < page.items.len() {
        log::debug!("{} listing items normalized into {} records", page.items.len(), records.len());
    }
    Ok(records)
}

pub async fn load_records(path: &Path) -> Result<Vec<EventLocationRecord>, RecordLoadError> {
    let text = tokio::fs::read_to_string(path).await.map_err(|source| RecordLoadError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let records = parse_records(&text)?;
    log::info!("Loaded {} records from {}", records.len(), path.display());
    Ok(records)
}

/// Reload `path` every `period` and hand the snapshot to the session.
///
/// The first reload happens one period after spawning; failures keep the
/// previous snapshot.
pub fn spawn_refresh(session: SharedSession, path: PathBuf, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.tick().await;

        loop {
            ticker.tick().await;
            match load_records(&path).await {
                Ok(records) => session.lock().await.replace_records(records),
                Err(e) => log::error!("Record refresh failed: {}", e),
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_paginated_listing() {
        let json = r#"{
            "results": [
                {"event_id": "a", "latitude": 1.0, "longitude": 2.0},
                {"event_id": "a", "latitude": "3.5", "longitude": "4.5", "sequence_index": 1},
                {"event_id": "b", "name": "no coordinates"}
            ],
            "next": "https://example.invalid/events?page=2"
        }"#;
        let records = parse_records(json).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].latitude, 3.5);
    }

    #[test]
    fn test_malformed_payload() {
        assert!(matches!(parse_records("[{"), Err(RecordLoadError::Json(_))));
        assert!(parse_records(r#"{"unexpected": true}"#).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_file_reports_path() {
        let err = load_records(Path::new("/nonexistent/records.json")).await.unwrap_err();
        assert!(err.to_string().contains("/nonexistent/records.json"));
    }
}
