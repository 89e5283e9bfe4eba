// tests/properties.rs - Property tests for ordering, timing, the clock and the normalizer

use proptest::prelude::*;
use serde_json::{json, Value};

use event_path_player::animation::{build_path, segment_durations, AnimationClock, PathTimeline, SurfaceKind};
use event_path_player::normalize::normalize;
use event_path_player::types::{EventLocationRecord, Waypoint};
use event_path_player::TimingConfig;

fn equator_path(steps_deg: &[f64]) -> Vec<Waypoint> {
    let mut lon = -170.0;
    let mut path = vec![Waypoint::from_record(EventLocationRecord::new("e", 0.0, lon))];
    for step in steps_deg {
        lon += step;
        path.push(Waypoint::from_record(EventLocationRecord::new("e", 0.0, lon)));
    }
    path
}

fn arb_json() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::from),
        any::<i64>().prop_map(Value::from),
        any::<f64>().prop_map(|f| serde_json::Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null)),
        "[a-z0-9 .:-]{0,12}".prop_map(Value::from),
    ];
    leaf.prop_recursive(3, 24, 6, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
            prop::collection::vec(
                (
                    prop_oneof![
                        Just("latitude".to_string()),
                        Just("lng".to_string()),
                        Just("event_id".to_string()),
                        Just("event_time".to_string()),
                        Just("sequence".to_string()),
                        Just("images".to_string()),
                        "[a-z_]{1,8}",
                    ],
                    inner,
                ),
                0..6,
            )
            .prop_map(|pairs| Value::Object(pairs.into_iter().collect())),
        ]
    })
}

proptest! {
    #[test]
    fn ordering_follows_sequence_regardless_of_input_order(
        shuffle in Just((0..8i64).collect::<Vec<_>>()).prop_shuffle()
    ) {
        let records: Vec<EventLocationRecord> = shuffle
            .iter()
            .map(|&i| EventLocationRecord::new("e", i as f64, 0.0).with_sequence(i))
            .collect();
        let order: Vec<i64> = build_path(&records)
            .iter()
            .map(|w| w.record.sequence_index.unwrap_or(-1))
            .collect();
        prop_assert_eq!(order, (0..8).collect::<Vec<_>>());
    }

    #[test]
    fn durations_are_proportional_to_distance(short in 0.01f64..10.0) {
        let config = TimingConfig {
            speed_mps: 1000.0,
            min_segment_ms: 0.0,
            max_segment_ms: 4000.0,
            min_total_ms: 0.0,
            time_based: false,
        };
        let path = equator_path(&[2.0 * short, short]);
        let d = segment_durations(&path, SurfaceKind::Flat, &config);
        prop_assert!((d[0] / d[1] - 2.0).abs() < 1e-6, "ratio {}", d[0] / d[1]);
    }

    #[test]
    fn durations_respect_floor_and_total(steps in prop::collection::vec(0.0f64..5.0, 1..12)) {
        let path = equator_path(&steps);
        for kind in [SurfaceKind::Flat, SurfaceKind::Globe] {
            let config = TimingConfig::for_surface(kind);
            let d = segment_durations(&path, kind, &config);
            prop_assert_eq!(d.len(), steps.len());
            prop_assert!(d.iter().all(|ms| *ms >= config.min_segment_ms));
            prop_assert!(d.iter().sum::<f64>() >= config.min_total_ms - 1e-6
                || d.iter().all(|ms| *ms == config.min_segment_ms));
        }
    }

    #[test]
    fn fraction_stays_in_range_and_never_rewinds(
        deltas in prop::collection::vec(0.0f64..700.0, 1..40),
        speed in 0.25f64..8.0,
    ) {
        let timeline = PathTimeline::build(equator_path(&[1.0, 0.5, 2.0]), SurfaceKind::Globe, &TimingConfig::globe());
        let mut clock = AnimationClock::new();
        let ticket = clock.start("e", timeline, speed, 0.0).unwrap();

        let mut now = 0.0;
        let mut progress = (0usize, 0.0f64);
        for delta in deltas {
            now += delta;
            let Some(sample) = clock.advance(ticket, now) else { break };
            prop_assert!((0.0..=1.0).contains(&sample.fraction));
            let next = (sample.segment_index, sample.fraction);
            prop_assert!(next >= progress, "{:?} after {:?}", next, progress);
            progress = if sample.reached_waypoint.is_some() && !sample.completed {
                (sample.segment_index + 1, 0.0)
            } else {
                next
            };
        }
    }

    #[test]
    fn normalizer_is_total(raw in arb_json()) {
        if let Some(record) = normalize(&raw) {
            prop_assert!(!record.event_id.is_empty());
            prop_assert!((-90.0..=90.0).contains(&record.latitude));
            prop_assert!((-180.0..=180.0).contains(&record.longitude));
        }
    }

    #[test]
    fn normalizer_accepts_string_coordinates(lat in -90.0f64..90.0, lon in -180.0f64..180.0) {
        let raw = json!({"id": 7, "lat": lat.to_string(), "lng": lon.to_string()});
        let record = normalize(&raw).unwrap();
        prop_assert_eq!(record.event_id, "7");
        prop_assert!((record.latitude - lat).abs() < 1e-9);
        prop_assert!((record.longitude - lon).abs() < 1e-9);
    }
}
