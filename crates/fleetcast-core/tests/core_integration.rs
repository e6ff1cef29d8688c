//! End-to-end tests for the core pipeline
//!
//! Builder -> forecaster -> schedule policy over synthetic trip records with
//! a daily demand cycle.

use chrono::{Duration, TimeZone, Utc};
use fleetcast_core::prelude::*;

/// Three days of hourly observations with a pronounced daily cycle.
fn synthetic_records(hours: usize) -> Vec<TripRecord> {
    let start = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
    (0..hours)
        .map(|i| TripRecord {
            timestamp: start + Duration::hours(i as i64),
            stop_id: "stop-12".to_string(),
            vehicle_id: Some("bus-101".to_string()),
            duration_secs: 900.0
                + 400.0 * ((i as f64 * std::f64::consts::PI / 12.0).sin()),
        })
        .collect()
}

#[test]
fn test_full_pipeline_produces_one_entry_per_forecast_point() {
    let records = synthetic_records(72);
    let series = SeriesBuilder::new().build(&records).unwrap();
    assert_eq!(series.len(), 72);

    let forecast = fit_and_forecast(&series, 24, 24).unwrap();
    assert_eq!(forecast.len(), 24);
    assert_eq!(
        forecast.points()[0].timestamp,
        series.last_timestamp() + Duration::hours(1)
    );

    let policy = SchedulePolicy::new(1000.0)
        .with_assignment(Some("stop-12".to_string()), Some("bus-101".to_string()));
    let schedule = policy.derive_schedule(&forecast, &FixedLoad(0.0));

    assert_eq!(schedule.len(), forecast.len());
    for (entry, point) in schedule.iter().zip(forecast.points()) {
        assert_eq!(entry.forecast_value, point.value);
        assert_eq!(
            entry.departs_at,
            point.timestamp + Duration::minutes(i64::from(entry.interval_minutes))
        );
    }

    // Output ordering matches forecast ordering (non-decreasing timestamps).
    for pair in schedule.windows(2) {
        assert!(pair[0].departs_at <= pair[1].departs_at);
    }
}

#[test]
fn test_cyclic_series_yields_both_peak_and_off_peak_entries() {
    let records = synthetic_records(96);
    let series = SeriesBuilder::new().build(&records).unwrap();
    let forecast = fit_and_forecast(&series, 24, 24).unwrap();

    let schedule = SchedulePolicy::new(900.0).derive_schedule(&forecast, &FixedLoad(0.0));
    let peaks = schedule.iter().filter(|e| e.peak).count();
    assert!(peaks > 0, "daily cycle should produce peak periods");
    assert!(peaks < schedule.len(), "and off-peak periods too");
}

#[test]
fn test_peak_count_monotone_in_threshold() {
    let records = synthetic_records(72);
    let series = SeriesBuilder::new().build(&records).unwrap();
    let forecast = fit_and_forecast(&series, 24, 24).unwrap();

    let mut last_count = usize::MAX;
    for threshold in [500.0, 900.0, 1100.0, 1300.0, 2000.0] {
        let schedule =
            SchedulePolicy::new(threshold).derive_schedule(&forecast, &FixedLoad(0.0));
        let count = schedule.iter().filter(|e| e.peak).count();
        assert!(count <= last_count);
        last_count = count;
    }
}

#[test]
fn test_builder_and_forecaster_errors_are_fatal_and_distinct() {
    // Builder: nothing to bucket.
    let err = SeriesBuilder::new().build(&[]).unwrap_err();
    assert!(matches!(err, TransitError::InsufficientData { .. }));

    // Forecaster: series exists but covers less than two seasonal cycles.
    let records = synthetic_records(20);
    let series = SeriesBuilder::new().build(&records).unwrap();
    let err = fit_and_forecast(&series, 24, 24).unwrap_err();
    assert!(matches!(err, TransitError::ModelFit { .. }));

    // The caller-side fallback still works on the short series.
    let fallback = fallback_forecast(&series, 24, 6).unwrap();
    assert_eq!(fallback.len(), 24);
}

#[test]
fn test_grouped_build_per_stop() {
    let mut records = synthetic_records(48);
    let start = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
    for i in 0..48usize {
        records.push(TripRecord {
            timestamp: start + Duration::hours(i as i64),
            stop_id: "stop-30".to_string(),
            vehicle_id: None,
            duration_secs: 300.0,
        });
    }

    let grouped = SeriesBuilder::new()
        .build_grouped(&records, GroupKey::Stop)
        .unwrap();
    assert_eq!(grouped.len(), 2);
    assert_eq!(grouped["stop-30"].len(), 48);

    // Each per-stop series forecasts independently.
    let forecast = fit_and_forecast(&grouped["stop-30"], 24, 24).unwrap();
    assert!(forecast.values().iter().all(|v| (v - 300.0).abs() < 1.0));
}
