//! Adaptive dispatch schedule derivation
//!
//! Classifies forecast buckets against a peak threshold, folds in one live
//! external load reading, and emits a dispatch interval plus target departure
//! time per forecast point.
//!
//! Departure policy: each forecast bucket is an independent future window,
//! not a sequential dispatch queue, so the departure time is the bucket
//! timestamp plus that bucket's own interval. Intervals are never chained
//! cumulatively across points.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::forecast::Forecast;

/// Capability seam for the live external load reading.
///
/// Implementations perform one synchronous read; failures surface as
/// `TransitError::SignalUnavailable` and are recovered by the policy's
/// configured default.
pub trait LoadSignalSource {
    /// Read the current load value.
    fn read(&self) -> Result<f64>;
}

/// A fixed load value, for callers that run without a live signal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedLoad(pub f64);

impl LoadSignalSource for FixedLoad {
    fn read(&self) -> Result<f64> {
        Ok(self.0)
    }
}

/// One derived dispatch period.
///
/// Produced 1:1 with forecast points, in the same order; immutable and
/// consumed exactly once by the delivery pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleEntry {
    /// Target departure time: bucket timestamp + this bucket's interval
    pub departs_at: DateTime<Utc>,
    /// Dispatch interval in minutes, load penalty included
    pub interval_minutes: u32,
    /// The forecast value the interval was derived from
    pub forecast_value: f64,
    /// Whether the bucket was classified high-demand
    pub peak: bool,
    /// Stop the schedule targets, when known
    pub stop_id: Option<String>,
    /// Vehicle assigned to the schedule, when known
    pub vehicle_id: Option<String>,
}

/// Interval policy parameters.
///
/// # Example
///
/// ```rust
/// use fleetcast_core::schedule::{FixedLoad, SchedulePolicy};
/// # use chrono::{TimeZone, Utc};
/// # use fleetcast_core::forecast::Forecast;
/// # let forecast = Forecast::from_values(
/// #     Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap(),
/// #     chrono::Duration::hours(1),
/// #     vec![900.0, 1300.0],
/// # );
///
/// let policy = SchedulePolicy::new(1200.0);
/// let schedule = policy.derive_schedule(&forecast, &FixedLoad(0.0));
/// assert_eq!(schedule.len(), forecast.len());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct SchedulePolicy {
    peak_threshold: f64,
    base_interval: u32,
    peak_interval: u32,
    load_penalty: u32,
    load_threshold: f64,
    load_default: f64,
    stop_id: Option<String>,
    vehicle_id: Option<String>,
}

impl SchedulePolicy {
    /// Policy with the given peak threshold and the stock intervals:
    /// 10 min off-peak, 20 min peak, 5 min load penalty. The load threshold
    /// defaults to the peak threshold and the signal fallback to 0.
    pub fn new(peak_threshold: f64) -> Self {
        Self {
            peak_threshold,
            base_interval: 10,
            peak_interval: 20,
            load_penalty: 5,
            load_threshold: peak_threshold,
            load_default: 0.0,
            stop_id: None,
            vehicle_id: None,
        }
    }

    /// Override the off-peak and peak dispatch intervals (minutes).
    pub fn with_intervals(mut self, base: u32, peak: u32) -> Self {
        self.base_interval = base;
        self.peak_interval = peak;
        self
    }

    /// Override the minutes added to every interval under external load.
    pub fn with_load_penalty(mut self, penalty: u32) -> Self {
        self.load_penalty = penalty;
        self
    }

    /// Override the external-load threshold (defaults to the peak threshold).
    pub fn with_load_threshold(mut self, threshold: f64) -> Self {
        self.load_threshold = threshold;
        self
    }

    /// Value assumed when the load signal cannot be read.
    pub fn with_load_default(mut self, value: f64) -> Self {
        self.load_default = value;
        self
    }

    /// Stamp the produced entries with a stop and/or vehicle identifier.
    pub fn with_assignment(
        mut self,
        stop_id: Option<String>,
        vehicle_id: Option<String>,
    ) -> Self {
        self.stop_id = stop_id;
        self.vehicle_id = vehicle_id;
        self
    }

    /// Derive one schedule entry per forecast point.
    ///
    /// The external load is read exactly once, before entry construction,
    /// and held as an immutable snapshot for the whole batch. A failed read
    /// is logged and replaced by the configured default; it never fails the
    /// run.
    pub fn derive_schedule(
        &self,
        forecast: &Forecast,
        signal: &dyn LoadSignalSource,
    ) -> Vec<ScheduleEntry> {
        let load = match signal.read() {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    fallback = self.load_default,
                    "load signal unavailable, using configured default"
                );
                self.load_default
            }
        };

        let penalty = if load > self.load_threshold {
            self.load_penalty
        } else {
            0
        };

        forecast
            .points()
            .iter()
            .map(|point| {
                let peak = point.value > self.peak_threshold;
                let interval = if peak {
                    self.peak_interval
                } else {
                    self.base_interval
                } + penalty;

                ScheduleEntry {
                    departs_at: point.timestamp + Duration::minutes(i64::from(interval)),
                    interval_minutes: interval,
                    forecast_value: point.value,
                    peak,
                    stop_id: self.stop_id.clone(),
                    vehicle_id: self.vehicle_id.clone(),
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransitError;
    use chrono::TimeZone;
    use std::cell::Cell;

    fn forecast() -> Forecast {
        Forecast::from_values(
            Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap(),
            Duration::hours(1),
            vec![900.0, 1300.0, 1199.0, 1500.0],
        )
    }

    struct FailingSignal;

    impl LoadSignalSource for FailingSignal {
        fn read(&self) -> Result<f64> {
            Err(TransitError::SignalUnavailable(
                "connection refused".to_string(),
            ))
        }
    }

    struct CountingSignal {
        reads: Cell<usize>,
        value: f64,
    }

    impl LoadSignalSource for CountingSignal {
        fn read(&self) -> Result<f64> {
            self.reads.set(self.reads.get() + 1);
            Ok(self.value)
        }
    }

    #[test]
    fn test_peak_classification() {
        let policy = SchedulePolicy::new(1200.0);
        let schedule = policy.derive_schedule(&forecast(), &FixedLoad(0.0));

        let peaks: Vec<bool> = schedule.iter().map(|e| e.peak).collect();
        let intervals: Vec<u32> = schedule.iter().map(|e| e.interval_minutes).collect();
        assert_eq!(peaks, vec![false, true, false, true]);
        assert_eq!(intervals, vec![10, 20, 10, 20]);
    }

    #[test]
    fn test_load_penalty_is_global() {
        let policy = SchedulePolicy::new(1200.0);
        let schedule = policy.derive_schedule(&forecast(), &FixedLoad(1300.0));

        let intervals: Vec<u32> = schedule.iter().map(|e| e.interval_minutes).collect();
        assert_eq!(intervals, vec![15, 25, 15, 25]);
    }

    #[test]
    fn test_load_at_threshold_adds_no_penalty() {
        let policy = SchedulePolicy::new(1200.0);
        let schedule = policy.derive_schedule(&forecast(), &FixedLoad(1200.0));
        assert!(schedule.iter().all(|e| e.interval_minutes <= 20));
    }

    #[test]
    fn test_departure_is_bucket_plus_own_interval() {
        let policy = SchedulePolicy::new(1200.0);
        let schedule = policy.derive_schedule(&forecast(), &FixedLoad(0.0));

        // 10:00 bucket is peak (1300 > 1200): departs at 10:20, not chained
        // onto the 09:00 entry.
        assert_eq!(
            schedule[1].departs_at,
            Utc.with_ymd_and_hms(2024, 3, 1, 10, 20, 0).unwrap()
        );
        assert_eq!(
            schedule[0].departs_at,
            Utc.with_ymd_and_hms(2024, 3, 1, 9, 10, 0).unwrap()
        );
    }

    #[test]
    fn test_idempotent() {
        let policy = SchedulePolicy::new(1200.0);
        let a = policy.derive_schedule(&forecast(), &FixedLoad(1300.0));
        let b = policy.derive_schedule(&forecast(), &FixedLoad(1300.0));
        assert_eq!(a, b);
    }

    #[test]
    fn test_signal_read_exactly_once() {
        let signal = CountingSignal {
            reads: Cell::new(0),
            value: 1300.0,
        };
        let policy = SchedulePolicy::new(1200.0);
        policy.derive_schedule(&forecast(), &signal);
        assert_eq!(signal.reads.get(), 1);
    }

    #[test]
    fn test_failed_signal_uses_default_and_completes() {
        let policy = SchedulePolicy::new(1200.0).with_load_default(1300.0);
        let schedule = policy.derive_schedule(&forecast(), &FailingSignal);

        // Default of 1300 exceeds the load threshold, so the penalty applies.
        assert_eq!(schedule.len(), 4);
        let intervals: Vec<u32> = schedule.iter().map(|e| e.interval_minutes).collect();
        assert_eq!(intervals, vec![15, 25, 15, 25]);
    }

    #[test]
    fn test_raising_threshold_never_adds_peaks() {
        let low = SchedulePolicy::new(1000.0);
        let high = SchedulePolicy::new(1400.0);
        let f = forecast();

        let low_peaks = low
            .derive_schedule(&f, &FixedLoad(0.0))
            .iter()
            .filter(|e| e.peak)
            .count();
        let high_peaks = high
            .derive_schedule(&f, &FixedLoad(0.0))
            .iter()
            .filter(|e| e.peak)
            .count();
        assert!(high_peaks <= low_peaks);
    }

    #[test]
    fn test_assignment_stamped_on_entries() {
        let policy = SchedulePolicy::new(1200.0)
            .with_assignment(Some("stop-12".to_string()), Some("bus-101".to_string()));
        let schedule = policy.derive_schedule(&forecast(), &FixedLoad(0.0));
        assert!(schedule
            .iter()
            .all(|e| e.stop_id.as_deref() == Some("stop-12")));
        assert!(schedule
            .iter()
            .all(|e| e.vehicle_id.as_deref() == Some("bus-101")));
    }
}
