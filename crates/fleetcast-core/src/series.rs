//! Demand series construction
//!
//! Turns raw trip records into a uniformly spaced demand series: observations
//! are grouped into fixed-width time buckets, each non-empty bucket is reduced
//! by an aggregator, and interior gaps are closed by carrying the previous
//! bucket's value forward. Leading empty buckets before the first observation
//! are trimmed rather than invented.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, TransitError};

/// One observed movement event, produced by the ingestion boundary.
///
/// Immutable once handed to the core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TripRecord {
    /// Observation timestamp
    pub timestamp: DateTime<Utc>,
    /// Stop the vehicle served
    pub stop_id: String,
    /// Reporting vehicle/device, when known
    pub vehicle_id: Option<String>,
    /// Observed travel time in seconds
    pub duration_secs: f64,
}

/// Reduction applied to the observations inside one bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Aggregator {
    /// Arithmetic mean of durations (the default demand proxy)
    Mean,
    /// Median duration, robust to outliers
    Median,
    /// Worst observed duration
    Max,
    /// Number of observations (occupancy proxy)
    Count,
}

impl Aggregator {
    /// Reduce one bucket's observations to a single value.
    ///
    /// Callers guarantee `values` is non-empty.
    fn reduce(&self, values: &[f64]) -> f64 {
        match self {
            Aggregator::Mean => values.iter().sum::<f64>() / values.len() as f64,
            Aggregator::Median => {
                let mut sorted = values.to_vec();
                sorted.sort_by(|a, b| a.total_cmp(b));
                let mid = sorted.len() / 2;
                if sorted.len() % 2 == 0 {
                    (sorted[mid - 1] + sorted[mid]) / 2.0
                } else {
                    sorted[mid]
                }
            }
            Aggregator::Max => values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            Aggregator::Count => values.len() as f64,
        }
    }
}

/// Grouping key applied before bucketing.
///
/// The original data feeds carried one table per granularity; a single
/// builder with a configurable key replaces those variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GroupKey {
    /// All records pooled into one series
    Pooled,
    /// One series per stop
    Stop,
    /// One series per (stop, vehicle) pair
    StopVehicle,
}

impl GroupKey {
    fn label(&self, record: &TripRecord) -> String {
        match self {
            GroupKey::Pooled => "all".to_string(),
            GroupKey::Stop => record.stop_id.clone(),
            GroupKey::StopVehicle => format!(
                "{}/{}",
                record.stop_id,
                record.vehicle_id.as_deref().unwrap_or("-")
            ),
        }
    }
}

/// One bucket of the demand series
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeriesPoint {
    /// Start of the bucket
    pub timestamp: DateTime<Utc>,
    /// Aggregated demand value for the bucket
    pub value: f64,
}

/// A uniformly spaced demand series.
///
/// Invariants: strictly increasing timestamps at a fixed cadence, no
/// duplicate buckets, no gaps.
#[derive(Debug, Clone, PartialEq)]
pub struct DemandSeries {
    interval: Duration,
    points: Vec<SeriesPoint>,
}

impl DemandSeries {
    /// Construct a series from pre-bucketed points, validating the cadence.
    pub fn new(interval: Duration, points: Vec<SeriesPoint>) -> Result<Self> {
        if interval <= Duration::zero() {
            return Err(TransitError::InvalidParameter {
                name: "interval".to_string(),
                reason: "must be positive".to_string(),
            });
        }
        if points.is_empty() {
            return Err(TransitError::InsufficientData {
                required: 1,
                actual: 0,
            });
        }
        for pair in points.windows(2) {
            if pair[1].timestamp - pair[0].timestamp != interval {
                return Err(TransitError::InvalidParameter {
                    name: "points".to_string(),
                    reason: format!(
                        "buckets {} and {} are not {}s apart",
                        pair[0].timestamp,
                        pair[1].timestamp,
                        interval.num_seconds()
                    ),
                });
            }
        }
        Ok(Self { interval, points })
    }

    /// Bucket width
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Number of buckets
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// True when the series holds no buckets
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// The bucketed points, oldest first
    pub fn points(&self) -> &[SeriesPoint] {
        &self.points
    }

    /// Demand values only, in bucket order
    pub fn values(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.value).collect()
    }

    /// Timestamp of the newest bucket
    pub fn last_timestamp(&self) -> DateTime<Utc> {
        // `new` rejects empty point sets, so the last element exists.
        self.points[self.points.len() - 1].timestamp
    }
}

/// Builds [`DemandSeries`] from trip records.
///
/// # Example
///
/// ```rust
/// use fleetcast_core::series::{SeriesBuilder, TripRecord};
/// # use chrono::{TimeZone, Utc};
///
/// let records = vec![TripRecord {
///     timestamp: Utc.with_ymd_and_hms(2024, 3, 1, 9, 15, 0).unwrap(),
///     stop_id: "stop-12".to_string(),
///     vehicle_id: None,
///     duration_secs: 420.0,
/// }];
///
/// let series = SeriesBuilder::new().build(&records).unwrap();
/// assert_eq!(series.len(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct SeriesBuilder {
    bucket_interval: Duration,
    aggregator: Aggregator,
}

impl Default for SeriesBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SeriesBuilder {
    /// Hourly buckets, mean aggregation.
    pub fn new() -> Self {
        Self {
            bucket_interval: Duration::hours(1),
            aggregator: Aggregator::Mean,
        }
    }

    /// Override the bucket width.
    pub fn with_bucket_interval(mut self, interval: Duration) -> Result<Self> {
        if interval <= Duration::zero() {
            return Err(TransitError::InvalidParameter {
                name: "bucket_interval".to_string(),
                reason: "must be positive".to_string(),
            });
        }
        self.bucket_interval = interval;
        Ok(self)
    }

    /// Override the per-bucket reduction.
    pub fn with_aggregator(mut self, aggregator: Aggregator) -> Self {
        self.aggregator = aggregator;
        self
    }

    /// Build one pooled series from all records.
    ///
    /// Pure transformation: groups records into buckets, reduces each
    /// non-empty bucket, forward-fills interior gaps. Fails with
    /// `InsufficientData` when no record survives bucketing.
    pub fn build(&self, records: &[TripRecord]) -> Result<DemandSeries> {
        if records.is_empty() {
            return Err(TransitError::InsufficientData {
                required: 1,
                actual: 0,
            });
        }

        let mut buckets: BTreeMap<DateTime<Utc>, Vec<f64>> = BTreeMap::new();
        for record in records {
            buckets
                .entry(self.bucket_start(record.timestamp))
                .or_default()
                .push(record.duration_secs);
        }

        // BTreeMap iteration is oldest-first; the range starts at the first
        // observed bucket, so leading empties never enter the series.
        let first = *buckets.keys().next().expect("at least one bucket");
        let last = *buckets.keys().next_back().expect("at least one bucket");

        let mut points = Vec::new();
        let mut carried = f64::NAN;
        let mut cursor = first;
        while cursor <= last {
            let value = match buckets.get(&cursor) {
                Some(values) => self.aggregator.reduce(values),
                None => carried,
            };
            points.push(SeriesPoint {
                timestamp: cursor,
                value,
            });
            carried = value;
            cursor += self.bucket_interval;
        }

        DemandSeries::new(self.bucket_interval, points)
    }

    /// Build one series per group, keyed by the group label.
    pub fn build_grouped(
        &self,
        records: &[TripRecord],
        key: GroupKey,
    ) -> Result<BTreeMap<String, DemandSeries>> {
        if records.is_empty() {
            return Err(TransitError::InsufficientData {
                required: 1,
                actual: 0,
            });
        }

        let mut groups: BTreeMap<String, Vec<TripRecord>> = BTreeMap::new();
        for record in records {
            groups
                .entry(key.label(record))
                .or_default()
                .push(record.clone());
        }

        let mut series = BTreeMap::new();
        for (label, group) in groups {
            series.insert(label, self.build(&group)?);
        }
        Ok(series)
    }

    fn bucket_start(&self, timestamp: DateTime<Utc>) -> DateTime<Utc> {
        let width = self.bucket_interval.num_seconds();
        let rem = timestamp.timestamp().rem_euclid(width);
        timestamp - Duration::seconds(rem)
    }
}
