//! Demand forecasting
//!
//! Fits a seasonal exponential-smoothing model to a demand series and
//! produces a fixed-horizon point forecast at the same bucket cadence. The
//! forecaster is deterministic: identical input series and parameters yield
//! identical forecasts.

pub mod holt_winters;
pub mod moving_average;

pub use holt_winters::{HoltWinters, SeasonalType};
pub use moving_average::SimpleMovingAverage;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, TransitError};
use crate::series::DemandSeries;

/// Forecast horizon used when the caller does not override it
pub const DEFAULT_HORIZON: usize = 24;
/// Buckets per seasonal cycle (daily cycle on hourly buckets)
pub const DEFAULT_SEASONAL_PERIOD: usize = 24;

/// Level smoothing used by [`fit_and_forecast`]
pub const DEFAULT_ALPHA: f64 = 0.3;
/// Trend smoothing used by [`fit_and_forecast`]
pub const DEFAULT_BETA: f64 = 0.1;
/// Seasonal smoothing used by [`fit_and_forecast`]
pub const DEFAULT_GAMMA: f64 = 0.2;

/// Common trait for demand predictors
pub trait Predictor {
    /// Fit the model to historical bucket values
    fn fit(&mut self, data: &[f64]) -> Result<()>;

    /// Predict future bucket values
    fn predict(&self, steps: usize) -> Result<Vec<f64>>;

    /// Check whether the model has been fitted
    fn is_fitted(&self) -> bool;
}

/// One forecast bucket
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    /// Bucket timestamp, contiguous with the historical series
    pub timestamp: DateTime<Utc>,
    /// Predicted demand value (may be negative; no clipping)
    pub value: f64,
}

/// A fixed-horizon point forecast.
///
/// Exactly `horizon` points at the series cadence, starting one bucket after
/// the last historical bucket. Produced once per run; not mutated afterward.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Forecast {
    points: Vec<ForecastPoint>,
}

impl Forecast {
    /// Build a forecast directly from values, with the first bucket at
    /// `start` and subsequent buckets spaced by `interval`.
    pub fn from_values(start: DateTime<Utc>, interval: Duration, values: Vec<f64>) -> Self {
        let points = values
            .into_iter()
            .enumerate()
            .map(|(i, value)| ForecastPoint {
                timestamp: start + interval * (i as i32),
                value,
            })
            .collect();
        Self { points }
    }

    /// The forecast points, oldest first
    pub fn points(&self) -> &[ForecastPoint] {
        &self.points
    }

    /// Number of forecast buckets
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// True when the forecast holds no points
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Predicted values only, in bucket order
    pub fn values(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.value).collect()
    }
}

/// Attach timestamps to raw predictions, one bucket after the series end.
fn timestamped(series: &DemandSeries, values: Vec<f64>) -> Forecast {
    let last = series.last_timestamp();
    let interval = series.interval();
    let points = values
        .into_iter()
        .enumerate()
        .map(|(i, value)| ForecastPoint {
            timestamp: last + interval * (i as i32 + 1),
            value,
        })
        .collect();
    Forecast { points }
}

/// Fit a Holt-Winters model and forecast `horizon` buckets ahead.
///
/// Requires at least two full seasonal cycles of history; shorter series fail
/// with `ModelFit` rather than silently degrading. Callers wanting graceful
/// degradation catch that error and call [`fallback_forecast`] explicitly.
pub fn fit_and_forecast(
    series: &DemandSeries,
    horizon: usize,
    seasonal_period: usize,
) -> Result<Forecast> {
    if horizon == 0 {
        return Err(TransitError::InvalidParameter {
            name: "horizon".to_string(),
            reason: "must be at least 1".to_string(),
        });
    }

    let required = seasonal_period * 2;
    if series.len() < required {
        return Err(TransitError::ModelFit {
            reason: format!(
                "history covers {} buckets, need {} (two full seasonal cycles of {})",
                series.len(),
                required,
                seasonal_period
            ),
        });
    }

    let mut model = HoltWinters::new(
        DEFAULT_ALPHA,
        DEFAULT_BETA,
        DEFAULT_GAMMA,
        seasonal_period,
        SeasonalType::Additive,
    )?;
    model.fit(&series.values())?;
    let values = model.predict(horizon)?;

    if values.iter().any(|v| !v.is_finite()) {
        return Err(TransitError::ModelFit {
            reason: "forecast produced non-finite values".to_string(),
        });
    }

    Ok(timestamped(series, values))
}

/// Moving-average fallback: a flat forecast from the trailing `window` mean.
///
/// This is the caller-invoked degradation path for histories too short for a
/// seasonal fit.
pub fn fallback_forecast(
    series: &DemandSeries,
    horizon: usize,
    window: usize,
) -> Result<Forecast> {
    if horizon == 0 {
        return Err(TransitError::InvalidParameter {
            name: "horizon".to_string(),
            reason: "must be at least 1".to_string(),
        });
    }

    let mut model = SimpleMovingAverage::new(window)?;
    model.fit(&series.values())?;
    let values = model.predict(horizon)?;

    Ok(timestamped(series, values))
}
