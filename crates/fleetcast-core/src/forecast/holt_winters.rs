//! Triple exponential smoothing (Holt-Winters)
//!
//! The demand forecaster: additive level + trend components with a repeating
//! seasonal term, suited to transit demand that cycles daily on hourly
//! buckets.
//!
//! ## Choosing parameters
//!
//! - `alpha` (level): higher values react faster to recent demand shifts
//! - `beta` (trend): controls trend smoothing
//! - `gamma` (seasonal): controls how quickly the daily shape adapts

use serde::{Deserialize, Serialize};

use crate::error::{Result, TransitError};
use crate::forecast::Predictor;

/// Seasonal composition
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum SeasonalType {
    /// Demand = level + trend + season (the default for travel times)
    Additive,
    /// Demand = (level + trend) * season
    Multiplicative,
}

/// Holt-Winters model state.
///
/// Fitting requires at least two full seasonal cycles of history; shorter
/// series are rejected rather than degraded to a non-seasonal fit.
///
/// # Example
///
/// ```rust
/// use fleetcast_core::forecast::{HoltWinters, Predictor, SeasonalType};
///
/// // Two days of hourly travel times with a daily cycle
/// let data: Vec<f64> = (0..48)
///     .map(|i| 600.0 + 120.0 * ((i as f64 * std::f64::consts::PI / 12.0).sin()))
///     .collect();
///
/// let mut model = HoltWinters::new(0.3, 0.1, 0.2, 24, SeasonalType::Additive).unwrap();
/// model.fit(&data).unwrap();
/// let forecast = model.predict(24).unwrap();
/// assert_eq!(forecast.len(), 24);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HoltWinters {
    alpha: f64,
    beta: f64,
    gamma: f64,
    period: usize,
    seasonal_type: SeasonalType,
    level: f64,
    trend: f64,
    seasonal: Vec<f64>,
    fitted: bool,
}

fn check_unit_interval(name: &str, value: f64) -> Result<()> {
    if !(0.0 < value && value < 1.0) {
        return Err(TransitError::InvalidParameter {
            name: name.to_string(),
            reason: "must be between 0 and 1 (exclusive)".to_string(),
        });
    }
    Ok(())
}

impl HoltWinters {
    /// Create an unfitted model.
    ///
    /// # Arguments
    ///
    /// * `alpha` - level smoothing (0 < alpha < 1)
    /// * `beta` - trend smoothing (0 < beta < 1)
    /// * `gamma` - seasonal smoothing (0 < gamma < 1)
    /// * `period` - buckets per seasonal cycle (>= 2)
    /// * `seasonal_type` - additive or multiplicative seasonality
    pub fn new(
        alpha: f64,
        beta: f64,
        gamma: f64,
        period: usize,
        seasonal_type: SeasonalType,
    ) -> Result<Self> {
        check_unit_interval("alpha", alpha)?;
        check_unit_interval("beta", beta)?;
        check_unit_interval("gamma", gamma)?;
        if period < 2 {
            return Err(TransitError::InvalidParameter {
                name: "period".to_string(),
                reason: "must be at least 2".to_string(),
            });
        }

        Ok(Self {
            alpha,
            beta,
            gamma,
            period,
            seasonal_type,
            level: 0.0,
            trend: 0.0,
            seasonal: vec![0.0; period],
            fitted: false,
        })
    }

    /// Buckets per seasonal cycle
    pub fn period(&self) -> usize {
        self.period
    }

    /// Current (level, trend, seasonal) components
    pub fn components(&self) -> (f64, f64, &[f64]) {
        (self.level, self.trend, &self.seasonal)
    }

    /// Seed level, trend and seasonal factors from the first two cycles.
    fn initialize(&mut self, data: &[f64]) {
        let period = self.period;
        let first_cycle_avg = data[..period].iter().sum::<f64>() / period as f64;
        let second_cycle_avg =
            data[period..2 * period].iter().sum::<f64>() / period as f64;

        self.level = first_cycle_avg;
        self.trend = (second_cycle_avg - first_cycle_avg) / period as f64;

        for i in 0..period {
            self.seasonal[i] = match self.seasonal_type {
                SeasonalType::Additive => data[i] - self.level,
                SeasonalType::Multiplicative => {
                    if self.level.abs() > 1e-10 {
                        data[i] / self.level
                    } else {
                        1.0
                    }
                }
            };
        }
    }
}

impl Predictor for HoltWinters {
    fn fit(&mut self, data: &[f64]) -> Result<()> {
        let min_required = self.period * 2;
        if data.len() < min_required {
            return Err(TransitError::InsufficientData {
                required: min_required,
                actual: data.len(),
            });
        }

        self.initialize(data);

        for (i, &value) in data.iter().enumerate().skip(self.period) {
            let season_idx = i % self.period;
            let prev_level = self.level;
            let prev_seasonal = self.seasonal[season_idx];

            match self.seasonal_type {
                SeasonalType::Additive => {
                    self.level = self.alpha * (value - prev_seasonal)
                        + (1.0 - self.alpha) * (self.level + self.trend);
                    self.trend =
                        self.beta * (self.level - prev_level) + (1.0 - self.beta) * self.trend;
                    self.seasonal[season_idx] =
                        self.gamma * (value - self.level) + (1.0 - self.gamma) * prev_seasonal;
                }
                SeasonalType::Multiplicative => {
                    let deseasonalized = if prev_seasonal.abs() > 1e-10 {
                        value / prev_seasonal
                    } else {
                        value
                    };
                    self.level = self.alpha * deseasonalized
                        + (1.0 - self.alpha) * (self.level + self.trend);
                    self.trend =
                        self.beta * (self.level - prev_level) + (1.0 - self.beta) * self.trend;
                    self.seasonal[season_idx] = if self.level.abs() > 1e-10 {
                        self.gamma * (value / self.level) + (1.0 - self.gamma) * prev_seasonal
                    } else {
                        prev_seasonal
                    };
                }
            }
        }

        self.fitted = true;
        Ok(())
    }

    fn predict(&self, steps: usize) -> Result<Vec<f64>> {
        if !self.fitted {
            return Err(TransitError::ModelFit {
                reason: "model must be fitted before prediction".to_string(),
            });
        }

        let mut forecasts = Vec::with_capacity(steps);
        for h in 1..=steps {
            let season = self.seasonal[(h - 1) % self.period];
            let forecast = match self.seasonal_type {
                SeasonalType::Additive => self.level + h as f64 * self.trend + season,
                SeasonalType::Multiplicative => (self.level + h as f64 * self.trend) * season,
            };
            forecasts.push(forecast);
        }

        Ok(forecasts)
    }

    fn is_fitted(&self) -> bool {
        self.fitted
    }
}
