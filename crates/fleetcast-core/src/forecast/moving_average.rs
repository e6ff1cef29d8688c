//! Moving-average fallback forecaster
//!
//! A flat forecast from the mean of the most recent window. This is the
//! explicit degradation path when the seasonal model cannot be fitted; the
//! forecaster itself never falls back silently.

use serde::{Deserialize, Serialize};

use crate::error::{Result, TransitError};
use crate::forecast::Predictor;

/// Simple moving average over the trailing `window` observations.
///
/// # Example
///
/// ```rust
/// use fleetcast_core::forecast::{Predictor, SimpleMovingAverage};
///
/// let data = vec![100.0, 120.0, 110.0, 130.0];
/// let mut sma = SimpleMovingAverage::new(2).unwrap();
/// sma.fit(&data).unwrap();
/// assert_eq!(sma.predict(3).unwrap(), vec![120.0, 120.0, 120.0]);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimpleMovingAverage {
    window: usize,
    level: f64,
    fitted: bool,
}

impl SimpleMovingAverage {
    /// Create a new SMA with the given trailing window (>= 2).
    pub fn new(window: usize) -> Result<Self> {
        if window < 2 {
            return Err(TransitError::InvalidParameter {
                name: "window".to_string(),
                reason: "must be at least 2".to_string(),
            });
        }

        Ok(Self {
            window,
            level: 0.0,
            fitted: false,
        })
    }

    /// Trailing window size
    pub fn window_size(&self) -> usize {
        self.window
    }

    /// Mean of the trailing window after fitting
    pub fn level(&self) -> f64 {
        self.level
    }
}

impl Predictor for SimpleMovingAverage {
    fn fit(&mut self, data: &[f64]) -> Result<()> {
        if data.len() < self.window {
            return Err(TransitError::InsufficientData {
                required: self.window,
                actual: data.len(),
            });
        }

        let tail = &data[data.len() - self.window..];
        self.level = tail.iter().sum::<f64>() / self.window as f64;
        self.fitted = true;
        Ok(())
    }

    fn predict(&self, steps: usize) -> Result<Vec<f64>> {
        if !self.fitted {
            return Err(TransitError::ModelFit {
                reason: "model must be fitted before prediction".to_string(),
            });
        }

        // Moving averages produce flat forecasts
        Ok(vec![self.level; steps])
    }

    fn is_fitted(&self) -> bool {
        self.fitted
    }
}
