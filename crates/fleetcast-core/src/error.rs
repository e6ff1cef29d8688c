//! Core error types
//!
//! Defines the standardized error type shared by the series builder, the
//! forecaster and the schedule policy engine.

use thiserror::Error;

/// Result type alias for core operations
pub type Result<T> = std::result::Result<T, TransitError>;

/// Errors that can occur while building series, fitting models or deriving
/// schedules.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransitError {
    /// Not enough observations to build a usable demand series
    #[error("Insufficient data: need at least {required} buckets, got {actual}")]
    InsufficientData { required: usize, actual: usize },

    /// The forecaster could not fit the requested model
    #[error("Model fit failed: {reason}")]
    ModelFit { reason: String },

    /// Invalid parameter value
    #[error("Invalid parameter '{name}': {reason}")]
    InvalidParameter { name: String, reason: String },

    /// The external load signal could not be read
    #[error("Load signal unavailable: {0}")]
    SignalUnavailable(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insufficient_data_display() {
        let error = TransitError::InsufficientData {
            required: 48,
            actual: 12,
        };
        assert_eq!(
            error.to_string(),
            "Insufficient data: need at least 48 buckets, got 12"
        );
    }

    #[test]
    fn test_model_fit_display() {
        let error = TransitError::ModelFit {
            reason: "history covers 10 buckets, need 48".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Model fit failed: history covers 10 buckets, need 48"
        );
    }

    #[test]
    fn test_signal_unavailable_display() {
        let error = TransitError::SignalUnavailable("connection refused".to_string());
        assert_eq!(
            error.to_string(),
            "Load signal unavailable: connection refused"
        );
    }

    #[test]
    fn test_error_propagation() {
        fn inner() -> Result<f64> {
            Err(TransitError::InvalidParameter {
                name: "horizon".to_string(),
                reason: "must be at least 1".to_string(),
            })
        }

        fn outer() -> Result<f64> {
            inner()?;
            Ok(1.0)
        }

        assert!(outer().is_err());
    }
}
