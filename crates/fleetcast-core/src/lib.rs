//! # fleetcast-core
//!
//! Transit demand forecasting and adaptive dispatch scheduling.
//!
//! The pipeline runs strictly forward:
//!
//! 1. **Series builder** — buckets raw trip records into a uniform demand
//!    series (forward-filled, leading empties trimmed).
//! 2. **Forecaster** — fits an additive Holt-Winters model and produces a
//!    fixed-horizon point forecast; an explicit moving-average fallback is
//!    available to callers when the seasonal fit fails.
//! 3. **Schedule policy** — classifies forecast buckets against a peak
//!    threshold, folds in one live external load reading and derives a
//!    dispatch interval and departure time per bucket.
//!
//! Delivery of the derived schedule lives in `fleetcast-delivery`.
//!
//! ## Example
//!
//! ```rust
//! use fleetcast_core::prelude::*;
//! use chrono::{Duration, TimeZone, Utc};
//!
//! let start = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
//! let records: Vec<TripRecord> = (0..48)
//!     .map(|i| TripRecord {
//!         timestamp: start + Duration::hours(i),
//!         stop_id: "stop-12".to_string(),
//!         vehicle_id: None,
//!         duration_secs: 600.0 + 100.0 * ((i as f64 * 0.26).sin()),
//!     })
//!     .collect();
//!
//! let series = SeriesBuilder::new().build(&records).unwrap();
//! let forecast = fit_and_forecast(&series, 24, 24).unwrap();
//! let schedule = SchedulePolicy::new(650.0).derive_schedule(&forecast, &FixedLoad(0.0));
//! assert_eq!(schedule.len(), 24);
//! ```

pub mod forecast;
pub mod schedule;
pub mod series;

mod error;

pub use error::{Result, TransitError};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::error::{Result, TransitError};
    pub use crate::forecast::{
        fallback_forecast, fit_and_forecast, Forecast, ForecastPoint, HoltWinters, Predictor,
        SeasonalType, SimpleMovingAverage,
    };
    pub use crate::schedule::{FixedLoad, LoadSignalSource, SchedulePolicy, ScheduleEntry};
    pub use crate::series::{Aggregator, DemandSeries, GroupKey, SeriesBuilder, TripRecord};
}
