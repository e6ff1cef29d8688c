//! # fleetcast-delivery
//!
//! Rate-limited, logged delivery of schedule entries to an external ordering
//! endpoint.
//!
//! - **limiter** — single-token rate limiter with an injectable clock
//! - **sink** — the order sink seam and its HTTP implementation
//! - **pipeline** — sequential delivery with per-entry outcome records
//! - **log** — the append-only CSV audit artifact
//!
//! The pipeline guarantees one record per entry regardless of outcome; a
//! failed submission never aborts the batch and is never retried within the
//! same call.

pub mod limiter;
pub mod log;
pub mod pipeline;
pub mod sink;

pub use limiter::{Clock, RateLimiter, SystemClock};
pub use log::{save_delivery_log, write_delivery_log, LOG_COLUMNS};
pub use pipeline::{DeliveryOutcome, DeliveryPipeline, DeliveryRecord, DEFAULT_MIN_INTERVAL};
pub use sink::{DeliveryError, HttpOrderSink, OrderPayload, OrderSink, API_KEY_HEADER};
