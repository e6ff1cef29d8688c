//! # fleetcast-data
//!
//! The data boundary of the fleetcast pipeline:
//!
//! - **ingest** — CSV parsing of trip-record tables and the stop directory.
//!   The core never reads raw files; everything enters as [`TripRecord`]s.
//! - **ticker** — the live external load signal, read from a public
//!   ticker-style HTTP endpoint.
//!
//! [`TripRecord`]: fleetcast_core::series::TripRecord

pub mod ingest;
pub mod ticker;

pub use ingest::{load_trip_records, read_trip_records, IngestError, Stop, StopDirectory};
pub use ticker::{TickerClient, TickerError, DEFAULT_TICKER_BASE_URL};
