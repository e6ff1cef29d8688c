//! Trip-record ingestion
//!
//! Parses the raw CSV feeds into [`TripRecord`]s: an arrivals table carrying
//! `arrival_time`, `departure_time`, `bus_stop` and optionally `device_id`
//! per row, and a stop-metadata table (`stop_id`, `stop_name`, `lat`, `lon`)
//! used for display joins. Travel time is derived as departure minus arrival.
//!
//! Ingestion owns type coercion: rows that fail to parse are skipped with a
//! warning rather than failing the run. Timestamps are accepted as RFC 3339,
//! `YYYY-MM-DD HH:MM:SS`, or bare `HH:MM:SS` (anchored to the epoch date,
//! matching feeds that carry per-day times only).

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use fleetcast_core::series::TripRecord;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors at the ingestion boundary
#[derive(Error, Debug)]
pub enum IngestError {
    /// The input file could not be opened
    #[error("Failed to open {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The CSV reader failed
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// A required column is absent from the header row
    #[error("Missing required column '{0}'")]
    MissingColumn(String),

    /// Every row failed to parse
    #[error("No usable records in input")]
    NoRecords,
}

/// Parse a timestamp in any of the accepted shapes.
fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();

    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    if let Ok(ts) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return Some(ts.and_utc());
    }
    if let Ok(time) = NaiveTime::parse_from_str(raw, "%H:%M:%S") {
        // Time-only feeds describe a single service day; anchor them all to
        // the same date so bucketing stays consistent.
        let date = NaiveDate::from_ymd_opt(1970, 1, 1)?;
        return Some(date.and_time(time).and_utc());
    }
    None
}

fn column_index(headers: &csv::StringRecord, name: &str) -> Option<usize> {
    headers.iter().position(|h| h.trim() == name)
}

fn required_column(headers: &csv::StringRecord, name: &str) -> Result<usize, IngestError> {
    column_index(headers, name).ok_or_else(|| IngestError::MissingColumn(name.to_string()))
}

/// Read trip records from any CSV source.
///
/// Required columns: `arrival_time`, `departure_time`, `bus_stop`. The
/// `device_id` column is optional.
pub fn read_trip_records<R: Read>(reader: R) -> Result<Vec<TripRecord>, IngestError> {
    let mut csv_reader = csv::Reader::from_reader(reader);
    let headers = csv_reader.headers()?.clone();

    let arrival_idx = required_column(&headers, "arrival_time")?;
    let departure_idx = required_column(&headers, "departure_time")?;
    let stop_idx = required_column(&headers, "bus_stop")?;
    let device_idx = column_index(&headers, "device_id");

    let mut records = Vec::new();
    for (row, result) in csv_reader.records().enumerate() {
        let record = result?;

        let arrival = record.get(arrival_idx).and_then(parse_timestamp);
        let departure = record.get(departure_idx).and_then(parse_timestamp);
        let stop = record.get(stop_idx).map(str::trim).filter(|s| !s.is_empty());

        let (arrival, departure, stop) = match (arrival, departure, stop) {
            (Some(a), Some(d), Some(s)) => (a, d, s),
            _ => {
                tracing::warn!(row = row + 1, "skipping unparseable trip record");
                continue;
            }
        };

        let duration_secs = (departure - arrival).num_seconds() as f64;
        if duration_secs < 0.0 {
            tracing::warn!(
                row = row + 1,
                duration_secs,
                "trip record has negative travel time"
            );
        }

        records.push(TripRecord {
            timestamp: arrival,
            stop_id: stop.to_string(),
            vehicle_id: device_idx
                .and_then(|i| record.get(i))
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from),
            duration_secs,
        });
    }

    if records.is_empty() {
        return Err(IngestError::NoRecords);
    }
    Ok(records)
}

/// Read trip records from a CSV file.
pub fn load_trip_records<P: AsRef<Path>>(path: P) -> Result<Vec<TripRecord>, IngestError> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|source| IngestError::Io {
        path: path.display().to_string(),
        source,
    })?;
    read_trip_records(file)
}

/// One stop from the metadata table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stop {
    pub stop_id: String,
    pub stop_name: String,
    pub lat: f64,
    pub lon: f64,
}

/// Stop metadata keyed by stop id, joined into CLI summaries for display.
#[derive(Debug, Clone, Default)]
pub struct StopDirectory {
    stops: HashMap<String, Stop>,
}

impl StopDirectory {
    /// Read the stop table from any CSV source.
    ///
    /// Required columns: `stop_id`, `stop_name`, `lat`, `lon`. Rows with
    /// unparseable coordinates are skipped with a warning.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, IngestError> {
        let mut csv_reader = csv::Reader::from_reader(reader);
        let headers = csv_reader.headers()?.clone();

        let id_idx = required_column(&headers, "stop_id")?;
        let name_idx = required_column(&headers, "stop_name")?;
        let lat_idx = required_column(&headers, "lat")?;
        let lon_idx = required_column(&headers, "lon")?;

        let mut stops = HashMap::new();
        for (row, result) in csv_reader.records().enumerate() {
            let record = result?;

            let id = record.get(id_idx).map(str::trim).filter(|s| !s.is_empty());
            let name = record.get(name_idx).map(str::trim);
            let lat = record.get(lat_idx).and_then(|v| v.trim().parse::<f64>().ok());
            let lon = record.get(lon_idx).and_then(|v| v.trim().parse::<f64>().ok());

            match (id, name, lat, lon) {
                (Some(id), Some(name), Some(lat), Some(lon)) => {
                    stops.insert(
                        id.to_string(),
                        Stop {
                            stop_id: id.to_string(),
                            stop_name: name.to_string(),
                            lat,
                            lon,
                        },
                    );
                }
                _ => tracing::warn!(row = row + 1, "skipping unparseable stop row"),
            }
        }

        Ok(Self { stops })
    }

    /// Read the stop table from a CSV file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, IngestError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| IngestError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_reader(file)
    }

    /// Look up a stop by id.
    pub fn get(&self, stop_id: &str) -> Option<&Stop> {
        self.stops.get(stop_id)
    }

    /// Human-readable label for a stop id: `name (id)` when known, the bare
    /// id otherwise.
    pub fn label(&self, stop_id: &str) -> String {
        match self.stops.get(stop_id) {
            Some(stop) => format!("{} ({})", stop.stop_name, stop.stop_id),
            None => stop_id.to_string(),
        }
    }

    /// Number of known stops
    pub fn len(&self) -> usize {
        self.stops.len()
    }

    /// True when no stops were loaded
    pub fn is_empty(&self) -> bool {
        self.stops.is_empty()
    }
}
