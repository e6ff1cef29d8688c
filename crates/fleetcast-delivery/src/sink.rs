//! Order sink abstraction and HTTP implementation
//!
//! A sink accepts one serialized schedule entry per call. The HTTP sink
//! POSTs the JSON wire payload to the external ordering endpoint with an
//! API-key header; HTTP 200 counts as accepted, any other status is a
//! remote rejection captured with its code and raw body.

use std::time::Duration;

use fleetcast_core::schedule::ScheduleEntry;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Header carrying the ordering endpoint's API key
pub const API_KEY_HEADER: &str = "X-GEMINI-APIKEY";

/// HTTP request timeout for a single submission
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Errors for a single submission attempt
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DeliveryError {
    /// The request never produced an HTTP response
    #[error("Transport failure: {0}")]
    Transport(String),

    /// The endpoint answered with a non-200 status
    #[error("Order rejected with HTTP {status}: {body}")]
    Rejected { status: u16, body: String },
}

/// Wire representation of one schedule entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderPayload {
    /// Target departure time, ISO-8601
    #[serde(rename = "Time")]
    pub time: String,

    #[serde(rename = "Bus Stop")]
    pub bus_stop: String,

    #[serde(rename = "Forecasted Travel Time")]
    pub forecasted_travel_time: f64,

    #[serde(rename = "Device ID", skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,
}

impl From<&ScheduleEntry> for OrderPayload {
    fn from(entry: &ScheduleEntry) -> Self {
        Self {
            time: entry.departs_at.to_rfc3339(),
            bus_stop: entry.stop_id.clone().unwrap_or_default(),
            forecasted_travel_time: entry.forecast_value,
            device_id: entry.vehicle_id.clone(),
        }
    }
}

/// Destination for serialized schedule entries.
pub trait OrderSink {
    /// Sink name, for logs.
    fn name(&self) -> &str;

    /// Submit one payload; `Ok` carries the raw response body.
    fn submit(&self, payload: &OrderPayload) -> Result<String, DeliveryError>;
}

/// HTTP sink for the external ordering endpoint.
pub struct HttpOrderSink {
    endpoint: String,
    api_key: String,
    client: reqwest::blocking::Client,
}

impl HttpOrderSink {
    /// Sink posting to `endpoint`, authenticated by `api_key`.
    pub fn new(endpoint: &str, api_key: &str) -> Result<Self, DeliveryError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| DeliveryError::Transport(e.to_string()))?;

        Ok(Self {
            endpoint: endpoint.to_string(),
            api_key: api_key.to_string(),
            client,
        })
    }
}

impl OrderSink for HttpOrderSink {
    fn name(&self) -> &str {
        &self.endpoint
    }

    fn submit(&self, payload: &OrderPayload) -> Result<String, DeliveryError> {
        let response = self
            .client
            .post(&self.endpoint)
            .header(API_KEY_HEADER, &self.api_key)
            .json(payload)
            .send()
            .map_err(|e| DeliveryError::Transport(e.to_string()))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .map_err(|e| DeliveryError::Transport(e.to_string()))?;

        if status == 200 {
            Ok(body)
        } else {
            Err(DeliveryError::Rejected { status, body })
        }
    }
}
