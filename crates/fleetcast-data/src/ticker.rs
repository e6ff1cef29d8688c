//! External load signal client
//!
//! Reads one scalar from a public ticker-style HTTP endpoint: the response
//! is a JSON object whose `last` field carries the current value as a
//! string-encoded number. The schedule policy treats the reading as
//! advisory; an unavailable signal maps to `SignalUnavailable` and the
//! policy's configured default takes over.
//!
//! # Example
//!
//! ```rust,no_run
//! use fleetcast_data::TickerClient;
//!
//! #[tokio::main]
//! async fn main() {
//!     let last = TickerClient::new("btcusd").fetch_last().await.unwrap();
//!     println!("current load signal: {}", last);
//! }
//! ```

use std::time::Duration;

use fleetcast_core::schedule::LoadSignalSource;
use fleetcast_core::{Result as CoreResult, TransitError};
use serde::Deserialize;
use thiserror::Error;

/// Default public ticker endpoint
pub const DEFAULT_TICKER_BASE_URL: &str = "https://api.gemini.com/v1/pubticker";

/// HTTP request timeout for a single signal read
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Errors while reading the ticker
#[derive(Error, Debug)]
pub enum TickerError {
    /// HTTP request failed (network, DNS, timeout)
    #[error("Request failed: {0}")]
    RequestFailed(String),

    /// Response body was not the expected shape
    #[error("Parse error: {0}")]
    ParseError(String),
}

/// Ticker response shape: only the `last` field is consumed.
#[derive(Debug, Deserialize)]
struct TickerResponse {
    last: String,
}

/// Client for a ticker-style last-value endpoint.
#[derive(Debug, Clone)]
pub struct TickerClient {
    base_url: String,
    symbol: String,
}

impl TickerClient {
    /// Client for `symbol` against the default endpoint.
    pub fn new(symbol: &str) -> Self {
        Self {
            base_url: DEFAULT_TICKER_BASE_URL.to_string(),
            symbol: symbol.to_string(),
        }
    }

    /// Point the client at a different base URL.
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/{}", self.base_url, self.symbol)
    }

    /// Extract the numeric `last` value from a response body.
    fn parse_response(json: &str) -> Result<f64, TickerError> {
        let response: TickerResponse =
            serde_json::from_str(json).map_err(|e| TickerError::ParseError(e.to_string()))?;
        response
            .last
            .trim()
            .parse::<f64>()
            .map_err(|e| TickerError::ParseError(format!("last value: {}", e)))
    }

    /// Fetch the current last value (async).
    pub async fn fetch_last(&self) -> Result<f64, TickerError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| TickerError::RequestFailed(e.to_string()))?;

        let text = client
            .get(self.endpoint())
            .send()
            .await
            .map_err(|e| TickerError::RequestFailed(e.to_string()))?
            .text()
            .await
            .map_err(|e| TickerError::RequestFailed(e.to_string()))?;

        Self::parse_response(&text)
    }

    /// Fetch the current last value (blocking).
    pub fn fetch_last_blocking(&self) -> Result<f64, TickerError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| TickerError::RequestFailed(e.to_string()))?;

        let text = client
            .get(self.endpoint())
            .send()
            .map_err(|e| TickerError::RequestFailed(e.to_string()))?
            .text()
            .map_err(|e| TickerError::RequestFailed(e.to_string()))?;

        Self::parse_response(&text)
    }
}

impl LoadSignalSource for TickerClient {
    fn read(&self) -> CoreResult<f64> {
        self.fetch_last_blocking()
            .map_err(|e| TransitError::SignalUnavailable(e.to_string()))
    }
}
