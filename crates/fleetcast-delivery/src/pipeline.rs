//! Rate-limited delivery pipeline
//!
//! Delivers schedule entries strictly in input order, one at a time, through
//! the rate limiter, and records every attempt. A failed submission never
//! aborts the batch and is never retried within the same call: each entry
//! gets exactly one attempt and exactly one record ("at-least-attempt"
//! semantics).
//!
//! The record accumulator is returned to the caller; no process-wide log
//! state exists.

use chrono::{DateTime, Utc};
use fleetcast_core::schedule::ScheduleEntry;
use serde::{Deserialize, Serialize};

use crate::limiter::{Clock, RateLimiter, SystemClock};
use crate::sink::{DeliveryError, OrderPayload, OrderSink};

/// Default spacing between delivery attempts
pub const DEFAULT_MIN_INTERVAL: std::time::Duration = std::time::Duration::from_secs(60);

/// Classified result of one delivery attempt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DeliveryOutcome {
    /// Endpoint accepted the order (HTTP 200)
    Delivered { response: String },
    /// Endpoint answered with a non-200 status
    Rejected { status: u16, body: String },
    /// The request never reached the endpoint
    TransportFailed { error: String },
}

impl DeliveryOutcome {
    /// True only for accepted orders
    pub fn is_success(&self) -> bool {
        matches!(self, DeliveryOutcome::Delivered { .. })
    }

    /// Short status text for the delivery log
    pub fn status_label(&self) -> String {
        match self {
            DeliveryOutcome::Delivered { .. } => "delivered".to_string(),
            DeliveryOutcome::Rejected { status, .. } => format!("rejected ({})", status),
            DeliveryOutcome::TransportFailed { .. } => "transport failure".to_string(),
        }
    }

    /// Response body or error text
    pub fn detail(&self) -> &str {
        match self {
            DeliveryOutcome::Delivered { response } => response,
            DeliveryOutcome::Rejected { body, .. } => body,
            DeliveryOutcome::TransportFailed { error } => error,
        }
    }
}

/// Audit-trail row for one delivery attempt.
///
/// Appended once per entry, regardless of outcome; never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveryRecord {
    /// When the attempt started
    pub sent_at: DateTime<Utc>,
    /// Classified result
    pub outcome: DeliveryOutcome,
    /// The schedule entry the attempt carried
    pub entry: ScheduleEntry,
}

/// Sequential, rate-limited delivery of a schedule batch.
pub struct DeliveryPipeline<C: Clock = SystemClock> {
    limiter: RateLimiter<C>,
}

impl DeliveryPipeline<SystemClock> {
    /// Pipeline spacing attempts by `min_interval` on the real clock.
    pub fn new(min_interval: std::time::Duration) -> Self {
        Self {
            limiter: RateLimiter::new(min_interval),
        }
    }
}

impl<C: Clock> DeliveryPipeline<C> {
    /// Pipeline over a pre-built limiter (tests inject a manual clock).
    pub fn with_limiter(limiter: RateLimiter<C>) -> Self {
        Self { limiter }
    }

    /// Deliver every entry, in order, and return one record per entry.
    ///
    /// Guarantees: records returned == entries given; no entry skipped; no
    /// entry submitted twice within this call.
    pub fn deliver(
        &mut self,
        entries: &[ScheduleEntry],
        sink: &dyn OrderSink,
    ) -> Vec<DeliveryRecord> {
        let mut records = Vec::with_capacity(entries.len());

        for entry in entries {
            self.limiter.acquire();

            let sent_at = Utc::now();
            let payload = OrderPayload::from(entry);
            let outcome = match sink.submit(&payload) {
                Ok(response) => {
                    tracing::info!(sink = sink.name(), time = %payload.time, "order delivered");
                    DeliveryOutcome::Delivered { response }
                }
                Err(DeliveryError::Rejected { status, body }) => {
                    tracing::warn!(
                        sink = sink.name(),
                        status,
                        time = %payload.time,
                        "order rejected"
                    );
                    DeliveryOutcome::Rejected { status, body }
                }
                Err(DeliveryError::Transport(error)) => {
                    tracing::warn!(
                        sink = sink.name(),
                        error = %error,
                        time = %payload.time,
                        "order transport failed"
                    );
                    DeliveryOutcome::TransportFailed { error }
                }
            };

            records.push(DeliveryRecord {
                sent_at,
                outcome,
                entry: entry.clone(),
            });
        }

        records
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::limiter::RateLimiter;
    use chrono::{Duration as ChronoDuration, TimeZone};
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::time::Duration;

    /// Clock that discards sleeps, for fast pipeline tests.
    struct NoopClock;

    impl Clock for NoopClock {
        fn sleep(&self, _duration: Duration) {}
    }

    /// Sink that replays a scripted sequence of results.
    struct ScriptedSink {
        script: RefCell<VecDeque<Result<String, DeliveryError>>>,
        submissions: RefCell<Vec<OrderPayload>>,
    }

    impl ScriptedSink {
        fn new(script: Vec<Result<String, DeliveryError>>) -> Self {
            Self {
                script: RefCell::new(script.into()),
                submissions: RefCell::new(Vec::new()),
            }
        }
    }

    impl OrderSink for ScriptedSink {
        fn name(&self) -> &str {
            "scripted"
        }

        fn submit(&self, payload: &OrderPayload) -> Result<String, DeliveryError> {
            self.submissions.borrow_mut().push(payload.clone());
            self.script
                .borrow_mut()
                .pop_front()
                .unwrap_or_else(|| Ok("ok".to_string()))
        }
    }

    fn entries(n: usize) -> Vec<ScheduleEntry> {
        let start = Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap();
        (0..n)
            .map(|i| ScheduleEntry {
                departs_at: start + ChronoDuration::hours(i as i64),
                interval_minutes: 10,
                forecast_value: 900.0 + i as f64,
                peak: false,
                stop_id: Some("stop-12".to_string()),
                vehicle_id: None,
            })
            .collect()
    }

    fn pipeline() -> DeliveryPipeline<NoopClock> {
        DeliveryPipeline::with_limiter(RateLimiter::with_clock(
            Duration::from_secs(60),
            NoopClock,
        ))
    }

    #[test]
    fn test_failure_isolation() {
        let sink = ScriptedSink::new(vec![
            Ok("accepted".to_string()),
            Err(DeliveryError::Transport("connection reset".to_string())),
            Ok("accepted".to_string()),
        ]);
        let batch = entries(3);

        let records = pipeline().deliver(&batch, &sink);

        assert_eq!(records.len(), 3);
        assert!(records[0].outcome.is_success());
        assert_eq!(
            records[1].outcome,
            DeliveryOutcome::TransportFailed {
                error: "connection reset".to_string()
            }
        );
        assert!(records[2].outcome.is_success());
    }

    #[test]
    fn test_completeness_under_rejection() {
        let sink = ScriptedSink::new(vec![
            Err(DeliveryError::Rejected {
                status: 503,
                body: "maintenance".to_string(),
            }),
            Err(DeliveryError::Rejected {
                status: 400,
                body: "bad order".to_string(),
            }),
        ]);
        let batch = entries(2);

        let records = pipeline().deliver(&batch, &sink);

        assert_eq!(records.len(), batch.len());
        assert_eq!(records[0].outcome.status_label(), "rejected (503)");
        assert_eq!(records[1].outcome.detail(), "bad order");
    }

    #[test]
    fn test_each_entry_submitted_exactly_once_in_order() {
        let sink = ScriptedSink::new(Vec::new());
        let batch = entries(5);

        pipeline().deliver(&batch, &sink);

        let submissions = sink.submissions.borrow();
        assert_eq!(submissions.len(), 5);
        for (payload, entry) in submissions.iter().zip(&batch) {
            assert_eq!(payload.time, entry.departs_at.to_rfc3339());
        }
    }

    #[test]
    fn test_empty_batch() {
        let sink = ScriptedSink::new(Vec::new());
        let records = pipeline().deliver(&[], &sink);
        assert!(records.is_empty());
        assert!(sink.submissions.borrow().is_empty());
    }

    #[test]
    fn test_record_echoes_entry() {
        let sink = ScriptedSink::new(Vec::new());
        let batch = entries(1);
        let records = pipeline().deliver(&batch, &sink);
        assert_eq!(records[0].entry, batch[0]);
    }
}
