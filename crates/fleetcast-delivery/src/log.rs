//! Delivery log artifact
//!
//! Serializes the batch's delivery records to the append-only tabular audit
//! log: one CSV row per attempt, persisted at the end of the run.

use std::io::Write;
use std::path::Path;

use crate::pipeline::DeliveryRecord;

/// Column order of the delivery log
pub const LOG_COLUMNS: [&str; 6] = [
    "Timestamp",
    "Bus/Device",
    "Bus Stop",
    "Forecasted Travel Time",
    "Status",
    "Response",
];

fn write_records<W: Write>(
    records: &[DeliveryRecord],
    mut writer: csv::Writer<W>,
) -> Result<(), csv::Error> {
    writer.write_record(LOG_COLUMNS)?;
    for record in records {
        writer.write_record([
            record.sent_at.to_rfc3339(),
            record
                .entry
                .vehicle_id
                .clone()
                .unwrap_or_else(|| "-".to_string()),
            record
                .entry
                .stop_id
                .clone()
                .unwrap_or_else(|| "-".to_string()),
            record.entry.forecast_value.to_string(),
            record.outcome.status_label(),
            record.outcome.detail().to_string(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

/// Write the delivery log to any writer.
pub fn write_delivery_log<W: Write>(
    records: &[DeliveryRecord],
    writer: W,
) -> Result<(), csv::Error> {
    write_records(records, csv::Writer::from_writer(writer))
}

/// Persist the delivery log to a CSV file.
pub fn save_delivery_log<P: AsRef<Path>>(
    records: &[DeliveryRecord],
    path: P,
) -> Result<(), csv::Error> {
    write_records(records, csv::Writer::from_path(path)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::DeliveryOutcome;
    use chrono::{TimeZone, Utc};
    use fleetcast_core::schedule::ScheduleEntry;

    fn record(outcome: DeliveryOutcome) -> DeliveryRecord {
        DeliveryRecord {
            sent_at: Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap(),
            outcome,
            entry: ScheduleEntry {
                departs_at: Utc.with_ymd_and_hms(2024, 3, 1, 13, 20, 0).unwrap(),
                interval_minutes: 20,
                forecast_value: 1300.0,
                peak: true,
                stop_id: Some("stop-12".to_string()),
                vehicle_id: Some("bus-101".to_string()),
            },
        }
    }

    #[test]
    fn test_header_and_row_shape() {
        let records = vec![
            record(DeliveryOutcome::Delivered {
                response: "{\"order_id\":\"17\"}".to_string(),
            }),
            record(DeliveryOutcome::Rejected {
                status: 503,
                body: "maintenance".to_string(),
            }),
        ];

        let mut buffer = Vec::new();
        write_delivery_log(&records, &mut buffer).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines.len(), 3);
        assert_eq!(
            lines[0],
            "Timestamp,Bus/Device,Bus Stop,Forecasted Travel Time,Status,Response"
        );
        assert!(lines[1].contains("bus-101"));
        assert!(lines[1].contains("delivered"));
        assert!(lines[2].contains("rejected (503)"));
        assert!(lines[2].contains("maintenance"));
    }

    #[test]
    fn test_missing_identifiers_dashed() {
        let mut r = record(DeliveryOutcome::TransportFailed {
            error: "timeout".to_string(),
        });
        r.entry.stop_id = None;
        r.entry.vehicle_id = None;

        let mut buffer = Vec::new();
        write_delivery_log(&[r], &mut buffer).unwrap();
        let text = String::from_utf8(buffer).unwrap();

        assert!(text.lines().nth(1).unwrap().contains("-,-,1300"));
    }

    #[test]
    fn test_one_row_per_record() {
        let records: Vec<DeliveryRecord> = (0..5)
            .map(|_| record(DeliveryOutcome::Delivered { response: "ok".to_string() }))
            .collect();

        let mut buffer = Vec::new();
        write_delivery_log(&records, &mut buffer).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        assert_eq!(text.lines().count(), 6);
    }
}
