//! Metadata refresh from probe results
//!
//! Rules:
//! - An available feed (or one that was never stamped) gets `last_updated`
//!   refreshed to the probe instant.
//! - An unavailable feed loses 10 availability points, clamped at 0; an
//!   unset availability starts from 100 before the decrement.
//! - Successful probes never raise availability: the score only recovers
//!   through a contributor review.

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use feedvault_core::SourceRecord;

use crate::health::HealthReport;

/// Availability points lost per failed probe
const AVAILABILITY_PENALTY: f64 = 10.0;

/// Fold one probe result into its record
pub fn apply_health(record: &mut SourceRecord, report: &HealthReport, now: DateTime<Utc>) {
    if report.available || record.last_updated.is_none() {
        record.touch(now);
        debug!("stamped last_updated for source {}", record.id);
    }

    if !report.available {
        let reduced = match record.availability {
            None => 100.0 - AVAILABILITY_PENALTY,
            Some(current) => (current - AVAILABILITY_PENALTY).max(0.0),
        };
        info!(
            "source {} unavailable, reducing availability to {reduced}",
            record.id
        );
        record.availability = Some(reduced);
    }

    if let Some(error) = &report.error {
        debug!("probe error for {}: {error}", record.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use feedvault_core::format_timestamp;

    fn record_with_availability(availability: Option<f64>) -> SourceRecord {
        let mut record: SourceRecord = serde_json::from_value(serde_json::json!({
            "id": "feed-a",
            "name": "Feed A",
            "url": "https://a.example.com",
            "category": "malware",
            "format": "json",
            "last_updated": "2026-01-01T00:00:00Z"
        }))
        .unwrap();
        record.availability = availability;
        record
    }

    fn up() -> HealthReport {
        HealthReport {
            available: true,
            status_code: Some(200),
            response_time_ms: Some(42),
            error: None,
        }
    }

    fn down() -> HealthReport {
        HealthReport {
            available: false,
            status_code: None,
            response_time_ms: None,
            error: Some("connection refused".to_string()),
        }
    }

    #[test]
    fn test_available_feed_gets_stamped() {
        let now = Utc::now();
        let mut record = record_with_availability(Some(100.0));
        apply_health(&mut record, &up(), now);

        assert_eq!(record.last_updated, Some(format_timestamp(now)));
        assert_eq!(record.availability, Some(100.0));
    }

    #[test]
    fn test_unavailable_feed_keeps_its_stamp() {
        let now = Utc::now();
        let mut record = record_with_availability(Some(100.0));
        apply_health(&mut record, &down(), now);

        assert_eq!(record.last_updated, Some("2026-01-01T00:00:00Z".to_string()));
    }

    #[test]
    fn test_missing_stamp_is_set_even_on_failure() {
        let now = Utc::now();
        let mut record = record_with_availability(None);
        record.last_updated = None;
        apply_health(&mut record, &down(), now);

        assert_eq!(record.last_updated, Some(format_timestamp(now)));
    }

    #[test]
    fn test_availability_decrement_rules() {
        let now = Utc::now();

        let mut unset = record_with_availability(None);
        apply_health(&mut unset, &down(), now);
        assert_eq!(unset.availability, Some(90.0));

        let mut mid = record_with_availability(Some(40.0));
        apply_health(&mut mid, &down(), now);
        assert_eq!(mid.availability, Some(30.0));

        let mut low = record_with_availability(Some(5.0));
        apply_health(&mut low, &down(), now);
        assert_eq!(low.availability, Some(0.0));
    }
}
