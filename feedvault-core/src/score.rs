//! Composite quality scoring
//!
//! Every score is a pure function of (record fields, `now`, weights): the
//! evaluation instant is always an explicit argument, never sampled inside,
//! so a batch is repeatable given the same wall-clock reading.
//!
//! Sub-metrics:
//! - freshness: derived from `last_updated` age, linear decay over 60 days
//! - authority, coverage, availability: taken from the record as-is
//!
//! Missing sub-metrics contribute 0 to the composite.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::record::SourceRecord;
use crate::{
    DEFAULT_AUTHORITY_WEIGHT, DEFAULT_AVAILABILITY_WEIGHT, DEFAULT_COVERAGE_WEIGHT,
    DEFAULT_FRESHNESS_WEIGHT, FRESHNESS_WINDOW_DAYS,
};

/// Weights for the four sub-metrics of the composite score
///
/// Used as given for the default path; only per-record user preference
/// weights are normalized before application.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringWeights {
    pub freshness: f64,
    pub authority: f64,
    pub coverage: f64,
    pub availability: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            freshness: DEFAULT_FRESHNESS_WEIGHT,
            authority: DEFAULT_AUTHORITY_WEIGHT,
            coverage: DEFAULT_COVERAGE_WEIGHT,
            availability: DEFAULT_AVAILABILITY_WEIGHT,
        }
    }
}

/// Freshness score in [0,100] from the age of `last_updated` at `now`
///
/// Single linear decay: age 0 days scores 100, 30 days scores 50, 60 or
/// more days scores 0. Missing or unparseable timestamps score 0; that is
/// the expected state for new, never-fetched records.
pub fn freshness_score(last_updated: Option<&str>, now: DateTime<Utc>) -> f64 {
    let Some(raw) = last_updated else {
        return 0.0;
    };
    let Ok(parsed) = DateTime::parse_from_rfc3339(raw) else {
        return 0.0;
    };

    let age_days = (now - parsed.with_timezone(&Utc)).num_days() as f64;
    (100.0 - age_days * 100.0 / FRESHNESS_WINDOW_DAYS).clamp(0.0, 100.0)
}

/// Composite quality score in [0,100] under the given weights
///
/// Retirement is a data convention, not a scorer concern: a retired record
/// passed here is re-scored like any other. Callers preserving retirement
/// skip retired records instead.
pub fn quality_score(record: &SourceRecord, weights: &ScoringWeights, now: DateTime<Utc>) -> f64 {
    let freshness = freshness_score(record.last_updated.as_deref(), now);
    let authority = record.authority.unwrap_or(0.0);
    let coverage = record.coverage.unwrap_or(0.0);
    let availability = record.availability.unwrap_or(0.0);

    let composite = freshness * weights.freshness
        + authority * weights.authority
        + coverage * weights.coverage
        + availability * weights.availability;

    round_one_decimal(composite.clamp(0.0, 100.0))
}

/// Composite score under the record's own preference weights
///
/// The per-record weights are normalized to sum to 1.0 before application.
/// A record without preference weights (or with all-zero weights) scores
/// exactly its default composite.
pub fn user_weighted_score(
    record: &SourceRecord,
    weights: &ScoringWeights,
    now: DateTime<Utc>,
) -> f64 {
    let Some(user) = record
        .user_preference_weight
        .as_ref()
        .and_then(|w| w.normalized())
    else {
        return quality_score(record, weights, now);
    };

    let freshness = freshness_score(record.last_updated.as_deref(), now);
    let authority = record.authority.unwrap_or(0.0);
    let coverage = record.coverage.unwrap_or(0.0);
    let availability = record.availability.unwrap_or(0.0);

    let composite = freshness * user.freshness
        + authority * user.authority
        + coverage * user.coverage
        + availability * user.availability;

    round_one_decimal(composite.clamp(0.0, 100.0))
}

/// Scores are persisted with one decimal place
fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{format_timestamp, sample_record, UserWeights};
    use chrono::Duration;

    fn stamp(now: DateTime<Utc>, days_ago: i64) -> String {
        format_timestamp(now - Duration::days(days_ago))
    }

    #[test]
    fn test_freshness_anchor_points() {
        let now = Utc::now();
        assert_eq!(freshness_score(Some(&stamp(now, 0)), now), 100.0);
        assert_eq!(freshness_score(Some(&stamp(now, 30)), now), 50.0);
        assert_eq!(freshness_score(Some(&stamp(now, 60)), now), 0.0);
        assert_eq!(freshness_score(Some(&stamp(now, 90)), now), 0.0);
    }

    #[test]
    fn test_freshness_monotonically_non_increasing() {
        let now = Utc::now();
        let mut previous = 100.0;
        for days in 0..=70 {
            let score = freshness_score(Some(&stamp(now, days)), now);
            assert!(score <= previous, "freshness rose at day {days}");
            previous = score;
        }
    }

    #[test]
    fn test_freshness_missing_or_garbage_scores_zero() {
        let now = Utc::now();
        assert_eq!(freshness_score(None, now), 0.0);
        assert_eq!(freshness_score(Some("yesterday-ish"), now), 0.0);
    }

    #[test]
    fn test_freshness_future_timestamp_clamps_to_100() {
        let now = Utc::now();
        let future = format_timestamp(now + Duration::days(5));
        assert_eq!(freshness_score(Some(&future), now), 100.0);
    }

    #[test]
    fn test_composite_extremes() {
        let now = Utc::now();
        let weights = ScoringWeights::default();

        let mut record = sample_record("feed-hi");
        record.last_updated = Some(format_timestamp(now));
        record.authority = Some(100.0);
        record.coverage = Some(100.0);
        record.availability = Some(100.0);
        assert_eq!(quality_score(&record, &weights, now), 100.0);

        let mut record = sample_record("feed-lo");
        record.last_updated = None;
        record.authority = Some(0.0);
        record.coverage = Some(0.0);
        record.availability = Some(0.0);
        assert_eq!(quality_score(&record, &weights, now), 0.0);
    }

    #[test]
    fn test_missing_sub_metrics_default_to_zero() {
        // Fresh record with no other sub-metrics: 100 * 0.4 = 40
        let now = Utc::now();
        let mut record = sample_record("feed-x");
        record.last_updated = Some(format_timestamp(now));
        record.authority = None;
        record.coverage = None;
        record.availability = None;

        assert_eq!(quality_score(&record, &ScoringWeights::default(), now), 40.0);
    }

    #[test]
    fn test_irrelevant_fields_do_not_affect_score() {
        let now = Utc::now();
        let weights = ScoringWeights::default();

        let mut record = sample_record("feed-a");
        let baseline = quality_score(&record, &weights, now);

        record.name = "renamed".to_string();
        record.description = Some("new description".to_string());
        record.tags.push("extra-tag".to_string());
        record
            .extra
            .insert("rate_limit".to_string(), serde_json::json!(10));

        assert_eq!(quality_score(&record, &weights, now), baseline);
    }

    #[test]
    fn test_user_weighted_equals_default_without_preferences() {
        let now = Utc::now();
        let weights = ScoringWeights::default();
        let record = sample_record("feed-b");

        assert_eq!(
            user_weighted_score(&record, &weights, now),
            quality_score(&record, &weights, now)
        );
    }

    #[test]
    fn test_user_weighted_normalizes_preferences() {
        let now = Utc::now();
        let weights = ScoringWeights::default();

        let mut record = sample_record("feed-c");
        record.last_updated = None; // freshness 0
        record.authority = Some(80.0);
        record.coverage = Some(40.0);
        record.availability = Some(0.0);
        // 3:1 authority:coverage, any scale
        record.user_preference_weight = Some(UserWeights {
            freshness: 0.0,
            authority: 3.0,
            coverage: 1.0,
            availability: 0.0,
        });

        // 80 * 0.75 + 40 * 0.25 = 70
        assert_eq!(user_weighted_score(&record, &weights, now), 70.0);
    }

    #[test]
    fn test_all_zero_user_weights_fall_back_to_default() {
        let now = Utc::now();
        let weights = ScoringWeights::default();

        let mut record = sample_record("feed-d");
        record.user_preference_weight = Some(UserWeights::default());

        assert_eq!(
            user_weighted_score(&record, &weights, now),
            quality_score(&record, &weights, now)
        );
    }
}
