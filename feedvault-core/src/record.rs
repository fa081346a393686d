//! Source record model
//!
//! One JSON document per external data feed. Records are:
//! - Created by contributors adding a file under the catalog root
//! - Mutated by the scorer (quality fields) and the health checker
//!   (availability, last_updated)
//! - Never deleted: "deletion" is retirement, a zeroed quality score

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Wire format of an external data feed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SourceFormat {
    /// JSON payloads
    Json,
    /// CSV exports
    Csv,
    /// RSS feeds
    Rss,
    /// XML payloads
    Xml,
    /// Anything else (also absorbs unrecognized tags)
    #[serde(other)]
    #[default]
    Other,
}

impl SourceFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceFormat::Json => "json",
            SourceFormat::Csv => "csv",
            SourceFormat::Rss => "rss",
            SourceFormat::Xml => "xml",
            SourceFormat::Other => "other",
        }
    }
}

/// Per-record scoring weight overrides supplied by a user
///
/// Weights need not sum to 1; the scorer normalizes them before use.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct UserWeights {
    #[serde(default)]
    pub freshness: f64,
    #[serde(default)]
    pub authority: f64,
    #[serde(default)]
    pub coverage: f64,
    #[serde(default)]
    pub availability: f64,
}

impl UserWeights {
    pub fn sum(&self) -> f64 {
        self.freshness + self.authority + self.coverage + self.availability
    }

    /// Normalize the weights to sum to 1.0
    ///
    /// Returns `None` when the weights sum to zero (or below), in which
    /// case callers fall back to the default composite score.
    pub fn normalized(&self) -> Option<UserWeights> {
        let total = self.sum();
        if total <= 0.0 {
            return None;
        }
        Some(UserWeights {
            freshness: self.freshness / total,
            authority: self.authority / total,
            coverage: self.coverage / total,
            availability: self.availability / total,
        })
    }
}

/// Metadata describing one external threat-intelligence feed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceRecord {
    /// Globally unique identifier, immutable once published
    pub id: String,
    /// Human-readable name
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Feed endpoint
    pub url: String,
    /// Top-level category (e.g. "vulnerability", "malware")
    pub category: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub_category: Option<String>,
    /// Wire format of the feed
    pub format: SourceFormat,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    /// Composite quality score in [0,100]; `Some(0.0)` marks retirement
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality_score: Option<f64>,
    /// Composite score under the record's own preference weights
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_weighted_score: Option<f64>,
    /// ISO-8601 timestamp of the last successful refresh
    ///
    /// Kept as a raw string so an unparseable value degrades to zero
    /// freshness instead of failing the whole load.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub freshness: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authority: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coverage: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub availability: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_preference_weight: Option<UserWeights>,
    /// Contributor-supplied extras (rate limits, auth notes, examples)
    ///
    /// Preserved verbatim through load, scoring and write-back.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl SourceRecord {
    /// A retired record has a quality score of exactly zero
    pub fn is_retired(&self) -> bool {
        self.quality_score == Some(0.0)
    }

    /// Retire the record: zero the score and refresh `last_updated`
    ///
    /// Records are never deleted from the catalog, only retired.
    pub fn retire(&mut self, now: DateTime<Utc>) {
        self.quality_score = Some(0.0);
        self.touch(now);
    }

    /// Stamp `last_updated` with the given instant
    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.last_updated = Some(format_timestamp(now));
    }
}

/// Format a timestamp the way the catalog stores them: RFC 3339, seconds
/// precision, `Z` suffix
pub fn format_timestamp(instant: DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Test fixture shared by the scorer and index test modules
#[cfg(test)]
pub(crate) fn sample_record(id: &str) -> SourceRecord {
    SourceRecord {
        id: id.to_string(),
        name: format!("Sample {id}"),
        description: None,
        url: "https://feeds.example.com/v1".to_string(),
        category: "vulnerability".to_string(),
        sub_category: None,
        format: SourceFormat::Json,
        tags: vec!["cve".to_string()],
        quality_score: Some(75.0),
        user_weighted_score: None,
        last_updated: Some("2026-08-01T00:00:00Z".to_string()),
        freshness: None,
        authority: Some(80.0),
        coverage: Some(60.0),
        availability: Some(100.0),
        user_preference_weight: None,
        extra: Map::new(),
    }
}
