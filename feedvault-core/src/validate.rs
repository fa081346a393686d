//! Schema validation for source files
//!
//! Validation runs over raw JSON values rather than typed records so a file
//! with the wrong type in one field still yields a precise, per-field
//! report instead of a single serde failure.
//!
//! Vocabulary checks (known categories/tags) are hygiene, not schema: they
//! only ever produce warnings.

use std::sync::LazyLock;

use chrono::DateTime;
use regex::Regex;
use serde_json::Value;

use crate::config::CategorySet;
use crate::record::SourceFormat;

/// Keys every source file must carry
pub const REQUIRED_KEYS: &[&str] = &[
    "id",
    "name",
    "url",
    "category",
    "format",
    "quality_score",
    "last_updated",
];

const SCORE_KEYS: &[&str] = &[
    "quality_score",
    "user_weighted_score",
    "freshness",
    "authority",
    "coverage",
    "availability",
];

const WEIGHT_KEYS: &[&str] = &["freshness", "authority", "coverage", "availability"];

static ID_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9][a-z0-9_-]*$").unwrap());

/// How bad a validation finding is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Schema violation; the file does not conform
    Error,
    /// Hygiene finding; the file still conforms
    Warning,
}

/// One finding against one field of one file
#[derive(Debug, Clone)]
pub struct ValidationIssue {
    pub field: String,
    pub message: String,
    pub severity: Severity,
}

impl ValidationIssue {
    fn error(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
            severity: Severity::Error,
        }
    }

    fn warning(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
            severity: Severity::Warning,
        }
    }
}

/// True if any issue is a hard schema violation
pub fn has_errors(issues: &[ValidationIssue]) -> bool {
    issues.iter().any(|i| i.severity == Severity::Error)
}

/// Validate one parsed source document
pub fn validate_value(value: &Value, vocabulary: Option<&CategorySet>) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();

    let Some(doc) = value.as_object() else {
        issues.push(ValidationIssue::error("document", "expected a JSON object"));
        return issues;
    };

    for key in REQUIRED_KEYS {
        if !doc.contains_key(*key) || doc[*key].is_null() {
            issues.push(ValidationIssue::error(key, "required key is missing"));
        }
    }

    for key in ["id", "name", "url", "category", "sub_category", "description"] {
        if let Some(v) = doc.get(key) {
            if !v.is_null() && !v.is_string() {
                issues.push(ValidationIssue::error(key, "expected a string"));
            }
        }
    }

    if let Some(id) = doc.get("id").and_then(Value::as_str) {
        if !ID_REGEX.is_match(id) {
            issues.push(ValidationIssue::error(
                "id",
                "must match ^[a-z0-9][a-z0-9_-]*$",
            ));
        }
    }

    if let Some(url) = doc.get("url").and_then(Value::as_str) {
        if !url.starts_with("http://") && !url.starts_with("https://") {
            issues.push(ValidationIssue::error(
                "url",
                "must use an http or https scheme",
            ));
        }
    }

    if let Some(format) = doc.get("format") {
        match format.as_str() {
            Some(tag) => {
                let known = serde_json::from_value::<SourceFormat>(format.clone())
                    .map(|f| f.as_str() == tag)
                    .unwrap_or(false);
                if !known {
                    issues.push(ValidationIssue::warning(
                        "format",
                        format!("unrecognized format tag `{tag}`, treated as `other`"),
                    ));
                }
            }
            None if !format.is_null() => {
                issues.push(ValidationIssue::error("format", "expected a string"));
            }
            None => {}
        }
    }

    for key in SCORE_KEYS {
        if let Some(v) = doc.get(*key) {
            match v.as_f64() {
                Some(score) if (0.0..=100.0).contains(&score) => {}
                Some(score) => issues.push(ValidationIssue::error(
                    key,
                    format!("score {score} is outside [0,100]"),
                )),
                None if !v.is_null() => {
                    issues.push(ValidationIssue::error(key, "expected a number"));
                }
                None => {}
            }
        }
    }

    if let Some(raw) = doc.get("last_updated").and_then(Value::as_str) {
        if DateTime::parse_from_rfc3339(raw).is_err() {
            issues.push(ValidationIssue::error(
                "last_updated",
                format!("`{raw}` is not an ISO-8601 timestamp"),
            ));
        }
    }

    match doc.get("tags") {
        Some(Value::Array(tags)) => {
            if tags.iter().any(|t| !t.is_string()) {
                issues.push(ValidationIssue::error("tags", "tags must all be strings"));
            }
        }
        Some(v) if !v.is_null() => {
            issues.push(ValidationIssue::error("tags", "expected an array of strings"));
        }
        _ => {}
    }

    match doc.get("user_preference_weight") {
        Some(Value::Object(weights)) => {
            for (key, v) in weights {
                if !WEIGHT_KEYS.contains(&key.as_str()) {
                    issues.push(ValidationIssue::warning(
                        "user_preference_weight",
                        format!("unknown weight key `{key}`"),
                    ));
                    continue;
                }
                match v.as_f64() {
                    Some(w) if w >= 0.0 => {}
                    Some(w) => issues.push(ValidationIssue::error(
                        "user_preference_weight",
                        format!("weight `{key}` is negative ({w})"),
                    )),
                    None => issues.push(ValidationIssue::error(
                        "user_preference_weight",
                        format!("weight `{key}` is not a number"),
                    )),
                }
            }
        }
        Some(v) if !v.is_null() => {
            issues.push(ValidationIssue::error(
                "user_preference_weight",
                "expected an object of weights",
            ));
        }
        _ => {}
    }

    if let Some(vocab) = vocabulary {
        if let Some(category) = doc.get("category").and_then(Value::as_str) {
            if !vocab.contains_category(category) {
                issues.push(ValidationIssue::warning(
                    "category",
                    format!("`{category}` is not in the category vocabulary"),
                ));
            }
        }
        if vocab.has_tags() {
            if let Some(Value::Array(tags)) = doc.get("tags") {
                for tag in tags.iter().filter_map(Value::as_str) {
                    if !vocab.contains_tag(tag) {
                        issues.push(ValidationIssue::warning(
                            "tags",
                            format!("`{tag}` is not in the tag vocabulary"),
                        ));
                    }
                }
            }
        }
    }

    issues
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn valid_doc() -> Value {
        json!({
            "id": "abuse-ch-urlhaus",
            "name": "URLhaus",
            "url": "https://urlhaus.abuse.ch/downloads/json/",
            "category": "malware",
            "format": "json",
            "quality_score": 82.5,
            "last_updated": "2026-08-01T00:00:00Z",
            "tags": ["urls", "payloads"]
        })
    }

    #[test]
    fn test_valid_document_has_no_issues() {
        assert!(validate_value(&valid_doc(), None).is_empty());
    }

    #[test]
    fn test_missing_required_key() {
        let mut doc = valid_doc();
        doc.as_object_mut().unwrap().remove("quality_score");
        let issues = validate_value(&doc, None);
        assert!(has_errors(&issues));
        assert!(issues.iter().any(|i| i.field == "quality_score"));
    }

    #[test]
    fn test_bad_url_scheme() {
        let mut doc = valid_doc();
        doc["url"] = json!("ftp://urlhaus.abuse.ch/dump");
        let issues = validate_value(&doc, None);
        assert!(issues.iter().any(|i| i.field == "url" && i.severity == Severity::Error));
    }

    #[test]
    fn test_out_of_range_score() {
        let mut doc = valid_doc();
        doc["authority"] = json!(140.0);
        let issues = validate_value(&doc, None);
        assert!(issues.iter().any(|i| i.field == "authority" && i.severity == Severity::Error));
    }

    #[test]
    fn test_bad_id_shape() {
        let mut doc = valid_doc();
        doc["id"] = json!("Abuse CH!");
        assert!(has_errors(&validate_value(&doc, None)));
    }

    #[test]
    fn test_unparseable_timestamp() {
        let mut doc = valid_doc();
        doc["last_updated"] = json!("last tuesday");
        let issues = validate_value(&doc, None);
        assert!(issues.iter().any(|i| i.field == "last_updated"));
    }

    #[test]
    fn test_unknown_format_is_only_a_warning() {
        let mut doc = valid_doc();
        doc["format"] = json!("protobuf");
        let issues = validate_value(&doc, None);
        assert!(!has_errors(&issues));
        assert!(issues.iter().any(|i| i.field == "format" && i.severity == Severity::Warning));
    }

    #[test]
    fn test_negative_user_weight() {
        let mut doc = valid_doc();
        doc["user_preference_weight"] = json!({"freshness": -1.0});
        assert!(has_errors(&validate_value(&doc, None)));
    }

    #[test]
    fn test_vocabulary_mismatch_is_a_warning() {
        let vocab = CategorySet::new(vec!["vulnerability".to_string()], Vec::new());
        let issues = validate_value(&valid_doc(), Some(&vocab));
        assert!(!has_errors(&issues));
        assert!(issues.iter().any(|i| i.field == "category" && i.severity == Severity::Warning));
    }

    #[test]
    fn test_non_object_document() {
        let issues = validate_value(&json!([1, 2, 3]), None);
        assert!(has_errors(&issues));
    }
}
