//! Denormalized lookup index
//!
//! The index is a pure projection of the record set: five maps built in a
//! single pass, persisted as one JSON snapshot, and rebuilt wholesale each
//! run. It owns no state the records don't already contain and can be
//! discarded at any time without loss.
//!
//! All maps are `BTreeMap`s and id lists preserve discovery order, so
//! rebuilding from an unchanged record set is bit-identical.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::record::SourceRecord;

/// Errors that abort index construction or persistence
///
/// Integrity errors are fatal to the whole batch: a duplicate id would make
/// the derived index self-contradictory, so nothing is emitted.
#[derive(Debug, Error)]
pub enum IndexError {
    #[error("Duplicate source id `{id}`")]
    DuplicateId { id: String },

    #[error("Source named `{name}` has no id")]
    MissingId { name: String },

    #[error("Source `{id}` is missing required field `{field}`")]
    MissingField { id: String, field: &'static str },

    #[error("Failed to read index {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to encode or decode index {path}")]
    Codec {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Fixed quality buckets over the composite score
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum QualityBucket {
    /// [90,100]
    Excellent,
    /// [70,90)
    Good,
    /// [50,70)
    Average,
    /// (0,50)
    Poor,
    /// Exactly 0 - retired records
    Deprecated,
}

impl QualityBucket {
    pub const ALL: [QualityBucket; 5] = [
        QualityBucket::Excellent,
        QualityBucket::Good,
        QualityBucket::Average,
        QualityBucket::Poor,
        QualityBucket::Deprecated,
    ];

    pub fn for_score(score: f64) -> Self {
        if score >= 90.0 {
            QualityBucket::Excellent
        } else if score >= 70.0 {
            QualityBucket::Good
        } else if score >= 50.0 {
            QualityBucket::Average
        } else if score > 0.0 {
            QualityBucket::Poor
        } else {
            QualityBucket::Deprecated
        }
    }
}

/// Summary counts stored alongside the maps
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexMetadata {
    pub source_count: usize,
    pub category_count: usize,
    pub tag_count: usize,
    pub format_count: usize,
}

/// The five lookup maps over the scored record set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceIndex {
    pub category_index: BTreeMap<String, Vec<String>>,
    pub tag_index: BTreeMap<String, Vec<String>>,
    pub format_index: BTreeMap<String, Vec<String>>,
    pub quality_index: BTreeMap<QualityBucket, Vec<String>>,
    pub source_lookup: BTreeMap<String, SourceRecord>,
    pub metadata: IndexMetadata,
}

impl SourceIndex {
    /// Build the index from the full scored record list in a single pass
    ///
    /// Fails without emitting anything if any record lacks the fields every
    /// downstream lookup depends on, or if two records share an id.
    pub fn build(records: &[SourceRecord]) -> Result<Self, IndexError> {
        let mut category_index: BTreeMap<String, Vec<String>> = BTreeMap::new();
        let mut tag_index: BTreeMap<String, Vec<String>> = BTreeMap::new();
        let mut format_index: BTreeMap<String, Vec<String>> = BTreeMap::new();
        let mut quality_index: BTreeMap<QualityBucket, Vec<String>> = QualityBucket::ALL
            .iter()
            .map(|bucket| (*bucket, Vec::new()))
            .collect();
        let mut source_lookup: BTreeMap<String, SourceRecord> = BTreeMap::new();

        for record in records {
            let id = record.id.trim();
            if id.is_empty() {
                return Err(IndexError::MissingId {
                    name: record.name.clone(),
                });
            }
            if record.category.trim().is_empty() {
                return Err(IndexError::MissingField {
                    id: id.to_string(),
                    field: "category",
                });
            }
            let Some(score) = record.quality_score else {
                return Err(IndexError::MissingField {
                    id: id.to_string(),
                    field: "quality_score",
                });
            };
            if source_lookup.contains_key(id) {
                return Err(IndexError::DuplicateId { id: id.to_string() });
            }

            category_index
                .entry(record.category.clone())
                .or_default()
                .push(id.to_string());

            for tag in &record.tags {
                tag_index
                    .entry(tag.clone())
                    .or_default()
                    .push(id.to_string());
            }

            format_index
                .entry(record.format.as_str().to_string())
                .or_default()
                .push(id.to_string());

            quality_index
                .entry(QualityBucket::for_score(score))
                .or_default()
                .push(id.to_string());

            source_lookup.insert(id.to_string(), record.clone());
        }

        let metadata = IndexMetadata {
            source_count: source_lookup.len(),
            category_count: category_index.len(),
            tag_count: tag_index.len(),
            format_count: format_index.len(),
        };

        Ok(Self {
            category_index,
            tag_index,
            format_index,
            quality_index,
            source_lookup,
            metadata,
        })
    }

    /// Persist the whole snapshot as pretty JSON, atomically
    pub fn save(&self, path: &Path) -> Result<(), IndexError> {
        let mut body = serde_json::to_string_pretty(self).map_err(|e| IndexError::Codec {
            path: path.to_path_buf(),
            source: e,
        })?;
        body.push('\n');

        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, body).map_err(|e| IndexError::Io {
            path: tmp.clone(),
            source: e,
        })?;
        fs::rename(&tmp, path).map_err(|e| IndexError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        info!(
            "saved index of {} sources to {}",
            self.metadata.source_count,
            path.display()
        );
        Ok(())
    }

    /// Load a previously persisted snapshot as a whole
    pub fn load(path: &Path) -> Result<Self, IndexError> {
        let raw = fs::read_to_string(path).map_err(|e| IndexError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        serde_json::from_str(&raw).map_err(|e| IndexError::Codec {
            path: path.to_path_buf(),
            source: e,
        })
    }
}
