//! Configuration documents
//!
//! Two small JSON documents steer a batch run:
//! - the scoring config carries the four composite weights
//! - the categories document enumerates the category/tag vocabulary used
//!   by the optional hygiene check in `validate`

use std::fs;
use std::path::Path;

use serde::Deserialize;
use tracing::warn;

use crate::catalog::CatalogError;
use crate::score::ScoringWeights;

/// Scoring configuration (`config/scoring-config.json`)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScoringConfig {
    #[serde(default)]
    pub weights: ScoringWeights,
}

impl ScoringConfig {
    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let raw = fs::read_to_string(path).map_err(|e| CatalogError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        serde_json::from_str(&raw).map_err(|e| CatalogError::Parse {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Load the config, falling back to default weights if it is missing
    /// or unreadable
    ///
    /// A broken config should not stop a scheduled scoring run.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!("failed to load scoring config, using default weights: {e}");
                Self::default()
            }
        }
    }
}

/// Category and tag vocabulary (`config/categories.json`)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CategorySet {
    #[serde(default)]
    categories: Vec<String>,
    #[serde(default)]
    tags: Vec<String>,
}

impl CategorySet {
    pub fn new(categories: Vec<String>, tags: Vec<String>) -> Self {
        Self { categories, tags }
    }

    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let raw = fs::read_to_string(path).map_err(|e| CatalogError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        serde_json::from_str(&raw).map_err(|e| CatalogError::Parse {
            path: path.to_path_buf(),
            source: e,
        })
    }

    pub fn contains_category(&self, category: &str) -> bool {
        self.categories.iter().any(|c| c == category)
    }

    pub fn contains_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    /// Whether a tag vocabulary was declared at all
    pub fn has_tags(&self) -> bool {
        !self.tags.is_empty()
    }
}
