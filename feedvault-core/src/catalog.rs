//! Catalog loader and writer
//!
//! The catalog is a directory tree of `*.json` records. Loading walks the
//! tree in path order, so the "discovery order" the index preserves is
//! stable across runs. Every loaded record keeps its originating path for
//! write-back after scoring or a health refresh.
//!
//! An empty catalog is an error, not a valid state: zero files almost
//! always means a misconfigured root directory.

use std::cmp::Ordering;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::record::SourceRecord;

/// Errors from catalog file operations
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Sources directory does not exist: {0}")]
    MissingRoot(PathBuf),

    #[error("No JSON source files found under {0}")]
    EmptyCatalog(PathBuf),

    #[error("Failed to scan {path}")]
    Walk {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error("Failed to read {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {path} as JSON")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to write {path}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A record annotated with the file it came from
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedRecord {
    pub record: SourceRecord,
    pub path: PathBuf,
}

/// A file the lenient loader could not turn into a record
#[derive(Debug)]
pub struct LoadFailure {
    pub path: PathBuf,
    pub error: CatalogError,
}

/// The full record set of one batch run
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    pub records: Vec<LoadedRecord>,
}

impl Catalog {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records sorted by quality score descending, ties broken by id
    ///
    /// Unscored records count as zero, so retired and never-scored records
    /// sort last.
    pub fn quality_ranked(&self) -> Vec<&LoadedRecord> {
        let mut ranked: Vec<&LoadedRecord> = self.records.iter().collect();
        ranked.sort_by(|a, b| {
            let qa = a.record.quality_score.unwrap_or(0.0);
            let qb = b.record.quality_score.unwrap_or(0.0);
            qb.partial_cmp(&qa)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.record.id.cmp(&b.record.id))
        });
        ranked
    }
}

/// List every `*.json` file under the root, recursively, in path order
pub fn source_files(root: &Path) -> Result<Vec<PathBuf>, CatalogError> {
    if !root.is_dir() {
        return Err(CatalogError::MissingRoot(root.to_path_buf()));
    }

    let mut files = Vec::new();
    for entry in walkdir::WalkDir::new(root) {
        let entry = entry.map_err(|e| CatalogError::Walk {
            path: root.to_path_buf(),
            source: e,
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        if entry.path().extension().is_some_and(|ext| ext == "json") {
            files.push(entry.path().to_path_buf());
        }
    }
    files.sort();

    if files.is_empty() {
        return Err(CatalogError::EmptyCatalog(root.to_path_buf()));
    }
    Ok(files)
}

fn read_record(path: &Path) -> Result<SourceRecord, CatalogError> {
    let raw = fs::read_to_string(path).map_err(|e| CatalogError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    serde_json::from_str(&raw).map_err(|e| CatalogError::Parse {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Load the catalog, failing on the first unreadable or malformed file
pub fn load_catalog(root: &Path) -> Result<Catalog, CatalogError> {
    let mut records = Vec::new();
    for path in source_files(root)? {
        let record = read_record(&path)?;
        records.push(LoadedRecord { record, path });
    }
    info!("loaded {} source files from {}", records.len(), root.display());
    Ok(Catalog { records })
}

/// Load the catalog, collecting per-file failures instead of aborting
///
/// One malformed file should not block scoring or indexing the rest; the
/// caller decides whether the failures are fatal for its operation. Missing
/// root and empty catalog are still hard errors.
pub fn load_catalog_lenient(root: &Path) -> Result<(Catalog, Vec<LoadFailure>), CatalogError> {
    let mut records = Vec::new();
    let mut failures = Vec::new();

    for path in source_files(root)? {
        match read_record(&path) {
            Ok(record) => records.push(LoadedRecord { record, path }),
            Err(error) => {
                warn!("skipping unreadable source file: {error}");
                failures.push(LoadFailure { path, error });
            }
        }
    }

    info!(
        "loaded {} source files from {} ({} unreadable)",
        records.len(),
        root.display(),
        failures.len()
    );
    Ok((Catalog { records }, failures))
}

/// Write a record back to its originating file
///
/// Pretty-printed JSON with a trailing newline, written to a sibling temp
/// file and renamed into place so an interrupted write never truncates the
/// record.
pub fn save_record(loaded: &LoadedRecord) -> Result<(), CatalogError> {
    let mut body =
        serde_json::to_string_pretty(&loaded.record).map_err(|e| CatalogError::Parse {
            path: loaded.path.clone(),
            source: e,
        })?;
    body.push('\n');

    let tmp = loaded.path.with_extension("json.tmp");
    fs::write(&tmp, body).map_err(|e| CatalogError::Write {
        path: tmp.clone(),
        source: e,
    })?;
    fs::rename(&tmp, &loaded.path).map_err(|e| CatalogError::Write {
        path: loaded.path.clone(),
        source: e,
    })?;

    debug!("saved {}", loaded.path.display());
    Ok(())
}
