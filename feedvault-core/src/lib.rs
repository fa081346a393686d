//! feedvault core - record model and batch logic for the feed catalog
//!
//! This crate provides the synchronous pieces of the pipeline:
//! - Typed source records with retirement semantics
//! - Catalog loader/writer over a directory tree of JSON files
//! - Composite quality scoring (freshness, authority, coverage, availability)
//! - Denormalized lookup index, rebuilt wholesale as an immutable snapshot
//! - Schema and vocabulary validation

pub mod catalog;
pub mod config;
pub mod index;
pub mod record;
pub mod score;
pub mod validate;

pub use catalog::*;
pub use config::*;
pub use index::*;
pub use record::*;
pub use score::*;
pub use validate::*;

/// Default weight for the freshness sub-metric
pub const DEFAULT_FRESHNESS_WEIGHT: f64 = 0.4;

/// Default weight for the authority sub-metric
pub const DEFAULT_AUTHORITY_WEIGHT: f64 = 0.3;

/// Default weight for the coverage sub-metric
pub const DEFAULT_COVERAGE_WEIGHT: f64 = 0.2;

/// Default weight for the availability sub-metric
pub const DEFAULT_AVAILABILITY_WEIGHT: f64 = 0.1;

/// Days until a record's freshness score decays to zero
pub const FRESHNESS_WINDOW_DAYS: f64 = 60.0;
