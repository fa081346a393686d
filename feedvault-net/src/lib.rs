//! feedvault networking - feed health probes
//!
//! This crate is the only part of the pipeline that touches the network:
//! - HEAD probes against each feed URL, bounded by a worker cap
//! - Per-call timeout and bounded retry with jittered exponential backoff
//! - Metadata refresh rules applied from probe results
//!
//! Probes are independent per record with no ordering guarantee; the core
//! scoring and indexing logic never depends on this crate.

pub mod health;
pub mod refresh;

pub use health::*;
pub use refresh::*;
