//! bibdup-core: duplicate detection for BibTeX bibliographies
//!
//! Two entries are reported as duplicates when they share a cite key, or
//! when both declare the same DOI. The crate provides:
//! - [`extract`]: BibTeX text to an ordered list of [`Entry`] records
//! - [`detect_duplicates`] / [`find_duplicate_groups`]: the flagged entries,
//!   or the groups they form
//! - [`Detector`] with a [`DetectorConfig`] for the opt-in variations
//!
//! Both extraction and detection refuse empty input with
//! [`DedupError::EmptyInput`], so "nothing was checked" never reads as
//! "no duplicates".

pub mod config;
pub mod deduplication;
pub mod entry;
pub mod error;
pub mod extract;

pub use config::{ConfigError, DetectorConfig, GroupingPolicy};
pub use deduplication::{
    check_bibliography, detect_duplicates, find_duplicate_groups, normalize_doi, Detector,
    DuplicateGroup, DuplicateReport, MatchSignal,
};
pub use entry::Entry;
pub use error::{DedupError, Result};
pub use extract::extract;

/// Returns the version of bibdup-core
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
