//! Duplicate detection by cite key and DOI
//!
//! Two entries are duplicates when their cite keys are equal, or when both
//! declare a DOI and the DOIs are equal. Entries are bucketed by each signal
//! and every bucket with two or more members binds them together, so no
//! pairwise scan is needed.

mod detector;
mod index;
mod normalization;

pub use detector::{
    check_bibliography, detect_duplicates, find_duplicate_groups, Detector, DuplicateGroup,
    DuplicateReport, MatchSignal,
};
pub use normalization::normalize_doi;
