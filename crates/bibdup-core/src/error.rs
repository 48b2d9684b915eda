//! Error types for bibdup-core

use bibdup_bibtex::ParseError;
use thiserror::Error;

use crate::config::ConfigError;

/// Result type alias for bibdup operations
pub type Result<T> = std::result::Result<T, DedupError>;

/// Errors surfaced by extraction and detection
#[derive(Error, Debug)]
pub enum DedupError {
    /// Nothing to check: blank text, no entry blocks, or an empty collection
    #[error("no bibliography entries: {0}")]
    EmptyInput(&'static str),

    /// The text had `@` blocks but none of them yielded an entry
    #[error("could not parse any entry: {0}")]
    Parse(#[from] ParseError),

    /// Detector configuration rejected
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
}

impl DedupError {
    /// True for the "nothing to check" failure
    pub fn is_empty_input(&self) -> bool {
        matches!(self, DedupError::EmptyInput(_))
    }
}
