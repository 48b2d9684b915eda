//! Entry extraction from BibTeX text

use tracing::{debug, warn};

use crate::entry::Entry;
use crate::error::{DedupError, Result};

/// Extract the entries of a BibTeX text in source order
///
/// Blank text, or text without any entry block, is [`DedupError::EmptyInput`].
/// Text whose `@` blocks are all malformed is [`DedupError::Parse`], carrying
/// the first failure. Malformed blocks next to good ones are skipped with a
/// warning.
pub fn extract(text: &str) -> Result<Vec<Entry>> {
    if text.trim().is_empty() {
        return Err(DedupError::EmptyInput("input text is blank"));
    }

    let parsed = bibdup_bibtex::parse(text);
    for issue in &parsed.issues {
        warn!(line = issue.line, "skipping block: {}", issue.message);
    }

    if parsed.entries.is_empty() {
        return Err(match parsed.issues.into_iter().next() {
            Some(issue) => DedupError::Parse(issue.into()),
            None => DedupError::EmptyInput("no entry blocks found"),
        });
    }

    let skipped = parsed.issues.len();
    let entries: Vec<Entry> = parsed.entries.into_iter().map(Entry::from).collect();
    debug!(entries = entries.len(), skipped, "extracted bibliography entries");
    Ok(entries)
}
