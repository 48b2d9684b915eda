//! DOI canonicalization for the opt-in `normalize_dois` setting

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref DOI_PREFIX: Regex =
        Regex::new(r"(?i)^(?:https?://(?:dx\.)?doi\.org/|doi:\s*)").unwrap();
}

/// Strip resolver prefixes and lowercase a DOI
///
/// DOIs are case-insensitive by registry rules, and bibliographies often
/// carry them as resolver URLs. Returns an empty string for a DOI that was
/// only a prefix.
pub fn normalize_doi(doi: &str) -> String {
    DOI_PREFIX.replace(doi.trim(), "").trim().to_lowercase()
}
