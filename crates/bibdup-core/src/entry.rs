//! Bibliographic entry records checked for duplicates

use std::collections::BTreeMap;

use bibdup_bibtex::BibTeXEntry;
use serde::{Deserialize, Serialize};

/// One bibliographic record
///
/// Only `key` and `doi` take part in duplicate detection. Every other field
/// is kept in an open map with lowercased names so callers can render
/// reports without the detector knowing the full schema.
///
/// Deserialized entries go through the same rules as [`Entry::new`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawEntry")]
pub struct Entry {
    key: String,
    doi: Option<String>,
    entry_type: String,
    fields: BTreeMap<String, String>,
}

impl Entry {
    /// Create an entry. A blank `doi` is treated as absent.
    pub fn new(key: impl Into<String>, doi: Option<&str>) -> Self {
        Self {
            key: key.into(),
            doi: doi
                .map(str::trim)
                .filter(|d| !d.is_empty())
                .map(str::to_string),
            entry_type: "misc".to_string(),
            fields: BTreeMap::new(),
        }
    }

    pub fn with_entry_type(mut self, entry_type: &str) -> Self {
        self.entry_type = entry_type.to_ascii_lowercase();
        self
    }

    /// Attach a descriptive field. `doi` is not a descriptive field and is
    /// ignored here; set it through [`Entry::new`].
    pub fn with_field(mut self, name: &str, value: impl Into<String>) -> Self {
        let name = name.to_ascii_lowercase();
        if name != "doi" {
            self.fields.entry(name).or_insert_with(|| value.into());
        }
        self
    }

    /// Cite key as written in the source
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn doi(&self) -> Option<&str> {
        self.doi.as_deref()
    }

    pub fn entry_type(&self) -> &str {
        &self.entry_type
    }

    /// Descriptive field by name, ignoring case
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    pub fn fields(&self) -> &BTreeMap<String, String> {
        &self.fields
    }

    pub fn title(&self) -> Option<&str> {
        self.field("title")
    }

    pub fn author(&self) -> Option<&str> {
        self.field("author")
    }
}

/// Serialized shape of an [`Entry`], checked before use
#[derive(Deserialize)]
struct RawEntry {
    key: String,
    #[serde(default)]
    doi: Option<String>,
    #[serde(default = "default_entry_type")]
    entry_type: String,
    #[serde(default)]
    fields: BTreeMap<String, String>,
}

fn default_entry_type() -> String {
    "misc".to_string()
}

impl TryFrom<RawEntry> for Entry {
    type Error = String;

    fn try_from(raw: RawEntry) -> Result<Self, Self::Error> {
        if raw.key.trim().is_empty() {
            return Err("entry key must not be empty".to_string());
        }
        let mut entry = Entry::new(raw.key, raw.doi.as_deref()).with_entry_type(&raw.entry_type);
        for (name, value) in raw.fields {
            entry = entry.with_field(&name, value);
        }
        Ok(entry)
    }
}

impl From<BibTeXEntry> for Entry {
    fn from(raw: BibTeXEntry) -> Self {
        let mut entry =
            Entry::new(raw.cite_key.as_str(), raw.get_field("doi")).with_entry_type(&raw.entry_type);
        for field in raw.fields {
            entry = entry.with_field(&field.name, field.value);
        }
        entry
    }
}
