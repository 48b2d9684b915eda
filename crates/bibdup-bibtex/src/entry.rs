//! Raw BibTeX block records

use serde::{Deserialize, Serialize};

/// A single `name = value` pair as it appeared in the block
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BibTeXField {
    pub name: String,
    pub value: String,
}

/// One `@type{key, ...}` block read from the input
///
/// Fields are kept in source order with their names as written; lookups
/// through [`BibTeXEntry::get_field`] ignore ASCII case the way BibTeX does.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BibTeXEntry {
    pub cite_key: String,
    /// Entry type lowercased (`article`, `inproceedings`, ...)
    pub entry_type: String,
    pub fields: Vec<BibTeXField>,
    /// 1-based line of the opening `@`
    pub line: u32,
}

impl BibTeXEntry {
    pub fn new(cite_key: impl Into<String>, entry_type: &str) -> Self {
        Self {
            cite_key: cite_key.into(),
            entry_type: entry_type.to_ascii_lowercase(),
            fields: Vec::new(),
            line: 0,
        }
    }

    pub fn add_field(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.fields.push(BibTeXField {
            name: name.into(),
            value: value.into(),
        });
    }

    /// First field whose name matches `name` case-insensitively
    pub fn get_field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|f| f.name.eq_ignore_ascii_case(name))
            .map(|f| f.value.as_str())
    }
}
