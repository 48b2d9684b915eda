//! BibTeX block parsing for bibdup
//!
//! Turns BibTeX text into raw [`BibTeXEntry`] records in source order,
//! keeping every field as written. Blocks that cannot be parsed are reported
//! as [`ParseIssue`]s instead of aborting the whole text.

mod entry;
pub mod parser;

pub use entry::{BibTeXEntry, BibTeXField};
pub use parser::{parse, ParseError, ParseIssue, ParsedBibliography};
