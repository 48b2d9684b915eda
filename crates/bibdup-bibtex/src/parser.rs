//! BibTeX block parser built on nom
//!
//! Recognizes:
//! - `@string` definitions, including `#` concatenation and macro references
//! - `@preamble` and `@comment` blocks
//! - regular entries delimited by braces or parentheses
//! - braced, quoted, numeric and macro field values with nested braces
//! - `%` line comments between blocks and between fields
//!
//! A block that cannot be parsed is recorded as a [`ParseIssue`] and the
//! parser resumes at the next `@`, so one broken entry never hides the rest.

use nom::{
    branch::alt,
    bytes::complete::take_while1,
    character::complete::{char, multispace0},
    combinator::map,
    IResult,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::entry::BibTeXEntry;

const MONTH_MACROS: [(&str, &str); 12] = [
    ("jan", "January"),
    ("feb", "February"),
    ("mar", "March"),
    ("apr", "April"),
    ("may", "May"),
    ("jun", "June"),
    ("jul", "July"),
    ("aug", "August"),
    ("sep", "September"),
    ("oct", "October"),
    ("nov", "November"),
    ("dec", "December"),
];

/// A block the parser had to skip
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseIssue {
    /// 1-based line of the `@` that opened the block
    pub line: u32,
    pub message: String,
}

/// Entries read from one BibTeX text, plus the blocks that were skipped
///
/// `@string` macros are expanded into field values and `@preamble` or
/// `@comment` blocks are dropped, so neither is kept here.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedBibliography {
    pub entries: Vec<BibTeXEntry>,
    pub issues: Vec<ParseIssue>,
}

/// A skipped block, as an error value
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("line {line}: {message}")]
    Malformed { line: u32, message: String },
}

impl From<ParseIssue> for ParseError {
    fn from(issue: ParseIssue) -> Self {
        ParseError::Malformed {
            line: issue.line,
            message: issue.message,
        }
    }
}

/// Parse a BibTeX text, collecting entries and any skipped blocks
pub fn parse(input: &str) -> ParsedBibliography {
    let mut result = ParsedBibliography::default();
    let mut strings: HashMap<String, String> = HashMap::new();
    let mut remaining = input;

    loop {
        remaining = skip_whitespace_and_comments(remaining);
        if remaining.is_empty() {
            break;
        }

        // Anything outside an @ block is commentary
        if !remaining.starts_with('@') {
            match remaining.find('@') {
                Some(pos) => remaining = &remaining[pos..],
                None => break,
            }
            continue;
        }

        let line = line_at(input, input.len() - remaining.len());
        match parse_block(remaining, &strings) {
            Ok((rest, block)) => {
                match block {
                    Block::Entry(mut entry) => {
                        entry.line = line;
                        result.entries.push(entry);
                    }
                    Block::String(name, value) => {
                        strings.insert(name.to_ascii_lowercase(), value);
                    }
                    Block::Skipped => {}
                }
                remaining = rest;
            }
            Err(_) => {
                result.issues.push(ParseIssue {
                    line,
                    message: describe_failure(remaining),
                });
                match remaining[1..].find('@') {
                    Some(pos) => remaining = &remaining[pos + 1..],
                    None => break,
                }
            }
        }
    }

    result
}

enum Block {
    Entry(BibTeXEntry),
    String(String, String),
    /// `@preamble` or `@comment`
    Skipped,
}

fn line_at(input: &str, offset: usize) -> u32 {
    input[..offset].matches('\n').count() as u32 + 1
}

fn describe_failure(block: &str) -> String {
    let head = block.lines().next().unwrap_or(block).trim();
    let head: String = head.chars().take(40).collect();
    format!("malformed block starting with `{}`", head)
}

fn skip_whitespace_and_comments(input: &str) -> &str {
    let mut rest = input;
    loop {
        rest = rest.trim_start();
        match rest.strip_prefix('%') {
            Some(comment) => {
                rest = match comment.find('\n') {
                    Some(pos) => &comment[pos..],
                    None => "",
                }
            }
            None => return rest,
        }
    }
}

fn is_cite_key_char(c: char) -> bool {
    !c.is_whitespace() && !matches!(c, ',' | '{' | '}' | '(' | ')' | '=' | '"' | '#' | '%')
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | ':' | '.' | '+')
}

fn char_error(input: &str) -> nom::Err<nom::error::Error<&str>> {
    nom::Err::Error(nom::error::Error::new(input, nom::error::ErrorKind::Char))
}

/// Opening delimiter of a block, returning the matching closer
fn open_block(input: &str) -> IResult<&str, char> {
    let (rest, _) = multispace0(input)?;
    let (rest, open) = alt((char('{'), char('(')))(rest)?;
    Ok((rest, if open == '{' { '}' } else { ')' }))
}

fn parse_block<'a>(input: &'a str, strings: &HashMap<String, String>) -> IResult<&'a str, Block> {
    let (rest, _) = char('@')(input)?;
    let (rest, _) = multispace0(rest)?;
    let (rest, block_type) = take_while1(|c: char| c.is_ascii_alphanumeric())(rest)?;

    match block_type.to_ascii_lowercase().as_str() {
        "string" => {
            let (rest, close) = open_block(rest)?;
            let (rest, (name, value)) = parse_single_field(rest, strings)?;
            let (rest, _) = multispace0(rest)?;
            let (rest, _) = char(close)(rest)?;
            Ok((rest, Block::String(name, value)))
        }
        "preamble" => {
            let (rest, close) = open_block(rest)?;
            let (rest, _) = multispace0(rest)?;
            let (rest, _) = parse_field_value(rest, strings)?;
            let (rest, _) = multispace0(rest)?;
            let (rest, _) = char(close)(rest)?;
            Ok((rest, Block::Skipped))
        }
        "comment" => {
            let (rest, _) = multispace0(rest)?;
            if rest.starts_with('{') {
                let (rest, _) = parse_braced_content(rest)?;
                Ok((rest, Block::Skipped))
            } else {
                let pos = rest.find('\n').unwrap_or(rest.len());
                Ok((&rest[pos..], Block::Skipped))
            }
        }
        _ => {
            let (rest, entry) = parse_entry_body(rest, block_type, strings)?;
            Ok((rest, Block::Entry(entry)))
        }
    }
}

fn parse_entry_body<'a>(
    input: &'a str,
    entry_type: &str,
    strings: &HashMap<String, String>,
) -> IResult<&'a str, BibTeXEntry> {
    let (rest, close) = open_block(input)?;
    let (rest, _) = multispace0(rest)?;
    let (rest, cite_key) = take_while1(is_cite_key_char)(rest)?;
    let (rest, _) = multispace0(rest)?;

    // `@misc{key}` without any fields is legal
    let (rest, fields) = match rest.strip_prefix(',') {
        Some(after_comma) => parse_fields(after_comma, close, strings)?,
        None => (rest, Vec::new()),
    };

    let (rest, _) = multispace0(rest)?;
    let (rest, _) = char(close)(rest)?;

    let mut entry = BibTeXEntry::new(cite_key, entry_type);
    for (name, value) in fields {
        entry.add_field(name, value);
    }

    Ok((rest, entry))
}

fn parse_fields<'a>(
    input: &'a str,
    close: char,
    strings: &HashMap<String, String>,
) -> IResult<&'a str, Vec<(String, String)>> {
    let mut fields = Vec::new();
    let mut remaining = input;

    loop {
        let rest = skip_whitespace_and_comments(remaining);
        if rest.starts_with(close) {
            return Ok((rest, fields));
        }

        match parse_single_field(rest, strings) {
            Ok((rest, field)) => {
                fields.push(field);
                let rest = skip_whitespace_and_comments(rest);
                remaining = rest.strip_prefix(',').unwrap_or(rest);
            }
            // Let the caller fail on the missing closer
            Err(_) => return Ok((rest, fields)),
        }
    }
}

fn parse_single_field<'a>(
    input: &'a str,
    strings: &HashMap<String, String>,
) -> IResult<&'a str, (String, String)> {
    let (rest, _) = multispace0(input)?;
    let (rest, name) = take_while1(is_name_char)(rest)?;
    let (rest, _) = multispace0(rest)?;
    let (rest, _) = char('=')(rest)?;
    let (rest, _) = multispace0(rest)?;
    let (rest, value) = parse_field_value(rest, strings)?;

    Ok((rest, (name.to_string(), value)))
}

fn resolve_macro(name: &str, strings: &HashMap<String, String>) -> String {
    let lowered = name.to_ascii_lowercase();
    if let Some(value) = strings.get(&lowered) {
        return value.clone();
    }
    MONTH_MACROS
        .iter()
        .find(|(abbrev, _)| *abbrev == lowered)
        .map(|(_, month)| month.to_string())
        .unwrap_or_else(|| name.to_string())
}

/// Braced, quoted, numeric or macro value, joined across `#`
fn parse_field_value<'a>(
    input: &'a str,
    strings: &HashMap<String, String>,
) -> IResult<&'a str, String> {
    let mut value = String::new();
    let mut remaining = input;

    loop {
        let (rest, _) = multispace0(remaining)?;
        let (rest, part) = alt((
            parse_braced_value,
            parse_quoted_value,
            // Bare numbers, `2024a` style values and macro names
            map(take_while1(is_name_char), |s: &str| resolve_macro(s, strings)),
        ))(rest)?;
        value.push_str(&part);

        let (rest, _) = multispace0(rest)?;
        match rest.strip_prefix('#') {
            Some(next) => remaining = next,
            None => return Ok((rest, value)),
        }
    }
}

fn parse_braced_value(input: &str) -> IResult<&str, String> {
    let (rest, content) = parse_braced_content(input)?;
    Ok((rest, content[1..content.len() - 1].to_string()))
}

/// Balanced `{...}` including the outer braces
fn parse_braced_content(input: &str) -> IResult<&str, &str> {
    if !input.starts_with('{') {
        return Err(char_error(input));
    }

    let mut depth = 0usize;
    let mut escaped = false;
    for (pos, c) in input.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Ok((&input[pos + 1..], &input[..pos + 1]));
                }
            }
            _ => {}
        }
    }

    Err(char_error(input))
}

fn parse_quoted_value(input: &str) -> IResult<&str, String> {
    let Some(body) = input.strip_prefix('"') else {
        return Err(char_error(input));
    };

    let mut depth = 0usize;
    let mut escaped = false;
    for (pos, c) in body.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '{' => depth += 1,
            '}' => depth = depth.saturating_sub(1),
            '"' if depth == 0 => return Ok((&body[pos + 1..], body[..pos].to_string())),
            _ => {}
        }
    }

    Err(char_error(input))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_entry() {
        let input = r#"
@article{Smith2024,
    author = {John Smith},
    title = {A Great Paper},
    year = {2024},
    doi = {10.1234/5678},
}
"#;
        let result = parse(input);
        assert_eq!(result.entries.len(), 1);
        assert!(result.issues.is_empty());

        let entry = &result.entries[0];
        assert_eq!(entry.cite_key, "Smith2024");
        assert_eq!(entry.entry_type, "article");
        assert_eq!(entry.line, 2);
        assert_eq!(entry.get_field("author"), Some("John Smith"));
        assert_eq!(entry.get_field("doi"), Some("10.1234/5678"));
    }

    #[test]
    fn test_parse_quoted_values() {
        let input = r#"@article{Test2024, author = "Jane Doe", title = "Testing \"Quotes\""}"#;
        let result = parse(input);
        assert_eq!(result.entries.len(), 1);
        assert_eq!(result.entries[0].get_field("author"), Some("Jane Doe"));
        assert_eq!(
            result.entries[0].get_field("title"),
            Some(r#"Testing \"Quotes\""#)
        );
    }

    #[test]
    fn test_parse_non_ascii_quoted_value() {
        let input = r#"@article{Muller, author = "Jürgen Müller"}"#;
        let result = parse(input);
        assert_eq!(result.entries[0].get_field("author"), Some("Jürgen Müller"));
    }

    #[test]
    fn test_parse_nested_braces() {
        let input = "@article{Test2024, title = {A {B}ook about {LaTeX}}}";
        let result = parse(input);
        assert_eq!(
            result.entries[0].get_field("title"),
            Some("A {B}ook about {LaTeX}")
        );
    }

    #[test]
    fn test_parse_string_definitions_and_concatenation() {
        let input = r#"
@string{doiprefix = "10.1234/"}
@article{Test2024, doi = doiprefix # "5678", month = jan}
"#;
        let result = parse(input);
        assert_eq!(result.entries[0].get_field("doi"), Some("10.1234/5678"));
        assert_eq!(result.entries[0].get_field("month"), Some("January"));
    }

    #[test]
    fn test_parse_preamble_and_comment() {
        let input = r#"
@preamble{"\newcommand{\noop}[1]{}"}
@comment{ ignore @article{nope, title = {x}} }
% @article{alsonope, title = {y}}
@misc{kept}
"#;
        let result = parse(input);
        assert!(result.issues.is_empty());
        assert_eq!(result.entries.len(), 1);
        assert_eq!(result.entries[0].cite_key, "kept");
        assert!(result.entries[0].fields.is_empty());
    }

    #[test]
    fn test_parse_parenthesized_entry() {
        let input = "@book(Knuth1997, title = {The Art of Computer Programming})";
        let result = parse(input);
        assert_eq!(result.entries.len(), 1);
        assert_eq!(result.entries[0].cite_key, "Knuth1997");
    }

    #[test]
    fn test_recovers_after_malformed_block() {
        let input = r#"
@article{, title = {No key}}
@article{Good2024, title = {Fine}}
"#;
        let result = parse(input);
        assert_eq!(result.entries.len(), 1);
        assert_eq!(result.entries[0].cite_key, "Good2024");
        assert_eq!(result.entries[0].line, 3);
        assert_eq!(result.issues.len(), 1);
        assert_eq!(result.issues[0].line, 2);
    }

    #[test]
    fn test_issue_converts_to_parse_error() {
        let result = parse("@article{broken, title = {unterminated");
        assert!(result.entries.is_empty());
        let err = ParseError::from(result.issues[0].clone());
        assert!(matches!(err, ParseError::Malformed { line: 1, .. }));
    }

    #[test]
    fn test_comment_lines_between_fields() {
        let input = r#"
@article{Smith2024,
  % exported by a reference manager
  title = {A Great Paper},
  %doi = {10.0000/old},
  doi = {10.1234/5678} % trailing note
}
"#;
        let result = parse(input);
        assert!(result.issues.is_empty());
        assert_eq!(result.entries.len(), 1);
        assert_eq!(result.entries[0].get_field("doi"), Some("10.1234/5678"));
        assert_eq!(result.entries[0].fields.len(), 2);
    }

    #[test]
    fn test_bare_alphanumeric_values() {
        let input = "@article{Smith2024a, year = 2024a, volume = 12, month = feb}";
        let result = parse(input);
        assert!(result.issues.is_empty());
        let entry = &result.entries[0];
        assert_eq!(entry.get_field("year"), Some("2024a"));
        assert_eq!(entry.get_field("volume"), Some("12"));
        assert_eq!(entry.get_field("month"), Some("February"));
    }
}
