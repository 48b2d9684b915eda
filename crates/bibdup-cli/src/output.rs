use std::collections::BTreeSet;
use std::io::{self, Write};

use bibdup_core::{DuplicateGroup, MatchSignal};
use serde::Serialize;

use crate::Collected;

/// Report rendering for `bibdup check`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

fn describe_group(group: &DuplicateGroup) -> String {
    let mut parts: Vec<String> = group
        .shared_keys
        .iter()
        .map(|key| format!("key `{}`", key))
        .collect();
    parts.extend(group.shared_dois.iter().map(|doi| format!("DOI `{}`", doi)));

    let mut header = format!("shared {}", parts.join(", "));
    if group.has_doi_conflict() {
        header.push_str(&format!(
            " (conflicting DOIs under {})",
            group.conflicting_keys.join(", ")
        ));
    }
    header
}

/// Print a human-readable duplicate report.
pub fn print_text_report(
    w: &mut dyn Write,
    collected: &Collected,
    groups: &[DuplicateGroup],
) -> io::Result<()> {
    writeln!(
        w,
        "Checked {} entries from {} file(s)",
        collected.entries.len(),
        collected.files.len()
    )?;

    if groups.is_empty() {
        writeln!(w, "No duplicates found.")?;
        return Ok(());
    }

    let flagged: BTreeSet<usize> = groups
        .iter()
        .flat_map(|group| group.members.iter().copied())
        .collect();
    writeln!(
        w,
        "Found {} duplicate group(s) covering {} entries",
        groups.len(),
        flagged.len()
    )?;

    for (n, group) in groups.iter().enumerate() {
        writeln!(w)?;
        writeln!(w, "[{}] {}", n + 1, describe_group(group))?;
        for &member in &group.members {
            let entry = &collected.entries[member];
            writeln!(
                w,
                "    {}  {}  doi: {}  {}",
                entry.key(),
                collected.origin(member).display(),
                entry.doi().unwrap_or("-"),
                entry.title().unwrap_or("")
            )?;
        }
    }
    Ok(())
}

#[derive(Serialize)]
struct JsonReport<'a> {
    files: Vec<String>,
    entries_checked: usize,
    groups: Vec<JsonGroup<'a>>,
}

#[derive(Serialize)]
struct JsonGroup<'a> {
    signals: &'a BTreeSet<MatchSignal>,
    shared_keys: &'a [String],
    shared_dois: &'a [String],
    conflicting_keys: &'a [String],
    entries: Vec<JsonEntry<'a>>,
}

#[derive(Serialize)]
struct JsonEntry<'a> {
    file: String,
    key: &'a str,
    doi: Option<&'a str>,
    title: Option<&'a str>,
}

/// Print the duplicate report as pretty JSON.
pub fn print_json_report(
    w: &mut dyn Write,
    collected: &Collected,
    groups: &[DuplicateGroup],
) -> io::Result<()> {
    let report = JsonReport {
        files: collected
            .files
            .iter()
            .map(|f| f.display().to_string())
            .collect(),
        entries_checked: collected.entries.len(),
        groups: groups
            .iter()
            .map(|group| JsonGroup {
                signals: &group.signals,
                shared_keys: &group.shared_keys,
                shared_dois: &group.shared_dois,
                conflicting_keys: &group.conflicting_keys,
                entries: group
                    .members
                    .iter()
                    .map(|&member| {
                        let entry = &collected.entries[member];
                        JsonEntry {
                            file: collected.origin(member).display().to_string(),
                            key: entry.key(),
                            doi: entry.doi(),
                            title: entry.title(),
                        }
                    })
                    .collect(),
            })
            .collect(),
    };

    serde_json::to_writer_pretty(&mut *w, &report)?;
    writeln!(w)
}
