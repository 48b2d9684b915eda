//! Grouping of entries that share a cite key or a DOI

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::index::{doi_identity, shared_buckets, Bucket, DisjointSet};
use crate::config::{DetectorConfig, GroupingPolicy};
use crate::entry::Entry;
use crate::error::{DedupError, Result};
use crate::extract::extract;

/// The identity signal that bound entries together
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchSignal {
    Key,
    Doi,
}

/// Two or more entries judged to be the same work
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuplicateGroup {
    /// Positions of the members in the checked collection, ascending
    pub members: Vec<usize>,
    pub signals: BTreeSet<MatchSignal>,
    /// Cite keys declared by more than one member
    pub shared_keys: Vec<String>,
    /// DOIs declared by more than one member (normalized when enabled)
    pub shared_dois: Vec<String>,
    /// Shared keys whose entries disagree on the DOI, usually a data-entry slip
    pub conflicting_keys: Vec<String>,
}

impl DuplicateGroup {
    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Resolve member positions against the collection the group came from
    pub fn entries<'a>(&self, entries: &'a [Entry]) -> Vec<&'a Entry> {
        self.members.iter().filter_map(|&i| entries.get(i)).collect()
    }

    pub fn has_doi_conflict(&self) -> bool {
        !self.conflicting_keys.is_empty()
    }

    fn absorb(&mut self, bucket: &Bucket<'_>, entries: &[Entry], normalize_dois: bool) {
        self.members.extend_from_slice(&bucket.members);
        self.signals.insert(bucket.signal);
        match bucket.signal {
            MatchSignal::Key => {
                self.shared_keys.push(bucket.value.to_string());
                let dois: BTreeSet<_> = bucket
                    .members
                    .iter()
                    .filter_map(|&i| entries[i].doi())
                    .filter_map(|doi| doi_identity(doi, normalize_dois))
                    .collect();
                if dois.len() > 1 {
                    self.conflicting_keys.push(bucket.value.to_string());
                }
            }
            MatchSignal::Doi => self.shared_dois.push(bucket.value.to_string()),
        }
    }

    fn finish(mut self) -> Self {
        self.members.sort_unstable();
        self.members.dedup();
        self
    }
}

/// Duplicate detector over a fixed configuration
#[derive(Debug, Clone, Default)]
pub struct Detector {
    config: DetectorConfig,
}

impl Detector {
    pub fn new(config: DetectorConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// Duplicate groups ordered by their first member
    ///
    /// An empty collection is [`DedupError::EmptyInput`]: "nothing to check"
    /// must not read as "no duplicates".
    pub fn groups(&self, entries: &[Entry]) -> Result<Vec<DuplicateGroup>> {
        if entries.is_empty() {
            return Err(DedupError::EmptyInput("entry collection is empty"));
        }

        let buckets = shared_buckets(entries, &self.config);
        let normalize = self.config.normalize_dois;
        let mut groups: Vec<DuplicateGroup> = match self.config.grouping {
            GroupingPolicy::Transitive => {
                let mut sets = DisjointSet::new(entries.len());
                for bucket in &buckets {
                    for pair in bucket.members.windows(2) {
                        sets.union(pair[0], pair[1]);
                    }
                }

                let mut by_root: BTreeMap<usize, DuplicateGroup> = BTreeMap::new();
                for bucket in &buckets {
                    let root = sets.find(bucket.members[0]);
                    by_root
                        .entry(root)
                        .or_default()
                        .absorb(bucket, entries, normalize);
                }
                by_root.into_values().map(DuplicateGroup::finish).collect()
            }
            GroupingPolicy::PerSignal => buckets
                .iter()
                .map(|bucket| {
                    let mut group = DuplicateGroup::default();
                    group.absorb(bucket, entries, normalize);
                    group.finish()
                })
                .collect(),
        };
        groups.sort_by_key(|group| group.members[0]);

        debug!(
            entries = entries.len(),
            groups = groups.len(),
            grouping = %self.config.grouping,
            "duplicate detection finished"
        );
        Ok(groups)
    }

    /// Positions of every entry in at least one group, ascending
    pub fn flagged_indices(&self, entries: &[Entry]) -> Result<Vec<usize>> {
        let flagged: BTreeSet<usize> = self
            .groups(entries)?
            .iter()
            .flat_map(|group| group.members.iter().copied())
            .collect();
        Ok(flagged.into_iter().collect())
    }

    /// Every entry in at least one group, in input order
    pub fn flagged<'a>(&self, entries: &'a [Entry]) -> Result<Vec<&'a Entry>> {
        Ok(self
            .flagged_indices(entries)?
            .into_iter()
            .map(|i| &entries[i])
            .collect())
    }

    /// Extract `text` and group its duplicates
    pub fn check(&self, text: &str) -> Result<DuplicateReport> {
        let entries = extract(text)?;
        let groups = self.groups(&entries)?;
        Ok(DuplicateReport { entries, groups })
    }
}

/// Entries of one bibliography and the duplicate groups found among them
#[derive(Debug, Clone, Serialize)]
pub struct DuplicateReport {
    pub entries: Vec<Entry>,
    pub groups: Vec<DuplicateGroup>,
}

impl DuplicateReport {
    pub fn has_duplicates(&self) -> bool {
        !self.groups.is_empty()
    }

    pub fn flagged(&self) -> Vec<&Entry> {
        let flagged: BTreeSet<usize> = self
            .groups
            .iter()
            .flat_map(|group| group.members.iter().copied())
            .collect();
        // Fields are public, so a member may point past `entries`
        flagged
            .into_iter()
            .filter_map(|i| self.entries.get(i))
            .collect()
    }

    pub fn conflicts(&self) -> impl Iterator<Item = &DuplicateGroup> {
        self.groups.iter().filter(|group| group.has_doi_conflict())
    }
}

/// Entries that duplicate at least one other entry, in input order
pub fn detect_duplicates(entries: &[Entry]) -> Result<Vec<&Entry>> {
    Detector::default().flagged(entries)
}

pub fn find_duplicate_groups(entries: &[Entry]) -> Result<Vec<DuplicateGroup>> {
    Detector::default().groups(entries)
}

/// Extract a BibTeX text and report its duplicates with default settings
pub fn check_bibliography(text: &str) -> Result<DuplicateReport> {
    Detector::default().check(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(key: &str, doi: Option<&str>) -> Entry {
        Entry::new(key, doi)
    }

    #[test]
    fn test_empty_collection_is_error() {
        let err = detect_duplicates(&[]).unwrap_err();
        assert!(err.is_empty_input());
        assert!(find_duplicate_groups(&[]).unwrap_err().is_empty_input());
    }

    #[test]
    fn test_single_entry_has_no_duplicates() {
        let entries = vec![entry("key1", Some("10.1234/5678"))];
        assert!(detect_duplicates(&entries).unwrap().is_empty());
    }

    #[test]
    fn test_transitive_chain_forms_one_group() {
        // a~b by key, b~c by DOI, a and c share nothing
        let entries = vec![
            entry("a", None),
            entry("a", Some("10.1/x")),
            entry("c", Some("10.1/x")),
            entry("d", None),
        ];
        let groups = find_duplicate_groups(&entries).unwrap();

        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].members, vec![0, 1, 2]);
        assert_eq!(
            groups[0].signals,
            BTreeSet::from([MatchSignal::Key, MatchSignal::Doi])
        );
        assert_eq!(groups[0].shared_keys, vec!["a"]);
        assert_eq!(groups[0].shared_dois, vec!["10.1/x"]);
    }

    #[test]
    fn test_per_signal_keeps_buckets_apart() {
        let entries = vec![
            entry("a", None),
            entry("a", Some("10.1/x")),
            entry("c", Some("10.1/x")),
        ];
        let config = DetectorConfig {
            grouping: GroupingPolicy::PerSignal,
            ..Default::default()
        };
        let detector = Detector::new(config).unwrap();
        let groups = detector.groups(&entries).unwrap();

        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].members, vec![0, 1]);
        assert_eq!(groups[0].signals, BTreeSet::from([MatchSignal::Key]));
        assert_eq!(groups[1].members, vec![1, 2]);
        assert_eq!(groups[1].signals, BTreeSet::from([MatchSignal::Doi]));

        // Same flagged set as the transitive policy
        assert_eq!(detector.flagged_indices(&entries).unwrap(), vec![0, 1, 2]);
    }

    #[test]
    fn test_same_key_different_doi_is_conflict() {
        let entries = vec![
            entry("key1", Some("10.1234/5678")),
            entry("key1", Some("10.1234/9999")),
        ];
        let groups = find_duplicate_groups(&entries).unwrap();
        assert_eq!(groups.len(), 1);
        assert!(groups[0].has_doi_conflict());
        assert_eq!(groups[0].conflicting_keys, vec!["key1"]);
    }

    #[test]
    fn test_same_key_one_doi_missing_is_not_conflict() {
        let entries = vec![entry("key1", Some("10.1234/5678")), entry("key1", None)];
        let groups = find_duplicate_groups(&entries).unwrap();
        assert!(!groups[0].has_doi_conflict());
    }

    #[test]
    fn test_doi_comparison_is_exact_by_default() {
        let entries = vec![
            entry("key1", Some("10.1234/ABC")),
            entry("key2", Some("https://doi.org/10.1234/abc")),
        ];
        assert!(detect_duplicates(&entries).unwrap().is_empty());

        let detector = Detector::new(DetectorConfig {
            normalize_dois: true,
            ..Default::default()
        })
        .unwrap();
        assert_eq!(detector.flagged_indices(&entries).unwrap(), vec![0, 1]);
        assert_eq!(
            detector.groups(&entries).unwrap()[0].shared_dois,
            vec!["10.1234/abc"]
        );
    }

    #[test]
    fn test_disabled_signals_are_ignored() {
        let entries = vec![entry("key1", Some("10.1/x")), entry("key1", Some("10.1/y"))];
        let dois_only = Detector::new(DetectorConfig {
            match_keys: false,
            ..Default::default()
        })
        .unwrap();
        assert!(dois_only.flagged(&entries).unwrap().is_empty());

        let entries = vec![entry("key1", Some("10.1/x")), entry("key2", Some("10.1/x"))];
        let keys_only = Detector::new(DetectorConfig {
            match_dois: false,
            ..Default::default()
        })
        .unwrap();
        assert!(keys_only.flagged(&entries).unwrap().is_empty());
    }

    #[test]
    fn test_detector_rejects_invalid_config() {
        let config = DetectorConfig {
            match_keys: false,
            match_dois: false,
            ..Default::default()
        };
        assert!(matches!(Detector::new(config), Err(DedupError::Config(_))));
    }

    #[test]
    fn test_groups_resolve_entries() {
        let entries = vec![entry("x", None), entry("key1", None), entry("key1", None)];
        let groups = find_duplicate_groups(&entries).unwrap();
        let keys: Vec<&str> = groups[0]
            .entries(&entries)
            .into_iter()
            .map(Entry::key)
            .collect();
        assert_eq!(keys, vec!["key1", "key1"]);
    }

    #[test]
    fn test_check_bibliography_report() {
        let report = check_bibliography(
            r#"
@article{key1, title = {Title}, doi = {10.1234/5678}}
@article{key2, title = {Title}, doi = {10.1234/5678}}
@article{key3, title = {Other}}
"#,
        )
        .unwrap();

        assert!(report.has_duplicates());
        let keys: Vec<&str> = report.flagged().into_iter().map(Entry::key).collect();
        assert_eq!(keys, vec!["key1", "key2"]);
        assert_eq!(report.conflicts().count(), 0);
    }

    #[test]
    fn test_report_skips_positions_outside_entries() {
        let report = DuplicateReport {
            entries: vec![entry("key1", None), entry("key1", None)],
            groups: vec![DuplicateGroup {
                members: vec![0, 1, 7],
                signals: BTreeSet::from([MatchSignal::Key]),
                shared_keys: vec!["key1".to_string()],
                ..Default::default()
            }],
        };

        let keys: Vec<&str> = report.flagged().into_iter().map(Entry::key).collect();
        assert_eq!(keys, vec!["key1", "key1"]);
    }
}
