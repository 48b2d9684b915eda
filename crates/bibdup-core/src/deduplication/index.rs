//! Signal buckets and the disjoint-set used to merge them

use std::borrow::Cow;
use std::collections::BTreeMap;

use super::detector::MatchSignal;
use super::normalization::normalize_doi;
use crate::config::DetectorConfig;
use crate::entry::Entry;

/// Entries sharing one value of one identity signal. Always two or more.
#[derive(Debug)]
pub(crate) struct Bucket<'a> {
    pub signal: MatchSignal,
    pub value: Cow<'a, str>,
    pub members: Vec<usize>,
}

/// The value a DOI is compared by, or `None` when it declares nothing
pub(crate) fn doi_identity(doi: &str, normalize: bool) -> Option<Cow<'_, str>> {
    if normalize {
        let normalized = normalize_doi(doi);
        (!normalized.is_empty()).then_some(Cow::Owned(normalized))
    } else {
        (!doi.trim().is_empty()).then_some(Cow::Borrowed(doi))
    }
}

/// Key buckets then DOI buckets, each in value order
pub(crate) fn shared_buckets<'a>(entries: &'a [Entry], config: &DetectorConfig) -> Vec<Bucket<'a>> {
    let mut by_key: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
    let mut by_doi: BTreeMap<Cow<'a, str>, Vec<usize>> = BTreeMap::new();

    for (idx, entry) in entries.iter().enumerate() {
        if config.match_keys {
            by_key.entry(entry.key()).or_default().push(idx);
        }
        if config.match_dois {
            if let Some(doi) = entry
                .doi()
                .and_then(|doi| doi_identity(doi, config.normalize_dois))
            {
                by_doi.entry(doi).or_default().push(idx);
            }
        }
    }

    let keys = by_key
        .into_iter()
        .filter(|(_, members)| members.len() > 1)
        .map(|(key, members)| Bucket {
            signal: MatchSignal::Key,
            value: Cow::Borrowed(key),
            members,
        });
    let dois = by_doi
        .into_iter()
        .filter(|(_, members)| members.len() > 1)
        .map(|(doi, members)| Bucket {
            signal: MatchSignal::Doi,
            value: doi,
            members,
        });

    keys.chain(dois).collect()
}

/// Union-find over entry positions
pub(crate) struct DisjointSet {
    parent: Vec<usize>,
    rank: Vec<u8>,
}

impl DisjointSet {
    pub fn new(len: usize) -> Self {
        Self {
            parent: (0..len).collect(),
            rank: vec![0; len],
        }
    }

    pub fn find(&mut self, x: usize) -> usize {
        let mut root = x;
        while self.parent[root] != root {
            root = self.parent[root];
        }
        // Path compression
        let mut current = x;
        while self.parent[current] != root {
            let next = self.parent[current];
            self.parent[current] = root;
            current = next;
        }
        root
    }

    pub fn union(&mut self, a: usize, b: usize) {
        let (root_a, root_b) = (self.find(a), self.find(b));
        if root_a == root_b {
            return;
        }
        match self.rank[root_a].cmp(&self.rank[root_b]) {
            std::cmp::Ordering::Less => self.parent[root_a] = root_b,
            std::cmp::Ordering::Greater => self.parent[root_b] = root_a,
            std::cmp::Ordering::Equal => {
                self.parent[root_b] = root_a;
                self.rank[root_a] += 1;
            }
        }
    }
}
