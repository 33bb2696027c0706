//! Identity matching between source issues and mirror collections.
//!
//! The `id: <identity>` label is the only correlation key. Titles and bodies
//! are never consulted.

use std::collections::HashMap;

use devpool_core::{labels, Classification, IssueId, MirrorIssue, RepoRef};

/// First issue in `issues` carrying `id: <identity>`.
pub fn find_mirror<'a>(issues: &'a [MirrorIssue], identity: &IssueId) -> Option<&'a MirrorIssue> {
    let token = labels::identity_label(identity);
    issues.iter().find(|m| m.has_label(&token))
}

/// Every mirror fetched from one devpool repository, indexed by identity.
///
/// The index answers exactly what [`find_mirror`] would: when two mirrors
/// carry the same identity the earlier one wins and a warning is logged.
#[derive(Debug, Clone)]
pub struct MirrorCollection {
    classification: Classification,
    repo: RepoRef,
    issues: Vec<MirrorIssue>,
    index: HashMap<String, usize>,
    duplicates: usize,
}

impl MirrorCollection {
    pub fn new(classification: Classification, repo: RepoRef, issues: Vec<MirrorIssue>) -> Self {
        let mut collection = MirrorCollection {
            classification,
            repo,
            issues: Vec::with_capacity(issues.len()),
            index: HashMap::new(),
            duplicates: 0,
        };
        for issue in issues {
            collection.push(issue);
        }
        collection
    }

    pub fn classification(&self) -> Classification {
        self.classification
    }

    pub fn repo(&self) -> &RepoRef {
        &self.repo
    }

    pub fn issues(&self) -> &[MirrorIssue] {
        &self.issues
    }

    pub fn len(&self) -> usize {
        self.issues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    /// Number of identity labels found on more than one mirror.
    pub fn duplicate_count(&self) -> usize {
        self.duplicates
    }

    pub fn find(&self, identity: &IssueId) -> Option<&MirrorIssue> {
        self.index
            .get(identity.as_str())
            .and_then(|&pos| self.issues.get(pos))
    }

    /// Add a mirror created during this pass so later lookups see it.
    pub fn insert(&mut self, mirror: MirrorIssue) {
        self.push(mirror);
    }

    /// Swap in a fresh copy of a mirror already in the collection (matched by
    /// number). Unknown numbers are appended.
    pub fn replace(&mut self, mirror: MirrorIssue) {
        match self.issues.iter().position(|m| m.number == mirror.number) {
            Some(pos) => {
                self.index_labels(pos, &mirror);
                self.issues[pos] = mirror;
            }
            None => self.push(mirror),
        }
    }

    fn push(&mut self, mirror: MirrorIssue) {
        let pos = self.issues.len();
        self.index_labels(pos, &mirror);
        self.issues.push(mirror);
    }

    fn index_labels(&mut self, pos: usize, mirror: &MirrorIssue) {
        for identity in mirror.labels.iter().filter_map(|l| labels::identity_of(l)) {
            match self.index.get(identity) {
                None => {
                    self.index.insert(identity.to_string(), pos);
                }
                Some(&first) if first == pos => {}
                Some(&first) => {
                    self.duplicates += 1;
                    let kept = self.issues.get(first).map(|m| m.number).unwrap_or_default();
                    tracing::warn!(
                        repo = %self.repo,
                        classification = %self.classification,
                        identity,
                        kept,
                        ignored = mirror.number,
                        "duplicate identity label; first mirror wins"
                    );
                }
            }
        }
    }
}
