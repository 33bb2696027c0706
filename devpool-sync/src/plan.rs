//! Desired mirror state and the diff against what the tracker holds.
//!
//! | Family       | On update                                              |
//! |--------------|--------------------------------------------------------|
//! | Identity     | kept as is, never added or removed                     |
//! | Partner      | replaced by the source-derived label                   |
//! | Availability | replaced by the source-derived label (or removed)      |
//! | Pricing      | replaced when the source is priced, else kept          |
//! | Time         | replaced when the source has one, else kept            |
//! | Priority     | replaced when the source has one, else kept            |
//! | Other        | kept                                                   |

use std::collections::BTreeSet;

use devpool_core::labels::{self, LabelFamily};
use devpool_core::{IssuePatch, IssueState, MirrorIssue, NewIssue, SourceIssue};

/// What a mirror should look like after this pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DesiredMirror {
    pub title: String,
    pub body: String,
    /// Source-derived labels only; see [`merge_labels`].
    pub labels: Vec<String>,
    pub state: IssueState,
}

impl DesiredMirror {
    /// `body` is the rendered mirror body (already carrying the guarded link).
    pub fn from_source(issue: &SourceIssue, body: String) -> Self {
        DesiredMirror {
            title: issue.title.clone(),
            body,
            labels: source_labels(issue),
            state: issue.state,
        }
    }

    /// Request for a brand-new mirror: identity label first, then the
    /// source-derived labels.
    pub fn to_new_issue(&self, issue: &SourceIssue) -> NewIssue {
        let mut all = Vec::with_capacity(self.labels.len() + 1);
        all.push(labels::identity_label(&issue.id));
        all.extend(self.labels.iter().cloned());
        NewIssue {
            title: self.title.clone(),
            body: self.body.clone(),
            labels: all,
        }
    }
}

/// Labels a mirror derives from its source issue.
pub fn source_labels(issue: &SourceIssue) -> Vec<String> {
    let mut out = vec![labels::partner_label(&issue.repo)];
    if let Some(price) = issue.price_label().and_then(labels::mirror_price_label) {
        out.push(price);
    }
    for family in [LabelFamily::Time, LabelFamily::Priority] {
        if let Some(label) = issue.labels.iter().find(|l| labels::family_of(l) == family) {
            out.push(label.clone());
        }
    }
    if issue.is_assigned() {
        out.push(labels::UNAVAILABLE.to_string());
    }
    out
}

/// Merge the source-derived `derived` labels into the mirror's `existing` set.
///
/// Existing labels survive unless their family is owned by the source for
/// this issue. The result keeps existing order, then appends new labels.
pub fn merge_labels(existing: &[String], derived: &[String]) -> Vec<String> {
    let mut owned: BTreeSet<LabelFamily> = derived.iter().map(|l| labels::family_of(l)).collect();
    owned.insert(LabelFamily::Partner);
    owned.insert(LabelFamily::Availability);
    owned.remove(&LabelFamily::Identity);
    owned.remove(&LabelFamily::Other);

    let mut merged: Vec<String> = Vec::with_capacity(existing.len() + derived.len());
    for label in existing {
        if !owned.contains(&labels::family_of(label)) && !merged.contains(label) {
            merged.push(label.clone());
        }
    }
    for label in derived {
        if !merged.contains(label) {
            merged.push(label.clone());
        }
    }
    merged
}

fn same_labels(a: &[String], b: &[String]) -> bool {
    let a: BTreeSet<&str> = a.iter().map(String::as_str).collect();
    let b: BTreeSet<&str> = b.iter().map(String::as_str).collect();
    a == b
}

/// The smallest patch that brings `mirror` to `desired`. Empty when nothing
/// differs.
pub fn plan_update(mirror: &MirrorIssue, desired: &DesiredMirror) -> IssuePatch {
    let mut patch = IssuePatch::default();
    if mirror.title != desired.title {
        patch.title = Some(desired.title.clone());
    }
    let current_body = mirror.body.as_deref().unwrap_or("").replace("\r\n", "\n");
    if current_body.trim_end() != desired.body.trim_end() {
        patch.body = Some(desired.body.clone());
    }
    let merged = merge_labels(&mirror.labels, &desired.labels);
    if !same_labels(&mirror.labels, &merged) {
        patch.labels = Some(merged);
    }
    if mirror.state != desired.state {
        patch.state = Some(desired.state);
    }
    patch
}
