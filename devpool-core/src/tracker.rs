//! Collaborator traits for the remote issue tracker and reporting surfaces.
//!
//! The sync engine only talks to these traits; `devpool-remote` provides the
//! GitHub implementations and tests provide in-memory fakes.

use crate::error::TrackerError;
use crate::types::{
    IssuePatch, MirrorIssue, NewIssue, PublishOutcome, RepoRef, SourceIssue, Statistics,
};

/// Read side: partner repositories and repository metadata.
pub trait IssueSource {
    /// Every issue of `repo`, open and closed. Pull requests are excluded.
    fn list_issues(&self, repo: &RepoRef) -> Result<Vec<SourceIssue>, TrackerError>;

    /// Every non-archived repository owned by `owner` (organization or user).
    fn list_repositories(&self, owner: &str) -> Result<Vec<RepoRef>, TrackerError>;

    /// Whether `repo` is a fork.
    fn is_fork(&self, repo: &RepoRef) -> Result<bool, TrackerError>;
}

/// Write side: devpool repositories.
pub trait IssueSink {
    /// Every issue of a devpool repository, open and closed.
    fn list_mirrors(&self, repo: &RepoRef) -> Result<Vec<MirrorIssue>, TrackerError>;

    /// Fresh copy of a single mirror.
    fn get_mirror(&self, repo: &RepoRef, number: u64) -> Result<MirrorIssue, TrackerError>;

    fn create_issue(&self, repo: &RepoRef, issue: &NewIssue) -> Result<MirrorIssue, TrackerError>;

    fn update_issue(
        &self,
        repo: &RepoRef,
        number: u64,
        patch: &IssuePatch,
    ) -> Result<MirrorIssue, TrackerError>;

    fn close_issue(&self, repo: &RepoRef, number: u64) -> Result<MirrorIssue, TrackerError>;
}

/// External announcement of a newly mirrored issue.
pub trait Announcer {
    /// Publish `text` for `issue`.
    ///
    /// `Ok(Some(token))` records the announcement; `Ok(None)` means the
    /// announcer is disabled and nothing was published.
    fn announce(
        &self,
        issue: &SourceIssue,
        mirror: &MirrorIssue,
        text: &str,
    ) -> Result<Option<String>, TrackerError>;
}

/// Announcer used when no announcement endpoint is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledAnnouncer;

impl Announcer for DisabledAnnouncer {
    fn announce(
        &self,
        _issue: &SourceIssue,
        _mirror: &MirrorIssue,
        _text: &str,
    ) -> Result<Option<String>, TrackerError> {
        Ok(None)
    }
}

/// Reporting surface for aggregate statistics. Writes overwrite, never append.
pub trait StatisticsSink {
    /// Human-readable target name used in logs and reports.
    fn target(&self) -> String;

    fn publish(&self, statistics: &Statistics, dry_run: bool)
        -> Result<PublishOutcome, TrackerError>;
}
