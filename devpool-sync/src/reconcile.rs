//! Reconciliation engine: one source issue at a time.
//!
//! Decision order:
//!
//! 1. A mirror carrying the identity label in any collection, checked in
//!    collection order (standard before RFC) → **update** it in place.
//! 2. Otherwise → **create** a standard mirror, subject to [`SyncPolicy`].
//!
//! A matched mirror is never moved between collections. Tracker failures are
//! returned as [`Outcome::Failed`] and never abort the pass.

use std::collections::HashSet;

use serde::Serialize;

use devpool_core::config::SyncPolicy;
use devpool_core::{
    Announcer, Classification, IssueId, IssuePatch, IssueSink, MirrorIssue, RepoRef, SourceIssue,
    TrackerError,
};
use devpool_renderer::{IssueContext, RenderError, Renderer};

use crate::fork_guard::ForkGuard;
use crate::matcher::MirrorCollection;
use crate::notify_store::NotifyStore;
use crate::plan::{plan_update, DesiredMirror};

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

/// Why a source issue without a mirror did not get one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Closed issues are never mirrored fresh.
    Closed,
    /// No price label yet.
    Unpriced,
    /// Someone is already working on it.
    Assigned,
    /// Dry run: a create for this identity was already planned this pass.
    AlreadyPlanned,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::Closed => write!(f, "closed"),
            SkipReason::Unpriced => write!(f, "unpriced"),
            SkipReason::Assigned => write!(f, "assigned"),
            SkipReason::AlreadyPlanned => write!(f, "already planned"),
        }
    }
}

/// What reconciliation did (or, in dry-run, would do) for one source issue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Outcome {
    Created { number: u64, announced: bool },
    Updated { number: u64 },
    Closed { number: u64 },
    Unchanged { number: u64 },
    Skipped { reason: SkipReason },
    WouldCreate,
    WouldUpdate { number: u64 },
    WouldClose { number: u64 },
    Failed { error: String },
}

impl Outcome {
    /// `true` when the tracker was written to.
    pub fn is_write(&self) -> bool {
        matches!(
            self,
            Outcome::Created { .. } | Outcome::Updated { .. } | Outcome::Closed { .. }
        )
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Outcome::Failed { .. })
    }

    /// Short action name used in tables and logs.
    pub fn action(&self) -> &'static str {
        match self {
            Outcome::Created { .. } => "created",
            Outcome::Updated { .. } => "updated",
            Outcome::Closed { .. } => "closed",
            Outcome::Unchanged { .. } => "unchanged",
            Outcome::Skipped { .. } => "skipped",
            Outcome::WouldCreate => "would create",
            Outcome::WouldUpdate { .. } => "would update",
            Outcome::WouldClose { .. } => "would close",
            Outcome::Failed { .. } => "failed",
        }
    }

    /// Mirror number, when a mirror exists.
    pub fn mirror_number(&self) -> Option<u64> {
        match self {
            Outcome::Created { number, .. }
            | Outcome::Updated { number }
            | Outcome::Closed { number }
            | Outcome::Unchanged { number }
            | Outcome::WouldUpdate { number }
            | Outcome::WouldClose { number } => Some(*number),
            Outcome::Skipped { .. } | Outcome::WouldCreate | Outcome::Failed { .. } => None,
        }
    }
}

/// Outcome for one source issue, tagged with where its mirror lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IssueOutcome {
    pub identity: IssueId,
    pub source_url: String,
    pub classification: Classification,
    #[serde(flatten)]
    pub outcome: Outcome,
}

fn failed(err: impl std::fmt::Display) -> Outcome {
    Outcome::Failed {
        error: err.to_string(),
    }
}

fn applied(patch: &IssuePatch, number: u64) -> Outcome {
    if patch.is_close_only() {
        Outcome::Closed { number }
    } else {
        Outcome::Updated { number }
    }
}

fn would_apply(patch: &IssuePatch, number: u64) -> Outcome {
    if patch.is_close_only() {
        Outcome::WouldClose { number }
    } else {
        Outcome::WouldUpdate { number }
    }
}

// ---------------------------------------------------------------------------
// Reconciler
// ---------------------------------------------------------------------------

/// Per-pass reconciliation context. Create once per pass.
pub struct Reconciler<'a> {
    sink: &'a dyn IssueSink,
    announcer: &'a dyn Announcer,
    renderer: &'a Renderer,
    guard: ForkGuard,
    policy: SyncPolicy,
    dry_run: bool,
    /// Identities given a `WouldCreate` so far; dry runs never touch the
    /// collections, so repeats are caught here.
    planned: HashSet<IssueId>,
}

impl<'a> Reconciler<'a> {
    pub fn new(
        sink: &'a dyn IssueSink,
        announcer: &'a dyn Announcer,
        renderer: &'a Renderer,
        guard: ForkGuard,
        policy: SyncPolicy,
        dry_run: bool,
    ) -> Self {
        Reconciler {
            sink,
            announcer,
            renderer,
            guard,
            policy,
            dry_run,
            planned: HashSet::new(),
        }
    }

    /// Reconcile `issue` against `collections` (in match order).
    ///
    /// Writes are reflected in the matching collection before returning, so
    /// the next issue sees mirrors created by this one.
    pub fn reconcile(
        &mut self,
        issue: &SourceIssue,
        collections: &mut [MirrorCollection],
        store: &mut NotifyStore,
    ) -> IssueOutcome {
        let matched = collections
            .iter()
            .enumerate()
            .find_map(|(pos, c)| c.find(&issue.id).map(|m| (pos, m.clone())));

        let (classification, outcome) = match matched {
            Some((pos, mirror)) => {
                let collection = &mut collections[pos];
                (collection.classification(), self.update(issue, collection, mirror))
            }
            None => match collections
                .iter_mut()
                .find(|c| c.classification() == Classification::Standard)
            {
                Some(collection) => (
                    Classification::Standard,
                    self.create(issue, collection, store),
                ),
                None => (
                    Classification::Standard,
                    failed("no standard devpool collection loaded"),
                ),
            },
        };

        log_outcome(issue, classification, &outcome);
        IssueOutcome {
            identity: issue.id.clone(),
            source_url: issue.html_url.clone(),
            classification,
            outcome,
        }
    }

    fn desired(&self, issue: &SourceIssue) -> Result<DesiredMirror, RenderError> {
        let ctx = IssueContext::from_source(issue, self.guard.rewrite(&issue.html_url));
        let body = self.renderer.render_mirror_body(&ctx)?;
        Ok(DesiredMirror::from_source(issue, body))
    }

    fn skip_reason(&self, issue: &SourceIssue) -> Option<SkipReason> {
        if !issue.is_open() {
            Some(SkipReason::Closed)
        } else if self.policy.require_price_label && issue.price_label().is_none() {
            Some(SkipReason::Unpriced)
        } else if self.policy.skip_assigned && issue.is_assigned() {
            Some(SkipReason::Assigned)
        } else {
            None
        }
    }

    // -- update -------------------------------------------------------------

    fn update(
        &self,
        issue: &SourceIssue,
        collection: &mut MirrorCollection,
        mirror: MirrorIssue,
    ) -> Outcome {
        let desired = match self.desired(issue) {
            Ok(desired) => desired,
            Err(err) => return failed(err),
        };
        let number = mirror.number;
        let patch = plan_update(&mirror, &desired);
        if patch.is_empty() {
            return Outcome::Unchanged { number };
        }
        if self.dry_run {
            return would_apply(&patch, number);
        }

        let repo = collection.repo().clone();
        match self.apply(&repo, number, &patch) {
            Ok(updated) => {
                collection.replace(updated);
                applied(&patch, number)
            }
            Err(err) if err.is_conflict() => {
                tracing::warn!(repo = %repo, issue = number, error = %err, "write conflict; re-fetching mirror");
                self.retry_after_conflict(&repo, collection, number, &desired)
            }
            Err(err) => failed(err),
        }
    }

    /// One retry after a conflict, planned against a fresh copy of the mirror.
    fn retry_after_conflict(
        &self,
        repo: &RepoRef,
        collection: &mut MirrorCollection,
        number: u64,
        desired: &DesiredMirror,
    ) -> Outcome {
        let fresh = match self.sink.get_mirror(repo, number) {
            Ok(fresh) => fresh,
            Err(err) => return failed(err),
        };
        let patch = plan_update(&fresh, desired);
        if patch.is_empty() {
            collection.replace(fresh);
            return Outcome::Unchanged { number };
        }
        match self.apply(repo, number, &patch) {
            Ok(updated) => {
                collection.replace(updated);
                applied(&patch, number)
            }
            Err(err) => failed(err),
        }
    }

    fn apply(
        &self,
        repo: &RepoRef,
        number: u64,
        patch: &IssuePatch,
    ) -> Result<MirrorIssue, TrackerError> {
        if patch.is_close_only() {
            self.sink.close_issue(repo, number)
        } else {
            self.sink.update_issue(repo, number, patch)
        }
    }

    // -- create -------------------------------------------------------------

    fn create(
        &mut self,
        issue: &SourceIssue,
        collection: &mut MirrorCollection,
        store: &mut NotifyStore,
    ) -> Outcome {
        if let Some(reason) = self.skip_reason(issue) {
            return Outcome::Skipped { reason };
        }
        let desired = match self.desired(issue) {
            Ok(desired) => desired,
            Err(err) => return failed(err),
        };
        if self.dry_run {
            if !self.planned.insert(issue.id.clone()) {
                return Outcome::Skipped {
                    reason: SkipReason::AlreadyPlanned,
                };
            }
            return Outcome::WouldCreate;
        }

        let new = desired.to_new_issue(issue);
        match self.sink.create_issue(collection.repo(), &new) {
            Ok(mirror) => {
                let number = mirror.number;
                let announced = self.announce(issue, &mirror, store);
                collection.insert(mirror);
                Outcome::Created { number, announced }
            }
            Err(err) => failed(err),
        }
    }

    /// Announce a freshly created mirror unless the identity was announced
    /// before. Failures are logged and otherwise ignored.
    fn announce(&self, issue: &SourceIssue, mirror: &MirrorIssue, store: &mut NotifyStore) -> bool {
        if store.has_announced(&issue.id) {
            tracing::debug!(identity = %issue.id, "already announced");
            return false;
        }
        let ctx = IssueContext::from_source(issue, self.guard.rewrite(&issue.html_url))
            .with_mirror_url(mirror.html_url.clone());
        let text = match self.renderer.render_announcement(&ctx) {
            Ok(text) => text,
            Err(err) => {
                tracing::warn!(identity = %issue.id, error = %err, "announcement not rendered");
                return false;
            }
        };
        match self.announcer.announce(issue, mirror, &text) {
            Ok(Some(token)) => {
                store.mark_announced(&issue.id, token);
                true
            }
            Ok(None) => false,
            Err(err) => {
                tracing::warn!(identity = %issue.id, error = %err, "announcement failed");
                false
            }
        }
    }
}

fn log_outcome(issue: &SourceIssue, classification: Classification, outcome: &Outcome) {
    let source = issue.html_url.as_str();
    match outcome {
        Outcome::Failed { error } => {
            tracing::warn!(source, %classification, error = %error, "reconcile failed");
        }
        Outcome::Unchanged { .. } | Outcome::Skipped { .. } => {
            tracing::debug!(source, %classification, action = outcome.action(), "reconciled");
        }
        _ => {
            tracing::info!(
                source,
                %classification,
                action = outcome.action(),
                mirror = outcome.mirror_number(),
                "reconciled"
            );
        }
    }
}
