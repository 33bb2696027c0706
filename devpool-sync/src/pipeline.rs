//! Orchestrator: one full reconciliation pass.
//!
//! 1. Lock `<state_dir>/pass.lock`.
//! 2. Load the notification store.
//! 3. Resolve the fork guard for the standard devpool.
//! 4. Fetch every mirror collection; any failure skips reconciliation.
//! 5. Resolve partner repositories and fetch their issues.
//! 6. Reconcile each source issue, serially.
//! 7. Aggregate statistics and publish them to every sink.
//! 8. Save the notification store.

use chrono::{DateTime, Utc};
use serde::Serialize;

use devpool_core::{
    Announcer, Classification, Config, IssueSink, IssueSource, PartnerTarget, PublishOutcome,
    RepoRef, Statistics, StatisticsSink,
};
use devpool_renderer::Renderer;

use crate::error::SyncError;
use crate::fork_guard::ForkGuard;
use crate::lock::PassLock;
use crate::matcher::MirrorCollection;
use crate::notify_store;
use crate::reconcile::{IssueOutcome, Outcome, Reconciler};
use crate::retry::with_retry;
use crate::statistics::aggregate;

/// Everything a pass talks to besides the local state directory.
pub struct Collaborators<'a> {
    pub source: &'a dyn IssueSource,
    pub sink: &'a dyn IssueSink,
    pub announcer: &'a dyn Announcer,
    pub statistics: Vec<&'a dyn StatisticsSink>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassOptions {
    /// Decide everything, write nothing.
    pub dry_run: bool,
}

/// A repository or organization that could not be listed this pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FetchFailure {
    pub target: String,
    pub error: String,
}

/// Result of handing statistics to one sink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PublishStatus {
    Written,
    Unchanged,
    WouldWrite,
    Failed { error: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PublishRecord {
    pub target: String,
    #[serde(flatten)]
    pub status: PublishStatus,
}

/// Counts per action over a pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PassSummary {
    pub created: usize,
    pub updated: usize,
    pub closed: usize,
    pub unchanged: usize,
    pub skipped: usize,
    pub would_create: usize,
    pub would_update: usize,
    pub would_close: usize,
    pub failed: usize,
}

/// Everything a pass did.
#[derive(Debug, Clone, Serialize)]
pub struct PassReport {
    pub dry_run: bool,
    pub is_fork: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Set when a mirror collection could not be fetched.
    pub reconciliation_skipped: bool,
    pub repositories: Vec<String>,
    pub fetch_failures: Vec<FetchFailure>,
    pub outcomes: Vec<IssueOutcome>,
    pub statistics: Option<Statistics>,
    pub published: Vec<PublishRecord>,
    /// Set when the notification store could not be saved.
    pub store_error: Option<String>,
}

impl PassReport {
    pub fn summary(&self) -> PassSummary {
        let mut s = PassSummary::default();
        for o in &self.outcomes {
            match o.outcome {
                Outcome::Created { .. } => s.created += 1,
                Outcome::Updated { .. } => s.updated += 1,
                Outcome::Closed { .. } => s.closed += 1,
                Outcome::Unchanged { .. } => s.unchanged += 1,
                Outcome::Skipped { .. } => s.skipped += 1,
                Outcome::WouldCreate => s.would_create += 1,
                Outcome::WouldUpdate { .. } => s.would_update += 1,
                Outcome::WouldClose { .. } => s.would_close += 1,
                Outcome::Failed { .. } => s.failed += 1,
            }
        }
        s
    }

    /// Tracker writes made during the pass.
    pub fn write_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.outcome.is_write()).count()
    }

    /// `true` when anything was skipped because of an error.
    pub fn has_failures(&self) -> bool {
        self.reconciliation_skipped
            || !self.fetch_failures.is_empty()
            || self.outcomes.iter().any(|o| o.outcome.is_failure())
            || self
                .published
                .iter()
                .any(|p| matches!(p.status, PublishStatus::Failed { .. }))
            || self.store_error.is_some()
    }
}

/// Run one reconciliation pass for `config`.
///
/// Only configuration, template, lock and local store errors are returned as
/// `Err`; tracker failures are recorded in the [`PassReport`].
pub fn run(
    config: &Config,
    collaborators: &Collaborators<'_>,
    options: &PassOptions,
) -> Result<PassReport, SyncError> {
    let started_at = Utc::now();
    let dry_run = options.dry_run;
    let state_dir = config.state_dir.as_path();

    let partners = config.partner_targets()?;
    let opt_out = config.opt_out_repos()?;
    let renderer = Renderer::with_overrides(config.templates_dir.as_deref())?;

    let _lock = PassLock::acquire(state_dir)?;
    let mut store = notify_store::load_or_reset_at(state_dir, !dry_run);
    let guard = ForkGuard::detect(collaborators.source, &config.devpool);

    let mut report = PassReport {
        dry_run,
        is_fork: guard.is_fork(),
        started_at,
        finished_at: started_at,
        reconciliation_skipped: false,
        repositories: Vec::new(),
        fetch_failures: Vec::new(),
        outcomes: Vec::new(),
        statistics: None,
        published: Vec::new(),
        store_error: None,
    };

    // -- mirror collections -------------------------------------------------
    let mut collections = Vec::new();
    for (classification, repo) in config.mirror_targets() {
        let label = format!("list mirrors {repo}");
        match with_retry(&config.retry, &label, || collaborators.sink.list_mirrors(&repo)) {
            Ok(issues) => {
                tracing::info!(repo = %repo, %classification, mirrors = issues.len(), "loaded devpool");
                collections.push(MirrorCollection::new(classification, repo, issues));
            }
            Err(err) => {
                tracing::error!(repo = %repo, %classification, error = %err, "devpool fetch failed");
                report.fetch_failures.push(FetchFailure {
                    target: repo.to_string(),
                    error: err.to_string(),
                });
                report.reconciliation_skipped = true;
            }
        }
    }

    // -- reconciliation -----------------------------------------------------
    if report.reconciliation_skipped {
        tracing::warn!("incomplete devpool view; skipping reconciliation this pass");
    } else {
        let repos = resolve_partners(config, collaborators.source, &partners, &opt_out, &mut report);
        let mut reconciler = Reconciler::new(
            collaborators.sink,
            collaborators.announcer,
            &renderer,
            guard,
            config.sync,
            dry_run,
        );
        for repo in repos {
            let label = format!("list issues {repo}");
            let issues = match with_retry(&config.retry, &label, || collaborators.source.list_issues(&repo)) {
                Ok(issues) => issues,
                Err(err) => {
                    tracing::error!(repo = %repo, error = %err, "partner fetch failed; skipping");
                    report.fetch_failures.push(FetchFailure {
                        target: repo.to_string(),
                        error: err.to_string(),
                    });
                    continue;
                }
            };
            tracing::info!(repo = %repo, issues = issues.len(), "reconciling partner");
            report.repositories.push(repo.to_string());
            for issue in &issues {
                let outcome = reconciler.reconcile(issue, &mut collections, &mut store);
                report.outcomes.push(outcome);
            }
        }
    }

    // -- statistics ---------------------------------------------------------
    if let Some(standard) = collections
        .iter()
        .find(|c| c.classification() == Classification::Standard)
    {
        let stats = aggregate(standard.issues());
        tracing::info!(
            total_reward = %stats.total_reward,
            total_tasks = stats.total_tasks,
            "devpool statistics"
        );
        for sink in &collaborators.statistics {
            report.published.push(publish(*sink, &stats, dry_run));
        }
        report.statistics = Some(stats);
    }

    // -- notification store -------------------------------------------------
    if !dry_run {
        store.updated_at = Utc::now();
        if let Err(err) = notify_store::save_at(state_dir, &store) {
            tracing::error!(error = %err, "notification store not saved");
            report.store_error = Some(err.to_string());
        }
    }

    report.finished_at = Utc::now();
    Ok(report)
}

/// Partner repositories in config order: organizations expanded, opt-outs
/// removed, duplicates dropped.
fn resolve_partners(
    config: &Config,
    source: &dyn IssueSource,
    partners: &[PartnerTarget],
    opt_out: &[RepoRef],
    report: &mut PassReport,
) -> Vec<RepoRef> {
    let mut repos: Vec<RepoRef> = Vec::new();
    let mut push = |repo: RepoRef| {
        if opt_out.contains(&repo) {
            tracing::debug!(repo = %repo, "opted out");
        } else if !repos.contains(&repo) {
            repos.push(repo);
        }
    };
    for target in partners {
        match target {
            PartnerTarget::Repo(repo) => push(repo.clone()),
            PartnerTarget::Org(owner) => {
                let label = format!("list repositories {owner}");
                match with_retry(&config.retry, &label, || source.list_repositories(owner)) {
                    Ok(found) => found.into_iter().for_each(&mut push),
                    Err(err) => {
                        tracing::error!(owner = %owner, error = %err, "organization fetch failed; skipping");
                        report.fetch_failures.push(FetchFailure {
                            target: owner.clone(),
                            error: err.to_string(),
                        });
                    }
                }
            }
        }
    }
    repos
}

fn publish(sink: &dyn StatisticsSink, stats: &Statistics, dry_run: bool) -> PublishRecord {
    let target = sink.target();
    let status = match sink.publish(stats, dry_run) {
        Ok(PublishOutcome::Written { .. }) => PublishStatus::Written,
        Ok(PublishOutcome::Unchanged { .. }) => PublishStatus::Unchanged,
        Ok(PublishOutcome::WouldWrite { .. }) => PublishStatus::WouldWrite,
        Err(err) => {
            tracing::warn!(sink = %target, error = %err, "statistics not published");
            PublishStatus::Failed {
                error: err.to_string(),
            }
        }
    };
    PublishRecord { target, status }
}
