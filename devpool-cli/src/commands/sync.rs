//! `devpool sync`: run one reconciliation pass against GitHub.

use std::path::Path;

use anyhow::{bail, Context, Result};
use clap::Args;
use colored::Colorize;

use devpool_core::{Announcer, Config, DisabledAnnouncer, StatisticsSink};
use devpool_remote::{GithubStatisticsSink, WebhookAnnouncer};
use devpool_sync::pipeline::{self, PublishStatus};
use devpool_sync::{Collaborators, FileStatisticsSink, Outcome, PassOptions, PassReport};

use super::{github_client, load_config};

/// Arguments for `devpool sync`.
#[derive(Args, Debug)]
pub struct SyncArgs {
    /// Decide everything but write nothing: no tracker writes, no
    /// announcements, no statistics, no store update.
    #[arg(long)]
    pub dry_run: bool,

    /// Print the pass report as JSON instead of a summary.
    #[arg(long)]
    pub json: bool,
}

impl SyncArgs {
    pub fn run(self, config_path: &Path) -> Result<()> {
        let config = load_config(config_path)?;
        let client = github_client(&config);

        let announcer: Box<dyn Announcer> = match &config.announce.webhook_url {
            Some(url) => Box::new(WebhookAnnouncer::new(url.clone())),
            None => Box::new(DisabledAnnouncer),
        };
        let sinks = statistics_sinks(&config, &client);

        let collaborators = Collaborators {
            source: &client,
            sink: &client,
            announcer: announcer.as_ref(),
            statistics: sinks.iter().map(|s| s.as_ref()).collect(),
        };
        let options = PassOptions {
            dry_run: self.dry_run,
        };
        let report = pipeline::run(&config, &collaborators, &options)
            .with_context(|| format!("sync failed for devpool {}", config.devpool))?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&report)?);
        } else {
            print_results(&report);
        }

        if report.has_failures() {
            bail!("pass finished with failures; see the log above");
        }
        Ok(())
    }
}

fn statistics_sinks(
    config: &Config,
    client: &devpool_remote::GithubClient,
) -> Vec<Box<dyn StatisticsSink>> {
    let mut sinks: Vec<Box<dyn StatisticsSink>> = Vec::new();
    if let Some(path) = &config.statistics.local_path {
        sinks.push(Box::new(FileStatisticsSink::new(path.clone())));
    }
    if let Some(path) = &config.statistics.repo_path {
        sinks.push(Box::new(GithubStatisticsSink::new(
            client.clone(),
            config.devpool.clone(),
            path.clone(),
            config.statistics.branch.clone(),
        )));
    }
    sinks
}

fn print_results(report: &PassReport) {
    let prefix = if report.dry_run { "[dry-run] " } else { "" };
    let summary = report.summary();

    if report.is_fork {
        println!("{}", "fork mode: source links rewritten to www.github.com".yellow());
    }
    if report.reconciliation_skipped {
        println!(
            "{prefix}{} devpool could not be fetched; reconciliation skipped",
            "✗".red()
        );
    } else if report.dry_run {
        println!(
            "{prefix}✓ {} repositories ({} would create, {} would update, {} would close, {} unchanged, {} skipped)",
            report.repositories.len(),
            summary.would_create,
            summary.would_update,
            summary.would_close,
            summary.unchanged,
            summary.skipped,
        );
    } else {
        println!(
            "{prefix}✓ {} repositories ({} created, {} updated, {} closed, {} unchanged, {} skipped)",
            report.repositories.len(),
            summary.created,
            summary.updated,
            summary.closed,
            summary.unchanged,
            summary.skipped,
        );
    }

    for o in &report.outcomes {
        let mirror = o
            .outcome
            .mirror_number()
            .map(|n| format!(" → #{n}"))
            .unwrap_or_default();
        match &o.outcome {
            Outcome::Created { announced, .. } => {
                let note = if *announced { " (announced)" } else { "" };
                println!("  {}  {}{mirror}{note}", "+".green(), o.source_url);
            }
            Outcome::Updated { .. } | Outcome::Closed { .. } => {
                println!("  ✎  {} {}{mirror}", o.outcome.action(), o.source_url);
            }
            Outcome::WouldCreate | Outcome::WouldUpdate { .. } | Outcome::WouldClose { .. } => {
                println!("  ~  {} {}{mirror}", o.outcome.action(), o.source_url);
            }
            Outcome::Failed { error } => {
                println!("  {}  {}: {error}", "✗".red(), o.source_url);
            }
            Outcome::Unchanged { .. } | Outcome::Skipped { .. } => {}
        }
    }

    for f in &report.fetch_failures {
        println!("  {}  fetch {}: {}", "✗".red(), f.target, f.error);
    }

    if let Some(stats) = &report.statistics {
        println!(
            "{prefix}· devpool: {} open tasks worth {} ({} unassigned worth {})",
            stats.total_tasks, stats.total_reward, stats.unassigned_tasks, stats.unassigned_reward
        );
    }
    for p in &report.published {
        match &p.status {
            PublishStatus::Written => println!("  ✎  {}", p.target),
            PublishStatus::WouldWrite => println!("  ~  {}", p.target),
            PublishStatus::Unchanged => println!("  ·  {}", p.target),
            PublishStatus::Failed { error } => {
                println!("  {}  {}: {error}", "✗".red(), p.target)
            }
        }
    }
    if let Some(err) = &report.store_error {
        println!("  {}  notification store: {err}", "✗".red());
    }

    let elapsed: chrono::Duration = report.finished_at - report.started_at;
    println!(
        "{prefix}· pass finished at {} ({:.1}s)",
        report.finished_at.format("%Y-%m-%d %H:%M:%S UTC"),
        elapsed.num_milliseconds() as f64 / 1000.0
    );
}
