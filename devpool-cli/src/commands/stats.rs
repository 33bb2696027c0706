//! `devpool stats`: aggregate statistics without running a pass.

use std::path::Path;

use anyhow::{Context, Result};
use clap::Args;
use tabled::{settings::Style, Table, Tabled};

use devpool_core::IssueSink;
use devpool_sync::{aggregate, retry::with_retry};

use super::{github_client, load_config};

/// Arguments for `devpool stats`.
#[derive(Args, Debug)]
pub struct StatsArgs {
    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Tabled)]
struct StatsRow {
    #[tabled(rename = "tasks")]
    scope: &'static str,
    #[tabled(rename = "count")]
    count: u64,
    #[tabled(rename = "reward")]
    reward: String,
}

impl StatsArgs {
    pub fn run(self, config_path: &Path) -> Result<()> {
        let config = load_config(config_path)?;
        let client = github_client(&config);

        let label = format!("list mirrors {}", config.devpool);
        let mirrors = with_retry(&config.retry, &label, || client.list_mirrors(&config.devpool))
            .with_context(|| format!("failed to fetch devpool {}", config.devpool))?;
        let stats = aggregate(&mirrors);

        if self.json {
            println!("{}", serde_json::to_string_pretty(&stats)?);
            return Ok(());
        }

        let rows = vec![
            StatsRow {
                scope: "all",
                count: stats.total_tasks,
                reward: stats.total_reward.to_string(),
            },
            StatsRow {
                scope: "assigned",
                count: stats.assigned_tasks,
                reward: stats.assigned_reward.to_string(),
            },
            StatsRow {
                scope: "unassigned",
                count: stats.unassigned_tasks,
                reward: stats.unassigned_reward.to_string(),
            },
        ];
        println!("devpool {} ({} mirrors)", config.devpool, mirrors.len());
        let mut table = Table::new(rows);
        table.with(Style::rounded());
        println!("{table}");
        Ok(())
    }
}
