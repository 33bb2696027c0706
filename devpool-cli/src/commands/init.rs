//! `devpool init <owner/repo>`: write a starter `devpool.yaml`.

use std::path::Path;

use anyhow::{bail, Context, Result};
use clap::Args;

use devpool_core::{config, RepoRef};

use super::super::RepoArg;

/// Scaffold a configuration file.
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Standard devpool repository, as `owner/repo` or a GitHub URL.
    pub devpool: RepoArg,
}

impl InitArgs {
    pub fn run(self, config_path: &Path) -> Result<()> {
        let devpool = RepoRef::from(self.devpool);
        let created = config::scaffold_at(config_path, &devpool)
            .with_context(|| format!("failed to write '{}'", config_path.display()))?;
        if !created {
            bail!(
                "'{}' already exists; remove it first to re-scaffold",
                config_path.display()
            );
        }

        println!("✓ Wrote '{}' for devpool {devpool}", config_path.display());
        println!("  Add partner repositories under `partners.urls`, then run `devpool sync --dry-run`.");
        Ok(())
    }
}
