pub mod init;
pub mod stats;
pub mod sync;

use std::path::Path;

use anyhow::{Context, Result};

use devpool_core::config::{self, Config};
use devpool_remote::GithubClient;

/// Environment variables searched, in order, for a GitHub token.
pub const TOKEN_VARS: &[&str] = &["DEVPOOL_GITHUB_TOKEN", "GITHUB_TOKEN"];

pub fn load_config(path: &Path) -> Result<Config> {
    config::load_at(path).with_context(|| {
        format!(
            "failed to load '{}'; run `devpool init <owner/repo>` first",
            path.display()
        )
    })
}

/// GitHub client for `config`, authenticated when a token is set.
pub fn github_client(config: &Config) -> GithubClient {
    let token = TOKEN_VARS
        .iter()
        .find_map(|var| std::env::var(var).ok().filter(|t| !t.trim().is_empty()));
    if token.is_none() {
        tracing::warn!("no GitHub token set; requests are unauthenticated and writes will fail");
    }
    GithubClient::new(config.github.api_url.clone(), token)
}
