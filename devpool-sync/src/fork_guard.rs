//! Fork guard: keep test devpools from mentioning partner issues.
//!
//! GitHub records a cross-reference when an issue body contains a bare
//! `https://github.com/...` issue link. A `www.` host still resolves but is
//! not picked up as a mention.

use devpool_core::{IssueSource, RepoRef};

const GITHUB_ORIGIN: &str = "https://github.com";
const UNMENTIONED_ORIGIN: &str = "https://www.github.com";

/// Rewrite `url` so it does not register as a mention when `is_fork` is set.
pub fn rewrite_link(url: &str, is_fork: bool) -> String {
    if is_fork {
        if let Some(rest) = url.strip_prefix(GITHUB_ORIGIN) {
            if rest.is_empty() || rest.starts_with('/') {
                return format!("{UNMENTIONED_ORIGIN}{rest}");
            }
        }
    }
    url.to_string()
}

/// The fork status of the devpool, resolved once per pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForkGuard {
    is_fork: bool,
}

impl ForkGuard {
    pub fn new(is_fork: bool) -> Self {
        ForkGuard { is_fork }
    }

    /// Ask the tracker whether `devpool` is a fork. When the lookup fails the
    /// devpool is treated as a fork.
    pub fn detect(source: &dyn IssueSource, devpool: &RepoRef) -> Self {
        match source.is_fork(devpool) {
            Ok(is_fork) => {
                tracing::debug!(repo = %devpool, is_fork, "fork check");
                ForkGuard { is_fork }
            }
            Err(err) => {
                tracing::warn!(repo = %devpool, error = %err, "fork check failed; rewriting links");
                ForkGuard { is_fork: true }
            }
        }
    }

    pub fn is_fork(&self) -> bool {
        self.is_fork
    }

    pub fn rewrite(&self, url: &str) -> String {
        rewrite_link(url, self.is_fork)
    }
}
