//! YAML configuration for a devpool sync run.
//!
//! # API pattern
//!
//! Every filesystem function takes an explicit path (`load_at`, `scaffold_at`)
//! so tests can point it at a `TempDir`. Relative paths inside the file
//! (`state_dir`, `templates_dir`, `statistics.local_path`) are resolved
//! against the directory that holds the config file.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::types::{Classification, RepoRef};

/// File name looked up in the working directory when `--config` is absent.
pub const DEFAULT_CONFIG_FILE: &str = "devpool.yaml";

const GITHUB_HOSTS: &[&str] = &[
    "https://github.com/",
    "http://github.com/",
    "https://www.github.com/",
    "http://www.github.com/",
];

// ---------------------------------------------------------------------------
// Schema
// ---------------------------------------------------------------------------

/// Root of `devpool.yaml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Standard devpool repository. Always present.
    pub devpool: RepoRef,
    /// RFC devpool repository, if the deployment has one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rfc: Option<RepoRef>,
    #[serde(default)]
    pub partners: PartnersConfig,
    #[serde(default)]
    pub sync: SyncPolicy,
    #[serde(default)]
    pub retry: RetryPolicy,
    #[serde(default)]
    pub statistics: StatisticsConfig,
    #[serde(default)]
    pub announce: AnnounceConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub templates_dir: Option<PathBuf>,
    #[serde(default = "default_state_dir")]
    pub state_dir: PathBuf,
    #[serde(default)]
    pub github: GithubConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct PartnersConfig {
    /// Repository URLs (`owner/repo`) or organization URLs (`owner`).
    #[serde(default)]
    pub urls: Vec<String>,
    /// Repository URLs skipped even when their organization is listed.
    #[serde(default)]
    pub opt_out: Vec<String>,
}

/// Which source issues may get a *new* mirror.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncPolicy {
    /// Unpriced issues are drafts and are not mirrored.
    pub require_price_label: bool,
    /// Assigned issues are already taken and are not mirrored.
    pub skip_assigned: bool,
}

impl Default for SyncPolicy {
    fn default() -> Self {
        Self {
            require_price_label: true,
            skip_assigned: true,
        }
    }
}

/// Bounded exponential backoff for transient tracker errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 500,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct StatisticsConfig {
    /// Path of the statistics JSON inside the devpool repository.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repo_path: Option<String>,
    /// Branch for `repo_path`; the repository default branch when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    /// Local JSON file, written atomically.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_path: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct AnnounceConfig {
    /// Endpoint receiving new-issue announcements. Disabled when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub webhook_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GithubConfig {
    pub api_url: String,
}

impl Default for GithubConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.github.com".to_string(),
        }
    }
}

fn default_state_dir() -> PathBuf {
    PathBuf::from(".devpool")
}

/// A configured partner entry after URL parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PartnerTarget {
    /// A single repository.
    Repo(RepoRef),
    /// Every repository of an organization or user.
    Org(String),
}

// ---------------------------------------------------------------------------
// URL parsing
// ---------------------------------------------------------------------------

/// Parse `https://github.com/<owner>[/<repo>[/...]]`.
///
/// A `.git` suffix and trailing slashes are tolerated; path segments after the
/// repository (`/issues/1`) are ignored.
pub fn parse_partner_url(url: &str) -> Result<PartnerTarget, ConfigError> {
    let invalid = || ConfigError::InvalidRepoUrl {
        url: url.to_string(),
    };
    let trimmed = url.trim();
    let path = GITHUB_HOSTS
        .iter()
        .find_map(|host| trimmed.strip_prefix(host))
        .ok_or_else(invalid)?;
    let mut segments = path.split('/').filter(|s| !s.is_empty());

    let owner = segments.next().ok_or_else(invalid)?;
    if !is_valid_owner(owner) {
        return Err(invalid());
    }
    match segments.next() {
        None => Ok(PartnerTarget::Org(owner.to_string())),
        Some(repo) => {
            let repo = repo.strip_suffix(".git").unwrap_or(repo);
            if !is_valid_repo_name(repo) {
                return Err(invalid());
            }
            Ok(PartnerTarget::Repo(RepoRef::new(owner, repo)))
        }
    }
}

impl RepoRef {
    /// Parse a repository URL; organization-only URLs are rejected.
    pub fn parse_url(url: &str) -> Result<RepoRef, ConfigError> {
        match parse_partner_url(url)? {
            PartnerTarget::Repo(repo) => Ok(repo),
            PartnerTarget::Org(_) => Err(ConfigError::InvalidRepoUrl {
                url: url.to_string(),
            }),
        }
    }
}

fn is_valid_owner(owner: &str) -> bool {
    !owner.is_empty() && owner.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
}

fn is_valid_repo_name(repo: &str) -> bool {
    !repo.is_empty()
        && repo != "."
        && repo != ".."
        && repo
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}

// ---------------------------------------------------------------------------
// Config accessors
// ---------------------------------------------------------------------------

impl Config {
    /// Mirror repositories in match order, each tagged with its classification.
    pub fn mirror_targets(&self) -> Vec<(Classification, RepoRef)> {
        let mut targets = vec![(Classification::Standard, self.devpool.clone())];
        if let Some(rfc) = &self.rfc {
            targets.push((Classification::Rfc, rfc.clone()));
        }
        targets
    }

    /// Parsed `partners.urls`, in file order.
    pub fn partner_targets(&self) -> Result<Vec<PartnerTarget>, ConfigError> {
        self.partners
            .urls
            .iter()
            .map(|u| parse_partner_url(u))
            .collect()
    }

    /// Parsed `partners.opt_out`.
    pub fn opt_out_repos(&self) -> Result<Vec<RepoRef>, ConfigError> {
        self.partners
            .opt_out
            .iter()
            .map(|u| RepoRef::parse_url(u))
            .collect()
    }

    fn validate(&self) -> Result<(), ConfigError> {
        self.partner_targets()?;
        self.opt_out_repos()?;
        if self.retry.max_attempts == 0 {
            return Err(ConfigError::Invalid {
                field: "retry.max_attempts",
                message: "must be at least 1".to_string(),
            });
        }
        if self.rfc.as_ref() == Some(&self.devpool) {
            return Err(ConfigError::Invalid {
                field: "rfc",
                message: "must differ from the standard devpool repository".to_string(),
            });
        }
        if let Some(url) = &self.announce.webhook_url {
            if !url.starts_with("https://") && !url.starts_with("http://") {
                return Err(ConfigError::Invalid {
                    field: "announce.webhook_url",
                    message: format!("'{url}' is not an http(s) url"),
                });
            }
        }
        Ok(())
    }

    fn resolve_paths(&mut self, base: &Path) {
        let resolve = |p: &Path| {
            if p.is_absolute() {
                p.to_path_buf()
            } else {
                base.join(p)
            }
        };
        self.state_dir = resolve(&self.state_dir);
        self.templates_dir = self.templates_dir.as_deref().map(resolve);
        self.statistics.local_path = self.statistics.local_path.as_deref().map(resolve);
    }
}

// ---------------------------------------------------------------------------
// Load / scaffold
// ---------------------------------------------------------------------------

/// Load and validate the config at `path`.
///
/// Returns `ConfigError::NotFound` if absent, `ConfigError::Parse` (with path
/// and line context) if the YAML is malformed, and `InvalidRepoUrl`/`Invalid`
/// for values that parse but cannot be used.
pub fn load_at(path: &Path) -> Result<Config, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::NotFound {
            path: path.to_path_buf(),
        });
    }
    let contents = std::fs::read_to_string(path)?;
    let mut config: Config = serde_yaml::from_str(&contents).map_err(|e| ConfigError::Parse {
        path: path.to_path_buf(),
        source: e,
    })?;
    config.validate()?;
    let base = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    config.resolve_paths(base);
    Ok(config)
}

const SCAFFOLD: &str = r#"# devpool sync configuration

# Standard devpool repository receiving mirrored issues.
devpool:
  owner: {owner}
  repo: {repo}

# Optional RFC devpool. Mirrors already living here stay here.
# rfc:
#   owner: {owner}
#   repo: devpool-rfc

partners:
  # Repository URLs, or organization URLs to include every repository.
  urls: []
  opt_out: []

sync:
  require_price_label: true
  skip_assigned: true

retry:
  max_attempts: 3
  base_delay_ms: 500

statistics:
  # repo_path: devpool-statistics.json
  local_path: devpool-statistics.json

# announce:
#   webhook_url: https://example.com/hooks/devpool

state_dir: .devpool
"#;

/// Write a commented starter config to `path`.
///
/// Never overwrites: returns `Ok(false)` when a file is already present.
/// Write flow: render → `.tmp` sibling → `rename`.
pub fn scaffold_at(path: &Path, devpool: &RepoRef) -> Result<bool, ConfigError> {
    if path.exists() {
        return Ok(false);
    }
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let content = SCAFFOLD
        .replace("{owner}", &devpool.owner)
        .replace("{repo}", &devpool.name);
    let tmp = path.with_extension("yaml.tmp");
    std::fs::write(&tmp, content)?;
    std::fs::rename(&tmp, path)?;
    Ok(true)
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use tempfile::TempDir;

    #[rstest]
    #[case("https://github.com/acme/widgets", PartnerTarget::Repo(RepoRef::new("acme", "widgets")))]
    #[case("https://github.com/acme/widgets/", PartnerTarget::Repo(RepoRef::new("acme", "widgets")))]
    #[case("https://github.com/acme/widgets.git", PartnerTarget::Repo(RepoRef::new("acme", "widgets")))]
    #[case("https://github.com/acme/widgets/issues/3", PartnerTarget::Repo(RepoRef::new("acme", "widgets")))]
    #[case("https://www.github.com/acme/pay.ubq.fi", PartnerTarget::Repo(RepoRef::new("acme", "pay.ubq.fi")))]
    #[case("https://github.com/acme", PartnerTarget::Org("acme".to_string()))]
    #[case("  https://github.com/acme/  ", PartnerTarget::Org("acme".to_string()))]
    fn partner_urls(#[case] url: &str, #[case] expected: PartnerTarget) {
        assert_eq!(parse_partner_url(url).expect("parse"), expected);
    }

    #[rstest]
    #[case("https://gitlab.com/acme/widgets")]
    #[case("github.com/acme/widgets")]
    #[case("https://github.com/")]
    #[case("https://github.com/ac me/x")]
    #[case("https://github.com/acme/..")]
    fn rejected_urls(#[case] url: &str) {
        assert!(matches!(
            parse_partner_url(url),
            Err(ConfigError::InvalidRepoUrl { .. })
        ));
    }

    #[test]
    fn repo_url_rejects_org() {
        assert!(RepoRef::parse_url("https://github.com/acme").is_err());
    }

    #[test]
    fn mirror_targets_standard_first() {
        let mut config: Config =
            serde_yaml::from_str("devpool: {owner: o, repo: devpool}\n").expect("yaml");
        assert_eq!(
            config.mirror_targets(),
            vec![(Classification::Standard, RepoRef::new("o", "devpool"))]
        );
        config.rfc = Some(RepoRef::new("o", "rfc"));
        let classes: Vec<_> = config.mirror_targets().into_iter().map(|(c, _)| c).collect();
        assert_eq!(classes, vec![Classification::Standard, Classification::Rfc]);
    }

    #[test]
    fn defaults_applied() {
        let config: Config =
            serde_yaml::from_str("devpool: {owner: o, repo: devpool}\n").expect("yaml");
        assert_eq!(config.sync, SyncPolicy::default());
        assert!(config.sync.require_price_label);
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.github.api_url, "https://api.github.com");
        assert_eq!(config.state_dir, PathBuf::from(".devpool"));
    }

    #[test]
    fn scaffold_then_load() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join(DEFAULT_CONFIG_FILE);
        let created = scaffold_at(&path, &RepoRef::new("acme", "devpool-directory")).expect("scaffold");
        assert!(created);
        let config = load_at(&path).expect("load scaffold");
        assert_eq!(config.devpool, RepoRef::new("acme", "devpool-directory"));
        assert!(config.rfc.is_none());
        assert_eq!(config.state_dir, dir.path().join(".devpool"));
        assert_eq!(
            config.statistics.local_path,
            Some(dir.path().join("devpool-statistics.json"))
        );
    }

    #[test]
    fn scaffold_never_overwrites() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join(DEFAULT_CONFIG_FILE);
        std::fs::write(&path, "devpool: {owner: mine, repo: keep}\n").expect("write");
        let created = scaffold_at(&path, &RepoRef::new("acme", "devpool")).expect("scaffold");
        assert!(!created);
        let kept = std::fs::read_to_string(&path).expect("read");
        assert!(kept.contains("keep"));
    }
}
