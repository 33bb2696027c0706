//! In-memory tracker used by the pass tests.
#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::path::Path;

use devpool_core::config::{load_at, Config};
use devpool_core::{
    Announcer, IssueId, IssuePatch, IssueSink, IssueSource, IssueState, MirrorIssue, NewIssue,
    RepoRef, SourceIssue, TrackerError,
};

/// A write the engine made against the fake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Write {
    Create { repo: RepoRef, issue: NewIssue },
    Update { repo: RepoRef, number: u64, patch: IssuePatch },
    Close { repo: RepoRef, number: u64 },
}

#[derive(Default)]
pub struct FakeTracker {
    pub sources: RefCell<HashMap<RepoRef, Vec<SourceIssue>>>,
    pub orgs: RefCell<HashMap<String, Vec<RepoRef>>>,
    pub mirrors: RefCell<HashMap<RepoRef, Vec<MirrorIssue>>>,
    /// `None` makes the fork check fail.
    pub fork: Cell<Option<bool>>,
    pub writes: RefCell<Vec<Write>>,
    /// Remaining transient failures per `owner/repo` listing.
    pub flaky_lists: RefCell<HashMap<String, u32>>,
    /// Listings that always fail.
    pub broken_lists: RefCell<Vec<String>>,
    /// Conflicts returned by the next updates.
    pub conflicts: Cell<u32>,
    /// Changes applied to a mirror right before a conflict is reported.
    pub concurrent_edit: RefCell<Option<(u64, IssueState)>>,
    pub failing_creates: RefCell<Vec<String>>,
    pub list_calls: RefCell<Vec<String>>,
    next_number: Cell<u64>,
}

impl FakeTracker {
    pub fn new() -> Self {
        let fake = FakeTracker::default();
        fake.fork.set(Some(false));
        fake.next_number.set(1);
        fake
    }

    pub fn add_source(&self, issue: SourceIssue) {
        self.sources
            .borrow_mut()
            .entry(issue.repo.clone())
            .or_default()
            .push(issue);
    }

    pub fn set_source_state(&self, id: &str, state: IssueState) {
        for issues in self.sources.borrow_mut().values_mut() {
            for issue in issues.iter_mut().filter(|i| i.id.as_str() == id) {
                issue.state = state;
            }
        }
    }

    pub fn update_source(&self, id: &str, f: impl Fn(&mut SourceIssue)) {
        for issues in self.sources.borrow_mut().values_mut() {
            issues.iter_mut().filter(|i| i.id.as_str() == id).for_each(&f);
        }
    }

    /// Seed a mirror directly, as if created by an earlier run.
    pub fn seed_mirror(&self, repo: &RepoRef, mut mirror: MirrorIssue) -> u64 {
        let number = self.next_number.get();
        self.next_number.set(number + 1);
        mirror.number = number;
        mirror.html_url = format!("https://github.com/{repo}/issues/{number}");
        self.mirrors
            .borrow_mut()
            .entry(repo.clone())
            .or_default()
            .push(mirror);
        number
    }

    pub fn mirrors_of(&self, repo: &RepoRef) -> Vec<MirrorIssue> {
        self.mirrors.borrow().get(repo).cloned().unwrap_or_default()
    }

    pub fn writes(&self) -> Vec<Write> {
        self.writes.borrow().clone()
    }

    pub fn clear_writes(&self) {
        self.writes.borrow_mut().clear();
    }

    pub fn creates_with_label(&self, label: &str) -> usize {
        self.writes
            .borrow()
            .iter()
            .filter(|w| matches!(w, Write::Create { issue, .. } if issue.labels.iter().any(|l| l == label)))
            .count()
    }

    fn check_list(&self, key: String, operation: &str) -> Result<(), TrackerError> {
        self.list_calls.borrow_mut().push(key.clone());
        if self.broken_lists.borrow().contains(&key) {
            return Err(TrackerError::Rejected {
                operation: operation.to_string(),
                status: 403,
                message: "forbidden".to_string(),
            });
        }
        if let Some(left) = self.flaky_lists.borrow_mut().get_mut(&key) {
            if *left > 0 {
                *left -= 1;
                return Err(TrackerError::Transient {
                    operation: operation.to_string(),
                    message: "503".to_string(),
                });
            }
        }
        Ok(())
    }

    fn with_mirror<T>(
        &self,
        repo: &RepoRef,
        number: u64,
        operation: &str,
        f: impl FnOnce(&mut MirrorIssue) -> T,
    ) -> Result<T, TrackerError> {
        let mut mirrors = self.mirrors.borrow_mut();
        let mirror = mirrors
            .get_mut(repo)
            .and_then(|all| all.iter_mut().find(|m| m.number == number))
            .ok_or_else(|| TrackerError::NotFound {
                operation: operation.to_string(),
            })?;
        Ok(f(mirror))
    }
}

impl IssueSource for FakeTracker {
    fn list_issues(&self, repo: &RepoRef) -> Result<Vec<SourceIssue>, TrackerError> {
        self.check_list(repo.to_string(), "list issues")?;
        Ok(self.sources.borrow().get(repo).cloned().unwrap_or_default())
    }

    fn list_repositories(&self, owner: &str) -> Result<Vec<RepoRef>, TrackerError> {
        self.check_list(owner.to_string(), "list repositories")?;
        self.orgs
            .borrow()
            .get(owner)
            .cloned()
            .ok_or_else(|| TrackerError::NotFound {
                operation: format!("list repositories {owner}"),
            })
    }

    fn is_fork(&self, repo: &RepoRef) -> Result<bool, TrackerError> {
        self.fork.get().ok_or_else(|| TrackerError::Transient {
            operation: format!("get repository {repo}"),
            message: "timeout".to_string(),
        })
    }
}

impl IssueSink for FakeTracker {
    fn list_mirrors(&self, repo: &RepoRef) -> Result<Vec<MirrorIssue>, TrackerError> {
        self.check_list(repo.to_string(), "list mirrors")?;
        Ok(self.mirrors_of(repo))
    }

    fn get_mirror(&self, repo: &RepoRef, number: u64) -> Result<MirrorIssue, TrackerError> {
        self.with_mirror(repo, number, "get mirror", |m| m.clone())
    }

    fn create_issue(&self, repo: &RepoRef, issue: &NewIssue) -> Result<MirrorIssue, TrackerError> {
        if self.failing_creates.borrow().contains(&issue.title) {
            return Err(TrackerError::Transient {
                operation: "create issue".to_string(),
                message: "502".to_string(),
            });
        }
        self.writes.borrow_mut().push(Write::Create {
            repo: repo.clone(),
            issue: issue.clone(),
        });
        let number = self.seed_mirror(
            repo,
            MirrorIssue {
                number: 0,
                title: issue.title.clone(),
                body: Some(issue.body.clone()),
                state: IssueState::Open,
                labels: issue.labels.clone(),
                html_url: String::new(),
            },
        );
        self.get_mirror(repo, number)
    }

    fn update_issue(
        &self,
        repo: &RepoRef,
        number: u64,
        patch: &IssuePatch,
    ) -> Result<MirrorIssue, TrackerError> {
        if self.conflicts.get() > 0 {
            self.conflicts.set(self.conflicts.get() - 1);
            if let Some((n, state)) = self.concurrent_edit.borrow_mut().take() {
                self.with_mirror(repo, n, "edit", |m| m.state = state)?;
            }
            return Err(TrackerError::Conflict {
                operation: format!("update {repo}#{number}"),
                message: "409".to_string(),
            });
        }
        self.writes.borrow_mut().push(Write::Update {
            repo: repo.clone(),
            number,
            patch: patch.clone(),
        });
        self.with_mirror(repo, number, "update", |m| {
            if let Some(title) = &patch.title {
                m.title = title.clone();
            }
            if let Some(body) = &patch.body {
                m.body = Some(body.clone());
            }
            if let Some(labels) = &patch.labels {
                m.labels = labels.clone();
            }
            if let Some(state) = patch.state {
                m.state = state;
            }
            m.clone()
        })
    }

    fn close_issue(&self, repo: &RepoRef, number: u64) -> Result<MirrorIssue, TrackerError> {
        self.writes.borrow_mut().push(Write::Close {
            repo: repo.clone(),
            number,
        });
        self.with_mirror(repo, number, "close", |m| {
            m.state = IssueState::Closed;
            m.clone()
        })
    }
}

/// Records every announcement; optionally fails them all.
#[derive(Default)]
pub struct FakeAnnouncer {
    pub calls: RefCell<Vec<IssueId>>,
    pub texts: RefCell<Vec<String>>,
    pub fail: Cell<bool>,
}

impl Announcer for FakeAnnouncer {
    fn announce(
        &self,
        issue: &SourceIssue,
        _mirror: &MirrorIssue,
        text: &str,
    ) -> Result<Option<String>, TrackerError> {
        self.calls.borrow_mut().push(issue.id.clone());
        self.texts.borrow_mut().push(text.to_string());
        if self.fail.get() {
            return Err(TrackerError::Transient {
                operation: "announce".to_string(),
                message: "down".to_string(),
            });
        }
        Ok(Some(format!("post-{}", issue.id)))
    }
}

impl FakeAnnouncer {
    pub fn count_for(&self, id: &str) -> usize {
        self.calls
            .borrow()
            .iter()
            .filter(|i| i.as_str() == id)
            .count()
    }
}

// ---------------------------------------------------------------------------
// Builders
// ---------------------------------------------------------------------------

pub fn devpool() -> RepoRef {
    RepoRef::new("ubiquity", "devpool-directory")
}

pub fn rfc() -> RepoRef {
    RepoRef::new("ubiquity", "devpool-rfc")
}

pub fn partner() -> RepoRef {
    RepoRef::new("acme", "widgets")
}

pub fn source(id: &str, number: u64, labels: &[&str]) -> SourceIssue {
    source_in(&partner(), id, number, labels)
}

pub fn source_in(repo: &RepoRef, id: &str, number: u64, labels: &[&str]) -> SourceIssue {
    SourceIssue {
        id: IssueId::from(id),
        number,
        title: format!("Task {number}"),
        body: Some("details".to_string()),
        state: IssueState::Open,
        labels: labels.iter().map(|l| l.to_string()).collect(),
        html_url: format!("https://github.com/{repo}/issues/{number}"),
        repo: repo.clone(),
        assignee: None,
    }
}

pub fn mirror(labels: &[&str], title: &str, body: &str) -> MirrorIssue {
    MirrorIssue {
        number: 0,
        title: title.to_string(),
        body: Some(body.to_string()),
        state: IssueState::Open,
        labels: labels.iter().map(|l| l.to_string()).collect(),
        html_url: String::new(),
    }
}

/// Write and load a config rooted in `dir`.
pub fn config_in(dir: &Path, partner_urls: &[&str], with_rfc: bool, extra: &str) -> Config {
    let mut yaml = format!(
        "devpool:\n  owner: {}\n  repo: {}\n",
        devpool().owner,
        devpool().name
    );
    if with_rfc {
        yaml.push_str(&format!("rfc:\n  owner: {}\n  repo: {}\n", rfc().owner, rfc().name));
    }
    yaml.push_str("partners:\n  urls:\n");
    for url in partner_urls {
        yaml.push_str(&format!("    - {url}\n"));
    }
    yaml.push_str("retry:\n  max_attempts: 3\n  base_delay_ms: 0\n");
    yaml.push_str(extra);
    let path = dir.join("devpool.yaml");
    std::fs::write(&path, yaml).expect("write config");
    load_at(&path).expect("load config")
}
