//! GitHub REST v3 client.
//!
//! All calls are blocking (`ureq`). Listings page through `per_page=100`
//! until a short page comes back. Pull requests returned by the issues
//! endpoint are dropped.

use std::time::Duration;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::de::DeserializeOwned;
use serde::Serialize;

use devpool_core::{
    IssuePatch, IssueSink, IssueSource, IssueState, MirrorIssue, NewIssue, PublishOutcome,
    RepoRef, SourceIssue, Statistics, StatisticsSink, TrackerError,
};

use crate::error::{decode, from_ureq};
use crate::wire::{WireContent, WireIssue, WireRepo};

const PER_PAGE: usize = 100;
const USER_AGENT: &str = concat!("devpool-sync/", env!("CARGO_PKG_VERSION"));

/// Blocking GitHub client shared by the source and sink sides of a pass.
#[derive(Clone)]
pub struct GithubClient {
    agent: ureq::Agent,
    api_url: String,
    token: Option<String>,
}

impl std::fmt::Debug for GithubClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GithubClient")
            .field("api_url", &self.api_url)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl GithubClient {
    pub fn new(api_url: impl Into<String>, token: Option<String>) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(Duration::from_secs(30))
            .user_agent(USER_AGENT)
            .build();
        GithubClient {
            agent,
            api_url: api_url.into().trim_end_matches('/').to_string(),
            token,
        }
    }

    fn request(&self, method: &str, path: &str) -> ureq::Request {
        let url = format!("{}{}", self.api_url, path);
        let req = self
            .agent
            .request(method, &url)
            .set("Accept", "application/vnd.github+json")
            .set("X-GitHub-Api-Version", "2022-11-28");
        match &self.token {
            Some(token) => req.set("Authorization", &format!("Bearer {token}")),
            None => req,
        }
    }

    fn get_json<T: DeserializeOwned>(
        &self,
        req: ureq::Request,
        operation: &str,
    ) -> Result<T, TrackerError> {
        tracing::debug!(url = req.url(), "GET");
        let response = req.call().map_err(|e| from_ureq(operation, e))?;
        response.into_json().map_err(|e| decode(operation, e))
    }

    fn send_json<T: DeserializeOwned>(
        &self,
        req: ureq::Request,
        body: impl Serialize,
        operation: &str,
    ) -> Result<T, TrackerError> {
        tracing::debug!(method = req.method(), url = req.url(), "write");
        let response = req.send_json(body).map_err(|e| from_ureq(operation, e))?;
        response.into_json().map_err(|e| decode(operation, e))
    }

    /// GET every page of a listing endpoint.
    fn list_paged<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
        operation: &str,
    ) -> Result<Vec<T>, TrackerError> {
        let mut out = Vec::new();
        let mut page = 1u32;
        loop {
            let page_param = page.to_string();
            let mut req = self
                .request("GET", path)
                .query("per_page", "100")
                .query("page", &page_param);
            for (key, value) in query {
                req = req.query(key, value);
            }
            let batch: Vec<T> = self.get_json(req, operation)?;
            let len = batch.len();
            out.extend(batch);
            if len < PER_PAGE {
                return Ok(out);
            }
            page += 1;
        }
    }

    fn list_issue_payloads(
        &self,
        repo: &RepoRef,
        operation: &str,
    ) -> Result<Vec<WireIssue>, TrackerError> {
        let path = format!("/repos/{}/{}/issues", repo.owner, repo.name);
        let issues: Vec<WireIssue> = self.list_paged(&path, &[("state", "all")], operation)?;
        Ok(issues.into_iter().filter(|i| !i.is_pull_request()).collect())
    }

    fn repos_under(&self, path: &str, operation: &str) -> Result<Vec<RepoRef>, TrackerError> {
        let repos: Vec<WireRepo> = self.list_paged(path, &[], operation)?;
        Ok(repos
            .into_iter()
            .filter(|r| !r.archived)
            .map(|r| RepoRef::new(r.owner.login, r.name))
            .collect())
    }

    fn get_content(
        &self,
        repo: &RepoRef,
        path: &str,
        branch: Option<&str>,
    ) -> Result<Option<(String, String)>, TrackerError> {
        let operation = format!("get {path} in {repo}");
        let mut req = self.request("GET", &format!("/repos/{}/{}/contents/{}", repo.owner, repo.name, path));
        if let Some(branch) = branch {
            req = req.query("ref", branch);
        }
        match self.get_json::<WireContent>(req, &operation) {
            Ok(content) => {
                let packed: String = content.content.split_whitespace().collect();
                let bytes = BASE64.decode(packed).map_err(|e| decode(&operation, e))?;
                let text = String::from_utf8(bytes).map_err(|e| decode(&operation, e))?;
                Ok(Some((content.sha, text)))
            }
            Err(TrackerError::NotFound { .. }) => Ok(None),
            Err(err) => Err(err),
        }
    }

    fn put_content(
        &self,
        repo: &RepoRef,
        path: &str,
        branch: Option<&str>,
        text: &str,
        sha: Option<&str>,
    ) -> Result<(), TrackerError> {
        #[derive(Serialize)]
        struct PutContent<'a> {
            message: &'a str,
            content: String,
            #[serde(skip_serializing_if = "Option::is_none")]
            sha: Option<&'a str>,
            #[serde(skip_serializing_if = "Option::is_none")]
            branch: Option<&'a str>,
        }
        let operation = format!("put {path} in {repo}");
        let req = self.request("PUT", &format!("/repos/{}/{}/contents/{}", repo.owner, repo.name, path));
        let body = PutContent {
            message: "chore: update devpool statistics",
            content: BASE64.encode(text),
            sha,
            branch,
        };
        let _: serde_json::Value = self.send_json(req, body, &operation)?;
        Ok(())
    }
}

impl IssueSource for GithubClient {
    fn list_issues(&self, repo: &RepoRef) -> Result<Vec<SourceIssue>, TrackerError> {
        let operation = format!("list issues {repo}");
        let issues = self.list_issue_payloads(repo, &operation)?;
        Ok(issues.into_iter().map(|i| i.into_source(repo)).collect())
    }

    fn list_repositories(&self, owner: &str) -> Result<Vec<RepoRef>, TrackerError> {
        let operation = format!("list repositories {owner}");
        match self.repos_under(&format!("/orgs/{owner}/repos"), &operation) {
            // Partner URLs may name a user account rather than an organization.
            Err(TrackerError::NotFound { .. }) => {
                self.repos_under(&format!("/users/{owner}/repos"), &operation)
            }
            other => other,
        }
    }

    fn is_fork(&self, repo: &RepoRef) -> Result<bool, TrackerError> {
        let operation = format!("get repository {repo}");
        let req = self.request("GET", &format!("/repos/{}/{}", repo.owner, repo.name));
        let wire: WireRepo = self.get_json(req, &operation)?;
        Ok(wire.fork)
    }
}

impl IssueSink for GithubClient {
    fn list_mirrors(&self, repo: &RepoRef) -> Result<Vec<MirrorIssue>, TrackerError> {
        let operation = format!("list mirrors {repo}");
        let issues = self.list_issue_payloads(repo, &operation)?;
        Ok(issues.into_iter().map(WireIssue::into_mirror).collect())
    }

    fn get_mirror(&self, repo: &RepoRef, number: u64) -> Result<MirrorIssue, TrackerError> {
        let operation = format!("get {repo}#{number}");
        let req = self.request("GET", &format!("/repos/{}/{}/issues/{number}", repo.owner, repo.name));
        let wire: WireIssue = self.get_json(req, &operation)?;
        Ok(wire.into_mirror())
    }

    fn create_issue(&self, repo: &RepoRef, issue: &NewIssue) -> Result<MirrorIssue, TrackerError> {
        let operation = format!("create issue in {repo}");
        let req = self.request("POST", &format!("/repos/{}/{}/issues", repo.owner, repo.name));
        let wire: WireIssue = self.send_json(req, issue, &operation)?;
        Ok(wire.into_mirror())
    }

    fn update_issue(
        &self,
        repo: &RepoRef,
        number: u64,
        patch: &IssuePatch,
    ) -> Result<MirrorIssue, TrackerError> {
        let operation = format!("update {repo}#{number}");
        let req = self.request("PATCH", &format!("/repos/{}/{}/issues/{number}", repo.owner, repo.name));
        let wire: WireIssue = self.send_json(req, patch, &operation)?;
        Ok(wire.into_mirror())
    }

    fn close_issue(&self, repo: &RepoRef, number: u64) -> Result<MirrorIssue, TrackerError> {
        let patch = IssuePatch {
            state: Some(IssueState::Closed),
            ..IssuePatch::default()
        };
        let operation = format!("close {repo}#{number}");
        let req = self.request("PATCH", &format!("/repos/{}/{}/issues/{number}", repo.owner, repo.name));
        let wire: WireIssue = self.send_json(req, &patch, &operation)?;
        Ok(wire.into_mirror())
    }
}

// ---------------------------------------------------------------------------
// Statistics through the contents API
// ---------------------------------------------------------------------------

/// Writes statistics as a pretty-printed JSON file committed to a repository.
///
/// The current file is read first; identical content is left alone.
#[derive(Debug, Clone)]
pub struct GithubStatisticsSink {
    client: GithubClient,
    repo: RepoRef,
    path: String,
    branch: Option<String>,
}

impl GithubStatisticsSink {
    pub fn new(
        client: GithubClient,
        repo: RepoRef,
        path: impl Into<String>,
        branch: Option<String>,
    ) -> Self {
        GithubStatisticsSink {
            client,
            repo,
            path: path.into(),
            branch,
        }
    }
}

impl StatisticsSink for GithubStatisticsSink {
    fn target(&self) -> String {
        match &self.branch {
            Some(branch) => format!("{}:{}@{}", self.repo, self.path, branch),
            None => format!("{}:{}", self.repo, self.path),
        }
    }

    fn publish(
        &self,
        statistics: &Statistics,
        dry_run: bool,
    ) -> Result<PublishOutcome, TrackerError> {
        let target = self.target();
        let mut text = serde_json::to_string_pretty(statistics)
            .map_err(|e| decode("serialize statistics", e))?;
        text.push('\n');

        let branch = self.branch.as_deref();
        let existing = self.client.get_content(&self.repo, &self.path, branch)?;
        if let Some((_, current)) = &existing {
            if *current == text {
                return Ok(PublishOutcome::Unchanged { target });
            }
        }
        if dry_run {
            return Ok(PublishOutcome::WouldWrite { target });
        }
        let sha = existing.as_ref().map(|(sha, _)| sha.as_str());
        self.client
            .put_content(&self.repo, &self.path, branch, &text, sha)?;
        Ok(PublishOutcome::Written { target })
    }
}
