//! GitHub REST payloads, decoded only as far as the sync engine needs.

use serde::Deserialize;

use devpool_core::{IssueId, IssueState, MirrorIssue, RepoRef, SourceIssue};

#[derive(Debug, Deserialize)]
pub(crate) struct WireLabel {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireUser {
    pub login: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireIssue {
    pub node_id: String,
    pub number: u64,
    pub title: String,
    #[serde(default)]
    pub body: Option<String>,
    pub state: IssueState,
    #[serde(default)]
    pub labels: Vec<WireLabel>,
    pub html_url: String,
    #[serde(default)]
    pub assignee: Option<WireUser>,
    #[serde(default)]
    pub assignees: Vec<WireUser>,
    /// Present only when the "issue" is a pull request.
    #[serde(default)]
    pub pull_request: Option<serde_json::Value>,
}

impl WireIssue {
    pub fn is_pull_request(&self) -> bool {
        self.pull_request.is_some()
    }

    fn label_names(&self) -> Vec<String> {
        self.labels.iter().map(|l| l.name.clone()).collect()
    }

    pub fn into_source(self, repo: &RepoRef) -> SourceIssue {
        let labels = self.label_names();
        let assignee = self
            .assignee
            .or_else(|| self.assignees.into_iter().next())
            .map(|u| u.login);
        SourceIssue {
            id: IssueId(self.node_id),
            number: self.number,
            title: self.title,
            body: self.body,
            state: self.state,
            labels,
            html_url: self.html_url,
            repo: repo.clone(),
            assignee,
        }
    }

    pub fn into_mirror(self) -> MirrorIssue {
        let labels = self.label_names();
        MirrorIssue {
            number: self.number,
            title: self.title,
            body: self.body,
            state: self.state,
            labels,
            html_url: self.html_url,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireRepo {
    pub name: String,
    pub owner: WireUser,
    #[serde(default)]
    pub fork: bool,
    #[serde(default)]
    pub archived: bool,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireContent {
    pub sha: String,
    #[serde(default)]
    pub content: String,
}
