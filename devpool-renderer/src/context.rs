//! Template context: serializable rendering payload built from a [`SourceIssue`].

use serde::{Deserialize, Serialize};

use devpool_core::{labels, SourceIssue};

/// Flat rendering payload shared by the mirror body and announcement templates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssueContext {
    /// Source issue title.
    pub title: String,
    /// Back-link to the source issue, already rewritten by the fork guard.
    pub link: String,
    /// `owner/repo` of the partner repository.
    pub partner: String,
    /// Amount and unit of the price label (`"100 USD"`), if priced.
    pub price: Option<String>,
    /// Source labels, verbatim.
    pub labels: Vec<String>,
    /// URL of the mirror; only known once the mirror exists.
    pub mirror_url: Option<String>,
}

impl IssueContext {
    /// Build a context for `issue`; `link` is the fork-guarded back-link.
    pub fn from_source(issue: &SourceIssue, link: impl Into<String>) -> Self {
        let price = issue.price_label().and_then(|l| {
            l.strip_prefix(labels::PRICING_PREFIX)
                .or_else(|| l.strip_prefix(labels::PRICE_PREFIX))
                .map(|rest| rest.trim().to_string())
        });
        IssueContext {
            title: issue.title.clone(),
            link: link.into(),
            partner: issue.repo.to_string(),
            price,
            labels: issue.labels.clone(),
            mirror_url: None,
        }
    }

    pub fn with_mirror_url(mut self, url: impl Into<String>) -> Self {
        self.mirror_url = Some(url.into());
        self
    }

    /// Convert to a [`tera::Context`] for rendering.
    pub fn to_tera_context(&self) -> Result<tera::Context, tera::Error> {
        tera::Context::from_serialize(self)
    }
}
