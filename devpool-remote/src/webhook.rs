//! Announcement of new mirrors through a JSON webhook.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use devpool_core::{Announcer, MirrorIssue, SourceIssue, TrackerError};

use crate::error::from_ureq;

/// Token recorded when the endpoint accepts the post without returning an id.
pub const DEFAULT_TOKEN: &str = "announced";

#[derive(Serialize)]
struct Payload<'a> {
    text: &'a str,
    issue_url: &'a str,
    source_url: &'a str,
    source_id: &'a str,
}

#[derive(Deserialize)]
struct Reply {
    #[serde(default)]
    id: Option<serde_json::Value>,
}

/// POSTs `{text, issue_url, source_url, source_id}` to a configured URL.
#[derive(Debug, Clone)]
pub struct WebhookAnnouncer {
    agent: ureq::Agent,
    url: String,
}

impl WebhookAnnouncer {
    pub fn new(url: impl Into<String>) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(Duration::from_secs(15))
            .build();
        WebhookAnnouncer {
            agent,
            url: url.into(),
        }
    }
}

impl Announcer for WebhookAnnouncer {
    fn announce(
        &self,
        issue: &SourceIssue,
        mirror: &MirrorIssue,
        text: &str,
    ) -> Result<Option<String>, TrackerError> {
        let operation = format!("announce {}", issue.id);
        let payload = Payload {
            text,
            issue_url: &mirror.html_url,
            source_url: &issue.html_url,
            source_id: issue.id.as_str(),
        };
        let response = self
            .agent
            .post(&self.url)
            .send_json(payload)
            .map_err(|e| from_ureq(&operation, e))?;

        // Endpoints differ in what they answer; an id is used when present.
        let body = response.into_string().unwrap_or_default();
        let token = serde_json::from_str::<Reply>(&body)
            .ok()
            .and_then(|r| r.id)
            .map(|id| match id {
                serde_json::Value::String(s) => s,
                other => other.to_string(),
            })
            .unwrap_or_else(|| DEFAULT_TOKEN.to_string());
        tracing::debug!(source = %issue.id, token = %token, "announcement accepted");
        Ok(Some(token))
    }
}
