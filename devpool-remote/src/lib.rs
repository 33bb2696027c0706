//! # devpool-remote
//!
//! Blocking HTTP implementations of the `devpool-core` tracker traits:
//!
//! - [`GithubClient`]: GitHub REST v3; [`IssueSource`](devpool_core::IssueSource)
//!   and [`IssueSink`](devpool_core::IssueSink)
//! - [`GithubStatisticsSink`]: statistics JSON committed through the contents API
//! - [`WebhookAnnouncer`]: new-mirror announcements posted to a webhook

mod error;
pub mod github;
pub mod webhook;
mod wire;

pub use github::{GithubClient, GithubStatisticsSink};
pub use webhook::WebhookAnnouncer;
