//! devpool core library: domain types, label vocabulary, configuration,
//! and the tracker traits the sync engine is written against.
//!
//! - [`types`]: source/mirror issues, repository references, statistics
//! - [`labels`]: label prefixes, price parsing, label families
//! - [`config`]: YAML configuration load
//! - [`tracker`]: collaborator traits implemented by `devpool-remote`
//! - [`error`]: [`ConfigError`], [`LabelError`], [`TrackerError`]

pub mod config;
pub mod error;
pub mod labels;
pub mod tracker;
pub mod types;

pub use config::{Config, PartnerTarget};
pub use error::{ConfigError, LabelError, TrackerError};
pub use tracker::{Announcer, DisabledAnnouncer, IssueSink, IssueSource, StatisticsSink};
pub use types::{
    Amount, Classification, IssueId, IssuePatch, IssueState, MirrorIssue, NewIssue,
    PublishOutcome, RepoRef, SourceIssue, Statistics,
};
