//! # devpool-sync
//!
//! The reconciliation pass: match every partner issue to its mirror, create,
//! update or close mirrors, announce new ones once, and publish aggregate
//! statistics.
//!
//! Call [`pipeline::run`] with injected [`Collaborators`] to execute a pass.

pub mod error;
pub mod fork_guard;
pub mod lock;
pub mod matcher;
pub mod notify_store;
pub mod pipeline;
pub mod plan;
pub mod reconcile;
pub mod report;
pub mod retry;
pub mod statistics;

pub use error::SyncError;
pub use fork_guard::{rewrite_link, ForkGuard};
pub use matcher::{find_mirror, MirrorCollection};
pub use notify_store::NotifyStore;
pub use pipeline::{run, Collaborators, FetchFailure, PassOptions, PassReport};
pub use reconcile::{IssueOutcome, Outcome, Reconciler, SkipReason};
pub use report::FileStatisticsSink;
pub use statistics::aggregate;
