//! Reward and task totals over the open standard devpool.

use devpool_core::{labels, Amount, MirrorIssue, Statistics};

/// Aggregate every open issue in `mirrors`. Closed issues are ignored.
///
/// The first price label of each issue is summed; a missing or malformed
/// price contributes zero but the task is still counted. An issue carrying
/// `Unavailable` counts as assigned.
pub fn aggregate<'a, I>(mirrors: I) -> Statistics
where
    I: IntoIterator<Item = &'a MirrorIssue>,
{
    let mut stats = Statistics::default();
    for mirror in mirrors.into_iter().filter(|m| m.is_open()) {
        let reward = price_of(mirror);
        stats.total_tasks += 1;
        stats.total_reward += reward;
        if mirror.has_label(labels::UNAVAILABLE) {
            stats.assigned_tasks += 1;
            stats.assigned_reward += reward;
        } else {
            stats.unassigned_tasks += 1;
            stats.unassigned_reward += reward;
        }
    }
    stats
}

fn price_of(mirror: &MirrorIssue) -> Amount {
    let Some(label) = mirror.labels.iter().find(|l| labels::is_price_label(l)) else {
        return Amount::ZERO;
    };
    match labels::parse_price(label) {
        Ok(amount) => amount.unwrap_or(Amount::ZERO),
        Err(err) => {
            tracing::warn!(issue = mirror.number, error = %err, "price label ignored");
            Amount::ZERO
        }
    }
}
