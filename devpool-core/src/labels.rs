//! Label vocabulary shared by source and mirror issues.
//!
//! | Family       | Shape                      | Owner                        |
//! |--------------|----------------------------|------------------------------|
//! | Identity     | `id: <node_id>`            | written once at creation     |
//! | Partner      | `Partner: <owner>/<repo>`  | source-derived               |
//! | Pricing      | `Pricing: <amount> <unit>` | source-derived when priced   |
//! | Time         | `Time: <estimate>`         | source-derived when present  |
//! | Priority     | `Priority: <level>`        | source-derived when present  |
//! | Availability | `Unavailable`              | source-derived (assignee)    |
//! | Other        | anything else              | mirror-only                  |

use crate::error::LabelError;
use crate::types::{Amount, IssueId, RepoRef};

pub const ID_PREFIX: &str = "id: ";
pub const PARTNER_PREFIX: &str = "Partner: ";
pub const PRICING_PREFIX: &str = "Pricing: ";
pub const PRICE_PREFIX: &str = "Price: ";
pub const TIME_PREFIX: &str = "Time: ";
pub const PRIORITY_PREFIX: &str = "Priority: ";
pub const UNAVAILABLE: &str = "Unavailable";

/// Which managed family a label belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LabelFamily {
    Identity,
    Partner,
    Pricing,
    Time,
    Priority,
    Availability,
    Other,
}

pub fn family_of(label: &str) -> LabelFamily {
    if label.starts_with(ID_PREFIX) {
        LabelFamily::Identity
    } else if label.starts_with(PARTNER_PREFIX) {
        LabelFamily::Partner
    } else if is_price_label(label) {
        LabelFamily::Pricing
    } else if label.starts_with(TIME_PREFIX) {
        LabelFamily::Time
    } else if label.starts_with(PRIORITY_PREFIX) {
        LabelFamily::Priority
    } else if label == UNAVAILABLE {
        LabelFamily::Availability
    } else {
        LabelFamily::Other
    }
}

/// `id: <identity>`
pub fn identity_label(id: &IssueId) -> String {
    format!("{ID_PREFIX}{id}")
}

/// The identity encoded by an `id:` label, or `None` for any other label.
///
/// Exact inverse of [`identity_label`]: surrounding whitespace is part of the
/// identity, so `id:  I_1` never matches `I_1`.
pub fn identity_of(label: &str) -> Option<&str> {
    label.strip_prefix(ID_PREFIX).filter(|id| !id.is_empty())
}

/// `Partner: <owner>/<repo>`
pub fn partner_label(repo: &RepoRef) -> String {
    format!("{PARTNER_PREFIX}{repo}")
}

pub fn is_price_label(label: &str) -> bool {
    label.starts_with(PRICING_PREFIX) || label.starts_with(PRICE_PREFIX)
}

/// Mirror-side spelling of a source price label.
///
/// Partner bots strip manually added `Price:` labels, so mirrors carry
/// `Pricing:` instead.
pub fn mirror_price_label(source_label: &str) -> Option<String> {
    if let Some(rest) = source_label.strip_prefix(PRICE_PREFIX) {
        return Some(format!("{PRICING_PREFIX}{rest}"));
    }
    source_label
        .starts_with(PRICING_PREFIX)
        .then(|| source_label.to_string())
}

/// Parse the reward carried by a price label.
///
/// `Ok(None)` when `label` is not a price label at all. The amount is the
/// first whitespace-separated token after the prefix, thousands separators
/// allowed: `Pricing: 1,000 USD` → 1000.
pub fn parse_price(label: &str) -> Result<Option<Amount>, LabelError> {
    let rest = match label
        .strip_prefix(PRICING_PREFIX)
        .or_else(|| label.strip_prefix(PRICE_PREFIX))
    {
        Some(rest) => rest,
        None => return Ok(None),
    };
    let malformed = || LabelError::MalformedPrice {
        label: label.to_string(),
    };
    let token = rest.split_whitespace().next().ok_or_else(malformed)?;
    let digits: String = token.chars().filter(|c| *c != ',').collect();
    digits
        .parse::<Amount>()
        .map(Some)
        .map_err(|_| malformed())
}
