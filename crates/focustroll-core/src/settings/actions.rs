//! Action history: a small, quota-friendly log of interventions taken.
//!
//! Retention mirrors the original data layer: newest first, capped at 250
//! entries or 30 days, whichever trims more.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::host::HostKey;

/// Keep at most this many entries.
pub const MAX_ACTIONS: usize = 250;
/// Drop entries older than this many days.
pub const MAX_ACTION_AGE_DAYS: i64 = 30;

/// One recorded intervention.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionEntry {
    #[serde(rename = "siteUrl")]
    pub host: HostKey,
    pub action_type: String,
    #[serde(rename = "actionDate")]
    pub at: DateTime<Utc>,
}

impl ActionEntry {
    pub fn new(host: HostKey, action_type: impl Into<String>) -> Self {
        Self {
            host,
            action_type: action_type.into(),
            at: Utc::now(),
        }
    }
}

/// Apply the retention policy in place: drop aged-out entries, sort newest
/// first, cap the length.
pub fn trim(actions: &mut Vec<ActionEntry>, now: DateTime<Utc>) {
    let cutoff = now - Duration::days(MAX_ACTION_AGE_DAYS);
    actions.retain(|action| action.at >= cutoff);
    actions.sort_by(|a, b| b.at.cmp(&a.at));
    actions.truncate(MAX_ACTIONS);
}
