use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Marker that a user finished one challenge day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionRecord {
    pub day: u32,
    pub completed_at: DateTime<Utc>,
}

/// Collapse records to the set of completed day numbers.
pub fn completed_days(records: &[CompletionRecord]) -> BTreeSet<u32> {
    records.iter().map(|r| r.day).collect()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressResponse {
    pub challenge_progress: Vec<CompletionRecord>,
}

impl From<Vec<CompletionRecord>> for ProgressResponse {
    fn from(challenge_progress: Vec<CompletionRecord>) -> Self {
        Self { challenge_progress }
    }
}
