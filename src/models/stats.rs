use serde::{Deserialize, Serialize};

/// Aggregates shown next to the challenge grid. Never persisted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DerivedStats {
    pub unlocked_day_count: u32,
    pub completed_count: u32,
    pub current_streak: u32,
    /// Ratio of completed to unlocked days, 0.0 when nothing is unlocked.
    pub percent_complete: f64,
}
