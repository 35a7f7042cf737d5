use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};

/// Submission counts keyed by UTC-midnight epoch seconds.
pub type ActivityMap = BTreeMap<i64, u32>;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionCount {
    pub difficulty: String,
    pub count: u32,
    #[serde(default)]
    pub submissions: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Badge {
    #[serde(default)]
    pub id: Option<String>,
    pub display_name: String,
    #[serde(default)]
    pub icon: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityCalendar {
    #[serde(deserialize_with = "deserialize_activity_map", default)]
    pub activity_by_epoch_day: ActivityMap,
    #[serde(default)]
    pub total_active_days: u32,
    #[serde(default)]
    pub current_streak: u32,
}

/// Practice statistics for one external handle.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PracticeProfile {
    pub username: String,
    #[serde(default)]
    pub profile: serde_json::Value,
    pub submission_counts_by_difficulty: Vec<SubmissionCount>,
    pub badges: Vec<Badge>,
    pub calendar: ActivityCalendar,
}

impl PracticeProfile {
    /// Accepted submissions, read from the "All" bucket when the API sends one.
    pub fn solved_total(&self) -> u32 {
        self.submission_counts_by_difficulty
            .iter()
            .find(|s| s.difficulty.eq_ignore_ascii_case("all"))
            .map(|s| s.count)
            .unwrap_or_else(|| self.submission_counts_by_difficulty.iter().map(|s| s.count).sum())
    }
}

fn activity_from_object(
    entries: serde_json::Map<String, serde_json::Value>,
) -> Result<ActivityMap, String> {
    entries
        .into_iter()
        .map(|(key, count)| {
            let day = key
                .trim()
                .parse::<i64>()
                .map_err(|_| format!("calendar key '{}' is not an epoch second", key))?;
            let count = count
                .as_u64()
                .and_then(|c| u32::try_from(c).ok())
                .ok_or_else(|| format!("calendar count for '{}' is not a count", key))?;
            Ok((day, count))
        })
        .collect()
}

fn activity_from_value(value: serde_json::Value) -> Result<ActivityMap, String> {
    match value {
        serde_json::Value::Null => Ok(ActivityMap::new()),
        serde_json::Value::Object(entries) => activity_from_object(entries),
        serde_json::Value::String(s) if s.trim().is_empty() => Ok(ActivityMap::new()),
        serde_json::Value::String(s) => match serde_json::from_str(&s) {
            Ok(serde_json::Value::Object(entries)) => activity_from_object(entries),
            Ok(serde_json::Value::Null) => Ok(ActivityMap::new()),
            Ok(other) => Err(format!("encoded calendar is not an object: {}", other)),
            Err(e) => Err(format!("encoded calendar is not JSON: {}", e)),
        },
        other => Err(format!("calendar is neither a map nor a string: {}", other)),
    }
}

/// The statistics API hands the calendar out as a JSON string, cached copies
/// carry it already parsed. Accept both.
pub fn deserialize_activity_map<'de, D>(deserializer: D) -> Result<ActivityMap, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    activity_from_value(value).map_err(serde::de::Error::custom)
}
