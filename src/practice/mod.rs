//! Practice statistics pulled from the external coding-practice site.

use std::time::Duration;

use async_trait::async_trait;
use log::{debug, warn};
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;

use crate::config::PracticeConfig;
use crate::models::activity::deserialize_activity_map;
use crate::models::{ActivityCalendar, ActivityMap, Badge, PracticeProfile, SubmissionCount};

#[derive(Debug, Error)]
pub enum PracticeError {
    #[error("no practice profile named '{0}'")]
    NotFound(String),
    #[error("practice service unavailable: {0}")]
    Unavailable(String),
}

impl PracticeError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, PracticeError::Unavailable(_))
    }
}

impl From<reqwest::Error> for PracticeError {
    fn from(err: reqwest::Error) -> Self {
        PracticeError::Unavailable(err.to_string())
    }
}

#[async_trait]
pub trait ActivitySource: Send + Sync {
    /// Whether `handle` names an existing profile.
    async fn check_handle(&self, handle: &str) -> Result<bool, PracticeError>;
    async fn profile(&self, handle: &str) -> Result<PracticeProfile, PracticeError>;
}

const CHECK_QUERY: &str = "
query userProfile($username: String!) {
  matchedUser(username: $username) {
    username
  }
}";

const PROFILE_QUERY: &str = "
query userProfile($username: String!) {
  matchedUser(username: $username) {
    username
    profile {
      realName
      userAvatar
      ranking
      reputation
      starRating
      aboutMe
      school
      countryName
      company
      skillTags
    }
    submitStats {
      acSubmissionNum {
        difficulty
        count
        submissions
      }
    }
    badges {
      id
      displayName
      icon
    }
    userCalendar {
      submissionCalendar
      totalActiveDays
      streak
    }
  }
}";

// ─── Wire format ─────────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct GraphQlResponse {
    data: Option<ResponseData>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResponseData {
    matched_user: Option<MatchedUser>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct MatchedUser {
    username: String,
    #[serde(default)]
    profile: serde_json::Value,
    #[serde(default)]
    submit_stats: Option<SubmitStats>,
    #[serde(default)]
    badges: Option<Vec<Badge>>,
    #[serde(default)]
    user_calendar: Option<UserCalendar>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SubmitStats {
    #[serde(default)]
    ac_submission_num: Vec<SubmissionCount>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UserCalendar {
    #[serde(deserialize_with = "deserialize_activity_map", default)]
    submission_calendar: ActivityMap,
    #[serde(default)]
    total_active_days: u32,
    #[serde(default)]
    streak: u32,
}

/// Turn a raw GraphQL body into a profile. A missing `matchedUser` means the
/// handle does not exist.
pub fn parse_profile_response(handle: &str, body: &str) -> Result<PracticeProfile, PracticeError> {
    let response: GraphQlResponse = serde_json::from_str(body)
        .map_err(|e| PracticeError::Unavailable(format!("malformed response: {}", e)))?;
    let user = response
        .data
        .and_then(|d| d.matched_user)
        .ok_or_else(|| PracticeError::NotFound(handle.to_string()))?;

    let calendar = user
        .user_calendar
        .map(|c| ActivityCalendar {
            activity_by_epoch_day: c.submission_calendar,
            total_active_days: c.total_active_days,
            current_streak: c.streak,
        })
        .unwrap_or_default();

    Ok(PracticeProfile {
        username: user.username,
        profile: user.profile,
        submission_counts_by_difficulty: user
            .submit_stats
            .map(|s| s.ac_submission_num)
            .unwrap_or_default(),
        badges: user.badges.unwrap_or_default(),
        calendar,
    })
}

// ─── HTTP client ─────────────────────────────────────────────────────────────

pub struct PracticeClient {
    http: reqwest::Client,
    endpoint: String,
}

impl PracticeClient {
    pub fn new(config: &PracticeConfig) -> Result<Self, PracticeError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent("Mozilla/5.0")
            .build()?;
        Ok(Self {
            http,
            endpoint: config.endpoint.clone(),
        })
    }

    async fn query(&self, query: &str, handle: &str) -> Result<String, PracticeError> {
        let response = self
            .http
            .post(&self.endpoint)
            .header("Accept", "*/*")
            .json(&json!({ "query": query, "variables": { "username": handle } }))
            .send()
            .await?;

        if !response.status().is_success() {
            warn!("Practice service answered {} for '{}'", response.status(), handle);
            return Err(PracticeError::Unavailable(format!("status {}", response.status())));
        }
        Ok(response.text().await?)
    }
}

#[async_trait]
impl ActivitySource for PracticeClient {
    async fn check_handle(&self, handle: &str) -> Result<bool, PracticeError> {
        let handle = handle.trim();
        if handle.is_empty() {
            return Ok(false);
        }
        let body = self.query(CHECK_QUERY, handle).await?;
        let response: GraphQlResponse = serde_json::from_str(&body)
            .map_err(|e| PracticeError::Unavailable(format!("malformed response: {}", e)))?;
        let found = response.data.and_then(|d| d.matched_user).is_some();
        debug!("Practice handle '{}' exists: {}", handle, found);
        Ok(found)
    }

    async fn profile(&self, handle: &str) -> Result<PracticeProfile, PracticeError> {
        let handle = handle.trim();
        let body = self.query(PROFILE_QUERY, handle).await?;
        parse_profile_response(handle, &body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_profile_with_encoded_calendar() {
        let body = r#"{
          "data": {
            "matchedUser": {
              "username": "alice",
              "profile": { "realName": "Alice", "ranking": 1200 },
              "submitStats": { "acSubmissionNum": [
                { "difficulty": "All", "count": 57, "submissions": 80 },
                { "difficulty": "Easy", "count": 40, "submissions": 50 },
                { "difficulty": "Medium", "count": 17, "submissions": 30 }
              ]},
              "badges": [ { "id": "7", "displayName": "50 Days Badge", "icon": "/b.png" } ],
              "userCalendar": {
                "submissionCalendar": "{\"1738368000\": 3, \"1738454400\": 11}",
                "totalActiveDays": 2,
                "streak": 2
              }
            }
          }
        }"#;

        let profile = parse_profile_response("alice", body).unwrap();
        assert_eq!(profile.username, "alice");
        assert_eq!(profile.solved_total(), 57);
        assert_eq!(profile.badges[0].display_name, "50 Days Badge");
        assert_eq!(profile.calendar.activity_by_epoch_day.get(&1_738_454_400), Some(&11));
        assert_eq!(profile.calendar.total_active_days, 2);
        assert_eq!(profile.profile["ranking"], 1200);
    }

    #[test]
    fn missing_user_is_not_found() {
        let err = parse_profile_response("ghost", r#"{"data":{"matchedUser":null}}"#).unwrap_err();
        assert!(matches!(err, PracticeError::NotFound(h) if h == "ghost"));
    }

    #[test]
    fn sparse_user_gets_empty_defaults() {
        let body = r#"{"data":{"matchedUser":{"username":"bob","userCalendar":{"submissionCalendar":""}}}}"#;
        let profile = parse_profile_response("bob", body).unwrap();
        assert!(profile.badges.is_empty());
        assert!(profile.calendar.activity_by_epoch_day.is_empty());
        assert_eq!(profile.solved_total(), 0);
    }

    #[test]
    fn garbage_body_is_unavailable() {
        let err = parse_profile_response("bob", "<html>").unwrap_err();
        assert!(matches!(err, PracticeError::Unavailable(_)));
    }
}
