use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub sap_id: Option<String>,
    pub practice_handle: Option<String>,
    #[serde(skip_serializing, default)]
    pub password_hash: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// SSO accounts start without a student ID or handle.
    pub fn profile_complete(&self) -> bool {
        self.sap_id.is_some() && self.practice_handle.is_some()
    }
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub sap_id: Option<String>,
    pub practice_handle: Option<String>,
    pub password_hash: Option<String>,
}

/// Student IDs are exactly eight ASCII digits.
pub fn is_valid_sap_id(s: &str) -> bool {
    s.len() == 8 && s.bytes().all(|b| b.is_ascii_digit())
}

pub fn normalize_email(s: &str) -> String {
    s.trim().to_lowercase()
}
