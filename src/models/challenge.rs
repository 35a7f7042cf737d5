use serde::{Deserialize, Serialize};

/// One entry of the challenge syllabus.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DayDescriptor {
    pub day: u32,
    pub unit: String,
    #[serde(default)]
    pub topics: Vec<String>,
    pub question1: Question,
    pub question2: Question,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub solutions: Option<Solutions>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    /// The syllabus uses `name` for the second question.
    #[serde(alias = "name")]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Solutions {
    #[serde(default)]
    pub question1: Vec<Solution>,
    #[serde(default)]
    pub question2: Vec<Solution>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Solution {
    #[serde(rename_all = "camelCase")]
    Tutorial {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        explanation: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        code: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        time_complexity: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        space_complexity: Option<String>,
    },
    Video {
        link: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        label: Option<String>,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DayStatus {
    Locked,
    Today,
    Unlocked,
}

impl DayStatus {
    pub fn badge(&self) -> &'static str {
        match self {
            DayStatus::Locked => "Locked",
            DayStatus::Today => "Today's Challenge",
            DayStatus::Unlocked => "Unlocked",
        }
    }
}

/// A syllabus day as presented to one user.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DayView {
    #[serde(flatten)]
    pub descriptor: DayDescriptor,
    pub status: DayStatus,
    pub completed: bool,
}
