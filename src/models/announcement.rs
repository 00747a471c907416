use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum Priority {
    Info,
    Alert,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Info => "Info",
            Priority::Alert => "Alert",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AnnouncementRequest {
    pub subject_id: String,
    pub phrase: String,
    pub priority: Priority,
}

impl AnnouncementRequest {
    pub fn info(subject_id: impl Into<String>, phrase: impl Into<String>) -> Self {
        Self {
            subject_id: subject_id.into(),
            phrase: phrase.into(),
            priority: Priority::Info,
        }
    }

    pub fn alert(subject_id: impl Into<String>, phrase: impl Into<String>) -> Self {
        Self {
            subject_id: subject_id.into(),
            phrase: phrase.into(),
            priority: Priority::Alert,
        }
    }
}
