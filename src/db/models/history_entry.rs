use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One announced detection or alert, as kept in the `history` table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub id: i64,
    pub detected_item: String,
    pub timestamp: DateTime<Utc>,
}
