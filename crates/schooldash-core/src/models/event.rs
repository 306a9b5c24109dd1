use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct SchoolEvent {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub event_date: NaiveDate,
    #[serde(default)]
    pub location: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl SchoolEvent {
    pub fn formatted_date(&self) -> String {
        self.event_date.format("%b %d, %Y").to_string()
    }
}
