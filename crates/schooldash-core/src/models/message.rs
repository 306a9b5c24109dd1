use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct Message {
    pub id: String,
    pub sender_id: String,
    pub recipient_id: String,
    #[serde(default)]
    pub subject: Option<String>,
    pub body: String,
    #[serde(default)]
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct Notification {
    pub id: String,
    pub user_id: String,
    pub title: String,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

/// Anything with a read flag, so inbox counters work for both collections.
pub trait Readable {
    fn is_read(&self) -> bool;
}

impl Readable for Message {
    fn is_read(&self) -> bool {
        self.read
    }
}

impl Readable for Notification {
    fn is_read(&self) -> bool {
        self.read
    }
}
