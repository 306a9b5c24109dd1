use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(rename_all = "lowercase")]
pub enum FeeStatus {
    Pending,
    Overdue,
    Partial,
    Paid,
    #[serde(other)]
    Other,
}

impl FeeStatus {
    /// Statuses whose amount still counts toward the balance owed.
    pub fn is_outstanding(&self) -> bool {
        matches!(self, FeeStatus::Pending | FeeStatus::Overdue | FeeStatus::Partial)
    }

    /// Statuses that carry a due date the parent still has to meet.
    pub fn has_upcoming_due(&self) -> bool {
        matches!(self, FeeStatus::Pending | FeeStatus::Overdue)
    }
}

impl std::fmt::Display for FeeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FeeStatus::Pending => write!(f, "Pending"),
            FeeStatus::Overdue => write!(f, "Overdue"),
            FeeStatus::Partial => write!(f, "Partial"),
            FeeStatus::Paid => write!(f, "Paid"),
            FeeStatus::Other => write!(f, "Unknown"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct FeeRecord {
    pub id: String,
    pub student_id: String,
    #[serde(default)]
    pub description: Option<String>,
    pub amount: f64,
    pub due_date: NaiveDate,
    pub status: FeeStatus,
    #[serde(default)]
    pub paid_date: Option<NaiveDate>,
}
