//! Typed access to the backend's collections.

use std::sync::Arc;

use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::models::{
    AttendanceRecord, Assignment, FeeRecord, Message, Notification, Profile, ProfileUpdate,
    SchoolEvent, Student,
};

use super::{ApiError, Query, SchoolBackend};

// ============================================================================
// Collection names
// ============================================================================

pub const STUDENTS: &str = "students";
pub const ATTENDANCE: &str = "attendance";
pub const FEES: &str = "fees";
pub const ASSIGNMENTS: &str = "assignments";
pub const SUBMISSIONS: &str = "assignment_submissions";
pub const SCHOOL_EVENTS: &str = "school_events";
pub const MESSAGES: &str = "messages";
pub const NOTIFICATIONS: &str = "notifications";
pub const PROFILES: &str = "profiles";

/// Attendance rows shown on a dashboard (roughly one school term).
const ATTENDANCE_LIMIT: usize = 90;

/// Upcoming assignments listed per student.
const ASSIGNMENT_LIMIT: usize = 20;

/// Upcoming events listed on a dashboard.
const EVENT_LIMIT: usize = 10;

/// Most recent inbox rows fetched.
const INBOX_LIMIT: usize = 20;

/// Typed wrapper over a `SchoolBackend`.
/// Clone is cheap - the backend is shared.
#[derive(Clone)]
pub struct SchoolApi {
    backend: Arc<dyn SchoolBackend>,
}

impl SchoolApi {
    pub fn new(backend: Arc<dyn SchoolBackend>) -> Self {
        Self { backend }
    }

    fn decode<T: DeserializeOwned>(table: &str, rows: Vec<Value>) -> Result<Vec<T>, ApiError> {
        rows.into_iter()
            .map(|row| {
                serde_json::from_value(row).map_err(|e| {
                    ApiError::InvalidResponse(format!("Failed to parse {} row: {}", table, e))
                })
            })
            .collect()
    }

    async fn fetch<T: DeserializeOwned>(&self, query: Query) -> Result<Vec<T>, ApiError> {
        let table = query.table_name().to_string();
        let rows = self.backend.select(&query).await?;
        debug!(table = %table, count = rows.len(), "Rows fetched");
        Self::decode(&table, rows)
    }

    pub async fn fetch_students_for_parent(&self, parent_id: &str) -> Result<Vec<Student>, ApiError> {
        self.fetch(
            Query::table(STUDENTS)
                .eq("parent_id", parent_id)
                .order("first_name", true),
        )
        .await
    }

    /// Most recent attendance first; `since` bounds the date range from below.
    pub async fn fetch_attendance(
        &self,
        student_id: &str,
        since: Option<NaiveDate>,
    ) -> Result<Vec<AttendanceRecord>, ApiError> {
        let mut query = Query::table(ATTENDANCE).eq("student_id", student_id);
        if let Some(since) = since {
            query = query.gte("date", since);
        }
        self.fetch(query.order("date", false).limit(ATTENDANCE_LIMIT))
            .await
    }

    pub async fn fetch_fees(&self, student_id: &str) -> Result<Vec<FeeRecord>, ApiError> {
        self.fetch(
            Query::table(FEES)
                .eq("student_id", student_id)
                .order("due_date", true),
        )
        .await
    }

    /// Assignments for a class, each with its submissions embedded.
    pub async fn fetch_assignments(&self, class_id: &str) -> Result<Vec<Assignment>, ApiError> {
        self.fetch(
            Query::table(ASSIGNMENTS)
                .select(format!("*,{}(*)", SUBMISSIONS))
                .eq("class_id", class_id)
                .order("due_date", true)
                .limit(ASSIGNMENT_LIMIT),
        )
        .await
    }

    pub async fn fetch_events(&self, from: NaiveDate) -> Result<Vec<SchoolEvent>, ApiError> {
        self.fetch(
            Query::table(SCHOOL_EVENTS)
                .gte("event_date", from)
                .order("event_date", true)
                .limit(EVENT_LIMIT),
        )
        .await
    }

    pub async fn fetch_messages(&self, user_id: &str) -> Result<Vec<Message>, ApiError> {
        self.fetch(
            Query::table(MESSAGES)
                .eq("recipient_id", user_id)
                .order("created_at", false)
                .limit(INBOX_LIMIT),
        )
        .await
    }

    pub async fn fetch_notifications(&self, user_id: &str) -> Result<Vec<Notification>, ApiError> {
        self.fetch(
            Query::table(NOTIFICATIONS)
                .eq("user_id", user_id)
                .order("created_at", false)
                .limit(INBOX_LIMIT),
        )
        .await
    }

    pub async fn fetch_profile(&self, user_id: &str) -> Result<Profile, ApiError> {
        let mut rows: Vec<Profile> = self
            .fetch(Query::table(PROFILES).eq("id", user_id).limit(1))
            .await?;
        rows.pop()
            .ok_or_else(|| ApiError::NotFound(format!("profile {}", user_id)))
    }

    /// Apply an already-validated edit to the user's own profile row.
    pub async fn update_profile(
        &self,
        user_id: &str,
        update: &ProfileUpdate,
    ) -> Result<Profile, ApiError> {
        let patch = serde_json::to_value(update)
            .map_err(|e| ApiError::InvalidResponse(format!("Failed to encode profile: {}", e)))?;
        let query = Query::table(PROFILES).eq("id", user_id);
        let rows = self.backend.update(&query, &patch).await?;
        let mut profiles: Vec<Profile> = Self::decode(PROFILES, rows)?;
        profiles
            .pop()
            .ok_or_else(|| ApiError::NotFound(format!("profile {}", user_id)))
    }
}
