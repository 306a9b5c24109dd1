//! Pure summaries computed from already-fetched rows.
//!
//! Nothing here touches the network or the cache; every function is total
//! (no panics, no NaN) over any input, including empty slices.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use crate::models::{
    AttendanceRecord, AttendanceStatus, Assignment, FeeRecord, FeeStatus, Readable, SchoolEvent,
};

/// Items created within this many (calendar-ceiled) days are flagged as new.
pub const RECENT_DAYS: i64 = 3;

const MILLIS_PER_DAY: f64 = 86_400_000.0;

/// `round(present / total * 100)`, or 0 for no records.
pub fn attendance_percentage(records: &[AttendanceRecord]) -> u32 {
    let total = records.len();
    if total == 0 {
        return 0;
    }
    let present = records.iter().filter(|r| r.is_present()).count();
    ((present as f64 / total as f64) * 100.0).round() as u32
}

/// Sum of amounts still owed (pending, overdue or partially paid).
pub fn total_due(fees: &[FeeRecord]) -> f64 {
    fees.iter()
        .filter(|f| f.status.is_outstanding())
        .map(|f| f.amount)
        .sum()
}

/// Earliest due date among pending or overdue fees.
pub fn next_due_date(fees: &[FeeRecord]) -> Option<NaiveDate> {
    fees.iter()
        .filter(|f| f.status.has_upcoming_due())
        .map(|f| f.due_date)
        .min()
}

/// Whether something created at `created_at` still counts as new at `now`.
///
/// Elapsed time is rounded up to whole days, so anything up to and including
/// exactly three days old is new. Timestamps in the future are new.
pub fn is_recent(created_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    let elapsed_days = (now - created_at).num_milliseconds() as f64 / MILLIS_PER_DAY;
    elapsed_days.ceil() <= RECENT_DAYS as f64
}

pub fn unread_count<T: Readable>(items: &[T]) -> usize {
    items.iter().filter(|i| !i.is_read()).count()
}

/// Assignments the student has not submitted and that are not yet past due.
/// Assignments without a due date stay pending until submitted.
pub fn pending_assignments<'a>(
    student_id: &str,
    assignments: &'a [Assignment],
    today: NaiveDate,
) -> Vec<&'a Assignment> {
    assignments
        .iter()
        .filter(|a| !a.is_submitted_by(student_id))
        .filter(|a| a.due_date.map(|d| d >= today).unwrap_or(true))
        .collect()
}

/// Events on or after `today`, soonest first, at most `limit`.
pub fn upcoming_events(events: &[SchoolEvent], today: NaiveDate, limit: usize) -> Vec<&SchoolEvent> {
    let mut upcoming: Vec<&SchoolEvent> = events.iter().filter(|e| e.event_date >= today).collect();
    upcoming.sort_by_key(|e| e.event_date);
    upcoming.truncate(limit);
    upcoming
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AttendanceSummary {
    pub present: usize,
    pub absent: usize,
    pub late: usize,
    pub excused: usize,
    pub total: usize,
    pub percentage: u32,
}

impl AttendanceSummary {
    pub fn from_records(records: &[AttendanceRecord]) -> Self {
        let count = |status: AttendanceStatus| records.iter().filter(|r| r.status == status).count();
        Self {
            present: count(AttendanceStatus::Present),
            absent: count(AttendanceStatus::Absent),
            late: count(AttendanceStatus::Late),
            excused: count(AttendanceStatus::Excused),
            total: records.len(),
            percentage: attendance_percentage(records),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FeeSummary {
    pub total_due: f64,
    pub total_paid: f64,
    pub overdue_count: usize,
    pub next_due_date: Option<NaiveDate>,
}

impl FeeSummary {
    pub fn from_fees(fees: &[FeeRecord]) -> Self {
        Self {
            total_due: total_due(fees),
            total_paid: fees
                .iter()
                .filter(|f| f.status == FeeStatus::Paid)
                .map(|f| f.amount)
                .sum(),
            overdue_count: fees.iter().filter(|f| f.status == FeeStatus::Overdue).count(),
            next_due_date: next_due_date(fees),
        }
    }
}
