//! Plain-text rendering of dashboards and lists.

use std::fmt::Write;

use chrono::{DateTime, NaiveDate, Utc};
use schooldash_core::aggregate::{self, is_recent, unread_count};
use schooldash_core::dashboard::{DashboardSnapshot, SliceKind, SliceStatus};
use schooldash_core::models::{Notification, Profile, Student};
use schooldash_core::utils::{format_currency, format_date, format_relative, truncate_string};

const UPCOMING_EVENT_LIMIT: usize = 5;
const LINE_WIDTH: usize = 60;

fn slice_header(out: &mut String, snapshot: &DashboardSnapshot, kind: SliceKind, title: &str) {
    let _ = writeln!(out, "\n== {} ==", title);
    match snapshot.status(kind) {
        SliceStatus::Error => {
            let error = snapshot.error(kind).unwrap_or("unknown error");
            let _ = writeln!(out, "  ! Could not refresh: {}", error);
        }
        SliceStatus::Loading => {
            let _ = writeln!(out, "  (loading)");
        }
        _ => {}
    }
}

pub fn dashboard(student: &Student, snapshot: &DashboardSnapshot, today: NaiveDate) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{} - {}", student.full_name(), student.class_label());

    slice_header(&mut out, snapshot, SliceKind::Attendance, "Attendance");
    if let Some(summary) = snapshot.attendance_summary() {
        let _ = writeln!(
            out,
            "  {}% present ({} of {} days, {} late, {} absent)",
            summary.percentage, summary.present, summary.total, summary.late, summary.absent
        );
    }

    slice_header(&mut out, snapshot, SliceKind::Fees, "Fees");
    if let Some(summary) = snapshot.fee_summary() {
        let _ = writeln!(out, "  Due: {}", format_currency(summary.total_due));
        if let Some(next) = summary.next_due_date {
            let _ = writeln!(out, "  Next due: {}", format_date(next));
        }
        if summary.overdue_count > 0 {
            let _ = writeln!(out, "  Overdue items: {}", summary.overdue_count);
        }
    }

    slice_header(&mut out, snapshot, SliceKind::Assignments, "Homework");
    if let Some(assignments) = snapshot.assignments.data() {
        let pending = aggregate::pending_assignments(&student.id, assignments, today);
        if pending.is_empty() {
            let _ = writeln!(out, "  Nothing pending");
        }
        for a in pending {
            let due = a.due_date.map(format_date).unwrap_or_else(|| "no due date".to_string());
            let _ = writeln!(out, "  - {} (due {})", truncate_string(&a.title, LINE_WIDTH), due);
        }
    }

    slice_header(&mut out, snapshot, SliceKind::Events, "Upcoming events");
    if let Some(events) = snapshot.events.data() {
        for e in aggregate::upcoming_events(events, today, UPCOMING_EVENT_LIMIT) {
            let _ = writeln!(out, "  {}  {}", e.formatted_date(), truncate_string(&e.title, LINE_WIDTH));
        }
    }

    slice_header(&mut out, snapshot, SliceKind::Messages, "Messages");
    if let Some(messages) = snapshot.messages.data() {
        let _ = writeln!(out, "  {} unread of {}", unread_count(messages), messages.len());
    }

    out
}

pub fn notifications(items: &[Notification], now: DateTime<Utc>) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{} unread", unread_count(items));
    for n in items {
        let marker = if is_recent(n.created_at, now) { "*" } else { " " };
        let _ = writeln!(
            out,
            "{} {}  {}",
            marker,
            format_relative(n.created_at, now),
            truncate_string(&n.title, LINE_WIDTH)
        );
    }
    out
}

pub fn profile(profile: &Profile) -> String {
    format!(
        "{} <{}>\nRole: {}\nPhone: {}\n",
        profile.display_name(),
        profile.email,
        profile.role,
        profile.phone.as_deref().unwrap_or("-")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use schooldash_core::models::{FeeRecord, FeeStatus, Role};

    fn student() -> Student {
        Student {
            id: "s1".into(),
            first_name: "Maya".into(),
            last_name: "Rao".into(),
            grade: Some("5".into()),
            section: Some("B".into()),
            class_id: Some("c1".into()),
            parent_id: Some("p1".into()),
            roll_number: None,
        }
    }

    #[test]
    fn test_dashboard_shows_fee_summary_and_slice_error() {
        let mut snapshot = DashboardSnapshot::default();
        snapshot.fees.succeed(
            vec![FeeRecord {
                id: "f1".into(),
                student_id: "s1".into(),
                description: None,
                amount: 5000.0,
                due_date: NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
                status: FeeStatus::Pending,
                paid_date: None,
            }],
            Utc::now(),
        );
        snapshot.attendance.fail("Server error: down", None);

        let text = dashboard(&student(), &snapshot, NaiveDate::from_ymd_opt(2024, 1, 20).unwrap());
        assert!(text.contains("Due: 5,000.00"));
        assert!(text.contains("Next due: Feb 01, 2024"));
        assert!(text.contains("Could not refresh: Server error: down"));
    }

    #[test]
    fn test_notifications_mark_recent() {
        let now = Utc::now();
        let make = |title: &str, age: Duration, read: bool| Notification {
            id: title.into(),
            user_id: "p1".into(),
            title: title.into(),
            body: None,
            read,
            created_at: now - age,
        };
        let text = notifications(
            &[make("Fee reminder", Duration::hours(2), false), make("Old", Duration::days(10), true)],
            now,
        );
        assert!(text.starts_with("1 unread"));
        assert!(text.contains("* 2h ago  Fee reminder"));
        assert!(text.contains("  10d ago  Old"));
    }

    #[test]
    fn test_profile_falls_back_to_email() {
        let p = Profile {
            id: "u1".into(),
            email: "p@example.com".into(),
            full_name: None,
            phone: None,
            role: Role::Parent,
            updated_at: None,
        };
        assert!(profile(&p).starts_with("p@example.com <p@example.com>"));
    }
}
