use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct AssignmentSubmission {
    pub id: String,
    pub assignment_id: String,
    pub student_id: String,
    #[serde(default)]
    pub submitted_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub grade: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct Assignment {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub class_id: Option<String>,
    // Embedded one-to-many join: select=*,assignment_submissions(*)
    #[serde(rename = "assignment_submissions", default)]
    pub submissions: Vec<AssignmentSubmission>,
}

impl Assignment {
    pub fn submission_for(&self, student_id: &str) -> Option<&AssignmentSubmission> {
        self.submissions.iter().find(|s| s.student_id == student_id)
    }

    pub fn is_submitted_by(&self, student_id: &str) -> bool {
        self.submission_for(student_id)
            .map(|s| s.submitted_at.is_some())
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assignment_with_joined_submissions() {
        let json = r#"{
            "id": "as1",
            "title": "Fractions worksheet",
            "due_date": "2024-02-10",
            "assignment_submissions": [
                {"id": "sub1", "assignment_id": "as1", "student_id": "s1", "submitted_at": "2024-02-08T10:00:00Z"},
                {"id": "sub2", "assignment_id": "as1", "student_id": "s2"}
            ]
        }"#;
        let assignment: Assignment = serde_json::from_str(json).unwrap();
        assert_eq!(assignment.submissions.len(), 2);
        assert!(assignment.is_submitted_by("s1"));
        assert!(!assignment.is_submitted_by("s2"));
        assert!(!assignment.is_submitted_by("s3"));
    }

    #[test]
    fn test_assignment_without_join_has_no_submissions() {
        let json = r#"{"id":"as1","title":"Essay"}"#;
        let assignment: Assignment = serde_json::from_str(json).unwrap();
        assert!(assignment.submissions.is_empty());
        assert!(assignment.due_date.is_none());
    }
}
