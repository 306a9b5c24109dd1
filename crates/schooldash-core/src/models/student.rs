use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct Student {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub grade: Option<String>,
    #[serde(default)]
    pub section: Option<String>,
    #[serde(default)]
    pub class_id: Option<String>,
    #[serde(default)]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub roll_number: Option<String>,
}

impl Student {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    /// "Grade 5-B", "Grade 5", or empty when the student has no grade yet.
    pub fn class_label(&self) -> String {
        match (&self.grade, &self.section) {
            (Some(grade), Some(section)) => format!("Grade {}-{}", grade, section),
            (Some(grade), None) => format!("Grade {}", grade),
            _ => String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_student_deserializes_with_missing_optionals() {
        let json = r#"{"id":"s1","first_name":"Asha","last_name":"Rao"}"#;
        let student: Student = serde_json::from_str(json).unwrap();
        assert_eq!(student.full_name(), "Asha Rao");
        assert_eq!(student.class_label(), "");
    }

    #[test]
    fn test_class_label() {
        let mut student: Student =
            serde_json::from_str(r#"{"id":"s1","first_name":"A","last_name":"B","grade":"5"}"#)
                .unwrap();
        assert_eq!(student.class_label(), "Grade 5");
        student.section = Some("B".to_string());
        assert_eq!(student.class_label(), "Grade 5-B");
    }
}
