use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Store-assigned record identifier. Always positive.
pub type Id = i64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StudentStatus {
    #[default]
    Active,
    Inactive,
}

impl StudentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            StudentStatus::Active => "active",
            StudentStatus::Inactive => "inactive",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "active" => Some(Self::Active),
            "inactive" => Some(Self::Inactive),
            _ => None,
        }
    }
}

/// Daily attendance mark. Any status string the dashboard does not know
/// lands in `Unmarked`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttendanceStatus {
    Present,
    Absent,
    Late,
    #[serde(other)]
    Unmarked,
}

impl AttendanceStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            AttendanceStatus::Present => "present",
            AttendanceStatus::Absent => "absent",
            AttendanceStatus::Late => "late",
            AttendanceStatus::Unmarked => "unmarked",
        }
    }

    /// Blank input means "not set"; anything unrecognised is `Unmarked`.
    pub fn parse(s: &str) -> Option<Self> {
        let t = s.trim();
        if t.is_empty() {
            return None;
        }
        Some(match t.to_ascii_lowercase().as_str() {
            "present" => Self::Present,
            "absent" => Self::Absent,
            "late" => Self::Late,
            _ => Self::Unmarked,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub id: Id,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub grade_level: u8,
    #[serde(default)]
    pub status: StudentStatus,
    #[serde(default)]
    pub enrollment_date: Option<String>,
}

impl Student {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Assignment {
    pub id: Id,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    pub total_points: f64,
    #[serde(default)]
    pub due_date: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// A score is a 0..=100 percentage; it is never rescaled by the
/// assignment's total points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Grade {
    pub id: Id,
    pub student_id: Id,
    pub assignment_id: Id,
    pub score: f64,
    #[serde(default)]
    pub submitted_date: Option<String>,
    #[serde(default)]
    pub comments: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceRecord {
    pub id: Id,
    pub student_id: Id,
    pub date: NaiveDate,
    #[serde(default)]
    pub status: Option<AttendanceStatus>,
    #[serde(default)]
    pub notes: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewStudent {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub grade_level: u8,
    #[serde(default)]
    pub status: StudentStatus,
    #[serde(default)]
    pub enrollment_date: Option<String>,
}

impl NewStudent {
    pub fn validate(&self) -> Result<(), String> {
        if self.first_name.trim().is_empty() || self.last_name.trim().is_empty() {
            return Err("firstName/lastName must not be empty".into());
        }
        if !self.email.contains('@') {
            return Err("email must contain '@'".into());
        }
        if !(1..=12).contains(&self.grade_level) {
            return Err("gradeLevel must be in 1..=12".into());
        }
        Ok(())
    }

    pub fn into_student(self, id: Id) -> Student {
        Student {
            id,
            first_name: self.first_name.trim().to_string(),
            last_name: self.last_name.trim().to_string(),
            email: self.email.trim().to_string(),
            grade_level: self.grade_level,
            status: self.status,
            enrollment_date: self.enrollment_date,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAssignment {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    #[serde(default = "default_total_points")]
    pub total_points: f64,
    #[serde(default)]
    pub due_date: Option<String>,
}

fn default_total_points() -> f64 {
    100.0
}

impl NewAssignment {
    pub fn validate(&self) -> Result<(), String> {
        if self.title.trim().is_empty() {
            return Err("title must not be empty".into());
        }
        if !self.total_points.is_finite() || self.total_points <= 0.0 {
            return Err("totalPoints must be > 0".into());
        }
        Ok(())
    }

    pub fn into_assignment(self, id: Id, created_at: Option<String>) -> Assignment {
        Assignment {
            id,
            title: self.title.trim().to_string(),
            description: self.description,
            category: self.category.trim().to_string(),
            total_points: self.total_points,
            due_date: self.due_date,
            created_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewGrade {
    pub student_id: Id,
    pub assignment_id: Id,
    pub score: f64,
    #[serde(default)]
    pub submitted_date: Option<String>,
    #[serde(default)]
    pub comments: String,
}

impl NewGrade {
    pub fn validate(&self) -> Result<(), String> {
        if self.student_id <= 0 || self.assignment_id <= 0 {
            return Err("studentId/assignmentId must be positive".into());
        }
        validate_score(self.score)
    }

    pub fn into_grade(self, id: Id) -> Grade {
        Grade {
            id,
            student_id: self.student_id,
            assignment_id: self.assignment_id,
            score: self.score,
            submitted_date: self.submitted_date,
            comments: self.comments,
        }
    }
}

pub fn validate_score(score: f64) -> Result<(), String> {
    if !score.is_finite() || !(0.0..=100.0).contains(&score) {
        return Err("score must be a number in 0..=100".into());
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAttendanceRecord {
    pub student_id: Id,
    pub date: NaiveDate,
    #[serde(default)]
    pub status: Option<AttendanceStatus>,
    #[serde(default)]
    pub notes: String,
}

impl NewAttendanceRecord {
    pub fn validate(&self) -> Result<(), String> {
        if self.student_id <= 0 {
            return Err("studentId must be positive".into());
        }
        Ok(())
    }

    pub fn into_record(self, id: Id) -> AttendanceRecord {
        AttendanceRecord {
            id,
            student_id: self.student_id,
            date: self.date,
            status: self.status,
            notes: self.notes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attendance_status_unknown_strings_are_unmarked() {
        let rec: AttendanceRecord = serde_json::from_value(serde_json::json!({
            "id": 1,
            "studentId": 2,
            "date": "2024-03-04",
            "status": "excused"
        }))
        .expect("record");
        assert_eq!(rec.status, Some(AttendanceStatus::Unmarked));

        let rec: AttendanceRecord = serde_json::from_value(serde_json::json!({
            "id": 1,
            "studentId": 2,
            "date": "2024-03-04",
            "status": null
        }))
        .expect("record");
        assert_eq!(rec.status, None);
        assert_eq!(AttendanceStatus::parse("  "), None);
        assert_eq!(AttendanceStatus::parse("LATE"), Some(AttendanceStatus::Late));
    }

    #[test]
    fn student_defaults_to_active() {
        let s: NewStudent = serde_json::from_value(serde_json::json!({
            "firstName": "Ada",
            "lastName": "Lovelace",
            "email": "ada@example.com",
            "gradeLevel": 9
        }))
        .expect("student");
        assert_eq!(s.status, StudentStatus::Active);
        assert!(s.validate().is_ok());
    }

    #[test]
    fn validation_rejects_out_of_range_values() {
        let s = NewStudent {
            first_name: "A".into(),
            last_name: "B".into(),
            email: "a@b".into(),
            grade_level: 13,
            status: StudentStatus::Active,
            enrollment_date: None,
        };
        assert!(s.validate().is_err());

        let a: NewAssignment = serde_json::from_value(serde_json::json!({ "title": "Quiz" }))
            .expect("assignment");
        assert_eq!(a.total_points, 100.0);
        let bad = NewAssignment {
            total_points: 0.0,
            ..a
        };
        assert!(bad.validate().is_err());

        assert!(validate_score(100.0).is_ok());
        assert!(validate_score(100.5).is_err());
        assert!(validate_score(f64::NAN).is_err());
    }
}
