//! Record stores. One trait, two backends: SQLite for a real workspace and
//! an in-memory fake owned by whoever constructs it.
//!
//! Both backends validate write payloads with the model's `validate()` and
//! check foreign keys before writing, so they report the same errors for the
//! same input. Upserts look up the natural key (student+assignment for
//! grades, student+date for attendance) and rewrite the first match.

use crate::model::{
    Assignment, AttendanceRecord, Grade, Id, NewAssignment, NewAttendanceRecord, NewGrade,
    NewStudent, Student,
};
use chrono::NaiveDate;

pub mod memory;
pub mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: Id },

    #[error("{0}")]
    Invalid(String),

    #[error("stored setting {key} is not valid JSON: {source}")]
    BadSetting {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Db(#[from] rusqlite::Error),
}

impl StoreError {
    /// IPC error code; `db_code` names the failing operation for database
    /// errors (`db_query_failed`, `db_insert_failed`, ...).
    pub fn code(&self, db_code: &'static str) -> &'static str {
        match self {
            StoreError::NotFound { .. } => "not_found",
            StoreError::Invalid(_) => "bad_params",
            StoreError::BadSetting { .. } | StoreError::Db(_) => db_code,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GradeFilter {
    pub student_id: Option<Id>,
    pub assignment_id: Option<Id>,
}

impl GradeFilter {
    pub fn matches(&self, g: &Grade) -> bool {
        self.student_id.map(|id| g.student_id == id).unwrap_or(true)
            && self.assignment_id.map(|id| g.assignment_id == id).unwrap_or(true)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AttendanceFilter {
    pub student_id: Option<Id>,
    pub date: Option<NaiveDate>,
}

impl AttendanceFilter {
    pub fn matches(&self, r: &AttendanceRecord) -> bool {
        self.student_id.map(|id| r.student_id == id).unwrap_or(true)
            && self.date.map(|d| r.date == d).unwrap_or(true)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Upserted<T> {
    pub record: T,
    pub created: bool,
}

pub trait RecordStore {
    /// Short backend name reported by `health`.
    fn kind(&self) -> &'static str;

    fn list_students(&self) -> Result<Vec<Student>, StoreError>;
    fn get_student(&self, id: Id) -> Result<Student, StoreError>;
    fn create_student(&mut self, new: NewStudent) -> Result<Student, StoreError>;
    fn update_student(&mut self, id: Id, new: NewStudent) -> Result<Student, StoreError>;
    /// Also removes the student's grades and attendance.
    fn delete_student(&mut self, id: Id) -> Result<(), StoreError>;

    fn list_assignments(&self) -> Result<Vec<Assignment>, StoreError>;
    fn get_assignment(&self, id: Id) -> Result<Assignment, StoreError>;
    fn create_assignment(&mut self, new: NewAssignment) -> Result<Assignment, StoreError>;
    fn update_assignment(&mut self, id: Id, new: NewAssignment) -> Result<Assignment, StoreError>;
    /// Also removes the assignment's grades.
    fn delete_assignment(&mut self, id: Id) -> Result<(), StoreError>;

    fn list_grades(&self, filter: GradeFilter) -> Result<Vec<Grade>, StoreError>;
    fn get_grade(&self, id: Id) -> Result<Grade, StoreError>;
    fn create_grade(&mut self, new: NewGrade) -> Result<Grade, StoreError>;
    fn update_grade(&mut self, id: Id, new: NewGrade) -> Result<Grade, StoreError>;
    fn delete_grade(&mut self, id: Id) -> Result<(), StoreError>;
    fn upsert_grade(&mut self, new: NewGrade) -> Result<Upserted<Grade>, StoreError>;

    fn list_attendance(&self, filter: AttendanceFilter) -> Result<Vec<AttendanceRecord>, StoreError>;
    fn mark_attendance(&mut self, new: NewAttendanceRecord) -> Result<Upserted<AttendanceRecord>, StoreError>;
    fn delete_attendance(&mut self, id: Id) -> Result<(), StoreError>;

    fn setting_get(&self, key: &str) -> Result<Option<serde_json::Value>, StoreError>;
    fn setting_set(&mut self, key: &str, value: &serde_json::Value) -> Result<(), StoreError>;
}

/// Creation timestamp stamped on new assignments.
pub(crate) fn now_stamp() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true)
}
