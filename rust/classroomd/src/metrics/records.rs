//! Client-side ordering and search over record collections.
//!
//! Sort keys are closed enums per record type. Keys derived from other
//! collections (a student's grade average or attendance rate) are computed
//! once up front by the ordering object, not per comparison.

use crate::dates;
use crate::metrics::{attendance, grades};
use crate::model::{Assignment, AttendanceRecord, Grade, Id, Student};
use serde::Serialize;
use std::borrow::Cow;
use std::cmp::Ordering;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn parse(s: &str) -> Option<Self> {
        if s.eq_ignore_ascii_case("asc") {
            Some(Self::Asc)
        } else if s.eq_ignore_ascii_case("desc") {
            Some(Self::Desc)
        } else {
            None
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        }
    }
}

/// A typed comparator for one record type.
pub trait RecordOrdering<R> {
    fn compare(&self, a: &R, b: &R) -> Ordering;
}

/// Returns a new, stably sorted copy. `Desc` reverses the comparator, so
/// records with equal keys keep their input order in either direction.
pub fn sort_records<R, O>(records: &[R], ordering: &O, direction: SortDirection) -> Vec<R>
where
    R: Clone,
    O: RecordOrdering<R>,
{
    let mut out = records.to_vec();
    out.sort_by(|a, b| {
        let ord = ordering.compare(a, b);
        match direction {
            SortDirection::Asc => ord,
            SortDirection::Desc => ord.reverse(),
        }
    });
    out
}

fn cmp_f64(a: f64, b: f64) -> Ordering {
    a.partial_cmp(&b).unwrap_or(Ordering::Equal)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StudentSortKey {
    FirstName,
    LastName,
    /// "first last", case-folded.
    Name,
    Email,
    GradeLevel,
    Status,
    EnrollmentDate,
    GradeAverage,
    Attendance,
}

impl StudentSortKey {
    pub const ALL: &'static [&'static str] = &[
        "firstName",
        "lastName",
        "name",
        "email",
        "gradeLevel",
        "status",
        "enrollmentDate",
        "gradeAverage",
        "attendance",
    ];

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "firstName" => Some(Self::FirstName),
            "lastName" => Some(Self::LastName),
            "name" => Some(Self::Name),
            "email" => Some(Self::Email),
            "gradeLevel" => Some(Self::GradeLevel),
            "status" => Some(Self::Status),
            "enrollmentDate" => Some(Self::EnrollmentDate),
            "gradeAverage" => Some(Self::GradeAverage),
            "attendance" => Some(Self::Attendance),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            StudentSortKey::FirstName => "firstName",
            StudentSortKey::LastName => "lastName",
            StudentSortKey::Name => "name",
            StudentSortKey::Email => "email",
            StudentSortKey::GradeLevel => "gradeLevel",
            StudentSortKey::Status => "status",
            StudentSortKey::EnrollmentDate => "enrollmentDate",
            StudentSortKey::GradeAverage => "gradeAverage",
            StudentSortKey::Attendance => "attendance",
        }
    }
}

pub struct StudentOrdering {
    key: StudentSortKey,
    derived: HashMap<Id, f64>,
    folded_names: HashMap<Id, String>,
}

fn fold_name(s: &Student) -> String {
    s.full_name().to_lowercase()
}

impl StudentOrdering {
    /// Plain field keys need no auxiliary data.
    #[cfg(test)]
    pub fn by(key: StudentSortKey) -> Self {
        Self::with_context(key, &[], &[], &[])
    }

    /// `grades` and `attendance` feed the derived keys; students with no rows
    /// rank as 0. Folded full names for `Name` are taken from `roster` once.
    pub fn with_context(
        key: StudentSortKey,
        roster: &[Student],
        grades: &[Grade],
        attendance: &[AttendanceRecord],
    ) -> Self {
        let derived = match key {
            StudentSortKey::GradeAverage => {
                let mut by_student: HashMap<Id, Vec<&Grade>> = HashMap::new();
                for g in grades {
                    by_student.entry(g.student_id).or_default().push(g);
                }
                by_student
                    .into_iter()
                    .map(|(id, rows)| (id, grades::mean_score(rows).unwrap_or(0.0)))
                    .collect()
            }
            StudentSortKey::Attendance => {
                let mut by_student: HashMap<Id, Vec<&AttendanceRecord>> = HashMap::new();
                for r in attendance {
                    by_student.entry(r.student_id).or_default().push(r);
                }
                by_student
                    .into_iter()
                    .map(|(id, rows)| (id, attendance::present_rate(rows).unwrap_or(0.0)))
                    .collect()
            }
            _ => HashMap::new(),
        };
        let folded_names = match key {
            StudentSortKey::Name => roster.iter().map(|s| (s.id, fold_name(s))).collect(),
            _ => HashMap::new(),
        };
        Self {
            key,
            derived,
            folded_names,
        }
    }

    fn derived(&self, id: Id) -> f64 {
        self.derived.get(&id).copied().unwrap_or(0.0)
    }

    fn folded_name<'a>(&'a self, s: &Student) -> Cow<'a, str> {
        match self.folded_names.get(&s.id) {
            Some(name) => Cow::Borrowed(name.as_str()),
            None => Cow::Owned(fold_name(s)),
        }
    }
}

impl RecordOrdering<Student> for StudentOrdering {
    fn compare(&self, a: &Student, b: &Student) -> Ordering {
        match self.key {
            StudentSortKey::FirstName => a.first_name.cmp(&b.first_name),
            StudentSortKey::LastName => a.last_name.cmp(&b.last_name),
            StudentSortKey::Name => self.folded_name(a).cmp(&self.folded_name(b)),
            StudentSortKey::Email => a.email.cmp(&b.email),
            StudentSortKey::GradeLevel => a.grade_level.cmp(&b.grade_level),
            StudentSortKey::Status => a.status.as_str().cmp(b.status.as_str()),
            StudentSortKey::EnrollmentDate => {
                dates::parse_lenient(a.enrollment_date.as_deref())
                    .cmp(&dates::parse_lenient(b.enrollment_date.as_deref()))
            }
            StudentSortKey::GradeAverage | StudentSortKey::Attendance => {
                cmp_f64(self.derived(a.id), self.derived(b.id))
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignmentSortKey {
    Title,
    Category,
    DueDate,
    TotalPoints,
    CreatedAt,
}

impl AssignmentSortKey {
    pub const ALL: &'static [&'static str] =
        &["title", "category", "dueDate", "totalPoints", "createdAt"];

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "title" => Some(Self::Title),
            "category" => Some(Self::Category),
            "dueDate" => Some(Self::DueDate),
            "totalPoints" => Some(Self::TotalPoints),
            "createdAt" => Some(Self::CreatedAt),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AssignmentSortKey::Title => "title",
            AssignmentSortKey::Category => "category",
            AssignmentSortKey::DueDate => "dueDate",
            AssignmentSortKey::TotalPoints => "totalPoints",
            AssignmentSortKey::CreatedAt => "createdAt",
        }
    }
}

impl RecordOrdering<Assignment> for AssignmentSortKey {
    fn compare(&self, a: &Assignment, b: &Assignment) -> Ordering {
        match self {
            AssignmentSortKey::Title => a.title.cmp(&b.title),
            AssignmentSortKey::Category => a.category.cmp(&b.category),
            AssignmentSortKey::DueDate => dates::parse_lenient(a.due_date.as_deref())
                .cmp(&dates::parse_lenient(b.due_date.as_deref())),
            AssignmentSortKey::TotalPoints => cmp_f64(a.total_points, b.total_points),
            AssignmentSortKey::CreatedAt => dates::parse_lenient(a.created_at.as_deref())
                .cmp(&dates::parse_lenient(b.created_at.as_deref())),
        }
    }
}

/// Orders grades by submission date; undated grades count as the oldest.
pub struct BySubmittedDate;

impl RecordOrdering<Grade> for BySubmittedDate {
    fn compare(&self, a: &Grade, b: &Grade) -> Ordering {
        dates::parse_lenient(a.submitted_date.as_deref())
            .cmp(&dates::parse_lenient(b.submitted_date.as_deref()))
    }
}

/// Newest submissions first.
pub fn recent_grades(grades: &[Grade], limit: usize) -> Vec<Grade> {
    let mut out = sort_records(grades, &BySubmittedDate, SortDirection::Desc);
    out.truncate(limit);
    out
}

/// A searchable field of `R`, rendered as text.
pub trait SearchField<R> {
    fn text(&self, record: &R) -> String;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StudentField {
    FirstName,
    LastName,
    Email,
    GradeLevel,
    Status,
}

impl StudentField {
    /// The fields the roster search box covers.
    pub const ROSTER: [StudentField; 4] = [
        StudentField::FirstName,
        StudentField::LastName,
        StudentField::Email,
        StudentField::GradeLevel,
    ];
}

impl SearchField<Student> for StudentField {
    fn text(&self, s: &Student) -> String {
        match self {
            StudentField::FirstName => s.first_name.clone(),
            StudentField::LastName => s.last_name.clone(),
            StudentField::Email => s.email.clone(),
            StudentField::GradeLevel => s.grade_level.to_string(),
            StudentField::Status => s.status.as_str().to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignmentField {
    Title,
    Description,
    Category,
}

impl AssignmentField {
    pub const ALL: [AssignmentField; 3] = [
        AssignmentField::Title,
        AssignmentField::Description,
        AssignmentField::Category,
    ];
}

impl SearchField<Assignment> for AssignmentField {
    fn text(&self, a: &Assignment) -> String {
        match self {
            AssignmentField::Title => a.title.clone(),
            AssignmentField::Description => a.description.clone(),
            AssignmentField::Category => a.category.clone(),
        }
    }
}

/// Case-insensitive substring match against any of `fields`. A blank query
/// keeps every record.
pub fn search_records<R, F>(records: &[R], query: &str, fields: &[F]) -> Vec<R>
where
    R: Clone,
    F: SearchField<R>,
{
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return records.to_vec();
    }
    records
        .iter()
        .filter(|r| {
            fields
                .iter()
                .any(|f| f.text(r).to_lowercase().contains(&needle))
        })
        .cloned()
        .collect()
}
