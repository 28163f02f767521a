use super::{
    now_stamp, AttendanceFilter, GradeFilter, RecordStore, StoreError, Upserted,
};
use crate::model::{
    Assignment, AttendanceRecord, Grade, Id, NewAssignment, NewAttendanceRecord, NewGrade,
    NewStudent, Student,
};
use std::collections::HashMap;

trait Keyed {
    fn id(&self) -> Id;
}

impl Keyed for Student {
    fn id(&self) -> Id {
        self.id
    }
}

impl Keyed for Assignment {
    fn id(&self) -> Id {
        self.id
    }
}

impl Keyed for Grade {
    fn id(&self) -> Id {
        self.id
    }
}

impl Keyed for AttendanceRecord {
    fn id(&self) -> Id {
        self.id
    }
}

/// Rows plus a never-reused id counter.
#[derive(Debug, Clone)]
struct Table<T> {
    kind: &'static str,
    rows: Vec<T>,
    next_id: Id,
}

impl<T: Keyed + Clone> Table<T> {
    fn new(kind: &'static str) -> Self {
        Self {
            kind,
            rows: Vec::new(),
            next_id: 1,
        }
    }

    #[cfg(test)]
    fn seeded(kind: &'static str, rows: Vec<T>) -> Self {
        let next_id = rows.iter().map(Keyed::id).max().unwrap_or(0) + 1;
        Self { kind, rows, next_id }
    }

    fn allocate(&mut self) -> Id {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn position(&self, id: Id) -> Result<usize, StoreError> {
        self.rows
            .iter()
            .position(|r| r.id() == id)
            .ok_or(StoreError::NotFound { kind: self.kind, id })
    }

    fn get(&self, id: Id) -> Result<T, StoreError> {
        let idx = self.position(id)?;
        Ok(self.rows[idx].clone())
    }

    fn replace(&mut self, row: T) -> Result<T, StoreError> {
        let idx = self.position(row.id())?;
        self.rows[idx] = row.clone();
        Ok(row)
    }

    fn remove(&mut self, id: Id) -> Result<(), StoreError> {
        let idx = self.position(id)?;
        self.rows.remove(idx);
        Ok(())
    }

    fn contains(&self, id: Id) -> bool {
        self.rows.iter().any(|r| r.id() == id)
    }
}

/// Store backed by plain vectors. Construct it empty or seeded, mutate it
/// through the trait, and drop it when done; nothing is shared or persisted.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    students: Table<Student>,
    assignments: Table<Assignment>,
    grades: Table<Grade>,
    attendance: Table<AttendanceRecord>,
    settings: HashMap<String, serde_json::Value>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            students: Table::new("student"),
            assignments: Table::new("assignment"),
            grades: Table::new("grade"),
            attendance: Table::new("attendance record"),
            settings: HashMap::new(),
        }
    }

    /// Starts from existing rows; new ids continue after the highest seeded id.
    #[cfg(test)]
    pub fn seeded(
        students: Vec<Student>,
        assignments: Vec<Assignment>,
        grades: Vec<Grade>,
        attendance: Vec<AttendanceRecord>,
    ) -> Self {
        Self {
            students: Table::seeded("student", students),
            assignments: Table::seeded("assignment", assignments),
            grades: Table::seeded("grade", grades),
            attendance: Table::seeded("attendance record", attendance),
            settings: HashMap::new(),
        }
    }

    fn check_grade_refs(&self, new: &NewGrade) -> Result<(), StoreError> {
        if !self.students.contains(new.student_id) {
            return Err(StoreError::NotFound {
                kind: "student",
                id: new.student_id,
            });
        }
        if !self.assignments.contains(new.assignment_id) {
            return Err(StoreError::NotFound {
                kind: "assignment",
                id: new.assignment_id,
            });
        }
        Ok(())
    }
}

impl RecordStore for MemoryStore {
    fn kind(&self) -> &'static str {
        "memory"
    }

    fn list_students(&self) -> Result<Vec<Student>, StoreError> {
        Ok(self.students.rows.clone())
    }

    fn get_student(&self, id: Id) -> Result<Student, StoreError> {
        self.students.get(id)
    }

    fn create_student(&mut self, new: NewStudent) -> Result<Student, StoreError> {
        new.validate().map_err(StoreError::Invalid)?;
        let student = new.into_student(self.students.allocate());
        self.students.rows.push(student.clone());
        Ok(student)
    }

    fn update_student(&mut self, id: Id, new: NewStudent) -> Result<Student, StoreError> {
        new.validate().map_err(StoreError::Invalid)?;
        self.students.replace(new.into_student(id))
    }

    fn delete_student(&mut self, id: Id) -> Result<(), StoreError> {
        self.students.remove(id)?;
        self.grades.rows.retain(|g| g.student_id != id);
        self.attendance.rows.retain(|r| r.student_id != id);
        Ok(())
    }

    fn list_assignments(&self) -> Result<Vec<Assignment>, StoreError> {
        Ok(self.assignments.rows.clone())
    }

    fn get_assignment(&self, id: Id) -> Result<Assignment, StoreError> {
        self.assignments.get(id)
    }

    fn create_assignment(&mut self, new: NewAssignment) -> Result<Assignment, StoreError> {
        new.validate().map_err(StoreError::Invalid)?;
        let assignment = new.into_assignment(self.assignments.allocate(), Some(now_stamp()));
        self.assignments.rows.push(assignment.clone());
        Ok(assignment)
    }

    fn update_assignment(&mut self, id: Id, new: NewAssignment) -> Result<Assignment, StoreError> {
        new.validate().map_err(StoreError::Invalid)?;
        let created_at = self.assignments.get(id)?.created_at;
        self.assignments.replace(new.into_assignment(id, created_at))
    }

    fn delete_assignment(&mut self, id: Id) -> Result<(), StoreError> {
        self.assignments.remove(id)?;
        self.grades.rows.retain(|g| g.assignment_id != id);
        Ok(())
    }

    fn list_grades(&self, filter: GradeFilter) -> Result<Vec<Grade>, StoreError> {
        Ok(self
            .grades
            .rows
            .iter()
            .filter(|g| filter.matches(g))
            .cloned()
            .collect())
    }

    fn get_grade(&self, id: Id) -> Result<Grade, StoreError> {
        self.grades.get(id)
    }

    fn create_grade(&mut self, new: NewGrade) -> Result<Grade, StoreError> {
        new.validate().map_err(StoreError::Invalid)?;
        self.check_grade_refs(&new)?;
        let grade = new.into_grade(self.grades.allocate());
        self.grades.rows.push(grade.clone());
        Ok(grade)
    }

    fn update_grade(&mut self, id: Id, new: NewGrade) -> Result<Grade, StoreError> {
        new.validate().map_err(StoreError::Invalid)?;
        self.check_grade_refs(&new)?;
        self.grades.replace(new.into_grade(id))
    }

    fn delete_grade(&mut self, id: Id) -> Result<(), StoreError> {
        self.grades.remove(id)
    }

    fn upsert_grade(&mut self, new: NewGrade) -> Result<Upserted<Grade>, StoreError> {
        let existing = self
            .grades
            .rows
            .iter()
            .find(|g| g.student_id == new.student_id && g.assignment_id == new.assignment_id)
            .map(|g| g.id);
        match existing {
            Some(id) => Ok(Upserted {
                record: self.update_grade(id, new)?,
                created: false,
            }),
            None => Ok(Upserted {
                record: self.create_grade(new)?,
                created: true,
            }),
        }
    }

    fn list_attendance(&self, filter: AttendanceFilter) -> Result<Vec<AttendanceRecord>, StoreError> {
        Ok(self
            .attendance
            .rows
            .iter()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect())
    }

    fn mark_attendance(&mut self, new: NewAttendanceRecord) -> Result<Upserted<AttendanceRecord>, StoreError> {
        new.validate().map_err(StoreError::Invalid)?;
        if !self.students.contains(new.student_id) {
            return Err(StoreError::NotFound {
                kind: "student",
                id: new.student_id,
            });
        }
        let existing = self
            .attendance
            .rows
            .iter()
            .find(|r| r.student_id == new.student_id && r.date == new.date)
            .map(|r| r.id);
        match existing {
            Some(id) => Ok(Upserted {
                record: self.attendance.replace(new.into_record(id))?,
                created: false,
            }),
            None => {
                let record = new.into_record(self.attendance.allocate());
                self.attendance.rows.push(record.clone());
                Ok(Upserted {
                    record,
                    created: true,
                })
            }
        }
    }

    fn delete_attendance(&mut self, id: Id) -> Result<(), StoreError> {
        self.attendance.remove(id)
    }

    fn setting_get(&self, key: &str) -> Result<Option<serde_json::Value>, StoreError> {
        Ok(self.settings.get(key).cloned())
    }

    fn setting_set(&mut self, key: &str, value: &serde_json::Value) -> Result<(), StoreError> {
        self.settings.insert(key.to_string(), value.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AttendanceStatus, StudentStatus};
    use chrono::NaiveDate;

    fn new_student(first: &str) -> NewStudent {
        NewStudent {
            first_name: first.to_string(),
            last_name: "Tester".to_string(),
            email: format!("{}@school.test", first.to_lowercase()),
            grade_level: 8,
            status: StudentStatus::Active,
            enrollment_date: Some("2023-09-01".to_string()),
        }
    }

    fn new_assignment(title: &str) -> NewAssignment {
        NewAssignment {
            title: title.to_string(),
            description: String::new(),
            category: "Quiz".to_string(),
            total_points: 100.0,
            due_date: None,
        }
    }

    fn new_grade(student_id: Id, assignment_id: Id, score: f64) -> NewGrade {
        NewGrade {
            student_id,
            assignment_id,
            score,
            submitted_date: Some("2024-03-04".to_string()),
            comments: String::new(),
        }
    }

    #[test]
    fn ids_are_positive_and_never_reused() {
        let mut store = MemoryStore::new();
        let a = store.create_student(new_student("Ann")).expect("create");
        let b = store.create_student(new_student("Ben")).expect("create");
        assert_eq!((a.id, b.id), (1, 2));
        store.delete_student(b.id).expect("delete");
        let c = store.create_student(new_student("Cal")).expect("create");
        assert_eq!(c.id, 3);
        assert!(matches!(
            store.get_student(b.id),
            Err(StoreError::NotFound { kind: "student", id: 2 })
        ));
    }

    #[test]
    fn upsert_grade_keeps_one_row_per_pair() {
        let mut store = MemoryStore::new();
        let s = store.create_student(new_student("Ann")).expect("student");
        let a = store.create_assignment(new_assignment("Quiz 1")).expect("assignment");
        assert!(a.created_at.is_some());

        let first = store.upsert_grade(new_grade(s.id, a.id, 70.0)).expect("upsert");
        assert!(first.created);
        let second = store.upsert_grade(new_grade(s.id, a.id, 88.0)).expect("upsert");
        assert!(!second.created);
        assert_eq!(second.record.id, first.record.id);

        let rows = store.list_grades(GradeFilter::default()).expect("list");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].score, 88.0);
    }

    #[test]
    fn grade_writes_check_references_and_ranges() {
        let mut store = MemoryStore::new();
        let s = store.create_student(new_student("Ann")).expect("student");
        assert!(matches!(
            store.create_grade(new_grade(s.id, 42, 80.0)),
            Err(StoreError::NotFound { kind: "assignment", id: 42 })
        ));
        let a = store.create_assignment(new_assignment("Quiz")).expect("assignment");
        assert!(matches!(
            store.create_grade(new_grade(s.id, a.id, 101.0)),
            Err(StoreError::Invalid(_))
        ));
    }

    #[test]
    fn mark_attendance_upserts_by_student_and_day() {
        let mut store = MemoryStore::new();
        let s = store.create_student(new_student("Ann")).expect("student");
        let day = NaiveDate::from_ymd_opt(2024, 3, 4).expect("date");
        let mark = |status| NewAttendanceRecord {
            student_id: s.id,
            date: day,
            status: Some(status),
            notes: String::new(),
        };
        assert!(store.mark_attendance(mark(AttendanceStatus::Absent)).expect("mark").created);
        let again = store.mark_attendance(mark(AttendanceStatus::Late)).expect("mark");
        assert!(!again.created);
        let rows = store
            .list_attendance(AttendanceFilter {
                student_id: Some(s.id),
                date: Some(day),
            })
            .expect("list");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].status, Some(AttendanceStatus::Late));
    }

    #[test]
    fn deleting_a_student_cascades() {
        let mut store = MemoryStore::new();
        let s = store.create_student(new_student("Ann")).expect("student");
        let a = store.create_assignment(new_assignment("Quiz")).expect("assignment");
        store.create_grade(new_grade(s.id, a.id, 90.0)).expect("grade");
        store
            .mark_attendance(NewAttendanceRecord {
                student_id: s.id,
                date: NaiveDate::from_ymd_opt(2024, 3, 4).expect("date"),
                status: Some(AttendanceStatus::Present),
                notes: String::new(),
            })
            .expect("mark");
        store.delete_student(s.id).expect("delete");
        assert!(store.list_grades(GradeFilter::default()).expect("grades").is_empty());
        assert!(store
            .list_attendance(AttendanceFilter::default())
            .expect("attendance")
            .is_empty());
    }

    #[test]
    fn seeded_store_continues_ids() {
        let seeded = MemoryStore::seeded(
            vec![new_student("Ann").into_student(7)],
            Vec::new(),
            Vec::new(),
            Vec::new(),
        );
        let mut store = seeded;
        let next = store.create_student(new_student("Ben")).expect("create");
        assert_eq!(next.id, 8);
        store
            .setting_set("setup.dashboard", &serde_json::json!({ "recentActivityLimit": 3 }))
            .expect("set");
        assert_eq!(
            store.setting_get("setup.dashboard").expect("get"),
            Some(serde_json::json!({ "recentActivityLimit": 3 }))
        );
    }
}
