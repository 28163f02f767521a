use super::{now_stamp, AttendanceFilter, GradeFilter, RecordStore, StoreError, Upserted};
use crate::db;
use crate::model::{
    Assignment, AttendanceRecord, AttendanceStatus, Grade, Id, NewAssignment,
    NewAttendanceRecord, NewGrade, NewStudent, Student, StudentStatus,
};
use rusqlite::{Connection, OptionalExtension, Row};
use std::path::Path;

const STUDENT_COLS: &str =
    "id, first_name, last_name, email, grade_level, status, enrollment_date";
const ASSIGNMENT_COLS: &str =
    "id, title, description, category, total_points, due_date, created_at";
const GRADE_COLS: &str = "id, student_id, assignment_id, score, submitted_date, comments";
const ATTENDANCE_COLS: &str = "id, student_id, date, status, notes";

/// Store over a workspace's `classroom.sqlite3`.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    pub fn open(workspace: &Path) -> anyhow::Result<Self> {
        Ok(Self {
            conn: db::open_db(workspace)?,
        })
    }

    /// Wraps an already-open connection, creating the schema if needed.
    #[cfg(test)]
    pub fn from_connection(conn: Connection) -> anyhow::Result<Self> {
        db::init_schema(&conn)?;
        Ok(Self { conn })
    }
}

fn student_from_row(row: &Row<'_>) -> rusqlite::Result<Student> {
    let status: Option<String> = row.get(5)?;
    Ok(Student {
        id: row.get(0)?,
        first_name: row.get(1)?,
        last_name: row.get(2)?,
        email: row.get(3)?,
        grade_level: row.get(4)?,
        status: status
            .as_deref()
            .and_then(StudentStatus::parse)
            .unwrap_or_default(),
        enrollment_date: row.get(6)?,
    })
}

fn assignment_from_row(row: &Row<'_>) -> rusqlite::Result<Assignment> {
    Ok(Assignment {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        category: row.get(3)?,
        total_points: row.get(4)?,
        due_date: row.get(5)?,
        created_at: row.get(6)?,
    })
}

fn grade_from_row(row: &Row<'_>) -> rusqlite::Result<Grade> {
    Ok(Grade {
        id: row.get(0)?,
        student_id: row.get(1)?,
        assignment_id: row.get(2)?,
        score: row.get(3)?,
        submitted_date: row.get(4)?,
        comments: row.get(5)?,
    })
}

fn attendance_from_row(row: &Row<'_>) -> rusqlite::Result<AttendanceRecord> {
    let status: Option<String> = row.get(3)?;
    Ok(AttendanceRecord {
        id: row.get(0)?,
        student_id: row.get(1)?,
        date: row.get(2)?,
        status: status.as_deref().and_then(AttendanceStatus::parse),
        notes: row.get(4)?,
    })
}

fn exists(conn: &Connection, table: &str, id: Id) -> rusqlite::Result<bool> {
    let sql = format!("SELECT 1 FROM {} WHERE id = ?", table);
    Ok(conn
        .query_row(&sql, [id], |_| Ok(()))
        .optional()?
        .is_some())
}

fn require(conn: &Connection, table: &str, kind: &'static str, id: Id) -> Result<(), StoreError> {
    if exists(conn, table, id)? {
        Ok(())
    } else {
        Err(StoreError::NotFound { kind, id })
    }
}

fn fetch_one<T>(
    conn: &Connection,
    sql: &str,
    kind: &'static str,
    id: Id,
    map: fn(&Row<'_>) -> rusqlite::Result<T>,
) -> Result<T, StoreError> {
    conn.query_row(sql, [id], map)
        .optional()?
        .ok_or(StoreError::NotFound { kind, id })
}

fn fetch_grade(conn: &Connection, id: Id) -> Result<Grade, StoreError> {
    let sql = format!("SELECT {GRADE_COLS} FROM grades WHERE id = ?");
    fetch_one(conn, &sql, "grade", id, grade_from_row)
}

fn fetch_attendance(conn: &Connection, id: Id) -> Result<AttendanceRecord, StoreError> {
    let sql = format!("SELECT {ATTENDANCE_COLS} FROM attendance WHERE id = ?");
    fetch_one(conn, &sql, "attendance record", id, attendance_from_row)
}

fn check_grade_refs(conn: &Connection, new: &NewGrade) -> Result<(), StoreError> {
    require(conn, "students", "student", new.student_id)?;
    require(conn, "assignments", "assignment", new.assignment_id)
}

fn insert_grade(conn: &Connection, new: &NewGrade) -> rusqlite::Result<Id> {
    conn.execute(
        "INSERT INTO grades(student_id, assignment_id, score, submitted_date, comments)
         VALUES(?, ?, ?, ?, ?)",
        (
            new.student_id,
            new.assignment_id,
            new.score,
            &new.submitted_date,
            &new.comments,
        ),
    )?;
    Ok(conn.last_insert_rowid())
}

fn rewrite_grade(conn: &Connection, id: Id, new: &NewGrade) -> rusqlite::Result<usize> {
    conn.execute(
        "UPDATE grades
         SET student_id = ?, assignment_id = ?, score = ?, submitted_date = ?, comments = ?
         WHERE id = ?",
        (
            new.student_id,
            new.assignment_id,
            new.score,
            &new.submitted_date,
            &new.comments,
            id,
        ),
    )
}

fn deleted(changed: usize, kind: &'static str, id: Id) -> Result<(), StoreError> {
    if changed == 0 {
        Err(StoreError::NotFound { kind, id })
    } else {
        Ok(())
    }
}

impl RecordStore for SqliteStore {
    fn kind(&self) -> &'static str {
        "sqlite"
    }

    fn list_students(&self) -> Result<Vec<Student>, StoreError> {
        let sql = format!("SELECT {STUDENT_COLS} FROM students ORDER BY id");
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map([], student_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn get_student(&self, id: Id) -> Result<Student, StoreError> {
        let sql = format!("SELECT {STUDENT_COLS} FROM students WHERE id = ?");
        fetch_one(&self.conn, &sql, "student", id, student_from_row)
    }

    fn create_student(&mut self, new: NewStudent) -> Result<Student, StoreError> {
        new.validate().map_err(StoreError::Invalid)?;
        let s = new.into_student(0);
        self.conn.execute(
            "INSERT INTO students(first_name, last_name, email, grade_level, status, enrollment_date)
             VALUES(?, ?, ?, ?, ?, ?)",
            (
                &s.first_name,
                &s.last_name,
                &s.email,
                s.grade_level,
                s.status.as_str(),
                &s.enrollment_date,
            ),
        )?;
        Ok(Student {
            id: self.conn.last_insert_rowid(),
            ..s
        })
    }

    fn update_student(&mut self, id: Id, new: NewStudent) -> Result<Student, StoreError> {
        new.validate().map_err(StoreError::Invalid)?;
        let s = new.into_student(id);
        let changed = self.conn.execute(
            "UPDATE students
             SET first_name = ?, last_name = ?, email = ?, grade_level = ?, status = ?, enrollment_date = ?
             WHERE id = ?",
            (
                &s.first_name,
                &s.last_name,
                &s.email,
                s.grade_level,
                s.status.as_str(),
                &s.enrollment_date,
                id,
            ),
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound { kind: "student", id });
        }
        Ok(s)
    }

    fn delete_student(&mut self, id: Id) -> Result<(), StoreError> {
        let changed = self.conn.execute("DELETE FROM students WHERE id = ?", [id])?;
        deleted(changed, "student", id)
    }

    fn list_assignments(&self) -> Result<Vec<Assignment>, StoreError> {
        let sql = format!("SELECT {ASSIGNMENT_COLS} FROM assignments ORDER BY id");
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map([], assignment_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn get_assignment(&self, id: Id) -> Result<Assignment, StoreError> {
        let sql = format!("SELECT {ASSIGNMENT_COLS} FROM assignments WHERE id = ?");
        fetch_one(&self.conn, &sql, "assignment", id, assignment_from_row)
    }

    fn create_assignment(&mut self, new: NewAssignment) -> Result<Assignment, StoreError> {
        new.validate().map_err(StoreError::Invalid)?;
        let a = new.into_assignment(0, Some(now_stamp()));
        self.conn.execute(
            "INSERT INTO assignments(title, description, category, total_points, due_date, created_at)
             VALUES(?, ?, ?, ?, ?, ?)",
            (
                &a.title,
                &a.description,
                &a.category,
                a.total_points,
                &a.due_date,
                &a.created_at,
            ),
        )?;
        Ok(Assignment {
            id: self.conn.last_insert_rowid(),
            ..a
        })
    }

    fn update_assignment(&mut self, id: Id, new: NewAssignment) -> Result<Assignment, StoreError> {
        new.validate().map_err(StoreError::Invalid)?;
        let created_at = self.get_assignment(id)?.created_at;
        let a = new.into_assignment(id, created_at);
        self.conn.execute(
            "UPDATE assignments
             SET title = ?, description = ?, category = ?, total_points = ?, due_date = ?
             WHERE id = ?",
            (
                &a.title,
                &a.description,
                &a.category,
                a.total_points,
                &a.due_date,
                id,
            ),
        )?;
        Ok(a)
    }

    fn delete_assignment(&mut self, id: Id) -> Result<(), StoreError> {
        let changed = self
            .conn
            .execute("DELETE FROM assignments WHERE id = ?", [id])?;
        deleted(changed, "assignment", id)
    }

    fn list_grades(&self, filter: GradeFilter) -> Result<Vec<Grade>, StoreError> {
        let sql = format!(
            "SELECT {GRADE_COLS} FROM grades
             WHERE (?1 IS NULL OR student_id = ?1) AND (?2 IS NULL OR assignment_id = ?2)
             ORDER BY id"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map((filter.student_id, filter.assignment_id), grade_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn get_grade(&self, id: Id) -> Result<Grade, StoreError> {
        fetch_grade(&self.conn, id)
    }

    fn create_grade(&mut self, new: NewGrade) -> Result<Grade, StoreError> {
        new.validate().map_err(StoreError::Invalid)?;
        check_grade_refs(&self.conn, &new)?;
        let id = insert_grade(&self.conn, &new)?;
        Ok(new.into_grade(id))
    }

    fn update_grade(&mut self, id: Id, new: NewGrade) -> Result<Grade, StoreError> {
        new.validate().map_err(StoreError::Invalid)?;
        check_grade_refs(&self.conn, &new)?;
        if rewrite_grade(&self.conn, id, &new)? == 0 {
            return Err(StoreError::NotFound { kind: "grade", id });
        }
        Ok(new.into_grade(id))
    }

    fn delete_grade(&mut self, id: Id) -> Result<(), StoreError> {
        let changed = self.conn.execute("DELETE FROM grades WHERE id = ?", [id])?;
        deleted(changed, "grade", id)
    }

    fn upsert_grade(&mut self, new: NewGrade) -> Result<Upserted<Grade>, StoreError> {
        new.validate().map_err(StoreError::Invalid)?;
        let tx = self.conn.transaction()?;
        check_grade_refs(&tx, &new)?;
        let existing: Option<Id> = tx
            .query_row(
                "SELECT id FROM grades WHERE student_id = ? AND assignment_id = ?
                 ORDER BY id LIMIT 1",
                (new.student_id, new.assignment_id),
                |row| row.get(0),
            )
            .optional()?;
        let (id, created) = match existing {
            Some(id) => {
                rewrite_grade(&tx, id, &new)?;
                (id, false)
            }
            None => (insert_grade(&tx, &new)?, true),
        };
        tx.commit()?;
        Ok(Upserted {
            record: new.into_grade(id),
            created,
        })
    }

    fn list_attendance(&self, filter: AttendanceFilter) -> Result<Vec<AttendanceRecord>, StoreError> {
        let sql = format!(
            "SELECT {ATTENDANCE_COLS} FROM attendance
             WHERE (?1 IS NULL OR student_id = ?1) AND (?2 IS NULL OR date = ?2)
             ORDER BY id"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map((filter.student_id, filter.date), attendance_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn mark_attendance(&mut self, new: NewAttendanceRecord) -> Result<Upserted<AttendanceRecord>, StoreError> {
        new.validate().map_err(StoreError::Invalid)?;
        let tx = self.conn.transaction()?;
        require(&tx, "students", "student", new.student_id)?;
        let status = new.status.map(AttendanceStatus::as_str);
        let existing: Option<Id> = tx
            .query_row(
                "SELECT id FROM attendance WHERE student_id = ? AND date = ? ORDER BY id LIMIT 1",
                (new.student_id, new.date),
                |row| row.get(0),
            )
            .optional()?;
        let (id, created) = match existing {
            Some(id) => {
                tx.execute(
                    "UPDATE attendance SET status = ?, notes = ? WHERE id = ?",
                    (status, &new.notes, id),
                )?;
                (id, false)
            }
            None => {
                tx.execute(
                    "INSERT INTO attendance(student_id, date, status, notes) VALUES(?, ?, ?, ?)",
                    (new.student_id, new.date, status, &new.notes),
                )?;
                (tx.last_insert_rowid(), true)
            }
        };
        tx.commit()?;
        Ok(Upserted {
            record: fetch_attendance(&self.conn, id)?,
            created,
        })
    }

    fn delete_attendance(&mut self, id: Id) -> Result<(), StoreError> {
        let changed = self
            .conn
            .execute("DELETE FROM attendance WHERE id = ?", [id])?;
        deleted(changed, "attendance record", id)
    }

    fn setting_get(&self, key: &str) -> Result<Option<serde_json::Value>, StoreError> {
        db::settings_get_json(&self.conn, key)
    }

    fn setting_set(&mut self, key: &str, value: &serde_json::Value) -> Result<(), StoreError> {
        db::settings_set_json(&self.conn, key, value)
    }
}
