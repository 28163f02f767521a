use crate::ipc::handlers::setup;
use crate::ipc::helpers::{optional_str, payload, required_id, respond, store_mut, store_ref, HandlerErr};
use crate::ipc::types::{AppState, Request};
use crate::metrics::attendance::attendance_percentage;
use crate::metrics::grades::{badge_class, letter_grade, mean_score, round_off_1_decimal};
use crate::metrics::records::{
    search_records, sort_records, SortDirection, StudentField, StudentOrdering, StudentSortKey,
};
use crate::model::{AttendanceRecord, Grade, NewStudent, Student, StudentStatus};
use crate::store::{AttendanceFilter, GradeFilter, RecordStore};
use serde_json::{json, Value};

fn student_row(s: &Student, grades: &[Grade], attendance: &[AttendanceRecord]) -> Value {
    let average = mean_score(grades.iter().filter(|g| g.student_id == s.id));
    let letter = average.map(letter_grade);
    let rate = attendance_percentage(attendance.iter().filter(|r| r.student_id == s.id));

    let mut row = json!(s);
    row["fullName"] = json!(s.full_name());
    row["gradeAverage"] = json!(average.map(round_off_1_decimal));
    row["letterGrade"] = json!(letter.map(|l| l.as_str()));
    row["badgeClass"] = json!(badge_class(letter));
    row["attendanceRate"] = json!(rate);
    row
}

fn students_list(store: &dyn RecordStore, params: &Value) -> Result<Value, HandlerErr> {
    let defaults =
        setup::students_defaults(store).map_err(|e| HandlerErr::store(e, "db_query_failed"))?;
    let query = params.get("query").unwrap_or(&Value::Null);

    let sort_raw = optional_str(query, "sortBy")?
        .or_else(|| defaults["defaultSortBy"].as_str())
        .unwrap_or("name");
    let Some(sort_by) = StudentSortKey::parse(sort_raw) else {
        return Err(HandlerErr {
            code: "bad_params",
            message: format!("unknown sortBy: {}", sort_raw),
            details: Some(json!({ "allowed": StudentSortKey::ALL })),
        });
    };
    let dir_raw = optional_str(query, "sortDir")?
        .or_else(|| defaults["defaultSortDir"].as_str())
        .unwrap_or("asc");
    let sort_dir = SortDirection::parse(dir_raw)
        .ok_or_else(|| HandlerErr::bad_params("sortDir must be asc or desc"))?;
    let search = optional_str(query, "search")?.unwrap_or("");
    let show_inactive = defaults["showInactive"].as_bool().unwrap_or(true);

    let students = store
        .list_students()
        .map_err(|e| HandlerErr::store(e, "db_query_failed"))?;
    let grades = store
        .list_grades(GradeFilter::default())
        .map_err(|e| HandlerErr::store(e, "db_query_failed"))?;
    let attendance = store
        .list_attendance(AttendanceFilter::default())
        .map_err(|e| HandlerErr::store(e, "db_query_failed"))?;

    let visible: Vec<Student> = students
        .into_iter()
        .filter(|s| show_inactive || s.status == StudentStatus::Active)
        .collect();
    let matched = search_records(&visible, search, &StudentField::ROSTER);
    let ordering = StudentOrdering::with_context(sort_by, &matched, &grades, &attendance);
    let sorted = sort_records(&matched, &ordering, sort_dir);

    let rows: Vec<Value> = sorted
        .iter()
        .map(|s| student_row(s, &grades, &attendance))
        .collect();
    Ok(json!({
        "students": rows,
        "sortBy": sort_by.as_str(),
        "sortDir": sort_dir.as_str()
    }))
}

fn students_get(store: &dyn RecordStore, params: &Value) -> Result<Value, HandlerErr> {
    let id = required_id(params, "studentId")?;
    let student = store
        .get_student(id)
        .map_err(|e| HandlerErr::store(e, "db_query_failed"))?;
    let grades = store
        .list_grades(GradeFilter {
            student_id: Some(id),
            assignment_id: None,
        })
        .map_err(|e| HandlerErr::store(e, "db_query_failed"))?;
    let attendance = store
        .list_attendance(AttendanceFilter {
            student_id: Some(id),
            date: None,
        })
        .map_err(|e| HandlerErr::store(e, "db_query_failed"))?;
    Ok(json!({ "student": student_row(&student, &grades, &attendance) }))
}

fn students_create(store: &mut dyn RecordStore, params: &Value) -> Result<Value, HandlerErr> {
    let new: NewStudent = payload(params, "student")?;
    let student = store
        .create_student(new)
        .map_err(|e| HandlerErr::store(e, "db_insert_failed"))?;
    tracing::debug!(student_id = student.id, "student created");
    Ok(json!({ "student": student }))
}

fn students_update(store: &mut dyn RecordStore, params: &Value) -> Result<Value, HandlerErr> {
    let id = required_id(params, "studentId")?;
    let new: NewStudent = payload(params, "student")?;
    let student = store
        .update_student(id, new)
        .map_err(|e| HandlerErr::store(e, "db_update_failed"))?;
    Ok(json!({ "student": student }))
}

fn students_delete(store: &mut dyn RecordStore, params: &Value) -> Result<Value, HandlerErr> {
    let id = required_id(params, "studentId")?;
    store
        .delete_student(id)
        .map_err(|e| HandlerErr::store(e, "db_delete_failed"))?;
    tracing::debug!(student_id = id, "student deleted");
    Ok(json!({ "ok": true }))
}

fn handle_students_list(state: &mut AppState, req: &Request) -> Value {
    respond(&req.id, store_ref(state).and_then(|s| students_list(s, &req.params)))
}

fn handle_students_get(state: &mut AppState, req: &Request) -> Value {
    respond(&req.id, store_ref(state).and_then(|s| students_get(s, &req.params)))
}

fn handle_students_create(state: &mut AppState, req: &Request) -> Value {
    respond(&req.id, store_mut(state).and_then(|s| students_create(s, &req.params)))
}

fn handle_students_update(state: &mut AppState, req: &Request) -> Value {
    respond(&req.id, store_mut(state).and_then(|s| students_update(s, &req.params)))
}

fn handle_students_delete(state: &mut AppState, req: &Request) -> Value {
    respond(&req.id, store_mut(state).and_then(|s| students_delete(s, &req.params)))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "students.list" => Some(handle_students_list(state, req)),
        "students.get" => Some(handle_students_get(state, req)),
        "students.create" => Some(handle_students_create(state, req)),
        "students.update" => Some(handle_students_update(state, req)),
        "students.delete" => Some(handle_students_delete(state, req)),
        _ => None,
    }
}
