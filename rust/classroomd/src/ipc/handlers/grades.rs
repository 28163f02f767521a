use crate::ipc::helpers::{
    optional_id, optional_str, payload, required_id, respond, store_mut, store_ref, today, HandlerErr,
};
use crate::ipc::types::{AppState, Request};
use crate::model::{validate_score, NewGrade};
use crate::store::{GradeFilter, RecordStore};
use serde_json::{json, Value};

fn grades_list(store: &dyn RecordStore, params: &Value) -> Result<Value, HandlerErr> {
    let filter = GradeFilter {
        student_id: optional_id(params, "studentId")?,
        assignment_id: optional_id(params, "assignmentId")?,
    };
    let grades = store
        .list_grades(filter)
        .map_err(|e| HandlerErr::store(e, "db_query_failed"))?;
    Ok(json!({ "grades": grades }))
}

fn grades_create(store: &mut dyn RecordStore, params: &Value) -> Result<Value, HandlerErr> {
    let new: NewGrade = payload(params, "grade")?;
    let grade = store
        .create_grade(new)
        .map_err(|e| HandlerErr::store(e, "db_insert_failed"))?;
    Ok(json!({ "grade": grade }))
}

fn grades_update(store: &mut dyn RecordStore, params: &Value) -> Result<Value, HandlerErr> {
    let id = required_id(params, "gradeId")?;
    let new: NewGrade = payload(params, "grade")?;
    let grade = store
        .update_grade(id, new)
        .map_err(|e| HandlerErr::store(e, "db_update_failed"))?;
    Ok(json!({ "grade": grade }))
}

fn grades_delete(store: &mut dyn RecordStore, params: &Value) -> Result<Value, HandlerErr> {
    let id = required_id(params, "gradeId")?;
    store
        .delete_grade(id)
        .map_err(|e| HandlerErr::store(e, "db_delete_failed"))?;
    Ok(json!({ "ok": true }))
}

/// Entering a score from the grade book: one row per student and
/// assignment, stamped with the submission day (today unless given).
fn grades_upsert(store: &mut dyn RecordStore, params: &Value) -> Result<Value, HandlerErr> {
    let student_id = required_id(params, "studentId")?;
    let assignment_id = required_id(params, "assignmentId")?;
    let score = params
        .get("score")
        .and_then(|v| v.as_f64())
        .ok_or_else(|| HandlerErr::bad_params("missing score"))?;
    validate_score(score).map_err(|msg| HandlerErr {
        code: "bad_params",
        message: msg,
        details: Some(json!({ "score": score })),
    })?;
    let submitted_date = match optional_str(params, "submittedDate")? {
        Some(d) => d.to_string(),
        None => today(params)?.format("%Y-%m-%d").to_string(),
    };
    let comments = optional_str(params, "comments")?.unwrap_or("").to_string();

    let upserted = store
        .upsert_grade(NewGrade {
            student_id,
            assignment_id,
            score,
            submitted_date: Some(submitted_date),
            comments,
        })
        .map_err(|e| HandlerErr::store(e, "db_update_failed"))?;
    tracing::debug!(
        grade_id = upserted.record.id,
        created = upserted.created,
        "grade upserted"
    );
    Ok(json!({ "grade": upserted.record, "created": upserted.created }))
}

fn handle_grades_list(state: &mut AppState, req: &Request) -> Value {
    respond(&req.id, store_ref(state).and_then(|s| grades_list(s, &req.params)))
}

fn handle_grades_create(state: &mut AppState, req: &Request) -> Value {
    respond(&req.id, store_mut(state).and_then(|s| grades_create(s, &req.params)))
}

fn handle_grades_update(state: &mut AppState, req: &Request) -> Value {
    respond(&req.id, store_mut(state).and_then(|s| grades_update(s, &req.params)))
}

fn handle_grades_delete(state: &mut AppState, req: &Request) -> Value {
    respond(&req.id, store_mut(state).and_then(|s| grades_delete(s, &req.params)))
}

fn handle_grades_upsert(state: &mut AppState, req: &Request) -> Value {
    respond(&req.id, store_mut(state).and_then(|s| grades_upsert(s, &req.params)))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "grades.list" => Some(handle_grades_list(state, req)),
        "grades.create" => Some(handle_grades_create(state, req)),
        "grades.update" => Some(handle_grades_update(state, req)),
        "grades.delete" => Some(handle_grades_delete(state, req)),
        "grades.upsert" => Some(handle_grades_upsert(state, req)),
        _ => None,
    }
}
