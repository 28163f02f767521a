use crate::ipc::handlers::setup;
use crate::ipc::helpers::{optional_str, payload, required_id, respond, store_mut, store_ref, HandlerErr};
use crate::ipc::types::{AppState, Request};
use crate::metrics::grades::{assignment_stats, badge_class, grade_color, letter_grade};
use crate::metrics::records::{search_records, sort_records, AssignmentField, AssignmentSortKey, SortDirection};
use crate::model::{Assignment, Grade, NewAssignment};
use crate::store::{GradeFilter, RecordStore};
use serde_json::{json, Value};

/// Assignment plus its submission stats. Letter and badge stay neutral
/// until something has been submitted.
fn assignment_row(a: &Assignment, grades: &[Grade]) -> Value {
    let own: Vec<Grade> = grades
        .iter()
        .filter(|g| g.assignment_id == a.id)
        .cloned()
        .collect();
    let stats = assignment_stats(&own, Some(a.total_points));
    let letter = (stats.submitted > 0).then(|| letter_grade(stats.average));

    let mut row = json!(a);
    row["stats"] = json!(stats);
    row["letterGrade"] = json!(letter.map(|l| l.as_str()));
    row["badgeClass"] = json!(badge_class(letter));
    row["gradeColor"] = json!(grade_color(stats.average));
    row
}

fn assignments_list(store: &dyn RecordStore, params: &Value) -> Result<Value, HandlerErr> {
    let defaults =
        setup::assignments_defaults(store).map_err(|e| HandlerErr::store(e, "db_query_failed"))?;
    let query = params.get("query").unwrap_or(&Value::Null);

    let sort_raw = optional_str(query, "sortBy")?
        .or_else(|| defaults["defaultSortBy"].as_str())
        .unwrap_or("dueDate");
    let Some(sort_by) = AssignmentSortKey::parse(sort_raw) else {
        return Err(HandlerErr {
            code: "bad_params",
            message: format!("unknown sortBy: {}", sort_raw),
            details: Some(json!({ "allowed": AssignmentSortKey::ALL })),
        });
    };
    let dir_raw = optional_str(query, "sortDir")?
        .or_else(|| defaults["defaultSortDir"].as_str())
        .unwrap_or("desc");
    let sort_dir = SortDirection::parse(dir_raw)
        .ok_or_else(|| HandlerErr::bad_params("sortDir must be asc or desc"))?;
    let search = optional_str(query, "search")?.unwrap_or("");

    let assignments = store
        .list_assignments()
        .map_err(|e| HandlerErr::store(e, "db_query_failed"))?;
    let grades = store
        .list_grades(GradeFilter::default())
        .map_err(|e| HandlerErr::store(e, "db_query_failed"))?;

    let matched = search_records(&assignments, search, &AssignmentField::ALL);
    let sorted = sort_records(&matched, &sort_by, sort_dir);
    let rows: Vec<Value> = sorted.iter().map(|a| assignment_row(a, &grades)).collect();
    Ok(json!({
        "assignments": rows,
        "sortBy": sort_by.as_str(),
        "sortDir": sort_dir.as_str()
    }))
}

fn assignments_get(store: &dyn RecordStore, params: &Value) -> Result<Value, HandlerErr> {
    let id = required_id(params, "assignmentId")?;
    let assignment = store
        .get_assignment(id)
        .map_err(|e| HandlerErr::store(e, "db_query_failed"))?;
    let grades = store
        .list_grades(GradeFilter {
            student_id: None,
            assignment_id: Some(id),
        })
        .map_err(|e| HandlerErr::store(e, "db_query_failed"))?;
    Ok(json!({ "assignment": assignment_row(&assignment, &grades) }))
}

fn assignments_create(store: &mut dyn RecordStore, params: &Value) -> Result<Value, HandlerErr> {
    let new: NewAssignment = payload(params, "assignment")?;
    let assignment = store
        .create_assignment(new)
        .map_err(|e| HandlerErr::store(e, "db_insert_failed"))?;
    tracing::debug!(assignment_id = assignment.id, "assignment created");
    Ok(json!({ "assignment": assignment }))
}

fn assignments_update(store: &mut dyn RecordStore, params: &Value) -> Result<Value, HandlerErr> {
    let id = required_id(params, "assignmentId")?;
    let new: NewAssignment = payload(params, "assignment")?;
    let assignment = store
        .update_assignment(id, new)
        .map_err(|e| HandlerErr::store(e, "db_update_failed"))?;
    Ok(json!({ "assignment": assignment }))
}

fn assignments_delete(store: &mut dyn RecordStore, params: &Value) -> Result<Value, HandlerErr> {
    let id = required_id(params, "assignmentId")?;
    store
        .delete_assignment(id)
        .map_err(|e| HandlerErr::store(e, "db_delete_failed"))?;
    tracing::debug!(assignment_id = id, "assignment deleted");
    Ok(json!({ "ok": true }))
}

fn handle_assignments_list(state: &mut AppState, req: &Request) -> Value {
    respond(&req.id, store_ref(state).and_then(|s| assignments_list(s, &req.params)))
}

fn handle_assignments_get(state: &mut AppState, req: &Request) -> Value {
    respond(&req.id, store_ref(state).and_then(|s| assignments_get(s, &req.params)))
}

fn handle_assignments_create(state: &mut AppState, req: &Request) -> Value {
    respond(&req.id, store_mut(state).and_then(|s| assignments_create(s, &req.params)))
}

fn handle_assignments_update(state: &mut AppState, req: &Request) -> Value {
    respond(&req.id, store_mut(state).and_then(|s| assignments_update(s, &req.params)))
}

fn handle_assignments_delete(state: &mut AppState, req: &Request) -> Value {
    respond(&req.id, store_mut(state).and_then(|s| assignments_delete(s, &req.params)))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "assignments.list" => Some(handle_assignments_list(state, req)),
        "assignments.get" => Some(handle_assignments_get(state, req)),
        "assignments.create" => Some(handle_assignments_create(state, req)),
        "assignments.update" => Some(handle_assignments_update(state, req)),
        "assignments.delete" => Some(handle_assignments_delete(state, req)),
        _ => None,
    }
}
