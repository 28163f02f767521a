use crate::ipc::helpers::{
    optional_day, optional_id, optional_str, required_id, respond, store_mut, store_ref, today,
    HandlerErr,
};
use crate::ipc::types::{AppState, Request};
use crate::metrics::attendance::{
    attendance_percentage, status_badge_token, status_color_token, status_on, today_snapshot,
    weekdays_of,
};
use crate::model::{AttendanceStatus, NewAttendanceRecord};
use crate::store::{AttendanceFilter, RecordStore};
use serde_json::{json, Value};

fn attendance_list(store: &dyn RecordStore, params: &Value) -> Result<Value, HandlerErr> {
    let filter = AttendanceFilter {
        student_id: optional_id(params, "studentId")?,
        date: optional_day(params, "date")?,
    };
    let records = store
        .list_attendance(filter)
        .map_err(|e| HandlerErr::store(e, "db_query_failed"))?;
    Ok(json!({ "records": records }))
}

fn attendance_mark(store: &mut dyn RecordStore, params: &Value) -> Result<Value, HandlerErr> {
    let student_id = required_id(params, "studentId")?;
    let date = optional_day(params, "date")?.ok_or_else(|| HandlerErr::bad_params("missing date"))?;
    let status = optional_str(params, "status")?.and_then(AttendanceStatus::parse);
    let notes = optional_str(params, "notes")?.unwrap_or("").to_string();

    let upserted = store
        .mark_attendance(NewAttendanceRecord {
            student_id,
            date,
            status,
            notes,
        })
        .map_err(|e| HandlerErr::store(e, "db_update_failed"))?;
    tracing::debug!(
        record_id = upserted.record.id,
        created = upserted.created,
        "attendance marked"
    );
    Ok(json!({ "record": upserted.record, "created": upserted.created }))
}

fn attendance_delete(store: &mut dyn RecordStore, params: &Value) -> Result<Value, HandlerErr> {
    let id = required_id(params, "recordId")?;
    store
        .delete_attendance(id)
        .map_err(|e| HandlerErr::store(e, "db_delete_failed"))?;
    Ok(json!({ "ok": true }))
}

/// Monday..Friday grid for the week containing `date` (default today).
fn attendance_week(store: &dyn RecordStore, params: &Value) -> Result<Value, HandlerErr> {
    let reference = today(params)?;
    let days = weekdays_of(reference).ok_or_else(|| HandlerErr {
        code: "bad_params",
        message: "date is too close to the calendar limits to build a week".to_string(),
        details: Some(json!({ "date": reference })),
    })?;
    let students = store
        .list_students()
        .map_err(|e| HandlerErr::store(e, "db_query_failed"))?;
    let records = store
        .list_attendance(AttendanceFilter::default())
        .map_err(|e| HandlerErr::store(e, "db_query_failed"))?;

    let rows: Vec<Value> = students
        .iter()
        .map(|s| {
            let cells: Vec<Value> = days
                .iter()
                .map(|d| {
                    let status = status_on(&records, s.id, *d);
                    json!({
                        "date": d,
                        "status": status,
                        "colorToken": status_color_token(status),
                        "badgeToken": status_badge_token(status)
                    })
                })
                .collect();
            json!({
                "studentId": s.id,
                "fullName": s.full_name(),
                "days": cells,
                "percentage": attendance_percentage(records.iter().filter(|r| r.student_id == s.id))
            })
        })
        .collect();
    Ok(json!({ "days": days, "students": rows }))
}

fn attendance_today(store: &dyn RecordStore, params: &Value) -> Result<Value, HandlerErr> {
    let day = today(params)?;
    let students = store
        .list_students()
        .map_err(|e| HandlerErr::store(e, "db_query_failed"))?;
    let records = store
        .list_attendance(AttendanceFilter {
            student_id: None,
            date: Some(day),
        })
        .map_err(|e| HandlerErr::store(e, "db_query_failed"))?;
    let snapshot = today_snapshot(&students, &records, day);
    let mut out = json!(snapshot);
    out["date"] = json!(day);
    Ok(out)
}

fn handle_attendance_list(state: &mut AppState, req: &Request) -> Value {
    respond(&req.id, store_ref(state).and_then(|s| attendance_list(s, &req.params)))
}

fn handle_attendance_mark(state: &mut AppState, req: &Request) -> Value {
    respond(&req.id, store_mut(state).and_then(|s| attendance_mark(s, &req.params)))
}

fn handle_attendance_delete(state: &mut AppState, req: &Request) -> Value {
    respond(&req.id, store_mut(state).and_then(|s| attendance_delete(s, &req.params)))
}

fn handle_attendance_week(state: &mut AppState, req: &Request) -> Value {
    respond(&req.id, store_ref(state).and_then(|s| attendance_week(s, &req.params)))
}

fn handle_attendance_today(state: &mut AppState, req: &Request) -> Value {
    respond(&req.id, store_ref(state).and_then(|s| attendance_today(s, &req.params)))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "attendance.list" => Some(handle_attendance_list(state, req)),
        "attendance.mark" => Some(handle_attendance_mark(state, req)),
        "attendance.delete" => Some(handle_attendance_delete(state, req)),
        "attendance.week" => Some(handle_attendance_week(state, req)),
        "attendance.today" => Some(handle_attendance_today(state, req)),
        _ => None,
    }
}
