use crate::dates;
use crate::ipc::handlers::setup;
use crate::ipc::helpers::{optional_id, optional_str, required_id, respond, store_ref, today, HandlerErr};
use crate::ipc::types::{AppState, Request};
use crate::metrics::attendance::{recent_absences, status_badge_token, status_color_token, today_snapshot};
use crate::metrics::grades::{
    average_of, badge_class, chart_points, filter_by_period, grade_color, letter_grade,
    performance_series, performance_summary, ReportingPeriod,
};
use crate::metrics::records::{recent_grades, sort_records, BySubmittedDate, SortDirection};
use crate::model::{Id, StudentStatus};
use crate::store::{AttendanceFilter, GradeFilter, RecordStore};
use serde_json::{json, Value};
use std::collections::HashMap;

const DEFAULT_RECENT_LIMIT: usize = 5;
const UNKNOWN_STUDENT: &str = "Unknown";
const UNKNOWN_ASSIGNMENT: &str = "Unknown Assignment";

/// Display name for an activity row whose student may be missing from the roster.
fn student_name(names: &HashMap<Id, String>, id: Id) -> String {
    names
        .get(&id)
        .cloned()
        .unwrap_or_else(|| UNKNOWN_STUDENT.to_string())
}

fn dashboard_summary(store: &dyn RecordStore, params: &Value) -> Result<Value, HandlerErr> {
    let day = today(params)?;
    let defaults =
        setup::dashboard_defaults(store).map_err(|e| HandlerErr::store(e, "db_query_failed"))?;
    let limit = defaults["recentActivityLimit"]
        .as_u64()
        .map(|n| n as usize)
        .unwrap_or(DEFAULT_RECENT_LIMIT);

    let students = store
        .list_students()
        .map_err(|e| HandlerErr::store(e, "db_query_failed"))?;
    let assignments = store
        .list_assignments()
        .map_err(|e| HandlerErr::store(e, "db_query_failed"))?;
    let grades = store
        .list_grades(GradeFilter::default())
        .map_err(|e| HandlerErr::store(e, "db_query_failed"))?;
    let attendance = store
        .list_attendance(AttendanceFilter::default())
        .map_err(|e| HandlerErr::store(e, "db_query_failed"))?;

    let names: HashMap<Id, String> = students.iter().map(|s| (s.id, s.full_name())).collect();
    let titles: HashMap<Id, &str> = assignments.iter().map(|a| (a.id, a.title.as_str())).collect();

    let class_average = average_of(&grades);
    let class_letter = (!grades.is_empty()).then(|| letter_grade(class_average));

    let recent: Vec<Value> = recent_grades(&grades, limit)
        .into_iter()
        .map(|g| {
            let mut row = json!(g);
            row["studentName"] = json!(student_name(&names, g.student_id));
            row["assignmentTitle"] =
                json!(titles.get(&g.assignment_id).copied().unwrap_or(UNKNOWN_ASSIGNMENT));
            row["letterGrade"] = json!(letter_grade(g.score).as_str());
            row
        })
        .collect();

    let absences: Vec<Value> = recent_absences(&attendance, limit)
        .into_iter()
        .map(|r| {
            let mut row = json!(r);
            row["studentName"] = json!(student_name(&names, r.student_id));
            row["colorToken"] = json!(status_color_token(r.status));
            row["badgeToken"] = json!(status_badge_token(r.status));
            row
        })
        .collect();

    Ok(json!({
        "date": day,
        "totalStudents": students.len(),
        "activeStudents": students.iter().filter(|s| s.status == StudentStatus::Active).count(),
        "totalAssignments": assignments.len(),
        "totalGrades": grades.len(),
        "classAverage": class_average,
        "classLetterGrade": class_letter.map(|l| l.as_str()),
        "classBadgeClass": badge_class(class_letter),
        "classGradeColor": grade_color(class_average),
        "today": today_snapshot(&students, &attendance, day),
        "recentGrades": recent,
        "recentAbsences": absences
    }))
}

fn performance_chart(store: &dyn RecordStore, params: &Value) -> Result<Value, HandlerErr> {
    let student_id = required_id(params, "studentId")?;
    let assignment_id = optional_id(params, "assignmentId")?;
    let defaults =
        setup::dashboard_defaults(store).map_err(|e| HandlerErr::store(e, "db_query_failed"))?;
    let period_raw = optional_str(params, "period")?
        .or_else(|| defaults["defaultChartPeriod"].as_str())
        .unwrap_or("all");
    let Some(period) = ReportingPeriod::parse(period_raw) else {
        return Err(HandlerErr {
            code: "bad_params",
            message: format!("unknown period: {}", period_raw),
            details: Some(json!({ "allowed": ReportingPeriod::ALL })),
        });
    };
    let now = match optional_str(params, "now")? {
        Some(raw) => dates::parse_lenient(Some(raw))
            .ok_or_else(|| HandlerErr::bad_params("now must be a date or timestamp"))?,
        None => chrono::Local::now().naive_local(),
    };

    let student = store
        .get_student(student_id)
        .map_err(|e| HandlerErr::store(e, "db_query_failed"))?;
    let assignments = store
        .list_assignments()
        .map_err(|e| HandlerErr::store(e, "db_query_failed"))?;
    let grades = store
        .list_grades(GradeFilter {
            student_id: Some(student_id),
            assignment_id,
        })
        .map_err(|e| HandlerErr::store(e, "db_query_failed"))?;

    let in_period = filter_by_period(&grades, period, now);
    let points = chart_points(&in_period, &assignments);
    let series = performance_series(&points)?;
    let chronological = sort_records(&in_period, &BySubmittedDate, SortDirection::Asc);
    let summary = performance_summary(&chronological)?;

    Ok(json!({
        "student": { "id": student.id, "fullName": student.full_name() },
        "period": period,
        "points": points,
        "series": series,
        "summary": summary
    }))
}

fn handle_dashboard_summary(state: &mut AppState, req: &Request) -> Value {
    respond(&req.id, store_ref(state).and_then(|s| dashboard_summary(s, &req.params)))
}

fn handle_performance_chart(state: &mut AppState, req: &Request) -> Value {
    respond(&req.id, store_ref(state).and_then(|s| performance_chart(s, &req.params)))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "dashboard.summary" => Some(handle_dashboard_summary(state, req)),
        "performance.chart" => Some(handle_performance_chart(state, req)),
        _ => None,
    }
}
