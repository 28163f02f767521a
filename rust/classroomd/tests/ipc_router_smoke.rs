mod test_support;

use serde_json::json;
use std::io::Write;
use test_support::{
    assignment_payload, create_id, error_code, read_line, request, request_ok, spawn_sidecar,
    student_payload,
};

#[test]
fn router_dispatch_smoke_covers_handler_families() {
    let (mut child, mut stdin, mut reader) = spawn_sidecar();

    let health = request_ok(&mut stdin, &mut reader, "1", "health", json!({}));
    assert!(health.get("version").and_then(|v| v.as_str()).is_some());
    assert!(health.get("storeKind").map(|v| v.is_null()).unwrap_or(false));

    let before = request(&mut stdin, &mut reader, "2", "students.list", json!({}));
    assert_eq!(error_code(&before), Some("no_workspace"));

    let selected = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "workspace.select",
        json!({ "inMemory": true }),
    );
    assert_eq!(selected.get("storeKind").and_then(|v| v.as_str()), Some("memory"));

    let student_id = create_id(
        &mut stdin,
        &mut reader,
        "4",
        "students.create",
        json!({ "student": student_payload("Smoke", "Student", 9) }),
        "/student/id",
    );
    let assignment_id = create_id(
        &mut stdin,
        &mut reader,
        "5",
        "assignments.create",
        json!({ "assignment": assignment_payload("Smoke Quiz", "Quiz", "2024-03-08") }),
        "/assignment/id",
    );

    let calls = [
        ("6", "setup.get", json!({})),
        ("7", "students.list", json!({})),
        ("8", "students.get", json!({ "studentId": student_id })),
        ("9", "assignments.list", json!({})),
        ("10", "assignments.get", json!({ "assignmentId": assignment_id })),
        (
            "11",
            "grades.upsert",
            json!({ "studentId": student_id, "assignmentId": assignment_id, "score": 88 }),
        ),
        ("12", "grades.list", json!({ "studentId": student_id })),
        (
            "13",
            "attendance.mark",
            json!({ "studentId": student_id, "date": "2024-03-04", "status": "present" }),
        ),
        ("14", "attendance.list", json!({})),
        ("15", "attendance.week", json!({ "date": "2024-03-04" })),
        ("16", "attendance.today", json!({ "date": "2024-03-04" })),
        ("17", "dashboard.summary", json!({ "date": "2024-03-04" })),
        (
            "18",
            "performance.chart",
            json!({ "studentId": student_id, "now": "2024-03-10" }),
        ),
    ];
    for (id, method, params) in calls {
        let _ = request_ok(&mut stdin, &mut reader, id, method, params);
    }

    let unknown = request(&mut stdin, &mut reader, "19", "gradebook.explode", json!({}));
    assert_eq!(error_code(&unknown), Some("not_implemented"));

    writeln!(stdin, "{{not json").expect("write garbage");
    stdin.flush().expect("flush garbage");
    let bad = read_line(&mut reader);
    assert_eq!(bad.get("ok").and_then(|v| v.as_bool()), Some(false));
    assert_eq!(error_code(&bad), Some("bad_json"));

    // The loop keeps serving after a bad line.
    let _ = request_ok(&mut stdin, &mut reader, "20", "health", json!({}));

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "21",
        "students.delete",
        json!({ "studentId": student_id }),
    );

    drop(stdin);
    let _ = child.wait();
}
