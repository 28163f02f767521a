mod test_support;

use serde_json::{json, Value};
use test_support::{assignment_payload, create_id, request_ok, spawn_sidecar, student_payload};

fn len_of(v: &Value, key: &str) -> usize {
    v.get(key).and_then(|x| x.as_array()).map(|a| a.len()).unwrap_or(0)
}

#[test]
fn dashboard_summary_rolls_up_store_contents() {
    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "inMemory": true }),
    );

    let ana = create_id(
        &mut stdin,
        &mut reader,
        "s1",
        "students.create",
        json!({ "student": student_payload("Ana", "Cruz", 7) }),
        "/student/id",
    );
    let raj = create_id(
        &mut stdin,
        &mut reader,
        "s2",
        "students.create",
        json!({ "student": student_payload("Raj", "Lee", 7) }),
        "/student/id",
    );
    let mut tom_payload = student_payload("Tom", "Ng", 7);
    tom_payload["status"] = json!("inactive");
    let tom = create_id(
        &mut stdin,
        &mut reader,
        "s3",
        "students.create",
        json!({ "student": tom_payload }),
        "/student/id",
    );

    let quiz = create_id(
        &mut stdin,
        &mut reader,
        "a1",
        "assignments.create",
        json!({ "assignment": assignment_payload("Quiz 1", "Quiz", "2024-03-01") }),
        "/assignment/id",
    );
    let project = create_id(
        &mut stdin,
        &mut reader,
        "a2",
        "assignments.create",
        json!({ "assignment": assignment_payload("Project", "Project", "2024-03-05") }),
        "/assignment/id",
    );

    let dated = [
        (ana, quiz, 90, "2024-03-01"),
        (raj, quiz, 80, "2024-03-02"),
        (tom, quiz, 70, "2024-03-03"),
        (ana, project, 100, "2024-03-04"),
        (raj, project, 60, "2024-03-05"),
    ];
    for (i, (student_id, assignment_id, score, date)) in dated.into_iter().enumerate() {
        let _ = request_ok(
            &mut stdin,
            &mut reader,
            &format!("g{}", i),
            "grades.upsert",
            json!({
                "studentId": student_id,
                "assignmentId": assignment_id,
                "score": score,
                "submittedDate": date
            }),
        );
    }
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "g5",
        "grades.create",
        json!({ "grade": { "studentId": tom, "assignmentId": project, "score": 85 } }),
    );

    let marks = [
        (ana, "2024-03-04", "absent"),
        (raj, "2024-03-06", "late"),
        (ana, "2024-03-06", "present"),
        (tom, "2024-03-01", "absent"),
    ];
    for (i, (student_id, date, status)) in marks.into_iter().enumerate() {
        let _ = request_ok(
            &mut stdin,
            &mut reader,
            &format!("m{}", i),
            "attendance.mark",
            json!({ "studentId": student_id, "date": date, "status": status }),
        );
    }

    let summary = request_ok(
        &mut stdin,
        &mut reader,
        "d1",
        "dashboard.summary",
        json!({ "date": "2024-03-06" }),
    );
    assert_eq!(summary.get("totalStudents").and_then(|v| v.as_u64()), Some(3));
    assert_eq!(summary.get("activeStudents").and_then(|v| v.as_u64()), Some(2));
    assert_eq!(summary.get("totalAssignments").and_then(|v| v.as_u64()), Some(2));
    assert_eq!(summary.get("totalGrades").and_then(|v| v.as_u64()), Some(6));
    // 485 / 6 = 80.83
    assert_eq!(summary.get("classAverage").and_then(|v| v.as_f64()), Some(80.8));
    assert_eq!(summary.get("classLetterGrade").and_then(|v| v.as_str()), Some("B"));
    assert_eq!(summary.get("classBadgeClass").and_then(|v| v.as_str()), Some("grade-b"));
    assert_eq!(
        summary.get("classGradeColor").and_then(|v| v.as_str()),
        Some("text-blue-600")
    );

    assert_eq!(summary.pointer("/today/present").and_then(|v| v.as_u64()), Some(1));
    assert_eq!(summary.pointer("/today/late").and_then(|v| v.as_u64()), Some(1));
    assert_eq!(summary.pointer("/today/total").and_then(|v| v.as_u64()), Some(3));
    assert_eq!(summary.pointer("/today/percentage").and_then(|v| v.as_u64()), Some(33));

    assert_eq!(len_of(&summary, "recentGrades"), 5);
    let newest = &summary["recentGrades"][0];
    assert_eq!(newest.get("studentName").and_then(|v| v.as_str()), Some("Raj Lee"));
    assert_eq!(newest.get("assignmentTitle").and_then(|v| v.as_str()), Some("Project"));
    assert_eq!(newest.get("letterGrade").and_then(|v| v.as_str()), Some("D"));
    assert_eq!(
        summary.pointer("/recentGrades/4/submittedDate").and_then(|v| v.as_str()),
        Some("2024-03-01")
    );

    assert_eq!(len_of(&summary, "recentAbsences"), 3);
    let latest = &summary["recentAbsences"][0];
    assert_eq!(latest.get("studentName").and_then(|v| v.as_str()), Some("Raj Lee"));
    assert_eq!(latest.get("colorToken").and_then(|v| v.as_str()), Some("text-yellow-600"));
    assert_eq!(latest.get("badgeToken").and_then(|v| v.as_str()), Some("status-late"));
    assert_eq!(
        summary.pointer("/recentAbsences/2/date").and_then(|v| v.as_str()),
        Some("2024-03-01")
    );

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "c1",
        "setup.update",
        json!({ "section": "dashboard", "patch": { "recentActivityLimit": 2 } }),
    );
    let trimmed = request_ok(
        &mut stdin,
        &mut reader,
        "d2",
        "dashboard.summary",
        json!({ "date": "2024-03-06" }),
    );
    assert_eq!(len_of(&trimmed, "recentGrades"), 2);
    assert_eq!(len_of(&trimmed, "recentAbsences"), 2);

    drop(stdin);
    let _ = child.wait();
}

#[test]
fn dashboard_summary_on_empty_store_is_neutral() {
    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "inMemory": true }),
    );
    let summary = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "dashboard.summary",
        json!({ "date": "2024-03-06" }),
    );
    assert_eq!(summary.get("classAverage").and_then(|v| v.as_f64()), Some(0.0));
    assert!(summary
        .get("classLetterGrade")
        .map(|v| v.is_null())
        .unwrap_or(false));
    assert_eq!(
        summary.get("classBadgeClass").and_then(|v| v.as_str()),
        Some("status-badge bg-gray-100 text-gray-800")
    );
    assert_eq!(summary.pointer("/today/total").and_then(|v| v.as_u64()), Some(0));
    assert_eq!(summary.pointer("/today/percentage").and_then(|v| v.as_u64()), Some(0));
    assert_eq!(len_of(&summary, "recentGrades"), 0);

    drop(stdin);
    let _ = child.wait();
}
