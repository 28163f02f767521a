mod test_support;

use serde_json::json;
use test_support::{error_code, request, request_ok, spawn_sidecar, temp_dir};

#[test]
fn setup_defaults_patch_and_survive_reopen() {
    let workspace = temp_dir("classroomd-setup");

    {
        let (mut child, mut stdin, mut reader) = spawn_sidecar();
        let _ = request_ok(
            &mut stdin,
            &mut reader,
            "1",
            "workspace.select",
            json!({ "path": workspace.to_string_lossy() }),
        );

        let defaults = request_ok(&mut stdin, &mut reader, "2", "setup.get", json!({}));
        assert_eq!(
            defaults.pointer("/students/defaultSortBy").and_then(|v| v.as_str()),
            Some("name")
        );
        assert_eq!(
            defaults.pointer("/assignments/defaultSortBy").and_then(|v| v.as_str()),
            Some("dueDate")
        );
        assert_eq!(
            defaults.pointer("/assignments/defaultSortDir").and_then(|v| v.as_str()),
            Some("desc")
        );
        assert_eq!(
            defaults
                .pointer("/dashboard/recentActivityLimit")
                .and_then(|v| v.as_i64()),
            Some(5)
        );

        let _ = request_ok(
            &mut stdin,
            &mut reader,
            "3",
            "setup.update",
            json!({
                "section": "dashboard",
                "patch": { "recentActivityLimit": 8, "defaultChartPeriod": "last90" }
            }),
        );
        let _ = request_ok(
            &mut stdin,
            &mut reader,
            "4",
            "setup.update",
            json!({ "section": "assignments", "patch": { "defaultSortBy": "title" } }),
        );

        let unknown_section = request(
            &mut stdin,
            &mut reader,
            "5",
            "setup.update",
            json!({ "section": "printer", "patch": {} }),
        );
        assert_eq!(error_code(&unknown_section), Some("bad_params"));
        let unknown_field = request(
            &mut stdin,
            &mut reader,
            "6",
            "setup.update",
            json!({ "section": "students", "patch": { "colour": "blue" } }),
        );
        assert_eq!(error_code(&unknown_field), Some("bad_params"));
        let out_of_range = request(
            &mut stdin,
            &mut reader,
            "7",
            "setup.update",
            json!({ "section": "dashboard", "patch": { "recentActivityLimit": 500 } }),
        );
        assert_eq!(error_code(&out_of_range), Some("bad_params"));

        drop(stdin);
        let _ = child.wait();
    }

    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    let health = request_ok(&mut stdin, &mut reader, "2", "health", json!({}));
    assert_eq!(health.get("storeKind").and_then(|v| v.as_str()), Some("sqlite"));

    let setup = request_ok(&mut stdin, &mut reader, "3", "setup.get", json!({}));
    assert_eq!(
        setup.pointer("/dashboard/recentActivityLimit").and_then(|v| v.as_i64()),
        Some(8)
    );
    assert_eq!(
        setup.pointer("/dashboard/defaultChartPeriod").and_then(|v| v.as_str()),
        Some("last90")
    );
    assert_eq!(
        setup.pointer("/assignments/defaultSortBy").and_then(|v| v.as_str()),
        Some("title")
    );
    assert_eq!(
        setup.pointer("/assignments/defaultSortDir").and_then(|v| v.as_str()),
        Some("desc")
    );
    assert!(workspace.join("classroom.sqlite3").is_file());

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn workspace_select_requires_a_path() {
    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    let missing = request(&mut stdin, &mut reader, "1", "workspace.select", json!({}));
    assert_eq!(error_code(&missing), Some("bad_params"));
    let setup = request(&mut stdin, &mut reader, "2", "setup.get", json!({}));
    assert_eq!(error_code(&setup), Some("no_workspace"));
    drop(stdin);
    let _ = child.wait();
}
