use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use crate::metrics::grades::ReportingPeriod;
use crate::metrics::records::{AssignmentSortKey, SortDirection, StudentSortKey};
use crate::store::{RecordStore, StoreError};
use serde_json::{json, Map, Value};

#[derive(Clone, Copy)]
pub(crate) enum SetupSection {
    Students,
    Assignments,
    Dashboard,
}

impl SetupSection {
    const ALL: [SetupSection; 3] = [Self::Students, Self::Assignments, Self::Dashboard];

    fn parse(s: &str) -> Option<Self> {
        match s {
            "students" => Some(Self::Students),
            "assignments" => Some(Self::Assignments),
            "dashboard" => Some(Self::Dashboard),
            _ => None,
        }
    }

    fn name(self) -> &'static str {
        match self {
            Self::Students => "students",
            Self::Assignments => "assignments",
            Self::Dashboard => "dashboard",
        }
    }

    fn key(self) -> &'static str {
        match self {
            Self::Students => "setup.students",
            Self::Assignments => "setup.assignments",
            Self::Dashboard => "setup.dashboard",
        }
    }
}

fn default_section(section: SetupSection) -> Value {
    match section {
        SetupSection::Students => json!({
            "defaultSortBy": "name",
            "defaultSortDir": "asc",
            "showInactive": true
        }),
        SetupSection::Assignments => json!({
            "defaultSortBy": "dueDate",
            "defaultSortDir": "desc"
        }),
        SetupSection::Dashboard => json!({
            "recentActivityLimit": 5,
            "defaultChartPeriod": "all"
        }),
    }
}

fn as_object_mut(v: &mut Value) -> Result<&mut Map<String, Value>, String> {
    v.as_object_mut()
        .ok_or_else(|| "setup section must be an object".to_string())
}

fn parse_bool(v: &Value, key: &str) -> Result<bool, String> {
    v.as_bool()
        .ok_or_else(|| format!("{} must be boolean", key))
}

fn parse_i64_range(v: &Value, key: &str, min: i64, max: i64) -> Result<i64, String> {
    let n = v
        .as_i64()
        .ok_or_else(|| format!("{} must be integer", key))?;
    if !(min..=max).contains(&n) {
        return Err(format!("{} must be in {}..={}", key, min, max));
    }
    Ok(n)
}

fn parse_choice(
    v: &Value,
    key: &str,
    valid: impl Fn(&str) -> bool,
    allowed: &[&str],
) -> Result<Value, String> {
    let s = v
        .as_str()
        .map(str::trim)
        .ok_or_else(|| format!("{} must be string", key))?;
    if !valid(s) {
        return Err(format!("{} must be one of: {}", key, allowed.join(", ")));
    }
    Ok(Value::String(s.to_string()))
}

fn parse_sort_dir(v: &Value, key: &str) -> Result<Value, String> {
    parse_choice(v, key, |s| SortDirection::parse(s).is_some(), &["asc", "desc"])
        .map(|s| match s.as_str().and_then(SortDirection::parse) {
            Some(dir) => Value::String(dir.as_str().to_string()),
            None => s,
        })
}

fn merge_section_patch(
    section: SetupSection,
    current: &mut Value,
    patch: &Map<String, Value>,
) -> Result<(), String> {
    let obj = as_object_mut(current)?;
    for (k, v) in patch {
        match section {
            SetupSection::Students => match k.as_str() {
                "defaultSortBy" => {
                    let s = parse_choice(
                        v,
                        k,
                        |s| StudentSortKey::parse(s).is_some(),
                        StudentSortKey::ALL,
                    )?;
                    obj.insert(k.clone(), s);
                }
                "defaultSortDir" => {
                    obj.insert(k.clone(), parse_sort_dir(v, k)?);
                }
                "showInactive" => {
                    obj.insert(k.clone(), Value::Bool(parse_bool(v, k)?));
                }
                _ => return Err(format!("unknown students field: {}", k)),
            },
            SetupSection::Assignments => match k.as_str() {
                "defaultSortBy" => {
                    let s = parse_choice(
                        v,
                        k,
                        |s| AssignmentSortKey::parse(s).is_some(),
                        AssignmentSortKey::ALL,
                    )?;
                    obj.insert(k.clone(), s);
                }
                "defaultSortDir" => {
                    obj.insert(k.clone(), parse_sort_dir(v, k)?);
                }
                _ => return Err(format!("unknown assignments field: {}", k)),
            },
            SetupSection::Dashboard => match k.as_str() {
                "recentActivityLimit" => {
                    obj.insert(k.clone(), Value::from(parse_i64_range(v, k, 1, 50)?));
                }
                "defaultChartPeriod" => {
                    let s = parse_choice(
                        v,
                        k,
                        |s| ReportingPeriod::parse(s).is_some(),
                        ReportingPeriod::ALL,
                    )?;
                    obj.insert(k.clone(), s);
                }
                _ => return Err(format!("unknown dashboard field: {}", k)),
            },
        }
    }
    Ok(())
}

/// Defaults overlaid with whatever was saved for the section.
pub(crate) fn load_section(
    store: &dyn RecordStore,
    section: SetupSection,
) -> Result<Value, StoreError> {
    let mut current = default_section(section);
    if let Some(saved) = store.setting_get(section.key())? {
        if let Some(saved_obj) = saved.as_object() {
            // Malformed historical values fall back to defaults field by field.
            for (k, v) in saved_obj {
                let mut one = Map::new();
                one.insert(k.clone(), v.clone());
                let _ = merge_section_patch(section, &mut current, &one);
            }
        }
    }
    Ok(current)
}

fn handle_setup_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(store) = state.store.as_deref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let mut out = Map::new();
    for section in SetupSection::ALL {
        match load_section(store, section) {
            Ok(v) => {
                out.insert(section.name().to_string(), v);
            }
            Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
        }
    }
    ok(&req.id, Value::Object(out))
}

fn handle_setup_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(store) = state.store.as_deref_mut() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let Some(section_raw) = req.params.get("section").and_then(|v| v.as_str()) else {
        return err(&req.id, "bad_params", "missing section", None);
    };
    let Some(section) = SetupSection::parse(section_raw) else {
        return err(&req.id, "bad_params", "unknown section", None);
    };
    let Some(patch_obj) = req.params.get("patch").and_then(|v| v.as_object()) else {
        return err(&req.id, "bad_params", "patch must be an object", None);
    };

    let mut current = match load_section(store, section) {
        Ok(v) => v,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };
    if let Err(msg) = merge_section_patch(section, &mut current, patch_obj) {
        return err(&req.id, "bad_params", msg, None);
    }
    if let Err(e) = store.setting_set(section.key(), &current) {
        return err(&req.id, "db_update_failed", e.to_string(), None);
    }
    tracing::debug!(section = section.name(), "setup section updated");
    ok(&req.id, json!({ "ok": true }))
}

pub(crate) fn students_defaults(store: &dyn RecordStore) -> Result<Value, StoreError> {
    load_section(store, SetupSection::Students)
}

pub(crate) fn assignments_defaults(store: &dyn RecordStore) -> Result<Value, StoreError> {
    load_section(store, SetupSection::Assignments)
}

pub(crate) fn dashboard_defaults(store: &dyn RecordStore) -> Result<Value, StoreError> {
    load_section(store, SetupSection::Dashboard)
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "setup.get" => Some(handle_setup_get(state, req)),
        "setup.update" => Some(handle_setup_update(state, req)),
        _ => None,
    }
}
