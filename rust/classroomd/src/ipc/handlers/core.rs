use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use crate::store::{MemoryStore, SqliteStore};
use serde_json::json;
use std::path::PathBuf;

fn handle_health(state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(
        &req.id,
        json!({
            "version": env!("CARGO_PKG_VERSION"),
            "workspacePath": state.workspace.as_ref().map(|p| p.to_string_lossy().to_string()),
            "storeKind": state.store.as_ref().map(|s| s.kind())
        }),
    )
}

fn handle_workspace_select(state: &mut AppState, req: &Request) -> serde_json::Value {
    let in_memory = req
        .params
        .get("inMemory")
        .and_then(|v| v.as_bool())
        .unwrap_or(false);
    if in_memory {
        state.workspace = None;
        state.store = Some(Box::new(MemoryStore::new()));
        tracing::info!("opened in-memory store");
        return ok(&req.id, json!({ "workspacePath": null, "storeKind": "memory" }));
    }

    let p = req
        .params
        .get("path")
        .and_then(|v| v.as_str())
        .map(PathBuf::from);
    let Some(path) = p else {
        return err(&req.id, "bad_params", "missing params.path", None);
    };

    match SqliteStore::open(&path) {
        Ok(store) => {
            tracing::info!(workspace = %path.display(), "opened workspace");
            state.workspace = Some(path.clone());
            state.store = Some(Box::new(store));
            ok(
                &req.id,
                json!({ "workspacePath": path.to_string_lossy(), "storeKind": "sqlite" }),
            )
        }
        Err(e) => {
            tracing::warn!(workspace = %path.display(), error = %e, "workspace open failed");
            err(&req.id, "db_open_failed", format!("{e:?}"), None)
        }
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "health" => Some(handle_health(state, req)),
        "workspace.select" => Some(handle_workspace_select(state, req)),
        _ => None,
    }
}
