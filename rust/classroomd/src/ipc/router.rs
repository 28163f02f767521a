use super::handlers;
use super::types::{AppState, Request};
use crate::ipc::error::err;

type Handler = fn(&mut AppState, &Request) -> Option<serde_json::Value>;

const FAMILIES: &[Handler] = &[
    handlers::core::try_handle,
    handlers::setup::try_handle,
    handlers::students::try_handle,
    handlers::assignments::try_handle,
    handlers::grades::try_handle,
    handlers::attendance::try_handle,
    handlers::analytics::try_handle,
];

pub fn handle_request(state: &mut AppState, req: Request) -> serde_json::Value {
    tracing::debug!(id = %req.id, method = %req.method, "request");
    let mut resp = None;
    for family in FAMILIES {
        if let Some(r) = family(state, &req) {
            resp = Some(r);
            break;
        }
    }
    let Some(resp) = resp else {
        return err(
            &req.id,
            "not_implemented",
            format!("unknown method: {}", req.method),
            None,
        );
    };
    if resp["ok"] == false {
        tracing::warn!(
            method = %req.method,
            code = resp["error"]["code"].as_str().unwrap_or("unknown"),
            "request failed"
        );
    }
    resp
}
