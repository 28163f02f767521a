use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};

use crate::dates;
use crate::ipc::error::{err, ok};
use crate::ipc::types::AppState;
use crate::metrics::MetricsError;
use crate::model::Id;
use crate::store::{RecordStore, StoreError};

pub struct HandlerErr {
    pub code: &'static str,
    pub message: String,
    pub details: Option<Value>,
}

impl HandlerErr {
    pub fn bad_params(message: impl Into<String>) -> Self {
        Self {
            code: "bad_params",
            message: message.into(),
            details: None,
        }
    }

    /// `db_code` is reported for database failures; validation and lookup
    /// failures keep their own codes.
    pub fn store(e: StoreError, db_code: &'static str) -> Self {
        let details = match &e {
            StoreError::NotFound { kind, id } => Some(json!({ "kind": kind, "id": id })),
            _ => None,
        };
        Self {
            code: e.code(db_code),
            message: e.to_string(),
            details,
        }
    }

    pub fn response(self, id: &str) -> Value {
        err(id, self.code, self.message, self.details)
    }
}

impl From<MetricsError> for HandlerErr {
    fn from(e: MetricsError) -> Self {
        let details = match &e {
            MetricsError::NonFiniteValue { index } => Some(json!({ "index": index })),
        };
        Self {
            code: "contract_violation",
            message: e.to_string(),
            details,
        }
    }
}

pub fn respond(id: &str, result: Result<Value, HandlerErr>) -> Value {
    match result {
        Ok(v) => ok(id, v),
        Err(e) => e.response(id),
    }
}

fn no_workspace() -> HandlerErr {
    HandlerErr {
        code: "no_workspace",
        message: "select a workspace first".to_string(),
        details: None,
    }
}

pub fn store_ref(state: &AppState) -> Result<&dyn RecordStore, HandlerErr> {
    state.store.as_deref().ok_or_else(no_workspace)
}

pub fn store_mut(state: &mut AppState) -> Result<&mut dyn RecordStore, HandlerErr> {
    match state.store.as_deref_mut() {
        Some(store) => Ok(store),
        None => Err(no_workspace()),
    }
}

pub fn required_str<'a>(params: &'a Value, key: &str) -> Result<&'a str, HandlerErr> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .ok_or_else(|| HandlerErr::bad_params(format!("missing {}", key)))
}

pub fn optional_str<'a>(params: &'a Value, key: &str) -> Result<Option<&'a str>, HandlerErr> {
    match params.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.as_str())),
        Some(_) => Err(HandlerErr::bad_params(format!("{} must be a string", key))),
    }
}

pub fn optional_id(params: &Value, key: &str) -> Result<Option<Id>, HandlerErr> {
    match params.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(v) => match v.as_i64() {
            Some(id) if id > 0 => Ok(Some(id)),
            _ => Err(HandlerErr::bad_params(format!(
                "{} must be a positive integer",
                key
            ))),
        },
    }
}

pub fn required_id(params: &Value, key: &str) -> Result<Id, HandlerErr> {
    optional_id(params, key)?.ok_or_else(|| HandlerErr::bad_params(format!("missing {}", key)))
}

pub fn optional_day(params: &Value, key: &str) -> Result<Option<NaiveDate>, HandlerErr> {
    match optional_str(params, key)? {
        None => Ok(None),
        Some(raw) => dates::parse_day(Some(raw))
            .map(Some)
            .ok_or_else(|| HandlerErr::bad_params(format!("{} must be a date", key))),
    }
}

/// The `date` param when given, otherwise the local calendar day.
pub fn today(params: &Value) -> Result<NaiveDate, HandlerErr> {
    Ok(optional_day(params, "date")?.unwrap_or_else(|| chrono::Local::now().date_naive()))
}

/// Deserializes `params[key]` into a write payload.
pub fn payload<T: DeserializeOwned>(params: &Value, key: &str) -> Result<T, HandlerErr> {
    let raw = params
        .get(key)
        .ok_or_else(|| HandlerErr::bad_params(format!("missing {}", key)))?;
    serde_json::from_value(raw.clone())
        .map_err(|e| HandlerErr::bad_params(format!("invalid {}: {}", key, e)))
}

/// Reads one `setup.*` section, or `Null` when nothing has been saved.
pub fn setting_or_null(store: &dyn RecordStore, key: &str) -> Result<Value, HandlerErr> {
    store
        .setting_get(key)
        .map(|v| v.unwrap_or(Value::Null))
        .map_err(|e| HandlerErr::store(e, "db_query_failed"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_params_must_be_positive_integers() {
        let params = json!({ "a": 3, "b": -1, "c": "7", "d": null });
        assert_eq!(required_id(&params, "a").ok(), Some(3));
        assert!(required_id(&params, "b").is_err());
        assert!(required_id(&params, "c").is_err());
        assert_eq!(optional_id(&params, "d").ok(), Some(None));
        let missing = required_id(&params, "zzz").err().map(|e| e.message);
        assert_eq!(missing.as_deref(), Some("missing zzz"));
    }

    #[test]
    fn date_override_and_store_errors() {
        let params = json!({ "date": "2024-03-09" });
        assert_eq!(
            today(&params).ok(),
            NaiveDate::from_ymd_opt(2024, 3, 9)
        );
        assert!(today(&json!({ "date": "soon" })).is_err());

        let e = HandlerErr::store(
            StoreError::NotFound {
                kind: "student",
                id: 4,
            },
            "db_update_failed",
        );
        assert_eq!(e.code, "not_found");
        assert_eq!(e.details, Some(json!({ "kind": "student", "id": 4 })));
        let e = HandlerErr::store(StoreError::Invalid("bad".into()), "db_insert_failed");
        assert_eq!(e.code, "bad_params");
    }
}
