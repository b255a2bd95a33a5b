use rusqlite::Connection;
use serde_json::Value;

use super::error::HandlerErr;
use super::types::AppState;

pub fn require_db(state: &AppState) -> Result<&Connection, HandlerErr> {
    state
        .db
        .as_ref()
        .ok_or_else(|| HandlerErr::new("no_workspace", "select a workspace first"))
}

pub fn get_required_str(params: &Value, key: &str) -> Result<String, HandlerErr> {
    get_optional_str(params, key).ok_or_else(|| HandlerErr::new("bad_params", format!("missing {}", key)))
}

/// Trimmed string param; blank counts as absent.
pub fn get_optional_str(params: &Value, key: &str) -> Option<String> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

pub fn get_optional_upper(params: &Value, key: &str) -> Option<String> {
    get_optional_str(params, key).map(|s| s.to_uppercase())
}
