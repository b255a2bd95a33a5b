use crate::ingest;
use crate::ipc::error::{ok, HandlerErr};
use crate::ipc::helpers::{get_optional_str, require_db};
use crate::ipc::types::{AppState, Request};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde_json::json;
use std::path::Path;

struct Payload {
    file_name: String,
    bytes: Vec<u8>,
}

fn read_payload(params: &serde_json::Value) -> Result<Payload, HandlerErr> {
    let file_name = get_optional_str(params, "fileName");
    let file_path = get_optional_str(params, "filePath");
    let encoded = get_optional_str(params, "contentBase64");

    if file_path.is_some() && encoded.is_some() {
        return Err(HandlerErr::new(
            "bad_params",
            "send either filePath or contentBase64, not both",
        ));
    }

    if let Some(path) = file_path {
        let bytes = std::fs::read(&path).map_err(|e| HandlerErr {
            code: "file_read_failed",
            message: e.to_string(),
            details: Some(json!({ "filePath": path })),
        })?;
        let file_name = file_name.or_else(|| {
            Path::new(&path)
                .file_name()
                .and_then(|s| s.to_str())
                .map(|s| s.to_string())
        });
        let Some(file_name) = file_name else {
            return Err(HandlerErr::new("bad_params", "missing fileName"));
        };
        return Ok(Payload { file_name, bytes });
    }

    let Some(encoded) = encoded else {
        return Err(HandlerErr::new("bad_params", "missing filePath or contentBase64"));
    };
    let Some(file_name) = file_name else {
        return Err(HandlerErr::new("bad_params", "missing fileName"));
    };
    let bytes = STANDARD
        .decode(encoded.as_bytes())
        .map_err(|e| HandlerErr::new("bad_params", format!("contentBase64: {}", e)))?;
    Ok(Payload { file_name, bytes })
}

fn handle_excel_upload(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let conn = require_db(state)?;
    let payload = read_payload(&req.params)?;
    let uploaded_by = get_optional_str(&req.params, "uploadedBy")
        .unwrap_or_else(|| state.config.default_uploader.clone());

    tracing::info!(
        file_name = %payload.file_name,
        bytes = payload.bytes.len(),
        uploaded_by = %uploaded_by,
        "excel upload received"
    );

    match ingest::ingest(conn, &payload.bytes, &payload.file_name, &uploaded_by) {
        Ok(outcome) => serde_json::to_value(&outcome)
            .map(|v| ok(&req.id, v))
            .map_err(|e| HandlerErr::new("internal", e.to_string())),
        Err(e) => {
            if matches!(e, ingest::IngestError::Store(_)) {
                tracing::error!(file_name = %payload.file_name, error = %e, "upload failed");
            } else {
                tracing::warn!(file_name = %payload.file_name, error = %e, "upload rejected");
            }
            Err(e.into())
        }
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let res = match req.method.as_str() {
        "excel.upload" => handle_excel_upload(state, req),
        _ => return None,
    };
    Some(res.unwrap_or_else(|e| e.response(&req.id)))
}
