use crate::db::{self, RecordFilter, RecordOrder};
use crate::ipc::error::{ok, HandlerErr};
use crate::ipc::helpers::{get_optional_str, get_optional_upper, require_db};
use crate::ipc::types::{AppState, Request};
use crate::model::CrewCourseRecord;
use serde_json::json;

fn handle_excel_files_list(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let conn = require_db(state)?;
    let files = db::list_active_source_files(conn).map_err(HandlerErr::query)?;
    Ok(ok(&req.id, json!({ "files": files })))
}

fn handle_crew_courses_list(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let conn = require_db(state)?;
    let p = &req.params;
    let filter = RecordFilter {
        source_file_id: get_optional_str(p, "sourceFileId"),
        division_code: get_optional_upper(p, "divisionCode"),
        designation_code: get_optional_upper(p, "designationCode"),
        crew_serial: get_optional_str(p, "crewSerial"),
        status_code: get_optional_upper(p, "statusCode"),
    };
    let records = db::find_records(conn, &filter, RecordOrder::NewestFirst).map_err(HandlerErr::query)?;
    Ok(ok(
        &req.id,
        json!({ "count": records.len(), "records": records }),
    ))
}

fn matches_search(r: &CrewCourseRecord, needle: &str) -> bool {
    r.full_crew_id().to_lowercase().contains(needle) || r.crew_name.to_lowercase().contains(needle)
}

fn table_row(sno: usize, r: &CrewCourseRecord) -> serde_json::Value {
    json!({
        "sno": sno,
        "crewId": r.full_crew_id(),
        "crewName": r.crew_name,
        "crewDesignation": r.designation_code,
        "dueDate": r.due_date.format("%d-%m-%Y").to_string(),
        "testCode": r.test_code,
        "statusReason": r.status_code,
        "station": r.division_code,
        "division": r.division_code,
    })
}

/// Flattened rows for the roster table. `station` narrows by division code,
/// since a crew member's station is the prefix of their id.
fn handle_crew_courses_table(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let conn = require_db(state)?;
    let p = &req.params;
    let division = get_optional_upper(p, "station").or_else(|| get_optional_upper(p, "division"));
    let filter = RecordFilter {
        division_code: division,
        designation_code: get_optional_upper(p, "designation"),
        ..RecordFilter::default()
    };
    let needle = get_optional_str(p, "search").map(|s| s.to_lowercase());

    let records = db::find_records(conn, &filter, RecordOrder::NewestFirst).map_err(HandlerErr::query)?;
    let rows: Vec<serde_json::Value> = records
        .iter()
        .filter(|r| needle.as_deref().map(|n| matches_search(r, n)).unwrap_or(true))
        .enumerate()
        .map(|(i, r)| table_row(i + 1, r))
        .collect();

    Ok(ok(&req.id, json!({ "count": rows.len(), "rows": rows })))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let res = match req.method.as_str() {
        "excelFiles.list" => handle_excel_files_list(state, req),
        "crewCourses.list" => handle_crew_courses_list(state, req),
        "crewCourses.table" => handle_crew_courses_table(state, req),
        _ => return None,
    };
    Some(res.unwrap_or_else(|e| e.response(&req.id)))
}
