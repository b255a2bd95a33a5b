use crate::crew_id;
use crate::db::{self, RecordFilter, RecordOrder};
use crate::ipc::error::{ok, HandlerErr};
use crate::ipc::helpers::{get_required_str, require_db};
use crate::ipc::types::{AppState, Request};
use serde_json::json;
use std::collections::BTreeMap;

fn handle_divisions_list(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let conn = require_db(state)?;
    let divisions = db::distinct_division_codes(conn).map_err(HandlerErr::query)?;
    let unlisted: Vec<&String> = divisions
        .iter()
        .filter(|d| !crew_id::is_valid_division_code(d))
        .collect();
    Ok(ok(
        &req.id,
        json!({ "divisions": divisions, "unlisted": unlisted }),
    ))
}

fn handle_designations_list(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let conn = require_db(state)?;
    let division = get_required_str(&req.params, "divisionCode")?.to_uppercase();
    let designations = db::distinct_designation_codes(conn, &division).map_err(HandlerErr::query)?;
    Ok(ok(
        &req.id,
        json!({ "divisionCode": division, "designations": designations }),
    ))
}

/// Unique crew members for a division + designation, ordered by serial.
fn handle_crews_list(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let conn = require_db(state)?;
    let division = get_required_str(&req.params, "divisionCode")?.to_uppercase();
    let designation = get_required_str(&req.params, "designationCode")?.to_uppercase();
    let filter = RecordFilter {
        division_code: Some(division),
        designation_code: Some(designation),
        ..RecordFilter::default()
    };
    let records = db::find_records(conn, &filter, RecordOrder::DueDate).map_err(HandlerErr::query)?;

    // First name seen wins for a serial.
    let mut crews: BTreeMap<String, String> = BTreeMap::new();
    for r in records {
        crews.entry(r.crew_serial).or_insert(r.crew_name);
    }
    let crews: Vec<serde_json::Value> = crews
        .into_iter()
        .map(|(crew_id, crew_name)| json!({ "crewId": crew_id, "crewName": crew_name }))
        .collect();

    Ok(ok(&req.id, json!({ "count": crews.len(), "crews": crews })))
}

fn handle_crew_detail(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let conn = require_db(state)?;
    let division = get_required_str(&req.params, "divisionCode")?.to_uppercase();
    let designation = get_required_str(&req.params, "designationCode")?.to_uppercase();
    let crew_id = get_required_str(&req.params, "crewId")?;
    let filter = RecordFilter {
        division_code: Some(division.clone()),
        designation_code: Some(designation.clone()),
        crew_serial: Some(crew_id.clone()),
        ..RecordFilter::default()
    };
    let records = db::find_records(conn, &filter, RecordOrder::DueDate).map_err(HandlerErr::query)?;
    let Some(first) = records.first() else {
        return Err(HandlerErr {
            code: "not_found",
            message: "Crew not found".to_string(),
            details: Some(json!({ "divisionCode": division, "designationCode": designation, "crewId": crew_id })),
        });
    };

    let tests: Vec<serde_json::Value> = records
        .iter()
        .map(|r| {
            json!({
                "testCode": r.test_code,
                "dueDate": r.due_date,
                "status": r.status_code,
                "reason": r.reason,
                "createdAt": r.created_at,
            })
        })
        .collect();

    Ok(ok(
        &req.id,
        json!({
            "crewId": crew_id,
            "crewName": first.crew_name,
            "division": division,
            "designation": designation,
            "tests": tests,
        }),
    ))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let res = match req.method.as_str() {
        "divisions.list" => handle_divisions_list(state, req),
        "divisions.designations" => handle_designations_list(state, req),
        "divisions.crews" => handle_crews_list(state, req),
        "crews.detail" => handle_crew_detail(state, req),
        _ => return None,
    };
    Some(res.unwrap_or_else(|e| e.response(&req.id)))
}
