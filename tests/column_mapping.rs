#[path = "../src/columns.rs"]
mod columns;

use columns::{resolve, resolve_all, Field, Header};

fn headers(names: &[&str]) -> Vec<Header> {
    names
        .iter()
        .enumerate()
        .map(|(index, text)| Header {
            index,
            text: text.to_string(),
        })
        .collect()
}

fn resolved_text(names: &[&str], field: Field) -> Option<String> {
    resolve(&headers(names), field).map(|h| h.text)
}

#[test]
fn identifier_header_is_case_and_whitespace_insensitive() {
    for name in ["Crew ID", "crewid", "CREW_ID", " Crew   ID "] {
        let h = resolve(&headers(&["Member Name", name, "Due Date"]), Field::CrewId)
            .unwrap_or_else(|| panic!("{:?} did not resolve", name));
        assert_eq!(h.index, 1);
        assert_eq!(h.text, name);
    }
}

#[test]
fn scenario_headers_resolve_expected_fields() {
    let mapping = resolve_all(&headers(&["Station Code", "Member Name", "Due Date"]));
    assert_eq!(mapping.get(Field::CrewId).map(|h| h.index), Some(0));
    assert_eq!(mapping.get(Field::CrewName).map(|h| h.index), Some(1));
    assert_eq!(mapping.get(Field::DueDate).map(|h| h.index), Some(2));
    assert!(mapping.get(Field::Designation).is_none());
    assert!(mapping.get(Field::TestCode).is_none());
    assert!(mapping.get(Field::TestStatus).is_none());
    assert!(mapping.get(Field::Reason).is_none());
}

#[test]
fn exact_match_beats_earlier_substring_match() {
    // "Station Name" would match "station" by substring, but "Station Code"
    // matches a candidate exactly.
    assert_eq!(
        resolved_text(&["Station Name", "Station Code"], Field::CrewId).as_deref(),
        Some("Station Code")
    );
}

#[test]
fn earlier_candidate_wins_within_a_tier() {
    // Both exact; "test status" is listed before "status".
    assert_eq!(
        resolved_text(&["Status", "Test Status"], Field::TestStatus).as_deref(),
        Some("Test Status")
    );
}

#[test]
fn separator_insensitive_tier() {
    assert_eq!(
        resolved_text(&["due-date"], Field::DueDate).as_deref(),
        Some("due-date")
    );
    assert_eq!(
        resolved_text(&["Designation-Code"], Field::Designation).as_deref(),
        Some("Designation-Code")
    );
}

#[test]
fn substring_tier_matches_decorated_headers() {
    assert_eq!(
        resolved_text(&["Remarks (optional)"], Field::Reason).as_deref(),
        Some("Remarks (optional)")
    );
    assert_eq!(
        resolved_text(&["Next Deadline"], Field::DueDate).as_deref(),
        Some("Next Deadline")
    );
}

#[test]
fn exact_name_header_beats_filename_column() {
    assert_eq!(
        resolved_text(&["Filename", "Crew Name"], Field::CrewName).as_deref(),
        Some("Crew Name")
    );
    assert_eq!(
        resolved_text(&["Employee Surname"], Field::CrewName).as_deref(),
        Some("Employee Surname")
    );
}

#[test]
fn identifier_token_fallback() {
    assert_eq!(
        resolved_text(&["ID of Crew"], Field::CrewId).as_deref(),
        Some("ID of Crew")
    );
}

#[test]
fn blank_headers_are_ignored() {
    let h = resolve(&headers(&["", "   ", "Crew ID"]), Field::CrewId).expect("crew id");
    assert_eq!(h.index, 2);
}

#[test]
fn no_match_returns_none() {
    assert!(resolve(&headers(&["Alpha", "Beta"]), Field::CrewId).is_none());
    assert!(resolve(&headers(&[]), Field::CrewName).is_none());
}

#[test]
fn mapping_json_uses_wire_keys() {
    let mapping = resolve_all(&headers(&["Crew ID", "Crew Name"]));
    let v = mapping.to_json();
    assert_eq!(v["crewId"], "Crew ID");
    assert_eq!(v["crewName"], "Crew Name");
    assert!(v["dueDate"].is_null());
    assert!(v["reason"].is_null());
}

#[test]
fn only_identifier_and_name_are_required() {
    let required: Vec<Field> = Field::ALL.into_iter().filter(|f| f.is_required()).collect();
    assert_eq!(required, vec![Field::CrewId, Field::CrewName]);
}
