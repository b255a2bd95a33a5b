use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    CrewId,
    CrewName,
    Designation,
    TestCode,
    DueDate,
    TestStatus,
    Reason,
}

impl Field {
    pub const ALL: [Field; 7] = [
        Field::CrewId,
        Field::CrewName,
        Field::Designation,
        Field::TestCode,
        Field::DueDate,
        Field::TestStatus,
        Field::Reason,
    ];

    /// Wire name used in upload results.
    pub fn key(self) -> &'static str {
        match self {
            Field::CrewId => "crewId",
            Field::CrewName => "crewName",
            Field::Designation => "designation",
            Field::TestCode => "testCode",
            Field::DueDate => "dueDate",
            Field::TestStatus => "testStatus",
            Field::Reason => "reason",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Field::CrewId => "Crew ID",
            Field::CrewName => "Crew Name",
            Field::Designation => "Designation",
            Field::TestCode => "Test Code",
            Field::DueDate => "Due Date",
            Field::TestStatus => "Test Status",
            Field::Reason => "Reason",
        }
    }

    pub fn is_required(self) -> bool {
        matches!(self, Field::CrewId | Field::CrewName)
    }

    /// Header synonyms in priority order.
    pub fn candidates(self) -> &'static [&'static str] {
        match self {
            Field::CrewId => &[
                "crew id",
                "crewid",
                "crew_id",
                "crew code",
                "station code",
                "stationcode",
                "station_code",
                "station",
                "code",
                "employee code",
                "staff code",
            ],
            Field::CrewName => &[
                "name",
                "member name",
                "membername",
                "member_name",
                "full name",
                "fullname",
                "full_name",
                "employee name",
                "staff name",
                "person name",
                "worker name",
                "crew name",
                "crewname",
            ],
            Field::Designation => &[
                "designation",
                "designation code",
                "designationcode",
                "designation_code",
                "role",
                "position",
            ],
            Field::TestCode => &[
                "test code",
                "testcode",
                "test_code",
                "test",
                "course code",
                "coursecode",
            ],
            Field::DueDate => &[
                "due date",
                "duedate",
                "due_date",
                "deadline",
                "test date",
                "testdate",
            ],
            Field::TestStatus => &[
                "test status",
                "teststatus",
                "test_status",
                "status",
                "test result",
                "testresult",
            ],
            Field::Reason => &["reason", "remarks", "note", "notes", "comment", "comments"],
        }
    }
}

/// One usable header cell: its text and the sheet column it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Header {
    pub index: usize,
    pub text: String,
}

#[derive(Debug, Clone, Default)]
pub struct ColumnMapping {
    slots: [Option<Header>; 7],
}

impl ColumnMapping {
    pub fn get(&self, field: Field) -> Option<&Header> {
        self.slots[field as usize].as_ref()
    }

    pub fn set(&mut self, field: Field, header: Option<Header>) {
        self.slots[field as usize] = header;
    }

    pub fn to_json(&self) -> serde_json::Value {
        let mut out = serde_json::Map::new();
        for field in Field::ALL {
            let v = match self.get(field) {
                Some(h) => serde_json::Value::String(h.text.clone()),
                None => serde_json::Value::Null,
            };
            out.insert(field.key().to_string(), v);
        }
        serde_json::Value::Object(out)
    }
}

fn collapse_ws(s: &str) -> String {
    s.to_lowercase().split_whitespace().collect::<Vec<_>>().join(" ")
}

fn strip_ws(s: &str) -> String {
    s.chars().filter(|c| !c.is_whitespace()).collect()
}

fn strip_separators(s: &str) -> String {
    s.chars()
        .filter(|c| !c.is_whitespace() && *c != '_' && *c != '-')
        .collect()
}

fn tier_matches(tier: u8, header: &str, candidate: &str) -> bool {
    match tier {
        1 => header == candidate,
        2 => strip_ws(header) == strip_ws(candidate),
        3 => strip_separators(header) == strip_separators(candidate),
        _ => header.contains(candidate) || candidate.contains(header),
    }
}

fn token_fallback(field: Field, lower: &str) -> bool {
    match field {
        Field::CrewId => {
            (lower.contains("crew") && lower.contains("id"))
                || (lower.contains("station") && lower.contains("code"))
                || lower == "code"
                || lower == "station"
                || lower == "crew"
        }
        Field::CrewName => {
            lower.contains("name")
                && !lower.contains("file")
                && !lower.contains("user")
                && !lower.contains("login")
        }
        _ => false,
    }
}

/// Resolves one field against the sheet headers.
///
/// Tiers run strongest first (exact, no whitespace, no separators, substring);
/// within a tier the earlier candidate wins, then the earlier header.
pub fn resolve(headers: &[Header], field: Field) -> Option<Header> {
    let normalized: Vec<(String, &Header)> = headers
        .iter()
        .map(|h| (collapse_ws(&h.text), h))
        .filter(|(n, _)| !n.is_empty())
        .collect();

    for tier in 1..=4u8 {
        for candidate in field.candidates() {
            let cand = collapse_ws(candidate);
            if let Some((_, h)) = normalized
                .iter()
                .find(|(n, _)| tier_matches(tier, n, &cand))
            {
                return Some((*h).clone());
            }
        }
    }

    normalized
        .iter()
        .find(|(n, _)| token_fallback(field, n))
        .map(|(_, h)| (*h).clone())
}

pub fn resolve_all(headers: &[Header]) -> ColumnMapping {
    let mut mapping = ColumnMapping::default();
    for field in Field::ALL {
        mapping.set(field, resolve(headers, field));
    }
    mapping
}
