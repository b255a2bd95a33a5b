use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SourceStatus {
    Active,
    Inactive,
}

impl SourceStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            SourceStatus::Active => "ACTIVE",
            SourceStatus::Inactive => "INACTIVE",
        }
    }

    pub fn parse(s: &str) -> Self {
        if s.eq_ignore_ascii_case("INACTIVE") {
            SourceStatus::Inactive
        } else {
            SourceStatus::Active
        }
    }
}

/// One uploaded spreadsheet. `file_name` is the natural key for re-uploads.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceFile {
    pub file_id: String,
    pub file_name: String,
    pub uploaded_at: DateTime<Utc>,
    pub uploaded_by: String,
    pub record_count: i64,
    pub status: SourceStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_sha256: Option<String>,
}

/// One test obligation for one crew member, owned by a `SourceFile`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CrewCourseRecord {
    pub source_file_id: String,
    pub division_code: String,
    pub crew_serial: String,
    pub crew_name: String,
    pub designation_code: String,
    pub test_code: String,
    pub due_date: NaiveDate,
    pub status_code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl CrewCourseRecord {
    pub fn full_crew_id(&self) -> String {
        format!("{}{}", self.division_code, self.crew_serial)
    }
}

/// A per-row diagnostic. `row` is the 1-based sheet row (header is row 1).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowIssue {
    pub row: usize,
    pub message: String,
}

impl RowIssue {
    pub fn new(row: usize, message: impl Into<String>) -> Self {
        Self {
            row,
            message: message.into(),
        }
    }
}
