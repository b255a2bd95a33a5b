use crate::columns::{ColumnMapping, Field};
use crate::crew_id::{self, MatchKind};
use crate::model::{CrewCourseRecord, RowIssue};
use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, TimeDelta, Utc};

pub const MIN_DUE_YEAR: i32 = 1900;
pub const MAX_DUE_YEAR: i32 = 2100;

const DEFAULT_NAME: &str = "Unknown";
const DEFAULT_DESIGNATION: &str = "UNKNOWN";
const DEFAULT_STATUS: &str = "PENDING";

const MS_PER_DAY: f64 = 86_400_000.0;

/// A spreadsheet cell, classified once before any field logic looks at it.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    NativeDate(NaiveDate),
    NumericSerial(f64),
    Text(String),
    Missing,
}

impl CellValue {
    pub fn is_missing(&self) -> bool {
        matches!(self, CellValue::Missing)
    }

    /// Trimmed text form, or `None` when the cell is blank.
    pub fn as_text(&self) -> Option<String> {
        let s = match self {
            CellValue::NativeDate(d) => d.format("%Y-%m-%d").to_string(),
            CellValue::NumericSerial(n) => format_number(*n),
            CellValue::Text(s) => s.trim().to_string(),
            CellValue::Missing => return None,
        };
        if s.is_empty() {
            None
        } else {
            Some(s)
        }
    }
}

/// Whole numbers print without a fractional part ("1456", not "1456.0").
pub fn format_number(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

/// Converts a spreadsheet day serial to a calendar date. Day 0 is 1899-12-30;
/// the fractional part (time of day) is dropped after conversion.
pub fn serial_to_date(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() {
        return None;
    }
    let ms = serial * MS_PER_DAY;
    if ms.abs() > i64::MAX as f64 {
        return None;
    }
    let delta = TimeDelta::try_milliseconds(ms as i64)?;
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?.and_hms_opt(0, 0, 0)?;
    epoch
        .checked_add_signed(delta)
        .map(|dt| dt.date())
}

const TEXT_DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%d-%m-%Y",
    "%d/%m/%Y",
    "%d.%m.%Y",
    "%d-%b-%Y",
    "%d %b %Y",
    "%d %B %Y",
    "%b %d, %Y",
    "%B %d, %Y",
];

const TEXT_DATETIME_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M"];

/// Best-effort date parsing for free-text cells.
pub fn parse_date_text(s: &str) -> Option<NaiveDate> {
    let t = s.trim();
    if t.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(t) {
        return Some(dt.date_naive());
    }
    for fmt in TEXT_DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(t, fmt) {
            return Some(dt.date());
        }
    }
    TEXT_DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(t, fmt).ok())
}

fn in_due_range(d: NaiveDate) -> bool {
    (MIN_DUE_YEAR..=MAX_DUE_YEAR).contains(&d.year())
}

/// Picks the due date for a cell. Anything unusable becomes `today` together
/// with the warning text to report.
pub fn resolve_due_date(cell: Option<&CellValue>, today: NaiveDate) -> (NaiveDate, Option<&'static str>) {
    match cell {
        Some(CellValue::NativeDate(d)) if in_due_range(*d) => (*d, None),
        Some(CellValue::NativeDate(_)) => (today, Some("Invalid date, using today")),
        Some(CellValue::NumericSerial(n)) => match serial_to_date(*n) {
            Some(d) if in_due_range(d) => (d, None),
            _ => (today, Some("Invalid Excel date, using today")),
        },
        Some(CellValue::Text(s)) if !s.trim().is_empty() => match parse_date_text(s) {
            Some(d) if in_due_range(d) => (d, None),
            _ => (today, Some("Invalid date string, using today")),
        },
        _ => (today, Some("Due date missing, using today")),
    }
}

/// Per-upload values every row needs.
#[derive(Debug, Clone)]
pub struct RowContext {
    pub source_file_id: String,
    pub ingested_at: DateTime<Utc>,
    /// 1-based sheet row of the header; data rows follow it directly.
    pub header_row: usize,
}

#[derive(Debug, Clone)]
pub struct NormalizedRow {
    pub record: CrewCourseRecord,
    pub warnings: Vec<RowIssue>,
    pub id_kind: MatchKind,
}

/// Sheet row number for a 0-based data row.
pub fn sheet_row_number(header_row: usize, data_index: usize) -> usize {
    header_row + 1 + data_index
}

fn cell<'a>(row: &'a [CellValue], mapping: &ColumnMapping, field: Field) -> Option<&'a CellValue> {
    mapping.get(field).and_then(|h| row.get(h.index))
}

fn text_field(row: &[CellValue], mapping: &ColumnMapping, field: Field) -> Option<String> {
    cell(row, mapping, field).and_then(CellValue::as_text)
}

/// Turns one data row into a record. Only a missing identifier drops the row;
/// every other gap is filled with a default, some of them with a warning.
pub fn normalize(
    row: &[CellValue],
    mapping: &ColumnMapping,
    data_index: usize,
    ctx: &RowContext,
) -> Result<NormalizedRow, RowIssue> {
    let row_no = sheet_row_number(ctx.header_row, data_index);
    let mut warnings = Vec::new();

    let Some(raw_id) = text_field(row, mapping, Field::CrewId) else {
        return Err(RowIssue::new(row_no, "Missing Crew ID"));
    };
    let parsed = crew_id::parse(&raw_id);
    if parsed.crew_serial.is_empty() {
        return Err(RowIssue::new(row_no, format!("Invalid Crew ID format: {}", raw_id)));
    }

    let crew_name = match text_field(row, mapping, Field::CrewName) {
        Some(v) => v,
        None => {
            warnings.push(RowIssue::new(row_no, "Crew Name is missing"));
            DEFAULT_NAME.to_string()
        }
    };

    let designation_code = text_field(row, mapping, Field::Designation)
        .map(|v| v.to_uppercase())
        .unwrap_or_else(|| DEFAULT_DESIGNATION.to_string());
    let test_code = text_field(row, mapping, Field::TestCode)
        .map(|v| v.to_uppercase())
        .unwrap_or_else(|| format!("TEST-{}", data_index + 1));
    let status_code = text_field(row, mapping, Field::TestStatus)
        .map(|v| v.to_uppercase())
        .unwrap_or_else(|| DEFAULT_STATUS.to_string());
    let reason = text_field(row, mapping, Field::Reason);

    let (due_date, due_warning) =
        resolve_due_date(cell(row, mapping, Field::DueDate), ctx.ingested_at.date_naive());
    if let Some(msg) = due_warning {
        warnings.push(RowIssue::new(row_no, msg));
    }

    Ok(NormalizedRow {
        record: CrewCourseRecord {
            source_file_id: ctx.source_file_id.clone(),
            division_code: parsed.division_code,
            crew_serial: parsed.crew_serial,
            crew_name,
            designation_code,
            test_code,
            due_date,
            status_code,
            reason,
            created_at: ctx.ingested_at,
        },
        warnings,
        id_kind: parsed.kind,
    })
}
