use crate::model::{CrewCourseRecord, SourceFile, SourceStatus};
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use rusqlite::types::{Type, Value};
use rusqlite::{params_from_iter, Connection, OptionalExtension, Row};
use std::path::Path;
use std::time::Duration;
use uuid::Uuid;

pub const DB_FILE_NAME: &str = "railedu.sqlite3";

pub fn open_db(workspace: &Path, busy_timeout: Duration) -> anyhow::Result<Connection> {
    std::fs::create_dir_all(workspace)?;
    let db_path = workspace.join(DB_FILE_NAME);
    let conn = Connection::open(db_path)?;
    conn.busy_timeout(busy_timeout)?;
    conn.execute("PRAGMA foreign_keys = ON", [])?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS source_files(
            file_id TEXT PRIMARY KEY,
            file_name TEXT NOT NULL UNIQUE,
            uploaded_at TEXT NOT NULL,
            uploaded_by TEXT NOT NULL,
            record_count INTEGER NOT NULL DEFAULT 0,
            status TEXT NOT NULL DEFAULT 'ACTIVE'
        )",
        [],
    )?;
    // Workspaces created before content hashing lack this column.
    ensure_source_files_sha256(&conn)?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_source_files_status ON source_files(status)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS crew_courses(
            id TEXT PRIMARY KEY,
            source_file_id TEXT NOT NULL,
            division_code TEXT NOT NULL,
            crew_serial TEXT NOT NULL,
            crew_name TEXT NOT NULL,
            designation_code TEXT NOT NULL,
            test_code TEXT NOT NULL,
            due_date TEXT NOT NULL,
            status_code TEXT NOT NULL,
            reason TEXT,
            created_at TEXT NOT NULL,
            FOREIGN KEY(source_file_id) REFERENCES source_files(file_id)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_crew_courses_source ON crew_courses(source_file_id, division_code)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_crew_courses_div_desig ON crew_courses(division_code, designation_code)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_crew_courses_div_desig_serial ON crew_courses(division_code, designation_code, crew_serial)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_crew_courses_div_serial ON crew_courses(division_code, crew_serial)",
        [],
    )?;

    Ok(conn)
}

fn ensure_source_files_sha256(conn: &Connection) -> anyhow::Result<()> {
    if table_has_column(conn, "source_files", "content_sha256")? {
        return Ok(());
    }
    conn.execute("ALTER TABLE source_files ADD COLUMN content_sha256 TEXT", [])?;
    Ok(())
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> anyhow::Result<bool> {
    let sql = format!("PRAGMA table_info({})", table);
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let name: String = row.get(1)?;
        if name == column {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Fixed-width UTC timestamps so TEXT ordering matches time ordering.
fn fmt_ts(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Reads a TEXT timestamp column; a malformed value is a conversion error.
fn get_ts(r: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let s: String = r.get(idx)?;
    DateTime::parse_from_rfc3339(&s)
        .map(|d| d.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn get_day(r: &Row<'_>, idx: usize) -> rusqlite::Result<NaiveDate> {
    let s: String = r.get(idx)?;
    NaiveDate::parse_from_str(&s, "%Y-%m-%d")
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn source_file_from_row(r: &Row<'_>) -> rusqlite::Result<SourceFile> {
    let status: String = r.get(5)?;
    Ok(SourceFile {
        file_id: r.get(0)?,
        file_name: r.get(1)?,
        uploaded_at: get_ts(r, 2)?,
        uploaded_by: r.get(3)?,
        record_count: r.get(4)?,
        status: SourceStatus::parse(&status),
        content_sha256: r.get(6)?,
    })
}

const SOURCE_FILE_COLUMNS: &str =
    "file_id, file_name, uploaded_at, uploaded_by, record_count, status, content_sha256";

pub fn find_source_file_by_name(
    conn: &Connection,
    file_name: &str,
) -> anyhow::Result<Option<SourceFile>> {
    let sql = format!(
        "SELECT {} FROM source_files WHERE file_name = ?",
        SOURCE_FILE_COLUMNS
    );
    let found = conn
        .query_row(&sql, [file_name], source_file_from_row)
        .optional()?;
    Ok(found)
}

pub fn list_active_source_files(conn: &Connection) -> anyhow::Result<Vec<SourceFile>> {
    let sql = format!(
        "SELECT {} FROM source_files WHERE status = 'ACTIVE' ORDER BY uploaded_at DESC",
        SOURCE_FILE_COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let files = stmt
        .query_map([], source_file_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(files)
}

/// Insert-or-replace keyed by `file_id`.
pub fn upsert_source_file(conn: &Connection, file: &SourceFile) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO source_files(file_id, file_name, uploaded_at, uploaded_by, record_count, status, content_sha256)
         VALUES(?, ?, ?, ?, ?, ?, ?)
         ON CONFLICT(file_id) DO UPDATE SET
           file_name = excluded.file_name,
           uploaded_at = excluded.uploaded_at,
           uploaded_by = excluded.uploaded_by,
           record_count = excluded.record_count,
           status = excluded.status,
           content_sha256 = excluded.content_sha256",
        (
            &file.file_id,
            &file.file_name,
            fmt_ts(&file.uploaded_at),
            &file.uploaded_by,
            file.record_count,
            file.status.as_str(),
            &file.content_sha256,
        ),
    )?;
    Ok(())
}

pub fn delete_records_by_source_file_id(conn: &Connection, file_id: &str) -> anyhow::Result<usize> {
    let n = conn.execute(
        "DELETE FROM crew_courses WHERE source_file_id = ?",
        [file_id],
    )?;
    Ok(n)
}

pub fn insert_records(conn: &Connection, records: &[CrewCourseRecord]) -> anyhow::Result<usize> {
    let mut stmt = conn.prepare(
        "INSERT INTO crew_courses(id, source_file_id, division_code, crew_serial, crew_name,
           designation_code, test_code, due_date, status_code, reason, created_at)
         VALUES(?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )?;
    for r in records {
        stmt.execute((
            Uuid::new_v4().to_string(),
            &r.source_file_id,
            &r.division_code,
            &r.crew_serial,
            &r.crew_name,
            &r.designation_code,
            &r.test_code,
            r.due_date.format("%Y-%m-%d").to_string(),
            &r.status_code,
            &r.reason,
            fmt_ts(&r.created_at),
        ))?;
    }
    Ok(records.len())
}

/// Equality filters; unset fields match everything.
#[derive(Debug, Clone, Default)]
pub struct RecordFilter {
    pub source_file_id: Option<String>,
    pub division_code: Option<String>,
    pub designation_code: Option<String>,
    pub crew_serial: Option<String>,
    pub status_code: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOrder {
    NewestFirst,
    DueDate,
}

fn record_from_row(r: &Row<'_>) -> rusqlite::Result<CrewCourseRecord> {
    Ok(CrewCourseRecord {
        source_file_id: r.get(0)?,
        division_code: r.get(1)?,
        crew_serial: r.get(2)?,
        crew_name: r.get(3)?,
        designation_code: r.get(4)?,
        test_code: r.get(5)?,
        due_date: get_day(r, 6)?,
        status_code: r.get(7)?,
        reason: r.get(8)?,
        created_at: get_ts(r, 9)?,
    })
}

pub fn find_records(
    conn: &Connection,
    filter: &RecordFilter,
    order: RecordOrder,
) -> anyhow::Result<Vec<CrewCourseRecord>> {
    let mut sql = String::from(
        "SELECT source_file_id, division_code, crew_serial, crew_name, designation_code,
           test_code, due_date, status_code, reason, created_at
         FROM crew_courses
         WHERE 1 = 1",
    );
    let mut bind: Vec<Value> = Vec::new();
    let clauses = [
        ("source_file_id", &filter.source_file_id),
        ("division_code", &filter.division_code),
        ("designation_code", &filter.designation_code),
        ("crew_serial", &filter.crew_serial),
        ("status_code", &filter.status_code),
    ];
    for (column, value) in clauses {
        if let Some(v) = value {
            sql.push_str(&format!(" AND {} = ?", column));
            bind.push(Value::Text(v.clone()));
        }
    }
    sql.push_str(match order {
        RecordOrder::NewestFirst => " ORDER BY created_at DESC, rowid",
        RecordOrder::DueDate => " ORDER BY due_date, rowid",
    });

    let mut stmt = conn.prepare(&sql)?;
    let records = stmt
        .query_map(params_from_iter(bind), record_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(records)
}

pub fn distinct_division_codes(conn: &Connection) -> anyhow::Result<Vec<String>> {
    let mut stmt =
        conn.prepare("SELECT DISTINCT division_code FROM crew_courses ORDER BY division_code")?;
    let codes = stmt
        .query_map([], |r| r.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(codes)
}

pub fn distinct_designation_codes(conn: &Connection, division_code: &str) -> anyhow::Result<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT DISTINCT designation_code
         FROM crew_courses
         WHERE division_code = ?
         ORDER BY designation_code",
    )?;
    let codes = stmt
        .query_map([division_code], |r| r.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(codes)
}
