use crate::columns::{self, ColumnMapping, Field};
use crate::crew_id::MatchKind;
use crate::db;
use crate::model::{CrewCourseRecord, RowIssue, SourceFile, SourceStatus};
use crate::rows::{self, RowContext};
use crate::workbook::{self, Sheet};
use chrono::{DateTime, Utc};
use rusqlite::{Connection, Transaction, TransactionBehavior};
use serde::Serialize;
use serde_json::json;
use sha2::{Digest, Sha256};
use std::collections::BTreeSet;
use thiserror::Error;
use uuid::Uuid;

/// Reasons an upload is rejected as a whole. Nothing is written when one of
/// these is returned.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("Failed to parse Excel file: {0}")]
    Workbook(String),
    #[error("Excel file has no sheets")]
    NoSheets,
    #[error("Sheet \"{sheet}\" is empty or invalid: {reason}")]
    SheetUnreadable { sheet: String, reason: String },
    #[error("Excel file has no column headers. Please ensure the first row contains column names.")]
    NoHeaders,
    #[error("Excel file is empty or has no data rows")]
    EmptySheet,
    #[error("{} column not found. Available columns: {}", .field.label(), .available.join(", "))]
    MissingColumn { field: Field, available: Vec<String> },
    #[error("No valid rows found in Excel file")]
    NoValidRows { total_rows: usize, errors: Vec<RowIssue> },
    #[error("database error: {0:#}")]
    Store(anyhow::Error),
}

impl From<anyhow::Error> for IngestError {
    fn from(e: anyhow::Error) -> Self {
        IngestError::Store(e)
    }
}

impl From<rusqlite::Error> for IngestError {
    fn from(e: rusqlite::Error) -> Self {
        IngestError::Store(e.into())
    }
}

impl IngestError {
    pub fn code(&self) -> &'static str {
        match self {
            IngestError::Workbook(_) => "workbook_unreadable",
            IngestError::NoSheets => "no_sheets",
            IngestError::SheetUnreadable { .. } => "sheet_unreadable",
            IngestError::NoHeaders => "no_headers",
            IngestError::EmptySheet => "empty_sheet",
            IngestError::MissingColumn { .. } => "missing_column",
            IngestError::NoValidRows { .. } => "no_valid_rows",
            IngestError::Store(_) => "db_write_failed",
        }
    }

    pub fn details(&self) -> Option<serde_json::Value> {
        match self {
            IngestError::SheetUnreadable { sheet, .. } => Some(json!({ "sheet": sheet })),
            IngestError::MissingColumn { field, available } => Some(json!({
                "field": field.key(),
                "availableColumns": available,
            })),
            IngestError::NoValidRows { total_rows, errors } => Some(json!({
                "totalRows": total_rows,
                "errors": errors,
            })),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestSummary {
    pub total_rows: usize,
    pub successful_rows: usize,
    pub error_rows: usize,
    pub warning_rows: usize,
    pub unknown_division_rows: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestOutcome {
    pub source_file_id: String,
    pub file_name: String,
    pub records_written: usize,
    pub is_reupload: bool,
    pub same_content: bool,
    pub message: String,
    pub column_mapping: serde_json::Value,
    pub errors: Vec<RowIssue>,
    pub warnings: Vec<RowIssue>,
    pub summary: IngestSummary,
}

/// Normalized rows of one sheet, ready to be written.
#[derive(Debug, Clone)]
pub struct PreparedBatch {
    pub mapping: ColumnMapping,
    pub records: Vec<CrewCourseRecord>,
    pub errors: Vec<RowIssue>,
    pub warnings: Vec<RowIssue>,
    pub total_rows: usize,
    pub unknown_division_rows: usize,
}

impl PreparedBatch {
    pub fn summary(&self) -> IngestSummary {
        let warned: BTreeSet<usize> = self.warnings.iter().map(|w| w.row).collect();
        IngestSummary {
            total_rows: self.total_rows,
            successful_rows: self.records.len(),
            error_rows: self.errors.len(),
            warning_rows: warned.len(),
            unknown_division_rows: self.unknown_division_rows,
        }
    }
}

/// Resolves columns and normalizes every data row. Pure: no store access.
pub fn prepare_batch(sheet: &Sheet, ctx: &RowContext) -> Result<PreparedBatch, IngestError> {
    let total_rows = sheet.data_rows().count();
    if total_rows == 0 {
        return Err(IngestError::EmptySheet);
    }

    let mapping = columns::resolve_all(&sheet.headers);
    tracing::info!(
        sheet = %sheet.name,
        mapping = %mapping.to_json(),
        "resolved column mapping"
    );
    for field in Field::ALL {
        if field.is_required() && mapping.get(field).is_none() {
            return Err(IngestError::MissingColumn {
                field,
                available: sheet.header_names(),
            });
        }
    }

    let mut records = Vec::with_capacity(total_rows);
    let mut errors = Vec::new();
    let mut warnings = Vec::new();
    let mut unknown_division_rows = 0usize;

    for (i, row) in sheet.data_rows() {
        match rows::normalize(row, &mapping, i, ctx) {
            Ok(n) => {
                if n.id_kind == MatchKind::Unrecognized {
                    unknown_division_rows += 1;
                    tracing::warn!(
                        row = rows::sheet_row_number(ctx.header_row, i),
                        crew_id = %n.record.crew_serial,
                        "could not parse division from crew id, using as-is"
                    );
                }
                warnings.extend(n.warnings);
                records.push(n.record);
            }
            Err(issue) => errors.push(issue),
        }
    }

    if records.is_empty() {
        return Err(IngestError::NoValidRows { total_rows, errors });
    }

    Ok(PreparedBatch {
        mapping,
        records,
        errors,
        warnings,
        total_rows,
        unknown_division_rows,
    })
}

fn sha256_hex(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    digest.iter().map(|b| format!("{:02x}", b)).collect()
}

/// Full upload: identify, parse, resolve, normalize, replace, report.
pub fn ingest(
    conn: &Connection,
    bytes: &[u8],
    file_name: &str,
    uploaded_by: &str,
) -> Result<IngestOutcome, IngestError> {
    ingest_at(conn, bytes, file_name, uploaded_by, Utc::now())
}

pub fn ingest_at(
    conn: &Connection,
    bytes: &[u8],
    file_name: &str,
    uploaded_by: &str,
    ingested_at: DateTime<Utc>,
) -> Result<IngestOutcome, IngestError> {
    let file_id = match db::find_source_file_by_name(conn, file_name)? {
        Some(existing) => {
            tracing::info!(file_id = %existing.file_id, file_name, "reusing existing file id");
            existing.file_id
        }
        None => {
            let id = Uuid::new_v4().to_string();
            tracing::info!(file_id = %id, file_name, "creating new file id");
            id
        }
    };

    let sheet = workbook::read_first_sheet(bytes)?;
    tracing::info!(
        sheet = %sheet.name,
        header_row = sheet.header_row,
        rows = sheet.rows.len(),
        "parsed workbook"
    );

    let ctx = RowContext {
        source_file_id: file_id,
        ingested_at,
        header_row: sheet.header_row,
    };
    let batch = prepare_batch(&sheet, &ctx)?;

    let upload = Upload {
        file_id: ctx.source_file_id,
        file_name,
        uploaded_by,
        ingested_at,
        content_sha256: sha256_hex(bytes),
    };
    persist(conn, upload, batch)
}

struct Upload<'a> {
    file_id: String,
    file_name: &'a str,
    uploaded_by: &'a str,
    ingested_at: DateTime<Utc>,
    content_sha256: String,
}

/// Writes the batch as one immediate transaction. The file-name lookup is
/// repeated under the write lock so concurrent uploads of the same name
/// replace each other whole instead of interleaving.
fn persist(
    conn: &Connection,
    upload: Upload<'_>,
    mut batch: PreparedBatch,
) -> Result<IngestOutcome, IngestError> {
    let tx = Transaction::new_unchecked(conn, TransactionBehavior::Immediate)?;

    let current = db::find_source_file_by_name(&tx, upload.file_name)?;
    let file_id = match &current {
        Some(f) => f.file_id.clone(),
        None => upload.file_id,
    };
    for r in batch.records.iter_mut() {
        r.source_file_id = file_id.clone();
    }

    db::upsert_source_file(
        &tx,
        &SourceFile {
            file_id: file_id.clone(),
            file_name: upload.file_name.to_string(),
            uploaded_at: upload.ingested_at,
            uploaded_by: upload.uploaded_by.to_string(),
            record_count: batch.records.len() as i64,
            status: SourceStatus::Active,
            content_sha256: Some(upload.content_sha256.clone()),
        },
    )?;
    if current.is_some() {
        let removed = db::delete_records_by_source_file_id(&tx, &file_id)?;
        tracing::info!(file_id = %file_id, removed, "deleted previous records");
    }
    let written = db::insert_records(&tx, &batch.records)?;
    tx.commit()?;

    let is_reupload = current.is_some();
    let same_content = current
        .as_ref()
        .and_then(|f| f.content_sha256.as_deref())
        .map(|prev| prev == upload.content_sha256)
        .unwrap_or(false);
    let message = if is_reupload {
        format!(
            "Successfully re-uploaded and updated {} records for existing file: {}",
            written, upload.file_name
        )
    } else {
        format!(
            "Successfully uploaded {} records from new file: {}",
            written, upload.file_name
        )
    };

    let summary = batch.summary();
    tracing::info!(
        file_id = %file_id,
        written,
        errors = summary.error_rows,
        warnings = summary.warning_rows,
        is_reupload,
        "upload stored"
    );

    Ok(IngestOutcome {
        source_file_id: file_id,
        file_name: upload.file_name.to_string(),
        records_written: written,
        is_reupload,
        same_content,
        message,
        column_mapping: batch.mapping.to_json(),
        errors: batch.errors,
        warnings: batch.warnings,
        summary,
    })
}
