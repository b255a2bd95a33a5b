use crate::columns::Header;
use crate::ingest::IngestError;
use crate::rows::{self, CellValue};
use calamine::{open_workbook_auto_from_rs, Data, Reader};
use std::io::Cursor;

/// First sheet of an uploaded workbook, header row split from data rows.
#[derive(Debug, Clone)]
pub struct Sheet {
    pub name: String,
    /// 1-based sheet row holding the headers (the top of the used range).
    pub header_row: usize,
    pub headers: Vec<Header>,
    /// Data rows in sheet order, blank ones included so row numbers hold.
    pub rows: Vec<Vec<CellValue>>,
}

impl Sheet {
    pub fn header_names(&self) -> Vec<String> {
        self.headers.iter().map(|h| h.text.clone()).collect()
    }

    /// Rows with at least one non-blank cell, paired with their 0-based data index.
    pub fn data_rows(&self) -> impl Iterator<Item = (usize, &[CellValue])> + '_ {
        self.rows
            .iter()
            .enumerate()
            .filter(|(_, cells)| !cells.iter().all(CellValue::is_missing))
            .map(|(i, cells)| (i, cells.as_slice()))
    }
}

pub fn classify(cell: &Data) -> CellValue {
    match cell {
        Data::Empty | Data::Error(_) => CellValue::Missing,
        Data::String(s) => {
            if s.trim().is_empty() {
                CellValue::Missing
            } else {
                CellValue::Text(s.clone())
            }
        }
        Data::Int(n) => CellValue::NumericSerial(*n as f64),
        Data::Float(f) => CellValue::NumericSerial(*f),
        Data::Bool(b) => CellValue::Text(b.to_string()),
        Data::DateTime(dt) => {
            let serial = dt.as_f64();
            if dt.is_duration() {
                return CellValue::NumericSerial(serial);
            }
            match rows::serial_to_date(serial) {
                Some(d) => CellValue::NativeDate(d),
                None => CellValue::NumericSerial(serial),
            }
        }
        Data::DateTimeIso(s) => match rows::parse_date_text(s) {
            Some(d) => CellValue::NativeDate(d),
            None => CellValue::Text(s.clone()),
        },
        Data::DurationIso(s) => CellValue::Text(s.clone()),
    }
}

fn header_text(cell: &Data) -> String {
    match classify(cell) {
        CellValue::Missing => String::new(),
        other => other.as_text().unwrap_or_default(),
    }
}

/// Decodes workbook bytes (xlsx, xlsm, xlsb, xls or ods) and returns the first sheet.
pub fn read_first_sheet(bytes: &[u8]) -> Result<Sheet, IngestError> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))
        .map_err(|e| IngestError::Workbook(e.to_string()))?;

    let names = workbook.sheet_names();
    let Some(name) = names.first().cloned() else {
        return Err(IngestError::NoSheets);
    };

    let range = workbook
        .worksheet_range(&name)
        .map_err(|e| IngestError::SheetUnreadable {
            sheet: name.clone(),
            reason: e.to_string(),
        })?;

    let header_row = range.start().map(|(r, _)| r as usize + 1).unwrap_or(1);
    let mut it = range.rows();
    let headers: Vec<Header> = match it.next() {
        Some(first) => first
            .iter()
            .enumerate()
            .map(|(index, c)| Header {
                index,
                text: header_text(c).trim().to_string(),
            })
            .filter(|h| !h.text.is_empty())
            .collect(),
        None => Vec::new(),
    };
    if headers.is_empty() {
        return Err(IngestError::NoHeaders);
    }

    let rows: Vec<Vec<CellValue>> = it
        .map(|r| r.iter().map(classify).collect::<Vec<_>>())
        .collect();

    Ok(Sheet {
        name,
        header_row,
        headers,
        rows,
    })
}
