//! Source workbook reading
//!
//! The first worksheet is loaded through calamine and flattened into a
//! header row plus raw data rows. Column positions are absolute (column `A`
//! is index 0) even when the used range starts further right, so fixed
//! column letters keep their meaning.

use std::path::{Path, PathBuf};

use calamine::{open_workbook_auto, Data, Range, Reader};
use chrono::{NaiveDate, NaiveDateTime};
use pmsheet_core::CellValue;

use crate::IngestError;

/// One data row of the source sheet
#[derive(Clone, Debug, PartialEq)]
pub struct RawRow {
    /// 1-based sheet row number
    pub line: usize,
    pub cells: Vec<CellValue>,
}

impl RawRow {
    pub fn cell(&self, column: usize) -> &CellValue {
        static EMPTY: CellValue = CellValue::Empty;
        self.cells.get(column).unwrap_or(&EMPTY)
    }
}

/// The first worksheet of a source workbook
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SourceSheet {
    /// Header text per absolute column; blank for columns without a header
    pub headers: Vec<String>,
    pub rows: Vec<RawRow>,
}

impl SourceSheet {
    /// Build a sheet from in-memory values; rows are numbered from line 2
    pub fn from_rows(headers: &[&str], rows: Vec<Vec<CellValue>>) -> Self {
        Self {
            headers: headers.iter().map(|h| (*h).to_string()).collect(),
            rows: rows
                .into_iter()
                .enumerate()
                .map(|(i, cells)| RawRow { line: i + 2, cells })
                .collect(),
        }
    }

    /// Number of columns covered by the header row
    pub fn width(&self) -> usize {
        self.headers.len()
    }

    /// Convert a calamine range; its first row is the header
    pub fn from_range(range: &Range<Data>) -> Self {
        let Some((start_row, start_col)) = range.start() else {
            return Self::default();
        };
        let offset = start_col as usize;

        let mut rows = range.rows();
        let headers = match rows.next() {
            Some(header) => std::iter::repeat(String::new())
                .take(offset)
                .chain(header.iter().map(|cell| convert_cell(cell).to_string()))
                .collect(),
            None => Vec::new(),
        };

        let rows = rows
            .enumerate()
            .map(|(i, cells)| RawRow {
                line: start_row as usize + i + 2,
                cells: std::iter::repeat(CellValue::Empty)
                    .take(offset)
                    .chain(cells.iter().map(convert_cell))
                    .collect(),
            })
            .collect();

        Self { headers, rows }
    }
}

/// Open a workbook (xlsx, xlsm, xls, ods) and read its first worksheet
pub fn read_source(path: &Path) -> Result<SourceSheet, IngestError> {
    let mut workbook = open_workbook_auto(path).map_err(|e| IngestError::Open {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| IngestError::NoWorksheet(PathBuf::from(path)))?
        .map_err(|e| IngestError::Worksheet {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

    let sheet = SourceSheet::from_range(&range);
    tracing::debug!(
        path = %path.display(),
        columns = sheet.width(),
        rows = sheet.rows.len(),
        "source sheet loaded"
    );
    Ok(sheet)
}

/// Map a calamine cell to the pipeline's cell model
pub fn convert_cell(cell: &Data) -> CellValue {
    match cell {
        Data::Empty | Data::Error(_) => CellValue::Empty,
        Data::String(s) => CellValue::Text(s.clone()),
        Data::Int(n) => CellValue::Int(*n),
        Data::Float(f) => CellValue::Float(*f),
        Data::Bool(b) => CellValue::Bool(*b),
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(value) => CellValue::DateTime(value),
            None => CellValue::Float(dt.as_f64()),
        },
        Data::DateTimeIso(s) => parse_iso(s)
            .map(CellValue::DateTime)
            .unwrap_or_else(|| CellValue::Text(s.clone())),
        Data::DurationIso(s) => CellValue::Text(s.clone()),
    }
}

fn parse_iso(s: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}
