//! # pmsheet-ingest
//!
//! Reading the master PM schedule spreadsheet.
//!
//! This crate provides:
//! - Source workbook loading through calamine (xlsx, xlsm, xls, ods)
//! - Header resolution (fuzzy header text or fixed column letters)
//! - Row extraction with integer coercion of Asset ID / HA Work Order No
//!
//! ## Example
//!
//! ```rust
//! use pmsheet_core::{CellValue, Field, HeaderMatching};
//! use pmsheet_ingest::{extract_rows, HeaderResolver, SourceSheet};
//!
//! let sheet = SourceSheet::from_rows(
//!     &["Asset ID", "Location", "Status"],
//!     vec![vec![CellValue::Float(42.0), "Ward 7".into(), "Accepted".into()]],
//! );
//! let resolver = HeaderResolver::new(&HeaderMatching::default_fuzzy()).unwrap();
//! let rows = extract_rows(&sheet, &resolver.resolve(&sheet.headers)).rows;
//! assert_eq!(rows[0].get(Field::AssetId), &CellValue::Int(42));
//! ```

pub mod headers;
pub mod rows;
pub mod source;

pub use headers::{normalize_header, HeaderResolver, Pattern, ResolvedColumnMap};
pub use rows::{extract_rows, Extraction};
pub use source::{read_source, RawRow, SourceSheet};

use std::path::{Path, PathBuf};

use pmsheet_core::DiagnosticEmitter;
use thiserror::Error;

/// Source reading error; always fatal for the run
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("Cannot open source workbook {path}: {message}")]
    Open { path: PathBuf, message: String },

    #[error("Source workbook {0} has no worksheet")]
    NoWorksheet(PathBuf),

    #[error("Cannot read first worksheet of {path}: {message}")]
    Worksheet { path: PathBuf, message: String },
}

/// Everything read from one source file
#[derive(Clone, Debug)]
pub struct Ingested {
    pub columns: ResolvedColumnMap,
    pub extraction: Extraction,
    /// Data rows in the sheet, blank ones included
    pub rows_read: usize,
}

/// Read a source file, resolve its header row and extract the rows
pub fn ingest(
    path: &Path,
    resolver: &HeaderResolver,
    emitter: &mut dyn DiagnosticEmitter,
) -> Result<Ingested, IngestError> {
    let sheet = read_source(path)?;
    let columns = resolver.resolve_reporting(&sheet.headers, emitter);
    let extraction = extract_rows(&sheet, &columns);
    tracing::debug!(
        rows = extraction.rows.len(),
        blank = extraction.blank_rows,
        "rows extracted"
    );
    Ok(Ingested {
        columns,
        rows_read: sheet.rows.len(),
        extraction,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pmsheet_core::{CollectingEmitter, HeaderMatching};

    #[test]
    fn missing_file_is_an_open_error() {
        let resolver = HeaderResolver::new(&HeaderMatching::default_fuzzy()).unwrap();
        let mut emitter = CollectingEmitter::new();
        let result = ingest(Path::new("/nonexistent/pending.xlsx"), &resolver, &mut emitter);
        assert!(matches!(result, Err(IngestError::Open { .. })));
        assert!(emitter.diagnostics.is_empty());
    }
}
