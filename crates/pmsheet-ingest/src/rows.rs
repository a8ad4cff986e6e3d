//! Row extraction

use pmsheet_core::{Field, SourceRow};

use crate::headers::ResolvedColumnMap;
use crate::source::SourceSheet;

/// Rows built from a sheet
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Extraction {
    pub rows: Vec<SourceRow>,
    /// Data rows skipped because every resolved cell was empty
    pub blank_rows: usize,
}

/// Build a [`SourceRow`] per data row.
///
/// Each resolved field reads its column (integer coercion applies to Asset
/// ID and HA Work Order No); unresolved fields stay empty.
pub fn extract_rows(sheet: &SourceSheet, columns: &ResolvedColumnMap) -> Extraction {
    let mut extraction = Extraction::default();
    for raw in &sheet.rows {
        let mut row = SourceRow::new(raw.line);
        for (field, column) in columns.iter() {
            if field == Field::Remark {
                continue;
            }
            row.set(field, raw.cell(column).clone());
        }
        if row.is_empty() {
            extraction.blank_rows += 1;
        } else {
            extraction.rows.push(row);
        }
    }
    extraction
}
