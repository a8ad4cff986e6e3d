//! Template-based device reports
//!
//! Each report chunk starts from a fresh copy of the template workbook (read
//! once per run). The first worksheet is prepared and filled:
//!
//! 1. Orientation set from the profile (landscape for current templates)
//! 2. Merged regions starting inside the device band are unmerged, so every
//!    band cell can take its own value
//! 3. Device rows written from `band_start` down, one per device
//! 4. PM due / schedule dates written next to each device
//! 5. Header and footer cells filled from the chunk's first row and the
//!    operator's details
//!
//! ## Layout (dynamic profile)
//!
//! ```text
//!   B4          "Hospital: " + Hospital
//!   rows 6..25  B Asset ID | C Location | D Remark | E Manufacture | F Model
//!               G Serial No | H Description | I ZT | J HA WO | K PM due
//!               L Schedule | N Service Report Ref
//!   E27 / G27   engineer name / phone
//!   E28 / G28   Caller / Caller Tel
//! ```

use std::io::Cursor;
use std::path::Path;

use pmsheet_core::config::CellRef;
use pmsheet_core::{
    CellValue, ClassifiedRow, Diagnostic, DiagnosticCode, DiagnosticEmitter, Field,
    OperatorInfo, RenderError, Renderer, TemplateProfile, TracingEmitter,
};
use pmsheet_plan::PmDateEngine;
use umya_spreadsheet::{OrientationValues, Spreadsheet, Worksheet};

/// Fills copies of a template workbook with device rows
#[derive(Clone, Debug)]
pub struct TemplateRenderer {
    template: Spreadsheet,
    profile: TemplateProfile,
    pm_dates: PmDateEngine,
    operator: OperatorInfo,
}

impl TemplateRenderer {
    /// Read the template once; every chunk clones it
    pub fn load(
        path: &Path,
        profile: TemplateProfile,
        pm_dates: PmDateEngine,
        operator: OperatorInfo,
    ) -> Result<Self, RenderError> {
        let template = umya_spreadsheet::reader::xlsx::read(path).map_err(|e| {
            RenderError::Template(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_spreadsheet(template, profile, pm_dates, operator)
    }

    pub fn from_spreadsheet(
        template: Spreadsheet,
        profile: TemplateProfile,
        pm_dates: PmDateEngine,
        operator: OperatorInfo,
    ) -> Result<Self, RenderError> {
        if template.get_sheet_collection().is_empty() {
            return Err(RenderError::Template("template has no worksheet".into()));
        }
        Ok(Self {
            template,
            profile,
            pm_dates,
            operator,
        })
    }

    pub fn profile(&self) -> &TemplateProfile {
        &self.profile
    }

    /// Fill one chunk and serialize it to `.xlsx` bytes
    pub fn render_chunk(
        &self,
        rows: &[&ClassifiedRow],
        emitter: &mut dyn DiagnosticEmitter,
    ) -> Result<Vec<u8>, RenderError> {
        let book = self.fill(rows, emitter)?;
        let mut buffer = Cursor::new(Vec::new());
        umya_spreadsheet::writer::xlsx::write_writer(&book, &mut buffer)
            .map_err(|e| RenderError::Workbook(e.to_string()))?;
        Ok(buffer.into_inner())
    }

    /// Fill one chunk into a copy of the template
    pub fn fill(
        &self,
        rows: &[&ClassifiedRow],
        emitter: &mut dyn DiagnosticEmitter,
    ) -> Result<Spreadsheet, RenderError> {
        let mut book = self.template.clone();
        let sheet = book
            .get_sheet_mut(&0)
            .ok_or_else(|| RenderError::Template("template has no worksheet".into()))?;

        let orientation = if self.profile.landscape {
            OrientationValues::Landscape
        } else {
            OrientationValues::Portrait
        };
        sheet.get_page_setup_mut().set_orientation(orientation);

        unmerge_band(sheet, self.profile.band_start, self.profile.band_end);

        let capacity = self.profile.band_height();
        if rows.len() > capacity {
            emitter.emit(Diagnostic::new(
                DiagnosticCode::W003BandOverflow,
                format!(
                    "{} rows exceed the template band of {} rows; extra rows skipped",
                    rows.len(),
                    capacity
                ),
            ));
        }

        for (offset, row) in rows.iter().take(capacity).enumerate() {
            let target = self.profile.band_start + offset as u32;
            self.write_device(sheet, target, row, emitter);
        }

        if let Some(first) = rows.first() {
            self.write_header_cells(sheet, first);
        }

        Ok(book)
    }

    fn write_device(
        &self,
        sheet: &mut Worksheet,
        target_row: u32,
        row: &ClassifiedRow,
        emitter: &mut dyn DiagnosticEmitter,
    ) {
        for (field, column) in &self.profile.device_columns {
            write_value(sheet, *column, target_row, &row.value(*field));
        }

        if self.profile.pm_due_column.is_none() && self.profile.schedule_column.is_none() {
            return;
        }
        match self
            .pm_dates
            .compute(row.get(Field::ScheduleDate), row.get(Field::Description))
        {
            Ok(dates) => {
                if let Some(column) = self.profile.pm_due_column {
                    sheet
                        .get_cell_mut((column, target_row))
                        .set_value_string(dates.due);
                }
                if let Some(column) = self.profile.schedule_column {
                    let text = format!("{}{}", self.profile.schedule_prefix, dates.schedule);
                    sheet
                        .get_cell_mut((column, target_row))
                        .set_value_string(text);
                }
            }
            Err(e) => emitter.emit(Diagnostic::new(
                DiagnosticCode::W001ScheduleDate,
                format!(
                    "source row {} (asset {}): {e}; PM dates left blank",
                    row.row.line,
                    row.get(Field::AssetId)
                ),
            )),
        }
    }

    fn write_header_cells(&self, sheet: &mut Worksheet, first: &ClassifiedRow) {
        let cells = &self.profile.header_cells;

        if let Some(cell) = cells.hospital {
            let hospital = first.get(Field::Hospital);
            if !hospital.is_empty() {
                let existing = sheet.get_value((cell.col, cell.row));
                sheet
                    .get_cell_mut((cell.col, cell.row))
                    .set_value_string(format!("{existing}{hospital}"));
            }
        }
        if let Some(cell) = cells.caller {
            write_at(sheet, cell, first.get(Field::Caller));
        }
        if let Some(cell) = cells.caller_tel {
            write_at(sheet, cell, first.get(Field::CallerTel));
        }
        if let (Some(cell), Some(name)) = (cells.engineer, self.operator.engineer()) {
            write_at(sheet, cell, &CellValue::from(name));
        }
        if let (Some(cell), Some(phone)) = (cells.engineer_phone, self.operator.phone()) {
            write_at(sheet, cell, &CellValue::from(phone));
        }
    }
}

impl<'r> Renderer<[&'r ClassifiedRow]> for TemplateRenderer {
    fn render(&self, input: &[&'r ClassifiedRow]) -> Result<Vec<u8>, RenderError> {
        self.render_chunk(input, &mut TracingEmitter)
    }
}

fn write_at(sheet: &mut Worksheet, cell: CellRef, value: &CellValue) {
    write_value(sheet, cell.col, cell.row, value);
}

/// Write a typed value; empty values leave the template cell untouched
pub fn write_value(sheet: &mut Worksheet, col: u32, row: u32, value: &CellValue) {
    if value.is_empty() {
        return;
    }
    let cell = sheet.get_cell_mut((col, row));
    match value {
        CellValue::Text(s) => {
            cell.set_value_string(s.clone());
        }
        CellValue::Int(n) => {
            cell.set_value_number(*n as f64);
        }
        CellValue::Float(f) => {
            cell.set_value_number(*f);
        }
        CellValue::Bool(b) => {
            cell.set_value_bool(*b);
        }
        CellValue::DateTime(dt) => {
            cell.set_value_string(dt.format("%Y-%m-%d").to_string());
        }
        CellValue::Empty => {}
    }
}

/// Drop every merged region whose first row lies in `start..=end`
pub fn unmerge_band(sheet: &mut Worksheet, start: u32, end: u32) -> usize {
    let merges = sheet.get_merge_cells_mut();
    let before = merges.len();
    merges.retain(|range| match range_start_row(&range.get_range()) {
        Some(row) => !(start..=end).contains(&row),
        None => true,
    });
    before - merges.len()
}

/// First row of an A1 range such as `B6:D6` or `$B$6:$D$6`
pub fn range_start_row(range: &str) -> Option<u32> {
    let first = range.split(':').next()?;
    let digits: String = first
        .chars()
        .skip_while(|c| c.is_ascii_alphabetic() || *c == '$')
        .filter(char::is_ascii_digit)
        .collect();
    digits.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pmsheet_core::{SourceRow, StatusGroup};

    #[test]
    fn start_row_of_a1_ranges() {
        assert_eq!(range_start_row("B6:D6"), Some(6));
        assert_eq!(range_start_row("$AA$12:$AB$13"), Some(12));
        assert_eq!(range_start_row("C25"), Some(25));
        assert_eq!(range_start_row(""), None);
    }

    fn template_book() -> Spreadsheet {
        let mut book = umya_spreadsheet::new_file();
        let sheet = book.get_sheet_mut(&0).unwrap();
        sheet.get_cell_mut("B4").set_value_string("Hospital: ");
        sheet.add_merge_cells("B6:C6");
        sheet.add_merge_cells("E25:F26");
        sheet.add_merge_cells("B2:D2");
        sheet.add_merge_cells("B27:C27");
        book
    }

    fn renderer(profile: TemplateProfile) -> TemplateRenderer {
        let operator = OperatorInfo {
            engineer: Some("Alex Wong".into()),
            phone: Some("5555 0199".into()),
            bess_assets: Vec::new(),
        };
        TemplateRenderer::from_spreadsheet(
            template_book(),
            profile,
            PmDateEngine::default(),
            operator,
        )
        .unwrap()
    }

    fn device(asset: i64, model: &str) -> ClassifiedRow {
        ClassifiedRow::new(
            SourceRow::new(2)
                .with(Field::AssetId, asset)
                .with(Field::Hospital, "Kwong Wah")
                .with(Field::Location, "SiteA")
                .with(Field::Model, model)
                .with(Field::Description, "DEFIBRILLATOR")
                .with(Field::ScheduleDate, "2025-01-15")
                .with(Field::Caller, "Nurse Chan")
                .with(Field::CallerTel, 55550101_i64),
            StatusGroup::OnHold,
        )
    }

    #[test]
    fn unmerges_only_band_regions() {
        let mut book = template_book();
        let sheet = book.get_sheet_mut(&0).unwrap();
        assert_eq!(unmerge_band(sheet, 6, 25), 2);
        let left: Vec<String> = sheet.get_merge_cells().iter().map(|r| r.get_range()).collect();
        assert_eq!(left, vec!["B2:D2".to_string(), "B27:C27".to_string()]);
    }

    #[test]
    fn fills_band_and_header_cells() {
        let renderer = renderer(TemplateProfile::dynamic());
        let rows = [device(1001, "M-200"), device(1002, "M-300")];
        let refs: Vec<&ClassifiedRow> = rows.iter().collect();

        let mut emitter = pmsheet_core::CollectingEmitter::new();
        let book = renderer.fill(&refs, &mut emitter).unwrap();
        let sheet = book.get_sheet(&0).unwrap();

        assert_eq!(sheet.get_value("B6"), "1001");
        assert_eq!(sheet.get_value("B7"), "1002");
        assert_eq!(sheet.get_value("C6"), "SiteA");
        assert_eq!(sheet.get_value("D6"), "On Hold");
        assert_eq!(sheet.get_value("F7"), "M-300");
        assert_eq!(sheet.get_value("K6"), "Jul-2025");
        assert_eq!(sheet.get_value("L6"), "    Jan-2025");
        assert_eq!(sheet.get_value("B4"), "Hospital: Kwong Wah");
        assert_eq!(sheet.get_value("E28"), "Nurse Chan");
        assert_eq!(sheet.get_value("G28"), "55550101");
        assert_eq!(sheet.get_value("E27"), "Alex Wong");
        assert_eq!(sheet.get_value("G27"), "5555 0199");
        assert!(emitter.diagnostics.is_empty());
    }

    #[test]
    fn legacy_profile_skips_pm_columns_and_uses_row_24() {
        let renderer = renderer(TemplateProfile::legacy());
        let rows = [device(7, "X")];
        let refs: Vec<&ClassifiedRow> = rows.iter().collect();
        let mut emitter = pmsheet_core::CollectingEmitter::new();
        let book = renderer.fill(&refs, &mut emitter).unwrap();
        let sheet = book.get_sheet(&0).unwrap();

        assert_eq!(sheet.get_value("B2"), "7");
        assert_eq!(sheet.get_value("K2"), "");
        assert_eq!(sheet.get_value("E24"), "Nurse Chan");
        assert_eq!(sheet.get_value("B4"), "Hospital: ");
        assert_eq!(sheet.get_value("E27"), "");
    }

    #[test]
    fn overflow_and_bad_dates_are_warnings() {
        let profile = TemplateProfile {
            band_end: 7,
            ..TemplateProfile::dynamic()
        };
        let renderer = renderer(profile);
        let mut rows: Vec<ClassifiedRow> = (0..3).map(|i| device(i, "M")).collect();
        rows[1].row.set(Field::ScheduleDate, CellValue::from("soon"));
        let refs: Vec<&ClassifiedRow> = rows.iter().collect();

        let mut emitter = pmsheet_core::CollectingEmitter::new();
        let book = renderer.fill(&refs, &mut emitter).unwrap();
        let sheet = book.get_sheet(&0).unwrap();

        assert_eq!(emitter.count(DiagnosticCode::W003BandOverflow), 1);
        assert_eq!(emitter.count(DiagnosticCode::W001ScheduleDate), 1);
        assert_eq!(sheet.get_value("K6"), "Jul-2025");
        assert_eq!(sheet.get_value("K7"), "");
        assert_eq!(sheet.get_value("B8"), "");
    }
}
