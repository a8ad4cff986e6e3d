//! `TotalModel.xlsx` rendering

use pmsheet_core::{RenderError, Renderer};
use pmsheet_plan::ModelSummary;
use rust_xlsxwriter::{Format, FormatBorder, Workbook, Worksheet};

const HEADERS: [&str; 4] = ["Manufacture", "Model", "Description", "Count"];

/// Column width from the longest line in the column
pub fn fitted_width(max_line_len: usize) -> f64 {
    ((max_line_len as f64) * 1.2).floor() + 6.0
}

fn longest_line(text: &str) -> usize {
    text.lines().map(|line| line.chars().count()).max().unwrap_or(0)
}

/// Writes the model summary with a trailing total row
#[derive(Clone, Debug, Default)]
pub struct SummaryRenderer;

impl SummaryRenderer {
    pub fn new() -> Self {
        Self
    }

    fn write_sheet(
        &self,
        sheet: &mut Worksheet,
        summary: &ModelSummary,
    ) -> Result<(), RenderError> {
        let header = Format::new().set_bold().set_border(FormatBorder::Thin);
        let mut widths = [0usize; 4];

        for (col, title) in HEADERS.iter().enumerate() {
            sheet
                .write_with_format(0, col as u16, *title, &header)
                .map_err(xlsx_error)?;
            widths[col] = widths[col].max(longest_line(title));
        }

        let mut row = 1u32;
        for entry in &summary.rows {
            let texts = [&entry.manufacture, &entry.model, &entry.description];
            for (col, text) in texts.iter().enumerate() {
                sheet
                    .write_string(row, col as u16, text.as_str())
                    .map_err(xlsx_error)?;
                widths[col] = widths[col].max(longest_line(text));
            }
            sheet
                .write_number(row, 3, entry.count as f64)
                .map_err(xlsx_error)?;
            widths[3] = widths[3].max(entry.count.to_string().len());
            row += 1;
        }

        let total = summary.total();
        sheet.write_string(row, 2, "Total").map_err(xlsx_error)?;
        sheet.write_number(row, 3, total as f64).map_err(xlsx_error)?;
        widths[2] = widths[2].max("Total".len());
        if total > 0 {
            widths[3] = widths[3].max(total.to_string().len());
        }

        for (col, width) in widths.iter().enumerate() {
            sheet
                .set_column_width(col as u16, fitted_width(*width))
                .map_err(xlsx_error)?;
        }
        Ok(())
    }
}

impl Renderer<ModelSummary> for SummaryRenderer {
    fn render(&self, summary: &ModelSummary) -> Result<Vec<u8>, RenderError> {
        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        sheet.set_name("Sheet1").map_err(xlsx_error)?;
        self.write_sheet(sheet, summary)?;
        workbook.save_to_buffer().map_err(xlsx_error)
    }
}

fn xlsx_error(e: rust_xlsxwriter::XlsxError) -> RenderError {
    RenderError::Workbook(format!("Failed to create summary workbook: {e}"))
}
