//! Integration tests: render to bytes, save, read the files back

use calamine::{open_workbook_auto, Data, Reader};
use pmsheet_core::{
    ClassifiedRow, CollectingEmitter, Field, OperatorInfo, Renderer, SourceRow, StatusGroup,
    TemplateProfile,
};
use pmsheet_plan::{ModelSummary, PmDateEngine};
use pmsheet_render::{write_atomic, SummaryRenderer, TemplateRenderer};
use rust_xlsxwriter::{Format, Workbook};
use tempfile::TempDir;

/// Template with a title merge, a merged band row and a footer merge
fn write_template(dir: &TempDir) -> std::path::PathBuf {
    let path = dir.path().join("template.xlsx");
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    let plain = Format::new();
    sheet.merge_range(0, 1, 0, 6, "PM Report", &plain).unwrap();
    sheet.write_string(3, 1, "Hospital: ").unwrap();
    sheet.merge_range(5, 7, 5, 8, "", &plain).unwrap();
    sheet.merge_range(26, 1, 26, 3, "Engineer", &plain).unwrap();
    workbook.save(&path).unwrap();
    path
}

fn device(asset: i64) -> ClassifiedRow {
    ClassifiedRow::new(
        SourceRow::new(asset as usize)
            .with(Field::AssetId, asset)
            .with(Field::Hospital, "Queen Mary")
            .with(Field::Location, "Ward 7")
            .with(Field::Manufacture, "Philips")
            .with(Field::Model, "HeartStart")
            .with(Field::Description, "DEFIBRILLATOR")
            .with(Field::ScheduleDate, "15/01/2025")
            .with(Field::WorkOrderNo, "88001"),
        StatusGroup::Accepted,
    )
}

fn cell(range: &calamine::Range<Data>, row: u32, col: u32) -> Data {
    range.get_value((row, col)).cloned().unwrap_or(Data::Empty)
}

#[test]
fn template_report_round_trip() {
    let dir = TempDir::new().unwrap();
    let template = write_template(&dir);
    let operator = OperatorInfo {
        engineer: Some("Sam Lee".into()),
        ..OperatorInfo::default()
    };
    let renderer = TemplateRenderer::load(
        &template,
        TemplateProfile::dynamic(),
        PmDateEngine::default(),
        operator,
    )
    .unwrap();

    let rows = [device(2002), device(2001)];
    let refs: Vec<&ClassifiedRow> = rows.iter().collect();
    let mut emitter = CollectingEmitter::new();
    let bytes = renderer.render_chunk(&refs, &mut emitter).unwrap();

    let out = dir.path().join("Ward 7.xlsx");
    write_atomic(&out, &bytes).unwrap();

    let mut workbook = open_workbook_auto(&out).unwrap();
    let range = workbook.worksheet_range_at(0).unwrap().unwrap();

    assert_eq!(cell(&range, 3, 1), Data::String("Hospital: Queen Mary".into()));
    assert_eq!(cell(&range, 5, 1), Data::Float(2002.0));
    assert_eq!(cell(&range, 6, 1), Data::Float(2001.0));
    assert_eq!(cell(&range, 5, 9), Data::Float(88001.0));
    assert_eq!(cell(&range, 5, 10), Data::String("Jul-2025".into()));
    assert_eq!(cell(&range, 5, 11), Data::String("    Jan-2025".into()));
    assert_eq!(cell(&range, 26, 4), Data::String("Sam Lee".into()));
    assert_eq!(cell(&range, 0, 1), Data::String("PM Report".into()));
    assert!(emitter.diagnostics.is_empty());

    // Only the band merge is gone
    let book = umya_check::merges(&out);
    assert_eq!(book, vec!["B1:G1".to_string(), "B27:D27".to_string()]);
}

mod umya_check {
    pub fn merges(path: &std::path::Path) -> Vec<String> {
        let book = umya_spreadsheet::reader::xlsx::read(path).unwrap();
        let sheet = book.get_sheet(&0).unwrap();
        let mut ranges: Vec<String> = sheet
            .get_merge_cells()
            .iter()
            .map(|r| r.get_range())
            .collect();
        ranges.sort();
        ranges
    }
}

#[test]
fn renderer_trait_matches_render_chunk() {
    let dir = TempDir::new().unwrap();
    let renderer = TemplateRenderer::load(
        &write_template(&dir),
        TemplateProfile::dynamic(),
        PmDateEngine::default(),
        OperatorInfo::default(),
    )
    .unwrap();
    let rows = [device(1)];
    let refs: Vec<&ClassifiedRow> = rows.iter().collect();
    let bytes = renderer.render(refs.as_slice()).unwrap();
    assert!(bytes.starts_with(b"PK"));
}

#[test]
fn missing_template_is_a_template_error() {
    let result = TemplateRenderer::load(
        std::path::Path::new("/nonexistent/template.xlsx"),
        TemplateProfile::dynamic(),
        PmDateEngine::default(),
        OperatorInfo::default(),
    );
    assert!(matches!(result, Err(pmsheet_core::RenderError::Template(_))));
}

#[test]
fn summary_workbook_contents() {
    let mut rows = Vec::new();
    for (manufacture, model, description, n) in [
        ("M1", "X", "D1", 3),
        ("M1", "Y", "D1", 1),
        ("M2", "X", "D2", 2),
    ] {
        for _ in 0..n {
            rows.push(ClassifiedRow::new(
                SourceRow::new(2)
                    .with(Field::Location, "SiteA")
                    .with(Field::Manufacture, manufacture)
                    .with(Field::Model, model)
                    .with(Field::Description, description),
                StatusGroup::Accepted,
            ));
        }
    }
    let summary = ModelSummary::from_rows(&rows);
    let bytes = SummaryRenderer::new().render(&summary).unwrap();

    let dir = TempDir::new().unwrap();
    let path = dir.path().join("TotalModel.xlsx");
    write_atomic(&path, &bytes).unwrap();

    let mut workbook = open_workbook_auto(&path).unwrap();
    let range = workbook.worksheet_range_at(0).unwrap().unwrap();
    let table: Vec<Vec<String>> = range
        .rows()
        .map(|r| r.iter().map(|c| c.to_string()).collect())
        .collect();

    assert_eq!(
        table,
        vec![
            vec!["Manufacture", "Model", "Description", "Count"],
            vec!["M1", "X", "D1", "3"],
            vec!["M1", "Y", "D1", "1"],
            vec!["M2", "X", "D2", "2"],
            vec!["", "", "Total", "6"],
        ]
    );
}
