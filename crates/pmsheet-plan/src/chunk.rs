//! Report pagination
//!
//! A group becomes one or more report files. Rows are sorted by
//! (Model, Asset ID) and cut into chunks of at most `chunk_size`; chunk 0
//! keeps the plain name, later chunks get a letter suffix `(B)`, `(C)`, ...

use std::cmp::Ordering;
use std::collections::HashSet;

use pmsheet_core::config::column_letters;
use pmsheet_core::{ClassifiedRow, Field, GroupKey};

/// Characters not allowed in output file names
const FORBIDDEN: &[char] = &['\\', '/', '*', '?', ':', '"', '<', '>', '|'];

/// Strip forbidden characters and surrounding whitespace from a group key
pub fn sanitize_file_stem(key: &str) -> String {
    key.chars()
        .filter(|c| !FORBIDDEN.contains(c))
        .collect::<String>()
        .trim()
        .to_string()
}

/// File-name suffix of the chunk at `index`: `""`, `"(B)"`, ..., `"(Z)"`,
/// `"(AA)"`, ...
pub fn chunk_suffix(index: usize) -> String {
    if index == 0 {
        String::new()
    } else {
        format!("({})", column_letters(index))
    }
}

fn report_order(a: &ClassifiedRow, b: &ClassifiedRow) -> Ordering {
    a.get(Field::Model)
        .sort_cmp(b.get(Field::Model))
        .then_with(|| a.get(Field::AssetId).sort_cmp(b.get(Field::AssetId)))
}

/// Stable sort by (Model, Asset ID), empty values last
pub fn sort_for_report(rows: &mut [&ClassifiedRow]) {
    rows.sort_by(|a, b| report_order(a, b));
}

/// One output file worth of rows
#[derive(Clone, Debug, PartialEq)]
pub struct ReportChunk<'p, 'a> {
    pub index: usize,
    pub file_name: String,
    pub rows: &'p [&'a ClassifiedRow],
}

/// A group ready for writing: sanitized name and sorted rows
#[derive(Clone, Debug, PartialEq)]
pub struct GroupPlan<'a> {
    pub key: GroupKey,
    pub stem: String,
    pub rows: Vec<&'a ClassifiedRow>,
}

impl<'a> GroupPlan<'a> {
    /// `None` when the key sanitizes to nothing
    pub fn new(key: GroupKey, mut rows: Vec<&'a ClassifiedRow>) -> Option<Self> {
        let stem = sanitize_file_stem(key.as_str());
        if stem.is_empty() {
            return None;
        }
        sort_for_report(&mut rows);
        Some(Self { key, stem, rows })
    }

    /// Number of files this group produces
    pub fn chunk_count(&self, chunk_size: usize) -> usize {
        self.rows.len().div_ceil(chunk_size.max(1))
    }

    pub fn chunks(&self, chunk_size: usize) -> Vec<ReportChunk<'_, 'a>> {
        self.rows
            .chunks(chunk_size.max(1))
            .enumerate()
            .map(|(index, rows)| ReportChunk {
                index,
                file_name: format!("{}{}.xlsx", self.stem, chunk_suffix(index)),
                rows,
            })
            .collect()
    }

    fn file_names(&self, stem: &str, chunk_size: usize) -> Vec<String> {
        (0..self.chunk_count(chunk_size).max(1))
            .map(|index| format!("{stem}{}.xlsx", chunk_suffix(index)).to_lowercase())
            .collect()
    }
}

/// Output file names claimed so far in a run
///
/// Names compare case-insensitively, matching Windows and macOS file systems.
#[derive(Clone, Debug, Default)]
pub struct FileNameRegistry {
    taken: HashSet<String>,
}

impl FileNameRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve a file name written outside any group
    pub fn reserve(&mut self, file_name: &str) {
        self.taken.insert(file_name.to_lowercase());
    }

    /// Reserve every file name of `plan`. When one is already taken the
    /// stem gets a `_2`, `_3`, ... suffix; returns `true` if it was renamed.
    pub fn claim(&mut self, plan: &mut GroupPlan<'_>, chunk_size: usize) -> bool {
        let mut stem = plan.stem.clone();
        let mut attempt = 1;
        loop {
            let names = plan.file_names(&stem, chunk_size);
            if names.iter().all(|name| !self.taken.contains(name)) {
                self.taken.extend(names);
                break;
            }
            attempt += 1;
            stem = format!("{}_{attempt}", plan.stem);
        }
        let renamed = stem != plan.stem;
        plan.stem = stem;
        renamed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pmsheet_core::{CellValue, SourceRow, StatusGroup};
    use pretty_assertions::assert_eq;

    fn device(line: usize, model: &str, asset: impl Into<CellValue>) -> ClassifiedRow {
        let mut row = SourceRow::new(line).with(Field::Location, "SiteA");
        if !model.is_empty() {
            row = row.with(Field::Model, model);
        }
        row.set(Field::AssetId, asset.into());
        ClassifiedRow::new(row, StatusGroup::Accepted)
    }

    #[test]
    fn sanitize_strips_forbidden_characters() {
        assert_eq!(sanitize_file_stem("A/B:C*D"), "ABCD");
        assert_eq!(sanitize_file_stem("  Ward <7> | East  "), "Ward 7  East");
        assert_eq!(sanitize_file_stem("\\/*?:\"<>|"), "");
        assert_eq!(sanitize_file_stem("SiteB_OnHold"), "SiteB_OnHold");
    }

    #[test]
    fn suffixes_follow_spreadsheet_letters() {
        assert_eq!(chunk_suffix(0), "");
        assert_eq!(chunk_suffix(1), "(B)");
        assert_eq!(chunk_suffix(2), "(C)");
        assert_eq!(chunk_suffix(25), "(Z)");
        assert_eq!(chunk_suffix(26), "(AA)");
        assert_eq!(chunk_suffix(27), "(AB)");
    }

    #[test]
    fn sorts_by_model_then_asset_with_empty_last() {
        let rows = vec![
            device(2, "Zoll", 5_i64),
            device(3, "", 1_i64),
            device(4, "Alaris", 30_i64),
            device(5, "Alaris", 4_i64),
            device(6, "Alaris", CellValue::Empty),
        ];
        let mut refs: Vec<&ClassifiedRow> = rows.iter().collect();
        sort_for_report(&mut refs);
        let lines: Vec<usize> = refs.iter().map(|r| r.row.line).collect();
        assert_eq!(lines, vec![5, 4, 6, 2, 3]);
    }

    #[test]
    fn chunks_cover_sorted_rows() {
        let rows: Vec<ClassifiedRow> = (0..45)
            .map(|i| device(i + 2, "M", (100 - i) as i64))
            .collect();
        let key = GroupKey::for_row(&rows[0]);
        let plan = GroupPlan::new(key, rows.iter().collect()).unwrap();

        let chunks = plan.chunks(20);
        assert_eq!(plan.chunk_count(20), 3);
        assert_eq!(chunks.len(), 3);
        assert_eq!(
            chunks.iter().map(|c| c.rows.len()).collect::<Vec<_>>(),
            vec![20, 20, 5]
        );
        assert_eq!(
            chunks.iter().map(|c| c.file_name.as_str()).collect::<Vec<_>>(),
            vec!["SiteA.xlsx", "SiteA(B).xlsx", "SiteA(C).xlsx"]
        );

        let rejoined: Vec<&ClassifiedRow> =
            chunks.iter().flat_map(|c| c.rows.iter().copied()).collect();
        assert_eq!(rejoined, plan.rows);
        assert_eq!(rejoined[0].get(Field::AssetId), &CellValue::Int(56));
    }

    #[test]
    fn empty_stem_has_no_plan() {
        let row = ClassifiedRow::new(
            SourceRow::new(2).with(Field::Location, "???"),
            StatusGroup::Accepted,
        );
        assert!(GroupPlan::new(GroupKey::for_row(&row), vec![&row]).is_none());
    }

    #[test]
    fn clashing_stems_get_numbered() {
        let plan_for = |location: &str| {
            let key = GroupKey::new(&CellValue::from(location), StatusGroup::Accepted);
            GroupPlan::new(key, Vec::new()).unwrap()
        };
        let mut registry = FileNameRegistry::new();

        let mut first = plan_for("A/B");
        assert!(!registry.claim(&mut first, 20));
        assert_eq!(first.stem, "AB");

        let mut second = plan_for("AB");
        assert!(registry.claim(&mut second, 20));
        assert_eq!(second.stem, "AB_2");

        let mut third = plan_for("ab");
        assert!(registry.claim(&mut third, 20));
        assert_eq!(third.stem, "ab_3");

        let mut other = plan_for("SiteB");
        assert!(!registry.claim(&mut other, 20));

        registry.reserve("TotalModel.xlsx");
        let mut summary_lookalike = plan_for("totalmodel");
        assert!(registry.claim(&mut summary_lookalike, 20));
        assert_eq!(summary_lookalike.stem, "totalmodel_2");
    }

    #[test]
    fn chunk_names_are_claimed_too() {
        let rows: Vec<ClassifiedRow> = (0..3)
            .map(|i| device(i + 2, "M", i as i64))
            .collect();
        let mut registry = FileNameRegistry::new();

        let key = GroupKey::for_row(&rows[0]);
        let mut site = GroupPlan::new(key, rows.iter().collect()).unwrap();
        assert!(!registry.claim(&mut site, 2));

        // A location literally named "SiteA(B)" would hit the second chunk
        let key = GroupKey::new(&CellValue::from("SiteA(B)"), StatusGroup::Accepted);
        let mut lookalike = GroupPlan::new(key, vec![&rows[0]]).unwrap();
        assert!(registry.claim(&mut lookalike, 2));
        assert_eq!(lookalike.chunks(2)[0].file_name, "SiteA(B)_2.xlsx");
    }
}
