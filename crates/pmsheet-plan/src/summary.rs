//! Model summary counts

use std::collections::BTreeMap;

use pmsheet_core::{ClassifiedRow, Field};

/// One (Manufacture, Model, Description) combination and its device count
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModelCount {
    pub manufacture: String,
    pub model: String,
    pub description: String,
    pub count: usize,
}

/// Device counts over the whole classified set
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ModelSummary {
    pub rows: Vec<ModelCount>,
    /// Rows left out because one of the three keys was empty
    pub skipped: usize,
}

impl ModelSummary {
    /// Count rows per key, sorted by Description asc, Manufacture asc,
    /// Count desc
    pub fn from_rows<'a, I>(rows: I) -> Self
    where
        I: IntoIterator<Item = &'a ClassifiedRow>,
    {
        let mut counts: BTreeMap<(String, String, String), usize> = BTreeMap::new();
        let mut skipped = 0;

        for row in rows {
            let key_cells = [
                row.get(Field::Manufacture),
                row.get(Field::Model),
                row.get(Field::Description),
            ];
            if key_cells.iter().any(|cell| cell.is_empty()) {
                skipped += 1;
                continue;
            }
            let [manufacture, model, description] = key_cells.map(|cell| cell.to_string());
            *counts.entry((manufacture, model, description)).or_insert(0) += 1;
        }

        let mut rows: Vec<ModelCount> = counts
            .into_iter()
            .map(|((manufacture, model, description), count)| ModelCount {
                manufacture,
                model,
                description,
                count,
            })
            .collect();
        rows.sort_by(|a, b| {
            a.description
                .cmp(&b.description)
                .then_with(|| a.manufacture.cmp(&b.manufacture))
                .then_with(|| b.count.cmp(&a.count))
        });

        Self { rows, skipped }
    }

    pub fn total(&self) -> usize {
        self.rows.iter().map(|r| r.count).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
