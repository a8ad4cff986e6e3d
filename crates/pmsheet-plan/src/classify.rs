//! Row classification
//!
//! Decides, per source row, which status group it belongs to. The rules are
//! applied in priority order and the first hit wins:
//!
//! 1. BESS: feature enabled and the Asset ID is in the operator's BESS list
//! 2. Accepted: `Status == "Accepted"` with a non-blank Location (or any
//!    non-blank Location when the profile has no status filter)
//! 3. On Hold: inclusion enabled, `Status == "On Hold"`, non-blank Location
//!
//! Rows matching none of them are dropped.

use std::collections::{BTreeMap, HashSet};

use pmsheet_core::{
    ClassifiedRow, Diagnostic, DiagnosticCode, DiagnosticEmitter, FeatureFlags, Field,
    OperatorInfo, SourceRow, StatusGroup,
};

const STATUS_ACCEPTED: &str = "Accepted";
const STATUS_ON_HOLD: &str = "On Hold";

/// Classification rules for one run
#[derive(Clone, Debug)]
pub struct Classifier {
    flags: FeatureFlags,
    status_filter: bool,
    bess_assets: HashSet<String>,
}

impl Classifier {
    pub fn new(flags: FeatureFlags, status_filter: bool, operator: &OperatorInfo) -> Self {
        Self {
            flags,
            status_filter,
            bess_assets: operator.bess_assets.iter().cloned().collect(),
        }
    }

    fn is_bess(&self, row: &SourceRow) -> bool {
        if !self.flags.bess_enabled || self.bess_assets.is_empty() {
            return false;
        }
        let asset = row.get(Field::AssetId).to_string();
        let asset = asset.trim();
        !asset.is_empty() && self.bess_assets.contains(asset)
    }

    /// Status group of a row, `None` when it is dropped
    pub fn classify_row(&self, row: &SourceRow) -> Option<StatusGroup> {
        if self.is_bess(row) {
            return Some(StatusGroup::Bess);
        }

        let status = row.get(Field::Status).as_text();
        let has_location = !row.get(Field::Location).is_blank();

        if has_location && (!self.status_filter || status == Some(STATUS_ACCEPTED)) {
            return Some(StatusGroup::Accepted);
        }
        if self.flags.include_on_hold && has_location && status == Some(STATUS_ON_HOLD) {
            return Some(StatusGroup::OnHold);
        }
        None
    }

    pub fn classify(&self, rows: Vec<SourceRow>) -> Classification {
        let mut classification = Classification {
            bess_ids: self.bess_assets.len(),
            bess_enabled: self.flags.bess_enabled,
            ..Classification::default()
        };
        for row in rows {
            match self.classify_row(&row) {
                Some(group) => classification.rows.push(ClassifiedRow::new(row, group)),
                None => {
                    tracing::trace!(line = row.line, "row dropped by classifier");
                    classification.dropped += 1;
                }
            }
        }
        classification
    }
}

/// Result of classifying all rows of a run
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Classification {
    pub rows: Vec<ClassifiedRow>,
    pub dropped: usize,
    /// Distinct BESS asset IDs supplied by the operator
    pub bess_ids: usize,
    pub bess_enabled: bool,
}

impl Classification {
    pub fn count(&self, group: StatusGroup) -> usize {
        self.rows.iter().filter(|r| r.group == group).count()
    }

    pub fn counts(&self) -> BTreeMap<StatusGroup, usize> {
        let mut counts = BTreeMap::new();
        for row in &self.rows {
            *counts.entry(row.group).or_insert(0) += 1;
        }
        counts
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Emit the BESS list size and the per-group counts
    pub fn report(&self, emitter: &mut dyn DiagnosticEmitter) {
        let bess = if self.bess_enabled {
            format!("BESS list: {} asset IDs", self.bess_ids)
        } else {
            format!("BESS list: {} asset IDs (grouping disabled)", self.bess_ids)
        };
        emitter.emit(Diagnostic::new(DiagnosticCode::I002RowsClassified, bess));
        for group in [StatusGroup::Accepted, StatusGroup::OnHold, StatusGroup::Bess] {
            emitter.emit(Diagnostic::new(
                DiagnosticCode::I002RowsClassified,
                format!("{}: {} rows", group, self.count(group)),
            ));
        }
        emitter.emit(Diagnostic::new(
            DiagnosticCode::I002RowsClassified,
            format!("dropped: {} rows", self.dropped),
        ));
    }
}
