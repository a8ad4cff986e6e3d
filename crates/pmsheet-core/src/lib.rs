//! # pmsheet-core
//!
//! Core domain model and traits for the pmsheet report generator.
//!
//! This crate provides:
//! - Domain types: `CellValue`, `Field`, `SourceRow`, `ClassifiedRow`, `GroupKey`
//! - Run configuration: `PipelineConfig`, `TemplateProfile`, `FeatureFlags`
//! - Diagnostics: `DiagnosticEmitter` and its collecting/line/tracing emitters
//! - Core traits: `Renderer`
//! - Error types
//!
//! ## Example
//!
//! ```rust
//! use pmsheet_core::{CellValue, ClassifiedRow, Field, GroupKey, SourceRow, StatusGroup};
//!
//! let mut row = SourceRow::new(2);
//! row.set(Field::Location, CellValue::from("Ward 7"));
//! row.set(Field::Status, CellValue::from("On Hold"));
//!
//! let classified = ClassifiedRow::new(row, StatusGroup::OnHold);
//! assert_eq!(classified.remark(), Some("On Hold"));
//! assert_eq!(GroupKey::for_row(&classified).as_str(), "Ward 7_OnHold");
//! ```

pub mod config;
pub mod diagnostics;

pub use config::{
    CellRef, ConfigError, FeatureFlags, HeaderCells, HeaderMatching, OperatorInfo,
    PipelineConfig, PmRule, ProfileFile, TemplateProfile,
};
pub use diagnostics::{
    CollectingEmitter, Diagnostic, DiagnosticCode, DiagnosticEmitter, LineEmitter, Severity,
    TracingEmitter,
};

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

// ============================================================================
// Cell Values
// ============================================================================

/// A raw spreadsheet cell as read from the source workbook
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub enum CellValue {
    #[default]
    Empty,
    Text(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    DateTime(NaiveDateTime),
}

static EMPTY_CELL: CellValue = CellValue::Empty;

impl CellValue {
    /// True for missing cells and NaN floats
    pub fn is_empty(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Float(f) => f.is_nan(),
            _ => false,
        }
    }

    /// True when the cell is empty or only whitespace
    pub fn is_blank(&self) -> bool {
        match self {
            CellValue::Text(s) => s.trim().is_empty(),
            other => other.is_empty(),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            CellValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Coerce to an integer where the value allows it.
    ///
    /// Integers are kept, finite floats are truncated toward zero and text is
    /// parsed after trimming. Anything else is returned unchanged.
    pub fn coerce_integer(self) -> CellValue {
        match self {
            CellValue::Float(f) if f.is_finite() && f.abs() < 9.2e18 => {
                CellValue::Int(f.trunc() as i64)
            }
            CellValue::Text(s) => match s.trim().parse::<i64>() {
                Ok(n) => CellValue::Int(n),
                Err(_) => CellValue::Text(s),
            },
            other => other,
        }
    }

    fn sort_rank(&self) -> u8 {
        match self {
            CellValue::Int(_) | CellValue::Float(_) if !self.is_empty() => 0,
            CellValue::Bool(_) => 1,
            CellValue::DateTime(_) => 2,
            CellValue::Text(_) => 3,
            _ => 4,
        }
    }

    /// Total order used when sorting report rows.
    ///
    /// Numbers compare numerically and come first, text compares
    /// lexicographically, empty cells sort last.
    pub fn sort_cmp(&self, other: &CellValue) -> Ordering {
        let rank = self.sort_rank().cmp(&other.sort_rank());
        if rank != Ordering::Equal {
            return rank;
        }
        match (self, other) {
            (CellValue::Int(a), CellValue::Int(b)) => a.cmp(b),
            (CellValue::Int(a), CellValue::Float(b)) => (*a as f64).total_cmp(b),
            (CellValue::Float(a), CellValue::Int(b)) => a.total_cmp(&(*b as f64)),
            (CellValue::Float(a), CellValue::Float(b)) => a.total_cmp(b),
            (CellValue::Bool(a), CellValue::Bool(b)) => a.cmp(b),
            (CellValue::DateTime(a), CellValue::DateTime(b)) => a.cmp(b),
            (CellValue::Text(a), CellValue::Text(b)) => a.cmp(b),
            _ => Ordering::Equal,
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Empty => Ok(()),
            CellValue::Text(s) => f.write_str(s),
            CellValue::Int(n) => write!(f, "{n}"),
            CellValue::Float(n) if n.is_nan() => Ok(()),
            CellValue::Float(n) if n.fract() == 0.0 && n.abs() < 1e15 => write!(f, "{n:.0}"),
            CellValue::Float(n) => write!(f, "{n}"),
            CellValue::Bool(b) => f.write_str(if *b { "TRUE" } else { "FALSE" }),
            CellValue::DateTime(dt) => {
                if dt.time() == chrono::NaiveTime::MIN {
                    write!(f, "{}", dt.format("%Y-%m-%d"))
                } else {
                    write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S"))
                }
            }
        }
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::Text(value.to_string())
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        CellValue::Text(value)
    }
}

impl From<i64> for CellValue {
    fn from(value: i64) -> Self {
        CellValue::Int(value)
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        CellValue::Float(value)
    }
}

impl From<NaiveDateTime> for CellValue {
    fn from(value: NaiveDateTime) -> Self {
        CellValue::DateTime(value)
    }
}

// ============================================================================
// Logical Fields
// ============================================================================

/// Logical column names used throughout the pipeline
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Field {
    AssetId,
    Hospital,
    Location,
    Manufacture,
    Model,
    SerialNo,
    Description,
    Zt,
    WorkOrderNo,
    ScheduleDate,
    ServiceReportRef,
    Caller,
    CallerTel,
    Status,
    /// Derived from the status group, never read from the source
    Remark,
}

impl Field {
    /// Fields that can be resolved from a source header row, in declaration order
    pub const SOURCE: [Field; 14] = [
        Field::AssetId,
        Field::Hospital,
        Field::Location,
        Field::Manufacture,
        Field::Model,
        Field::SerialNo,
        Field::Description,
        Field::Zt,
        Field::WorkOrderNo,
        Field::ScheduleDate,
        Field::ServiceReportRef,
        Field::Caller,
        Field::CallerTel,
        Field::Status,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Field::AssetId => "Asset ID",
            Field::Hospital => "Hospital",
            Field::Location => "Location",
            Field::Manufacture => "Manufacture",
            Field::Model => "Model",
            Field::SerialNo => "Serial No",
            Field::Description => "Description",
            Field::Zt => "ZT",
            Field::WorkOrderNo => "HA Work Order No",
            Field::ScheduleDate => "Schedule Date",
            Field::ServiceReportRef => "Service Report Reference",
            Field::Caller => "Caller",
            Field::CallerTel => "Caller Tel",
            Field::Status => "Status",
            Field::Remark => "Remark",
        }
    }

    /// Whether values of this field are coerced to integers on read
    pub fn is_integer_coerced(self) -> bool {
        matches!(self, Field::AssetId | Field::WorkOrderNo)
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Field {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Field::SOURCE
            .iter()
            .chain(std::iter::once(&Field::Remark))
            .find(|f| f.label().eq_ignore_ascii_case(wanted))
            .copied()
            .ok_or_else(|| ConfigError::UnknownField(s.to_string()))
    }
}

// ============================================================================
// Rows
// ============================================================================

/// One record of the master spreadsheet, keyed by logical field
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SourceRow {
    /// 1-based row number in the source sheet
    pub line: usize,
    values: BTreeMap<Field, CellValue>,
}

impl SourceRow {
    pub fn new(line: usize) -> Self {
        Self {
            line,
            values: BTreeMap::new(),
        }
    }

    /// Builder-style setter
    pub fn with(mut self, field: Field, value: impl Into<CellValue>) -> Self {
        self.set(field, value.into());
        self
    }

    /// Store a value, coercing integer fields. Empty values are not stored.
    pub fn set(&mut self, field: Field, value: CellValue) {
        let value = if field.is_integer_coerced() {
            value.coerce_integer()
        } else {
            value
        };
        if value.is_empty() {
            self.values.remove(&field);
        } else {
            self.values.insert(field, value);
        }
    }

    /// Value of a field; unresolved fields read as `CellValue::Empty`
    pub fn get(&self, field: Field) -> &CellValue {
        self.values.get(&field).unwrap_or(&EMPTY_CELL)
    }

    pub fn is_empty(&self) -> bool {
        self.values.values().all(CellValue::is_blank)
    }
}

/// Classification tag driving grouping and remark text
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum StatusGroup {
    Accepted,
    OnHold,
    Bess,
}

impl StatusGroup {
    pub fn remark(self) -> Option<&'static str> {
        match self {
            StatusGroup::Accepted => None,
            StatusGroup::OnHold => Some("On Hold"),
            StatusGroup::Bess => Some("BESS"),
        }
    }

    /// Suffix appended to the location to build the group key
    pub fn key_suffix(self) -> &'static str {
        match self {
            StatusGroup::Accepted => "",
            StatusGroup::OnHold => "_OnHold",
            StatusGroup::Bess => "_BESS",
        }
    }
}

impl fmt::Display for StatusGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            StatusGroup::Accepted => "Accepted",
            StatusGroup::OnHold => "On Hold",
            StatusGroup::Bess => "BESS",
        })
    }
}

/// A source row that passed classification
#[derive(Clone, Debug, PartialEq)]
pub struct ClassifiedRow {
    pub row: SourceRow,
    pub group: StatusGroup,
}

impl ClassifiedRow {
    pub fn new(row: SourceRow, group: StatusGroup) -> Self {
        Self { row, group }
    }

    pub fn remark(&self) -> Option<&'static str> {
        self.group.remark()
    }

    /// Field value including the derived `Remark`
    pub fn value(&self, field: Field) -> CellValue {
        match field {
            Field::Remark => self.remark().map(CellValue::from).unwrap_or_default(),
            other => self.row.get(other).clone(),
        }
    }

    pub fn get(&self, field: Field) -> &CellValue {
        self.row.get(field)
    }
}

/// Group identifier: the location text plus the status-group suffix
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GroupKey(String);

impl GroupKey {
    pub fn new(location: &CellValue, group: StatusGroup) -> Self {
        Self(format!("{}{}", location, group.key_suffix()))
    }

    pub fn for_row(row: &ClassifiedRow) -> Self {
        Self::new(row.get(Field::Location), row.group)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// Traits
// ============================================================================

/// Output rendering to workbook bytes
pub trait Renderer<Input: ?Sized> {
    /// Render the input into a complete `.xlsx` payload
    fn render(&self, input: &Input) -> Result<Vec<u8>, RenderError>;
}

// ============================================================================
// Errors
// ============================================================================

/// Rendering error
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Workbook error: {0}")]
    Workbook(String),

    #[error("Template error: {0}")]
    Template(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),
}

// ============================================================================
// Tests
// ============================================================================
