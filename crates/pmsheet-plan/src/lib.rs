//! # pmsheet-plan
//!
//! Everything between extracted rows and written files.
//!
//! This crate provides:
//! - Row classification into Accepted / On Hold / BESS groups
//! - Grouping by location and status group
//! - Sorting and pagination into report chunks with file names
//! - PM due-date rules
//! - Model summary counts
//!
//! ## Example
//!
//! ```rust
//! use pmsheet_core::{FeatureFlags, Field, OperatorInfo, SourceRow};
//! use pmsheet_plan::{group_rows, Classifier, GroupPlan};
//!
//! let rows = vec![
//!     SourceRow::new(2).with(Field::Location, "Ward 7").with(Field::Status, "Accepted"),
//!     SourceRow::new(3).with(Field::Location, "Ward 7").with(Field::Status, "On Hold"),
//! ];
//! let classifier = Classifier::new(FeatureFlags::default(), true, &OperatorInfo::default());
//! let classified = classifier.classify(rows);
//!
//! let names: Vec<String> = group_rows(&classified.rows)
//!     .into_iter()
//!     .filter_map(|(key, rows)| GroupPlan::new(key, rows))
//!     .flat_map(|plan| {
//!         plan.chunks(20)
//!             .into_iter()
//!             .map(|chunk| chunk.file_name)
//!             .collect::<Vec<_>>()
//!     })
//!     .collect();
//! assert_eq!(names, vec!["Ward 7.xlsx", "Ward 7_OnHold.xlsx"]);
//! ```

pub mod chunk;
pub mod classify;
pub mod group;
pub mod pm_date;
pub mod summary;

pub use chunk::{
    chunk_suffix, sanitize_file_stem, sort_for_report, FileNameRegistry, GroupPlan, ReportChunk,
};
pub use classify::{Classification, Classifier};
pub use group::{group_rows, Groups};
pub use pm_date::{parse_schedule_date, PmDateEngine, PmDateError, PmDates};
pub use summary::{ModelCount, ModelSummary};
