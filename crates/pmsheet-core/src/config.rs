//! Run configuration
//!
//! Everything that used to be a module-level constant in the old scripts
//! (template coordinates, header rules, PM offsets, feature toggles) lives
//! here and is passed explicitly into the pipeline.
//!
//! A [`TemplateProfile`] describes one template layout: how source columns
//! are located, where the device band sits, and which fixed cells receive
//! header/footer metadata. Three built-in profiles cover the known template
//! versions; a [`ProfileFile`] (deserialized from TOML by the host) can start
//! from any of them and override individual settings.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::Field;

/// Default number of device rows per generated report
pub const DEFAULT_CHUNK_SIZE: usize = 20;

/// Default PM interval in months when no keyword rule matches
pub const DEFAULT_PM_OFFSET: u32 = 12;

/// File name of the summary workbook
pub const SUMMARY_FILE_NAME: &str = "TotalModel.xlsx";

// ============================================================================
// Errors
// ============================================================================

/// Invalid configuration, detected before any file is touched
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Unknown field name: {0}")]
    UnknownField(String),

    #[error("Invalid header pattern {pattern:?} for {field}: {reason}")]
    InvalidPattern {
        field: String,
        pattern: String,
        reason: String,
    },

    #[error("Invalid column letter: {0:?}")]
    InvalidColumnLetter(String),

    #[error("Chunk size must be at least 1")]
    ZeroChunkSize,

    #[error("Invalid device band: rows {start}..={end}")]
    InvalidBand { start: u32, end: u32 },

    #[error("Invalid cell coordinate: row {row}, column {col} (both are 1-based)")]
    InvalidCell { row: u32, col: u32 },

    #[error("Unknown template profile: {0} (expected dynamic, fixed or legacy)")]
    UnknownProfile(String),
}

// ============================================================================
// Column letters
// ============================================================================

/// Convert spreadsheet column letters (`A`, `K`, `EV`) to a 0-based index
pub fn column_index(letters: &str) -> Result<usize, ConfigError> {
    let trimmed = letters.trim();
    if trimmed.is_empty() || trimmed.len() > 3 {
        return Err(ConfigError::InvalidColumnLetter(letters.to_string()));
    }
    let mut index = 0usize;
    for c in trimmed.chars() {
        if !c.is_ascii_alphabetic() {
            return Err(ConfigError::InvalidColumnLetter(letters.to_string()));
        }
        index = index * 26 + (c.to_ascii_uppercase() as usize - 'A' as usize + 1);
    }
    Ok(index - 1)
}

/// Convert a 0-based column index back to letters (`0` -> `A`, `151` -> `EV`)
pub fn column_letters(index: usize) -> String {
    let mut n = index + 1;
    let mut letters = Vec::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push((b'A' + rem as u8) as char);
        n = (n - 1) / 26;
    }
    letters.iter().rev().collect()
}

// ============================================================================
// Template profile
// ============================================================================

/// A fixed cell in the template (1-based row and column)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellRef {
    pub row: u32,
    pub col: u32,
}

impl CellRef {
    pub const fn new(row: u32, col: u32) -> Self {
        Self { row, col }
    }
}

/// Header/footer cells filled from the first row of each chunk
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderCells {
    /// Hospital is appended to the text already in this cell
    pub hospital: Option<CellRef>,
    pub caller: Option<CellRef>,
    pub caller_tel: Option<CellRef>,
    pub engineer: Option<CellRef>,
    pub engineer_phone: Option<CellRef>,
}

/// How logical fields are located in the source sheet
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HeaderMatching {
    /// Match header text against patterns, in rule order
    Fuzzy(Vec<(Field, Vec<String>)>),
    /// Fixed spreadsheet column letters
    Fixed(Vec<(Field, String)>),
}

impl HeaderMatching {
    /// Header rules of the dynamic template.
    ///
    /// `Caller` is anchored so it does not swallow a preceding
    /// "Caller Tel" column.
    pub fn default_fuzzy() -> Self {
        let rule = |field: Field, pattern: &str| (field, vec![pattern.to_string()]);
        HeaderMatching::Fuzzy(vec![
            rule(Field::AssetId, "asset id"),
            rule(Field::Hospital, "hospital"),
            rule(Field::Location, "location"),
            rule(Field::Manufacture, "manufacture"),
            rule(Field::Model, "model"),
            rule(Field::SerialNo, "serial no"),
            rule(Field::Description, "description"),
            rule(Field::Zt, "zt"),
            rule(Field::WorkOrderNo, "ha work order no"),
            rule(Field::ScheduleDate, "schedule date"),
            rule(Field::ServiceReportRef, "service report reference"),
            rule(Field::Caller, "^caller$"),
            rule(Field::CallerTel, "caller tel"),
            rule(Field::Status, "^status$"),
        ])
    }

    fn letters(pairs: &[(Field, &str)]) -> Self {
        HeaderMatching::Fixed(
            pairs
                .iter()
                .map(|(field, letter)| (*field, (*letter).to_string()))
                .collect(),
        )
    }

    /// Column letters of the pending-report export used by the fixed template
    pub fn fixed_letters() -> Self {
        Self::letters(&[
            (Field::AssetId, "D"),
            (Field::Hospital, "F"),
            (Field::Location, "K"),
            (Field::Manufacture, "L"),
            (Field::Model, "M"),
            (Field::SerialNo, "N"),
            (Field::Description, "O"),
            (Field::Zt, "EV"),
            (Field::WorkOrderNo, "R"),
            (Field::ScheduleDate, "T"),
            (Field::ServiceReportRef, "U"),
            (Field::Caller, "I"),
            (Field::CallerTel, "J"),
        ])
    }

    /// Column letters of the first export format (no hospital or schedule date)
    pub fn legacy_letters() -> Self {
        Self::letters(&[
            (Field::AssetId, "D"),
            (Field::Location, "K"),
            (Field::Manufacture, "L"),
            (Field::Model, "M"),
            (Field::SerialNo, "N"),
            (Field::Description, "O"),
            (Field::Zt, "EV"),
            (Field::WorkOrderNo, "R"),
            (Field::ServiceReportRef, "U"),
            (Field::Caller, "I"),
            (Field::CallerTel, "J"),
        ])
    }

    fn validate(&self) -> Result<(), ConfigError> {
        match self {
            HeaderMatching::Fuzzy(rules) => {
                for (field, _) in rules {
                    if *field == Field::Remark {
                        return Err(ConfigError::UnknownField(field.label().to_string()));
                    }
                }
            }
            HeaderMatching::Fixed(letters) => {
                for (field, letter) in letters {
                    if *field == Field::Remark {
                        return Err(ConfigError::UnknownField(field.label().to_string()));
                    }
                    column_index(letter)?;
                }
            }
        }
        Ok(())
    }
}

/// Layout of one template version
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TemplateProfile {
    pub name: String,
    pub headers: HeaderMatching,
    /// Require `Status == "Accepted"`; without it any located row is accepted
    pub status_filter: bool,
    /// First device row (1-based, inclusive)
    pub band_start: u32,
    /// Last device row (1-based, inclusive)
    pub band_end: u32,
    pub landscape: bool,
    /// Target column (1-based) per written field
    pub device_columns: Vec<(Field, u32)>,
    pub pm_due_column: Option<u32>,
    pub schedule_column: Option<u32>,
    /// Written in front of the formatted schedule date
    pub schedule_prefix: String,
    pub header_cells: HeaderCells,
}

fn default_device_columns(with_remark: bool) -> Vec<(Field, u32)> {
    let mut columns = vec![
        (Field::AssetId, 2),
        (Field::Location, 3),
        (Field::Remark, 4),
        (Field::Manufacture, 5),
        (Field::Model, 6),
        (Field::SerialNo, 7),
        (Field::Description, 8),
        (Field::Zt, 9),
        (Field::WorkOrderNo, 10),
        (Field::ServiceReportRef, 14),
    ];
    if !with_remark {
        columns.retain(|(field, _)| *field != Field::Remark);
    }
    columns
}

impl TemplateProfile {
    /// Current template: header-text matching, band rows 6-25
    pub fn dynamic() -> Self {
        Self {
            name: "dynamic".into(),
            headers: HeaderMatching::default_fuzzy(),
            status_filter: true,
            band_start: 6,
            band_end: 25,
            landscape: true,
            device_columns: default_device_columns(true),
            pm_due_column: Some(11),
            schedule_column: Some(12),
            schedule_prefix: "    ".into(),
            header_cells: HeaderCells {
                hospital: Some(CellRef::new(4, 2)),
                caller: Some(CellRef::new(28, 5)),
                caller_tel: Some(CellRef::new(28, 7)),
                engineer: Some(CellRef::new(27, 5)),
                engineer_phone: Some(CellRef::new(27, 7)),
            },
        }
    }

    /// Same template, source columns at fixed letters
    pub fn fixed() -> Self {
        Self {
            name: "fixed".into(),
            headers: HeaderMatching::fixed_letters(),
            status_filter: false,
            device_columns: default_device_columns(false),
            header_cells: HeaderCells {
                engineer: None,
                engineer_phone: None,
                ..Self::dynamic().header_cells
            },
            ..Self::dynamic()
        }
    }

    /// First template version: band rows 2-21, no PM dates, portrait
    pub fn legacy() -> Self {
        Self {
            name: "legacy".into(),
            headers: HeaderMatching::legacy_letters(),
            status_filter: false,
            band_start: 2,
            band_end: 21,
            landscape: false,
            device_columns: default_device_columns(false),
            pm_due_column: None,
            schedule_column: None,
            schedule_prefix: String::new(),
            header_cells: HeaderCells {
                hospital: None,
                caller: Some(CellRef::new(24, 5)),
                caller_tel: Some(CellRef::new(24, 7)),
                engineer: None,
                engineer_phone: None,
            },
        }
    }

    pub fn builtin(name: &str) -> Result<Self, ConfigError> {
        match name.trim().to_ascii_lowercase().as_str() {
            "dynamic" => Ok(Self::dynamic()),
            "fixed" => Ok(Self::fixed()),
            "legacy" => Ok(Self::legacy()),
            _ => Err(ConfigError::UnknownProfile(name.to_string())),
        }
    }

    /// Number of device rows the band can hold
    pub fn band_height(&self) -> usize {
        (self.band_end + 1).saturating_sub(self.band_start) as usize
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.band_start == 0 || self.band_end < self.band_start {
            return Err(ConfigError::InvalidBand {
                start: self.band_start,
                end: self.band_end,
            });
        }
        self.headers.validate()?;
        let cells = [
            self.header_cells.hospital,
            self.header_cells.caller,
            self.header_cells.caller_tel,
            self.header_cells.engineer,
            self.header_cells.engineer_phone,
        ];
        for cell in cells.into_iter().flatten() {
            if cell.row == 0 || cell.col == 0 {
                return Err(ConfigError::InvalidCell {
                    row: cell.row,
                    col: cell.col,
                });
            }
        }
        let columns = self
            .device_columns
            .iter()
            .map(|(_, col)| *col)
            .chain(self.pm_due_column)
            .chain(self.schedule_column);
        for col in columns {
            if col == 0 {
                return Err(ConfigError::InvalidCell {
                    row: self.band_start,
                    col,
                });
            }
        }
        Ok(())
    }
}

impl Default for TemplateProfile {
    fn default() -> Self {
        Self::dynamic()
    }
}

// ============================================================================
// PM rules, flags, operator input
// ============================================================================

/// Keyword rule for the PM interval; the first rule whose keyword occurs in
/// the description wins
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PmRule {
    pub keyword: String,
    pub months: u32,
}

impl PmRule {
    pub fn new(keyword: impl Into<String>, months: u32) -> Self {
        Self {
            keyword: keyword.into(),
            months,
        }
    }

    pub fn default_rules() -> Vec<PmRule> {
        vec![PmRule::new("DEFIBRILLATOR", 6)]
    }
}

/// Optional classification features
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureFlags {
    /// Include "On Hold" rows as their own `_OnHold` groups
    pub include_on_hold: bool,
    /// Route listed asset IDs into `_BESS` groups
    pub bess_enabled: bool,
}

impl Default for FeatureFlags {
    fn default() -> Self {
        Self {
            include_on_hold: true,
            bess_enabled: true,
        }
    }
}

/// Values typed in by the operator
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct OperatorInfo {
    pub engineer: Option<String>,
    pub phone: Option<String>,
    /// Deduplicated BESS asset IDs, first-seen order
    pub bess_assets: Vec<String>,
}

impl OperatorInfo {
    /// Split a free-text BESS list on newlines and commas.
    ///
    /// Tokens are trimmed, empty tokens dropped, duplicates removed keeping
    /// the first occurrence.
    pub fn parse_bess_list(text: &str) -> Vec<String> {
        let mut seen = Vec::new();
        for token in text.split(['\n', '\r', ',']) {
            let token = token.trim();
            if !token.is_empty() && !seen.iter().any(|s: &String| s == token) {
                seen.push(token.to_string());
            }
        }
        seen
    }

    /// Merge more BESS tokens into the list, keeping first-seen order
    pub fn add_bess_assets<I, S>(&mut self, tokens: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for token in tokens {
            for asset in Self::parse_bess_list(token.as_ref()) {
                if !self.bess_assets.contains(&asset) {
                    self.bess_assets.push(asset);
                }
            }
        }
    }

    pub fn engineer(&self) -> Option<&str> {
        self.engineer.as_deref().filter(|s| !s.trim().is_empty())
    }

    pub fn phone(&self) -> Option<&str> {
        self.phone.as_deref().filter(|s| !s.trim().is_empty())
    }
}

// ============================================================================
// Pipeline configuration
// ============================================================================

/// Complete input of one run
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PipelineConfig {
    pub source: PathBuf,
    pub template: PathBuf,
    /// Defaults to `Output/` next to the source file
    pub output_dir: Option<PathBuf>,
    pub profile: TemplateProfile,
    pub chunk_size: usize,
    pub pm_rules: Vec<PmRule>,
    pub default_pm_offset: u32,
    pub flags: FeatureFlags,
    pub operator: OperatorInfo,
    pub write_reports: bool,
    pub write_summary: bool,
}

impl PipelineConfig {
    pub fn new(source: impl Into<PathBuf>, template: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            template: template.into(),
            output_dir: None,
            profile: TemplateProfile::default(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            pm_rules: PmRule::default_rules(),
            default_pm_offset: DEFAULT_PM_OFFSET,
            flags: FeatureFlags::default(),
            operator: OperatorInfo::default(),
            write_reports: true,
            write_summary: true,
        }
    }

    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(dir.into());
        self
    }

    pub fn profile(mut self, profile: TemplateProfile) -> Self {
        self.profile = profile;
        self
    }

    pub fn chunk_size(mut self, size: usize) -> Self {
        self.chunk_size = size;
        self
    }

    pub fn flags(mut self, flags: FeatureFlags) -> Self {
        self.flags = flags;
        self
    }

    pub fn operator(mut self, operator: OperatorInfo) -> Self {
        self.operator = operator;
        self
    }

    /// Only write `TotalModel.xlsx`
    pub fn summary_only(mut self) -> Self {
        self.write_reports = false;
        self.write_summary = true;
        self
    }

    pub fn no_summary(mut self) -> Self {
        self.write_summary = false;
        self
    }

    /// Output directory actually used by the run
    pub fn resolved_output_dir(&self) -> PathBuf {
        match &self.output_dir {
            Some(dir) => dir.clone(),
            None => self
                .source
                .parent()
                .unwrap_or_else(|| Path::new("."))
                .join("Output"),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chunk_size == 0 {
            return Err(ConfigError::ZeroChunkSize);
        }
        self.profile.validate()
    }
}

// ============================================================================
// Profile files
// ============================================================================

/// `[headers]` table of a profile file
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(tag = "mode", rename_all = "lowercase", deny_unknown_fields)]
pub enum HeaderSection {
    Fuzzy {
        /// Field label -> accepted patterns
        rules: BTreeMap<String, Vec<String>>,
    },
    Fixed {
        /// Field label -> column letters
        letters: BTreeMap<String, String>,
    },
}

/// Overrides read from a TOML profile file; absent keys keep the base
/// profile's values
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ProfileFile {
    /// Built-in profile to start from; the configured profile when absent
    #[serde(default)]
    pub base: Option<String>,
    #[serde(default)]
    pub chunk_size: Option<usize>,
    #[serde(default)]
    pub status_filter: Option<bool>,
    #[serde(default)]
    pub band_start: Option<u32>,
    #[serde(default)]
    pub band_end: Option<u32>,
    #[serde(default)]
    pub landscape: Option<bool>,
    #[serde(default)]
    pub device_columns: Option<BTreeMap<String, u32>>,
    #[serde(default)]
    pub pm_due_column: Option<u32>,
    #[serde(default)]
    pub schedule_column: Option<u32>,
    #[serde(default)]
    pub schedule_prefix: Option<String>,
    #[serde(default)]
    pub header_cells: Option<HeaderCells>,
    #[serde(default)]
    pub default_pm_offset: Option<u32>,
    #[serde(default)]
    pub pm_rules: Option<Vec<PmRule>>,
    #[serde(default)]
    pub headers: Option<HeaderSection>,
}

impl ProfileFile {
    /// Apply the overrides to a run configuration
    pub fn apply(self, config: &mut PipelineConfig) -> Result<(), ConfigError> {
        let mut profile = match &self.base {
            Some(name) => TemplateProfile::builtin(name)?,
            None => config.profile.clone(),
        };

        if let Some(v) = self.status_filter {
            profile.status_filter = v;
        }
        if let Some(v) = self.band_start {
            profile.band_start = v;
        }
        if let Some(v) = self.band_end {
            profile.band_end = v;
        }
        if let Some(v) = self.landscape {
            profile.landscape = v;
        }
        if let Some(columns) = self.device_columns {
            profile.device_columns = columns
                .into_iter()
                .map(|(label, col)| Ok((label.parse::<Field>()?, col)))
                .collect::<Result<_, ConfigError>>()?;
            profile.device_columns.sort_by_key(|(_, col)| *col);
        }
        if self.pm_due_column.is_some() {
            profile.pm_due_column = self.pm_due_column;
        }
        if self.schedule_column.is_some() {
            profile.schedule_column = self.schedule_column;
        }
        if let Some(v) = self.schedule_prefix {
            profile.schedule_prefix = v;
        }
        if let Some(cells) = self.header_cells {
            profile.header_cells = cells;
        }
        if let Some(headers) = self.headers {
            profile.headers = headers.into_matching()?;
        }

        profile.name = format!("{} (custom)", profile.name);
        config.profile = profile;
        if let Some(size) = self.chunk_size {
            config.chunk_size = size;
        }
        if let Some(offset) = self.default_pm_offset {
            config.default_pm_offset = offset;
        }
        if let Some(rules) = self.pm_rules {
            config.pm_rules = rules;
        }
        config.validate()
    }
}

impl HeaderSection {
    fn into_matching(self) -> Result<HeaderMatching, ConfigError> {
        match self {
            HeaderSection::Fuzzy { rules } => {
                let mut parsed = rules
                    .into_iter()
                    .map(|(label, patterns)| Ok((label.parse::<Field>()?, patterns)))
                    .collect::<Result<Vec<_>, ConfigError>>()?;
                parsed.sort_by_key(|(field, _)| *field);
                Ok(HeaderMatching::Fuzzy(parsed))
            }
            HeaderSection::Fixed { letters } => {
                let mut parsed = letters
                    .into_iter()
                    .map(|(label, letter)| Ok((label.parse::<Field>()?, letter)))
                    .collect::<Result<Vec<_>, ConfigError>>()?;
                parsed.sort_by_key(|(field, _)| *field);
                Ok(HeaderMatching::Fixed(parsed))
            }
        }
    }
}
