//! Run diagnostics
//!
//! The pipeline never prints. Everything worth telling the operator is
//! emitted as a [`Diagnostic`] through a [`DiagnosticEmitter`]; the host
//! decides where it goes (a `tracing` subscriber, a text-line callback, or a
//! vector inspected by tests).

use serde::Serialize;
use std::fmt;

/// Diagnostic severity, ordered from least to most severe
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
        })
    }
}

/// Stable diagnostic codes
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum DiagnosticCode {
    /// A logical field has no matching source column
    I001FieldNotFound,
    /// Per-group classification counts
    I002RowsClassified,
    /// Rows left out of the model summary because a key was empty
    I003SummaryRowsSkipped,
    /// An output file was written
    I004FileWritten,
    /// Schedule date missing or unparsable; PM dates not written
    W001ScheduleDate,
    /// Group key empty after sanitizing; group skipped
    W002EmptyGroupKey,
    /// Chunk larger than the template band; extra rows skipped
    W003BandOverflow,
    /// Nothing was classified; no report files
    W004NoClassifiedRows,
    /// Two groups map to the same file name; the later one was renamed
    W005DuplicateFileName,
    /// One chunk could not be written
    E001ChunkFailed,
    /// The summary workbook could not be written
    E002SummaryFailed,
}

impl DiagnosticCode {
    pub fn as_str(self) -> &'static str {
        match self {
            DiagnosticCode::I001FieldNotFound => "I001",
            DiagnosticCode::I002RowsClassified => "I002",
            DiagnosticCode::I003SummaryRowsSkipped => "I003",
            DiagnosticCode::I004FileWritten => "I004",
            DiagnosticCode::W001ScheduleDate => "W001",
            DiagnosticCode::W002EmptyGroupKey => "W002",
            DiagnosticCode::W003BandOverflow => "W003",
            DiagnosticCode::W004NoClassifiedRows => "W004",
            DiagnosticCode::W005DuplicateFileName => "W005",
            DiagnosticCode::E001ChunkFailed => "E001",
            DiagnosticCode::E002SummaryFailed => "E002",
        }
    }

    pub fn severity(self) -> Severity {
        match self.as_str().as_bytes()[0] {
            b'E' => Severity::Error,
            b'W' => Severity::Warning,
            _ => Severity::Info,
        }
    }
}

impl fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One message produced during a run
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub code: DiagnosticCode,
    pub severity: Severity,
    pub message: String,
}

impl Diagnostic {
    pub fn new(code: DiagnosticCode, message: impl Into<String>) -> Self {
        Self {
            code,
            severity: code.severity(),
            message: message.into(),
        }
    }

    /// Single text line, e.g. `warning[W002]: group "???" skipped`
    pub fn to_line(&self) -> String {
        format!("{}[{}]: {}", self.severity, self.code, self.message)
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_line())
    }
}

/// Sink for diagnostics
pub trait DiagnosticEmitter {
    fn emit(&mut self, diagnostic: Diagnostic);
}

/// Keeps every diagnostic in memory
#[derive(Debug, Default)]
pub struct CollectingEmitter {
    pub diagnostics: Vec<Diagnostic>,
}

impl CollectingEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self, code: DiagnosticCode) -> usize {
        self.diagnostics.iter().filter(|d| d.code == code).count()
    }

    pub fn has(&self, code: DiagnosticCode) -> bool {
        self.diagnostics.iter().any(|d| d.code == code)
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(|d| d.severity == Severity::Error)
    }

    pub fn messages(&self, code: DiagnosticCode) -> Vec<&str> {
        self.diagnostics
            .iter()
            .filter(|d| d.code == code)
            .map(|d| d.message.as_str())
            .collect()
    }
}

impl DiagnosticEmitter for CollectingEmitter {
    fn emit(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }
}

/// Forwards each diagnostic as one formatted text line
pub struct LineEmitter<F: FnMut(&str)> {
    sink: F,
}

impl<F: FnMut(&str)> LineEmitter<F> {
    pub fn new(sink: F) -> Self {
        Self { sink }
    }
}

impl<F: FnMut(&str)> DiagnosticEmitter for LineEmitter<F> {
    fn emit(&mut self, diagnostic: Diagnostic) {
        (self.sink)(&diagnostic.to_line());
    }
}

/// Routes diagnostics to `tracing` at the matching level
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingEmitter;

impl DiagnosticEmitter for TracingEmitter {
    fn emit(&mut self, diagnostic: Diagnostic) {
        let code = diagnostic.code.as_str();
        match diagnostic.severity {
            Severity::Info => tracing::info!(code, "{}", diagnostic.message),
            Severity::Warning => tracing::warn!(code, "{}", diagnostic.message),
            Severity::Error => tracing::error!(code, "{}", diagnostic.message),
        }
    }
}
