//! Report generation pipeline
//!
//! One linear pass per run:
//! 1. **Validate**: configuration, header rules, template workbook
//! 2. **Ingest**: read the source sheet, resolve headers, extract rows
//! 3. **Classify**: Accepted / On Hold / BESS, everything else dropped
//! 4. **Write reports**: group, paginate, fill one template copy per chunk
//! 5. **Write summary**: `TotalModel.xlsx`
//!
//! Only the conditions in [`PipelineError`] abort a run. Problems with a
//! single row, group, chunk or the summary (when reports were also
//! requested) are reported through the emitter and the run carries on.

use std::fs;
use std::io;
use std::path::PathBuf;

use pmsheet_core::config::SUMMARY_FILE_NAME;
use pmsheet_core::{
    ConfigError, Diagnostic, DiagnosticCode, DiagnosticEmitter, PipelineConfig, RenderError,
    Renderer, StatusGroup,
};
use pmsheet_ingest::{ingest, HeaderResolver, IngestError};
use pmsheet_plan::{
    group_rows, Classification, Classifier, FileNameRegistry, GroupPlan, ModelSummary,
    PmDateEngine,
};
use pmsheet_render::{write_atomic, SummaryRenderer, TemplateRenderer};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, info_span};

/// Conditions that abort a run
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Template not found: {0}")]
    TemplateNotFound(PathBuf),

    #[error("Template unreadable: {0}")]
    TemplateUnreadable(#[source] RenderError),

    #[error("Source unreadable: {0}")]
    SourceUnreadable(#[from] IngestError),

    #[error("Cannot create output directory {path}: {source}")]
    OutputDirectory {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Summary could not be written: {0}")]
    SummaryFailed(#[source] RenderError),

    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),
}

/// Outcome of a successful run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub rows_read: usize,
    pub blank_rows: usize,
    pub accepted: usize,
    pub on_hold: usize,
    pub bess: usize,
    pub dropped: usize,
    pub bess_ids: usize,
    pub groups_processed: usize,
    pub groups_skipped: usize,
    pub files_written: Vec<PathBuf>,
    pub chunk_failures: usize,
    pub summary_path: Option<PathBuf>,
}

impl RunReport {
    pub fn classified(&self) -> usize {
        self.accepted + self.on_hold + self.bess
    }

    fn record_classification(&mut self, classification: &Classification) {
        self.accepted = classification.count(StatusGroup::Accepted);
        self.on_hold = classification.count(StatusGroup::OnHold);
        self.bess = classification.count(StatusGroup::Bess);
        self.dropped = classification.dropped;
        self.bess_ids = classification.bess_ids;
    }
}

/// Run the whole pipeline
pub fn run(
    config: &PipelineConfig,
    emitter: &mut dyn DiagnosticEmitter,
) -> Result<RunReport, PipelineError> {
    let _span = info_span!("pipeline", source = %config.source.display()).entered();
    let mut report = RunReport::default();

    // Stage 1: validate
    config.validate()?;
    let resolver = HeaderResolver::new(&config.profile.headers)?;
    if config.chunk_size > config.profile.band_height() {
        emitter.emit(Diagnostic::new(
            DiagnosticCode::W003BandOverflow,
            format!(
                "chunk size {} exceeds the {}-row band of profile '{}'",
                config.chunk_size,
                config.profile.band_height(),
                config.profile.name
            ),
        ));
    }
    let renderer = if config.write_reports {
        Some(load_template(config)?)
    } else {
        None
    };

    // Stage 2: ingest
    let ingested = ingest(&config.source, &resolver, emitter)?;
    report.rows_read = ingested.rows_read;
    report.blank_rows = ingested.extraction.blank_rows;
    info!(
        rows = report.rows_read,
        blank = report.blank_rows,
        columns = ingested.columns.len(),
        "source read"
    );

    // Stage 3: classify
    let classifier = Classifier::new(
        config.flags,
        config.profile.status_filter,
        &config.operator,
    );
    let classification = classifier.classify(ingested.extraction.rows);
    classification.report(emitter);
    report.record_classification(&classification);

    if classification.is_empty() {
        emitter.emit(Diagnostic::new(
            DiagnosticCode::W004NoClassifiedRows,
            "no rows matched the classification rules; nothing to write",
        ));
        return Ok(report);
    }

    let output_dir = config.resolved_output_dir();
    fs::create_dir_all(&output_dir).map_err(|source| PipelineError::OutputDirectory {
        path: output_dir.clone(),
        source,
    })?;

    // Stage 4: reports
    if let Some(renderer) = &renderer {
        write_reports(config, renderer, &classification, &output_dir, &mut report, emitter);
    }

    // Stage 5: summary
    if config.write_summary {
        match write_summary(&classification, &output_dir, emitter) {
            Ok(path) => {
                report.files_written.push(path.clone());
                report.summary_path = Some(path);
            }
            Err(e) if !config.write_reports => return Err(PipelineError::SummaryFailed(e)),
            Err(e) => emitter.emit(Diagnostic::new(
                DiagnosticCode::E002SummaryFailed,
                format!("{SUMMARY_FILE_NAME}: {e}"),
            )),
        }
    }

    info!(
        files = report.files_written.len(),
        failures = report.chunk_failures,
        "run finished"
    );
    Ok(report)
}

fn load_template(config: &PipelineConfig) -> Result<TemplateRenderer, PipelineError> {
    if !config.template.is_file() {
        return Err(PipelineError::TemplateNotFound(config.template.clone()));
    }
    TemplateRenderer::load(
        &config.template,
        config.profile.clone(),
        PmDateEngine::new(config.pm_rules.clone(), config.default_pm_offset),
        config.operator.clone(),
    )
    .map_err(PipelineError::TemplateUnreadable)
}

fn write_reports(
    config: &PipelineConfig,
    renderer: &TemplateRenderer,
    classification: &Classification,
    output_dir: &std::path::Path,
    report: &mut RunReport,
    emitter: &mut dyn DiagnosticEmitter,
) {
    let mut names = FileNameRegistry::new();
    if config.write_summary {
        names.reserve(SUMMARY_FILE_NAME);
    }
    for (key, rows) in group_rows(&classification.rows) {
        let Some(mut plan) = GroupPlan::new(key.clone(), rows) else {
            emitter.emit(Diagnostic::new(
                DiagnosticCode::W002EmptyGroupKey,
                format!("group {:?} has no usable file name; skipped", key.as_str()),
            ));
            report.groups_skipped += 1;
            continue;
        };
        let stem = plan.stem.clone();
        if names.claim(&mut plan, config.chunk_size) {
            emitter.emit(Diagnostic::new(
                DiagnosticCode::W005DuplicateFileName,
                format!(
                    "group {:?} would overwrite {stem}.xlsx; written as {}.xlsx",
                    key.as_str(),
                    plan.stem
                ),
            ));
        }
        debug!(group = %plan.key, rows = plan.rows.len(), "writing group");

        for chunk in plan.chunks(config.chunk_size) {
            let path = output_dir.join(&chunk.file_name);
            let written = renderer
                .render_chunk(chunk.rows, emitter)
                .and_then(|bytes| write_atomic(&path, &bytes));
            match written {
                Ok(()) => {
                    emitter.emit(Diagnostic::new(
                        DiagnosticCode::I004FileWritten,
                        format!("{} ({} devices)", chunk.file_name, chunk.rows.len()),
                    ));
                    report.files_written.push(path);
                }
                Err(e) => {
                    emitter.emit(Diagnostic::new(
                        DiagnosticCode::E001ChunkFailed,
                        format!("{}: {e}", chunk.file_name),
                    ));
                    report.chunk_failures += 1;
                }
            }
        }
        report.groups_processed += 1;
    }
}

fn write_summary(
    classification: &Classification,
    output_dir: &std::path::Path,
    emitter: &mut dyn DiagnosticEmitter,
) -> Result<PathBuf, RenderError> {
    let summary = ModelSummary::from_rows(&classification.rows);
    if summary.skipped > 0 {
        emitter.emit(Diagnostic::new(
            DiagnosticCode::I003SummaryRowsSkipped,
            format!(
                "{} rows without Manufacture, Model or Description left out of {SUMMARY_FILE_NAME}",
                summary.skipped
            ),
        ));
    }
    let bytes = SummaryRenderer::new().render(&summary)?;
    let path = output_dir.join(SUMMARY_FILE_NAME);
    write_atomic(&path, &bytes)?;
    emitter.emit(Diagnostic::new(
        DiagnosticCode::I004FileWritten,
        format!("{SUMMARY_FILE_NAME} ({} models, {} devices)", summary.rows.len(), summary.total()),
    ));
    Ok(path)
}
