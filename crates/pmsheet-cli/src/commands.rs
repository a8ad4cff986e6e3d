//! Subcommand implementations

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use pmsheet_core::config::column_letters;
use pmsheet_core::{Field, PipelineConfig, TracingEmitter};
use pmsheet_ingest::{read_source, HeaderResolver, ResolvedColumnMap, SourceSheet};
use serde::Serialize;

use crate::cli::{remembered, Cli, Commands, GenerateArgs, ProfileArgs, SettingsAction};
use crate::pipeline::{run, RunReport};
use crate::settings::{
    clear_settings, default_settings_path, load_settings, save_settings, SettingsError,
};

pub fn dispatch(cli: Cli) -> Result<()> {
    let settings_path = cli.settings.clone().or_else(default_settings_path);
    match cli.command {
        Commands::Generate(args) => generate(&args, settings_path.as_deref()),
        Commands::Headers {
            source,
            profile,
            json,
        } => headers(&source, &profile, json),
        Commands::Settings { action } => settings(action, settings_path.as_deref()),
    }
}

fn generate(args: &GenerateArgs, settings_path: Option<&Path>) -> Result<()> {
    let settings = settings_path.map(load_settings).unwrap_or_default();
    let config = args.to_config(&settings)?;

    let report = run(&config, &mut TracingEmitter)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&config, &report);
    }

    if args.remember {
        let path = settings_path.ok_or(SettingsError::NoConfigDir)?;
        save_settings(path, &remembered(&config))?;
    }
    Ok(())
}

fn print_report(config: &PipelineConfig, report: &RunReport) {
    println!(
        "Rows read: {} ({} blank)  Accepted: {}  On Hold: {}  BESS: {} ({} IDs)  Dropped: {}",
        report.rows_read,
        report.blank_rows,
        report.accepted,
        report.on_hold,
        report.bess,
        report.bess_ids,
        report.dropped
    );
    println!(
        "Groups: {} written, {} skipped  Chunk failures: {}",
        report.groups_processed, report.groups_skipped, report.chunk_failures
    );
    println!(
        "{} files in {}",
        report.files_written.len(),
        config.resolved_output_dir().display()
    );
}

/// One line of the `headers` command output
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HeaderLine {
    pub field: String,
    pub column: Option<String>,
    pub header: Option<String>,
}

/// Column map of a sheet, one line per source field
pub fn header_lines(sheet: &SourceSheet, columns: &ResolvedColumnMap) -> Vec<HeaderLine> {
    Field::SOURCE
        .iter()
        .map(|field| {
            let column = columns.get(*field);
            HeaderLine {
                field: field.label().to_string(),
                column: column.map(column_letters),
                header: column
                    .and_then(|c| sheet.headers.get(c))
                    .map(|h| h.trim().to_string()),
            }
        })
        .collect()
}

fn headers(source: &Path, profile: &ProfileArgs, json: bool) -> Result<()> {
    let mut config = PipelineConfig::new(source, PathBuf::new());
    profile.apply(&mut config)?;
    let resolver = HeaderResolver::new(&config.profile.headers)?;
    let sheet = read_source(source)?;
    let lines = header_lines(&sheet, &resolver.resolve(&sheet.headers));

    if json {
        println!("{}", serde_json::to_string_pretty(&lines)?);
        return Ok(());
    }
    println!("Profile: {}", config.profile.name);
    for line in &lines {
        match (&line.column, &line.header) {
            (Some(column), Some(header)) => {
                println!("  {:<26} {:<4} {}", line.field, column, header);
            }
            _ => println!("  {:<26} not found", line.field),
        }
    }
    Ok(())
}

fn settings(action: SettingsAction, path: Option<&Path>) -> Result<()> {
    let path = path.ok_or(SettingsError::NoConfigDir)?;
    match action {
        SettingsAction::Show => {
            println!("# {}", path.display());
            let settings = load_settings(path);
            print!(
                "{}",
                toml::to_string_pretty(&settings).context("cannot format settings")?
            );
        }
        SettingsAction::Clear => {
            if clear_settings(path)? {
                println!("Removed {}", path.display());
            } else {
                println!("No settings at {}", path.display());
            }
        }
    }
    Ok(())
}
