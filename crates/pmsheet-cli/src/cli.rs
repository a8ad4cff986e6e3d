//! Command-line definitions and flag resolution

use std::fs;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use pmsheet_core::{FeatureFlags, OperatorInfo, PipelineConfig, TemplateProfile};

use crate::settings::{read_profile_file, Settings};

#[derive(Parser, Debug)]
#[command(name = "pmsheet")]
#[command(author, version, about = "Preventive-maintenance report generator", long_about = None)]
pub struct Cli {
    /// Verbose output (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Settings file (defaults to the platform config directory)
    #[arg(long, env = "PMSHEET_SETTINGS", global = true, value_name = "FILE")]
    pub settings: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate per-location PM reports and the model summary
    Generate(GenerateArgs),

    /// Show how the source header row maps to report fields
    Headers {
        /// Source spreadsheet
        #[arg(value_name = "SOURCE")]
        source: PathBuf,

        #[command(flatten)]
        profile: ProfileArgs,

        /// Print the column map as JSON
        #[arg(long)]
        json: bool,
    },

    /// Inspect or clear remembered settings
    Settings {
        #[command(subcommand)]
        action: SettingsAction,
    },
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingsAction {
    /// Print the settings file location and contents
    Show,
    /// Delete the settings file
    Clear,
}

/// Built-in template layouts
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProfileName {
    /// Header-text matching, band rows 6-25
    #[default]
    Dynamic,
    /// Fixed source column letters, band rows 6-25
    Fixed,
    /// First template version, band rows 2-21
    Legacy,
}

impl ProfileName {
    pub fn profile(self) -> TemplateProfile {
        match self {
            ProfileName::Dynamic => TemplateProfile::dynamic(),
            ProfileName::Fixed => TemplateProfile::fixed(),
            ProfileName::Legacy => TemplateProfile::legacy(),
        }
    }
}

#[derive(Args, Debug, Clone, Default)]
pub struct ProfileArgs {
    /// Built-in template profile
    #[arg(long, value_enum, default_value_t = ProfileName::Dynamic)]
    pub profile: ProfileName,

    /// TOML profile file applied over --profile (or over its own `base`)
    #[arg(long, value_name = "TOML")]
    pub profile_file: Option<PathBuf>,
}

#[derive(Args, Debug, Clone, Default)]
pub struct GenerateArgs {
    /// Source spreadsheet (defaults to the remembered one)
    #[arg(value_name = "SOURCE")]
    pub source: Option<PathBuf>,

    /// Template workbook (defaults to the remembered one)
    #[arg(short, long, value_name = "PATH")]
    pub template: Option<PathBuf>,

    /// Output directory (defaults to Output/ next to the source)
    #[arg(short, long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// PM engineer name
    #[arg(long, value_name = "NAME")]
    pub engineer: Option<String>,

    /// PM engineer phone
    #[arg(long, value_name = "TEL")]
    pub phone: Option<String>,

    /// BESS asset ID (repeatable, comma-separated lists accepted)
    #[arg(long = "bess", value_name = "ID")]
    pub bess: Vec<String>,

    /// File with BESS asset IDs, one per line or comma-separated
    #[arg(long, value_name = "FILE")]
    pub bess_file: Option<PathBuf>,

    /// Disable BESS grouping
    #[arg(long)]
    pub no_bess: bool,

    /// Include "On Hold" rows as _OnHold reports
    #[arg(long, overrides_with = "no_on_hold")]
    pub on_hold: bool,

    /// Leave "On Hold" rows out
    #[arg(long, overrides_with = "on_hold")]
    pub no_on_hold: bool,

    /// Devices per report file
    #[arg(long, value_name = "N")]
    pub chunk_size: Option<usize>,

    #[command(flatten)]
    pub profile: ProfileArgs,

    /// Only write TotalModel.xlsx
    #[arg(long, conflicts_with = "no_summary")]
    pub summary_only: bool,

    /// Do not write TotalModel.xlsx
    #[arg(long)]
    pub no_summary: bool,

    /// Store engineer, phone, paths and toggles for the next run
    #[arg(long)]
    pub remember: bool,

    /// Print the run report as JSON
    #[arg(long)]
    pub json: bool,
}

impl ProfileArgs {
    /// Apply the chosen profile (and profile file) to a configuration
    pub fn apply(&self, config: &mut PipelineConfig) -> Result<()> {
        config.profile = self.profile.profile();
        if let Some(path) = &self.profile_file {
            read_profile_file(path)?
                .apply(config)
                .with_context(|| format!("invalid profile file {}", path.display()))?;
        }
        Ok(())
    }
}

impl GenerateArgs {
    /// Merge flags over remembered settings into a run configuration
    pub fn to_config(&self, settings: &Settings) -> Result<PipelineConfig> {
        let Some(source) = self.source.clone().or_else(|| settings.source_path.clone()) else {
            bail!("no source spreadsheet given and none remembered");
        };
        let template = match self.template.clone().or_else(|| settings.template_path.clone()) {
            Some(path) => path,
            None if self.summary_only => PathBuf::new(),
            None => bail!("no template given (use --template) and none remembered"),
        };

        let mut config = PipelineConfig::new(source, template);
        self.profile.apply(&mut config)?;

        if let Some(size) = self.chunk_size {
            config.chunk_size = size;
        }
        config.output_dir = self.output_dir.clone();
        config.flags = FeatureFlags {
            include_on_hold: if self.on_hold {
                true
            } else if self.no_on_hold {
                false
            } else {
                settings.on_hold_enabled.unwrap_or(true)
            },
            bess_enabled: !self.no_bess && settings.bess_enabled.unwrap_or(true),
        };
        config.operator = self.operator(settings)?;

        if self.summary_only {
            config = config.summary_only();
        } else if self.no_summary {
            config = config.no_summary();
        }
        config.validate()?;
        Ok(config)
    }

    fn operator(&self, settings: &Settings) -> Result<OperatorInfo> {
        let mut operator = OperatorInfo {
            engineer: self.engineer.clone().or_else(|| settings.pm_engineer.clone()),
            phone: self.phone.clone().or_else(|| settings.pm_phone.clone()),
            bess_assets: Vec::new(),
        };
        operator.add_bess_assets(&self.bess);
        if let Some(path) = &self.bess_file {
            let text = fs::read_to_string(path)
                .with_context(|| format!("cannot read BESS list {}", path.display()))?;
            operator.add_bess_assets([text]);
        }
        Ok(operator)
    }
}

/// Settings to remember after a successful run
pub fn remembered(config: &PipelineConfig) -> Settings {
    Settings {
        pm_engineer: config.operator.engineer().map(str::to_string),
        pm_phone: config.operator.phone().map(str::to_string),
        template_path: Some(config.template.clone()).filter(|p| !p.as_os_str().is_empty()),
        source_path: Some(config.source.clone()),
        bess_enabled: Some(config.flags.bess_enabled),
        on_hold_enabled: Some(config.flags.include_on_hold),
    }
}
