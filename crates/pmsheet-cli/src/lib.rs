//! # pmsheet-cli
//!
//! Command-line host for the pmsheet report generator.
//!
//! The binary gathers the run inputs (source, template, output directory,
//! operator details, BESS list) from flags, remembered settings and
//! optional profile files, then runs the [`pipeline`].
//!
//! ## Example
//!
//! ```rust,ignore
//! use pmsheet_cli::pipeline::run;
//! use pmsheet_core::{PipelineConfig, TracingEmitter};
//!
//! let config = PipelineConfig::new("pending.xlsx", "template.xlsx");
//! let report = run(&config, &mut TracingEmitter)?;
//! println!("{} files written", report.files_written.len());
//! ```

pub mod cli;
pub mod commands;
pub mod logging;
pub mod pipeline;
pub mod settings;

pub use pipeline::{run, PipelineError, RunReport};
