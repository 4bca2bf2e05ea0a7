//! Flowprobe CLI Library
//!
//! Command-line front end for the Flowprobe engine: layers the run
//! configuration, selects scenarios, drives the console reporter, and writes
//! the JSON run report.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

mod commands;
mod config;
mod error;
mod output;
mod runner;

pub use commands::{Cli, ColorArg, Commands, ListArgs, ListFormat, RunArgs};
pub use config::{CliConfig, ColorChoice, Verbosity};
pub use error::{CliError, CliResult};
pub use output::{render_plan, render_plan_json, ProgressReporter};
pub use runner::{
    build_plan, execute_plan, report_path, resolve_run_config, run_suite, REPORT_FILE,
};
