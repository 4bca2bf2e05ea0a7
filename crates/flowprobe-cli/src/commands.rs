//! CLI command definitions using clap

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Flowprobe: resilient UI-flow checks for the Hypertrio web app
#[derive(Parser, Debug)]
#[command(name = "flowprobe")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (failures only)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Color output (auto, always, never)
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorArg,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the Hypertrio scenarios in a browser
    Run(RunArgs),

    /// List the scenarios in run order
    List(ListArgs),
}

/// Arguments for the run command
#[derive(Parser, Debug, Default)]
pub struct RunArgs {
    /// YAML run configuration
    #[arg(short, long, env = "FLOWPROBE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Application URL
    #[arg(long, env = "FLOWPROBE_BASE_URL")]
    pub base_url: Option<String>,

    /// Show the browser window
    #[arg(long)]
    pub headed: bool,

    /// Chromium executable
    #[arg(long, env = "FLOWPROBE_CHROMIUM_PATH")]
    pub chromium_path: Option<PathBuf>,

    /// Directory for screenshots and the run report
    #[arg(long, env = "FLOWPROBE_ARTIFACTS_DIR")]
    pub artifacts_dir: Option<PathBuf>,

    /// Default step timeout in milliseconds
    #[arg(long)]
    pub timeout_ms: Option<u64>,

    /// Run only the named scenario (repeatable)
    #[arg(long = "only", value_name = "SCENARIO")]
    pub only: Vec<String>,

    /// Disable the Chromium sandbox (containers, CI)
    #[arg(long)]
    pub no_sandbox: bool,

    /// Run report path [default: <artifacts-dir>/report.json]
    #[arg(long)]
    pub report: Option<PathBuf>,
}

/// Arguments for the list command
#[derive(Parser, Debug, Default)]
pub struct ListArgs {
    /// Output format
    #[arg(long, default_value = "text")]
    pub format: ListFormat,
}

/// Scenario listing format
#[derive(ValueEnum, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ListFormat {
    /// One line per scenario
    #[default]
    Text,
    /// JSON array
    Json,
}

/// Color argument
#[derive(ValueEnum, Debug, Clone, Copy, Default)]
pub enum ColorArg {
    /// Automatic color detection
    #[default]
    Auto,
    /// Always use colors
    Always,
    /// Never use colors
    Never,
}

impl From<ColorArg> for crate::config::ColorChoice {
    fn from(arg: ColorArg) -> Self {
        match arg {
            ColorArg::Auto => Self::Auto,
            ColorArg::Always => Self::Always,
            ColorArg::Never => Self::Never,
        }
    }
}
