//! Flowprobe CLI binary
//!
//! Exit codes: 0 when every scenario passed, 1 when any scenario failed,
//! 2 when the run could not start (bad config, unknown scenario).

use clap::Parser;
use flowprobe::Session;
use flowprobe_cli::{
    build_plan, render_plan, render_plan_json, resolve_run_config, run_suite, Cli, CliConfig,
    CliResult, Commands, ListArgs, ListFormat, ProgressReporter, RunArgs, Verbosity,
};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let cli = Cli::parse();
    let config = build_config(&cli);
    init_tracing(config.verbosity);

    match run(&cli, config) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::from(2)
        }
    }
}

fn build_config(cli: &Cli) -> CliConfig {
    CliConfig::new()
        .with_verbosity(Verbosity::from_flags(cli.quiet, cli.verbose))
        .with_color(cli.color.into())
}

fn init_tracing(verbosity: Verbosity) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(verbosity.log_filter()));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn run(cli: &Cli, config: CliConfig) -> CliResult<bool> {
    match cli.command {
        Commands::Run(ref args) => run_flows(config, args),
        Commands::List(ref args) => {
            list_flows(args)?;
            Ok(true)
        }
    }
}

fn run_flows(config: CliConfig, args: &RunArgs) -> CliResult<bool> {
    let run_config = resolve_run_config(args)?;
    let mut reporter = ProgressReporter::new(config.color.should_color(), config.verbosity);
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    let report = runtime.block_on(run_suite(run_config, args, &mut reporter))?;
    reporter.summary(&report);
    Ok(report.all_passed())
}

fn list_flows(args: &ListArgs) -> CliResult<()> {
    let plan = build_plan(&Session::generate(), &[])?;
    match args.format {
        ListFormat::Text => print!("{}", render_plan(&plan)),
        ListFormat::Json => println!("{}", render_plan_json(&plan)?),
    }
    Ok(())
}
