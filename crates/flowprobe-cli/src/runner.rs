//! Run orchestration: config layering, plan selection, report output

use crate::commands::RunArgs;
use crate::error::{CliError, CliResult};
use flowprobe::{
    hypertrio, DriverFactory, RunConfig, RunListener, RunReport, ScenarioPlan, ScenarioRunner,
    Session,
};
use std::path::{Path, PathBuf};
use tracing::info;

/// File name of the run report inside the artifacts directory
pub const REPORT_FILE: &str = "report.json";

/// Config file first, then flags and environment
pub fn resolve_run_config(args: &RunArgs) -> CliResult<RunConfig> {
    let mut config = match args.config {
        Some(ref path) => RunConfig::load(path)?,
        None => RunConfig::default(),
    };
    if let Some(ref url) = args.base_url {
        config = config.with_base_url(url.clone());
    }
    if args.headed {
        config = config.with_headless(false);
    }
    if let Some(ref path) = args.chromium_path {
        config = config.with_chromium_path(path.clone());
    }
    if let Some(ref dir) = args.artifacts_dir {
        config = config.with_artifacts_dir(dir.clone());
    }
    if let Some(ms) = args.timeout_ms {
        config = config.with_default_timeout(ms);
    }
    config.validate()?;
    Ok(config)
}

/// The Hypertrio suite, narrowed to `only` when given
pub fn build_plan(session: &Session, only: &[String]) -> CliResult<ScenarioPlan> {
    let plan = hypertrio::suite(session)?;
    if let Some(unknown) = only.iter().find(|n| !plan.names().contains(&n.as_str())) {
        return Err(CliError::invalid_argument(format!(
            "unknown scenario {unknown:?} (expected one of: {})",
            plan.names().join(", ")
        )));
    }
    Ok(plan.only(only)?)
}

/// Where the run report goes
#[must_use]
pub fn report_path(args: &RunArgs, config: &RunConfig) -> PathBuf {
    args.report
        .clone()
        .unwrap_or_else(|| config.artifacts_dir.join(REPORT_FILE))
}

/// Run `plan` and write its report
pub async fn execute_plan(
    config: RunConfig,
    factory: Box<dyn DriverFactory>,
    plan: &ScenarioPlan,
    session: &Session,
    listener: &mut dyn RunListener,
    report: &Path,
) -> CliResult<RunReport> {
    let runner = ScenarioRunner::new(config, factory);
    let run = runner.run(plan, session, listener).await;
    run.write_json(report)
        .map_err(|e| CliError::report_generation(format!("{}: {e}", report.display())))?;
    info!(path = %report.display(), "run report written");
    Ok(run)
}

/// Run the selected scenarios in Chromium
#[cfg(feature = "browser")]
pub async fn run_suite(
    config: RunConfig,
    args: &RunArgs,
    listener: &mut dyn RunListener,
) -> CliResult<RunReport> {
    let session = Session::generate();
    let plan = build_plan(&session, &args.only)?;
    let mut factory = flowprobe::ChromiumFactory::from_config(&config);
    if args.no_sandbox {
        factory = factory.with_no_sandbox();
    }
    let report = report_path(args, &config);
    execute_plan(config, Box::new(factory), &plan, &session, listener, &report).await
}

/// Run the selected scenarios in Chromium
#[cfg(not(feature = "browser"))]
pub async fn run_suite(
    _config: RunConfig,
    _args: &RunArgs,
    _listener: &mut dyn RunListener,
) -> CliResult<RunReport> {
    Err(CliError::config(
        "flowprobe-cli was built without the `browser` feature",
    ))
}
