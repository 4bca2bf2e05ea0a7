//! Scenario Runner
//!
//! Runs a [`ScenarioPlan`] in order, one fresh browser session per scenario,
//! and folds the outcomes into a [`RunReport`]. A failed scenario never stops
//! the run, and a scenario whose requirement failed still runs: it fails on
//! its own at the first step that depends on the missing state.

use crate::config::RunConfig;
use crate::diagnostic::{Diagnostic, DiagnosticRecorder};
use crate::driver::DriverFactory;
use crate::result::ProbeResult;
use crate::scenario::{Scenario, ScenarioPlan};
use crate::session::Session;
use crate::step::{StepContext, StepFailure};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::time::Instant;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Receives progress events while a plan runs
pub trait RunListener: Send + fmt::Debug {
    /// A run is about to start
    fn run_started(&mut self, _plan: &ScenarioPlan, _session: &Session) {}

    /// A scenario is about to start
    fn scenario_started(&mut self, _scenario: &Scenario) {}

    /// A step succeeded
    fn step_passed(&mut self, _step: &str) {}

    /// A soft step failed and was skipped
    fn soft_failure(&mut self, _failure: &StepFailure) {}

    /// A hard failure ended a scenario
    fn hard_failure(&mut self, _scenario: &str, _failure: &StepFailure) {}

    /// A scenario finished
    fn scenario_finished(&mut self, _result: &ScenarioResult) {}
}

/// Listener that ignores every event
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopListener;

impl RunListener for NoopListener {}

/// Final status of a scenario
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioStatus {
    /// No hard failure
    Passed,
    /// Ended by a hard failure
    Failed,
}

/// Outcome of one scenario
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioResult {
    /// Scenario name
    pub name: String,
    /// Scenario order
    pub order: u32,
    /// Pass/fail
    pub status: ScenarioStatus,
    /// Hard failure, if any
    pub failure: Option<StepFailure>,
    /// Soft failures (skipped sub-features)
    pub skipped: Vec<StepFailure>,
    /// Requirements that had not passed when this scenario started
    pub unmet_requirements: Vec<String>,
    /// Wall time
    pub duration_ms: u64,
}

impl ScenarioResult {
    /// Whether the scenario passed
    #[must_use]
    pub fn passed(&self) -> bool {
        self.status == ScenarioStatus::Passed
    }
}

/// Machine-readable summary of a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    /// Unique run id
    pub run_id: Uuid,
    /// Start time
    pub started_at: DateTime<Utc>,
    /// Application URL
    pub base_url: String,
    /// Account the run used
    pub session_email: String,
    /// Scenario outcomes in run order
    pub scenarios: Vec<ScenarioResult>,
    /// Every diagnostic captured during the run
    pub diagnostics: Vec<Diagnostic>,
    /// Wall time
    pub duration_ms: u64,
}

impl RunReport {
    /// Number of passed scenarios
    #[must_use]
    pub fn passed(&self) -> usize {
        self.scenarios.iter().filter(|s| s.passed()).count()
    }

    /// Number of failed scenarios
    #[must_use]
    pub fn failed(&self) -> usize {
        self.scenarios.len() - self.passed()
    }

    /// Total soft failures across scenarios
    #[must_use]
    pub fn skipped(&self) -> usize {
        self.scenarios.iter().map(|s| s.skipped.len()).sum()
    }

    /// Whether every scenario passed
    #[must_use]
    pub fn all_passed(&self) -> bool {
        self.failed() == 0
    }

    /// Look up a scenario result by name
    #[must_use]
    pub fn scenario(&self, name: &str) -> Option<&ScenarioResult> {
        self.scenarios.iter().find(|s| s.name == name)
    }

    /// Write as pretty JSON, creating parent directories
    pub fn write_json(&self, path: &Path) -> ProbeResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}

/// Runs scenario plans against sessions from a [`DriverFactory`]
#[derive(Debug)]
pub struct ScenarioRunner {
    config: RunConfig,
    factory: Box<dyn DriverFactory>,
}

impl ScenarioRunner {
    /// Create a runner
    #[must_use]
    pub fn new(config: RunConfig, factory: Box<dyn DriverFactory>) -> Self {
        Self { config, factory }
    }

    /// Run configuration
    #[must_use]
    pub const fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Run every scenario of `plan`, strictly in order
    pub async fn run(
        &self,
        plan: &ScenarioPlan,
        session: &Session,
        listener: &mut dyn RunListener,
    ) -> RunReport {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let clock = Instant::now();
        let mut recorder = DiagnosticRecorder::new(&self.config.artifacts_dir)
            .with_excerpt_chars(self.config.excerpt_chars);
        let mut results: Vec<ScenarioResult> = Vec::with_capacity(plan.len());

        info!(%run_id, email = session.email(), scenarios = plan.len(), "run started");
        listener.run_started(plan, session);

        for scenario in plan.scenarios() {
            let unmet: Vec<String> = scenario
                .requirements()
                .iter()
                .filter(|req| !results.iter().any(|r| &r.name == *req && r.passed()))
                .cloned()
                .collect();
            if !unmet.is_empty() {
                warn!(
                    scenario = scenario.name(),
                    unmet = ?unmet,
                    "requirements have not passed, running anyway"
                );
            }

            let result = self
                .run_scenario(scenario, session, &mut recorder, listener, unmet)
                .await;
            listener.scenario_finished(&result);
            results.push(result);
        }

        let report = RunReport {
            run_id,
            started_at,
            base_url: self.config.base_url.clone(),
            session_email: session.email().to_string(),
            scenarios: results,
            diagnostics: recorder.records().to_vec(),
            duration_ms: clock.elapsed().as_millis() as u64,
        };
        info!(
            passed = report.passed(),
            failed = report.failed(),
            skipped = report.skipped(),
            "run finished"
        );
        report
    }

    async fn run_scenario(
        &self,
        scenario: &Scenario,
        session: &Session,
        recorder: &mut DiagnosticRecorder,
        listener: &mut dyn RunListener,
        unmet_requirements: Vec<String>,
    ) -> ScenarioResult {
        info!(scenario = scenario.name(), order = scenario.order(), "scenario started");
        listener.scenario_started(scenario);
        let clock = Instant::now();

        let (failure, skipped) = match self.factory.acquire().await {
            Err(e) => {
                error!(scenario = scenario.name(), error = %e, "could not acquire browser session");
                let failure = StepFailure {
                    step: "acquire browser session".to_string(),
                    kind: e.kind().to_string(),
                    reason: e.to_string(),
                    diagnostic: None,
                };
                (Some(failure), Vec::new())
            }
            Ok(mut driver) => {
                let mut ctx =
                    StepContext::new(driver.as_mut(), session, recorder, &self.config, listener);
                let outcome = ctx.run_all(scenario.step_list()).await;
                let skipped = ctx.into_skipped();
                if let Err(e) = driver.close().await {
                    warn!(scenario = scenario.name(), error = %e, "browser session did not close cleanly");
                }
                (outcome.err(), skipped)
            }
        };

        if let Some(failure) = &failure {
            error!(scenario = scenario.name(), step = %failure.step, reason = %failure.reason, "scenario failed");
            listener.hard_failure(scenario.name(), failure);
        } else {
            info!(scenario = scenario.name(), skipped = skipped.len(), "scenario passed");
        }

        ScenarioResult {
            name: scenario.name().to_string(),
            order: scenario.order(),
            status: if failure.is_some() {
                ScenarioStatus::Failed
            } else {
                ScenarioStatus::Passed
            },
            failure,
            skipped,
            unmet_requirements,
            duration_ms: clock.elapsed().as_millis() as u64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::{Driver, MockDriver, MockElement};
    use crate::locator::{Locator, Selector};
    use crate::result::ProbeError;
    use crate::step::Step;
    use async_trait::async_trait;

    fn fast_config(dir: &Path) -> RunConfig {
        RunConfig::new()
            .with_base_url("http://app")
            .with_default_timeout(30)
            .with_strategy_timeout(10)
            .with_poll_interval(5)
            .with_auth_grace(1)
            .with_artifacts_dir(dir)
    }

    #[derive(Debug, Default)]
    struct Recording {
        events: Vec<String>,
    }

    impl RunListener for Recording {
        fn scenario_started(&mut self, scenario: &Scenario) {
            self.events.push(format!("start:{}", scenario.name()));
        }
        fn soft_failure(&mut self, failure: &StepFailure) {
            self.events.push(format!("soft:{}", failure.step));
        }
        fn hard_failure(&mut self, scenario: &str, _failure: &StepFailure) {
            self.events.push(format!("hard:{scenario}"));
        }
        fn scenario_finished(&mut self, result: &ScenarioResult) {
            self.events.push(format!("done:{}:{:?}", result.name, result.status));
        }
    }

    #[derive(Debug)]
    struct BrokenFactory;

    #[async_trait]
    impl DriverFactory for BrokenFactory {
        async fn acquire(&self) -> ProbeResult<Box<dyn Driver>> {
            Err(ProbeError::BrowserLaunch {
                message: "no chromium".to_string(),
            })
        }
    }

    fn plan() -> ScenarioPlan {
        ScenarioPlan::new(vec![
            Scenario::new("create", 1).step(Step::click(Locator::id("create"))),
            Scenario::new("use", 2)
                .requires("create")
                .step(Step::click(Locator::id("nav-extra")).soft())
                .step(Step::wait_present(Locator::id("account"))),
        ])
        .unwrap()
    }

    #[tokio::test]
    async fn test_failed_requirement_still_runs_dependent() {
        let dir = tempfile::tempdir().unwrap();
        let factory = MockDriver::new();
        let runner = ScenarioRunner::new(fast_config(dir.path()), Box::new(factory.clone()));
        let session = Session::from_stamp(1);
        let mut listener = Recording::default();

        let report = runner.run(&plan(), &session, &mut listener).await;

        assert_eq!(report.failed(), 2);
        let dependent = report.scenario("use").unwrap();
        assert_eq!(dependent.unmet_requirements, vec!["create".to_string()]);
        assert_eq!(dependent.skipped.len(), 1);
        assert_eq!(dependent.failure.as_ref().unwrap().kind, "not_found");
        assert_eq!(
            listener.events,
            vec![
                "start:create",
                "hard:create",
                "done:create:Failed",
                "start:use",
                "soft:click id=nav-extra",
                "hard:use",
                "done:use:Failed",
            ]
        );
        assert_eq!(factory.acquired_count(), 2);
        assert_eq!(factory.closed_count(), 2);
        assert_eq!(report.diagnostics.len(), 3);
    }

    #[tokio::test]
    async fn test_passing_run() {
        let dir = tempfile::tempdir().unwrap();
        let factory = MockDriver::new()
            .with_element(&Selector::Id("create".into()), MockElement::new("button"))
            .with_element(&Selector::Id("nav-extra".into()), MockElement::new("a"))
            .with_element(&Selector::Id("account".into()), MockElement::new("div"));
        let runner = ScenarioRunner::new(fast_config(dir.path()), Box::new(factory));
        let session = Session::from_stamp(1);

        let report = runner.run(&plan(), &session, &mut NoopListener).await;

        assert!(report.all_passed());
        assert_eq!(report.skipped(), 0);
        assert!(report.diagnostics.is_empty());
        assert_eq!(report.session_email, "test_1@example.com");
        assert!(report.scenario("use").unwrap().unmet_requirements.is_empty());
    }

    #[tokio::test]
    async fn test_acquire_failure_is_hard_failure() {
        let dir = tempfile::tempdir().unwrap();
        let runner = ScenarioRunner::new(fast_config(dir.path()), Box::new(BrokenFactory));
        let session = Session::from_stamp(1);

        let report = runner.run(&plan(), &session, &mut NoopListener).await;

        assert_eq!(report.failed(), 2);
        assert_eq!(
            report.scenarios[0].failure.as_ref().unwrap().kind,
            "browser_launch"
        );
    }

    #[tokio::test]
    async fn test_report_json_written() {
        let dir = tempfile::tempdir().unwrap();
        let runner = ScenarioRunner::new(fast_config(dir.path()), Box::new(BrokenFactory));
        let report = runner
            .run(&plan(), &Session::from_stamp(1), &mut NoopListener)
            .await;
        let path = dir.path().join("nested").join("report.json");

        report.write_json(&path).unwrap();

        let back: RunReport =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(back, report);
    }
}
