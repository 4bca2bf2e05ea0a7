//! Steps and their execution.
//!
//! A [`Step`] is one UI action tagged [`Severity::Hard`] or [`Severity::Soft`].
//! [`StepContext`] executes steps against one browser session:
//!
//! - every element interaction goes through the wait engine first;
//! - a failing step carries exactly one [`Diagnostic`], captured by the wait
//!   engine or, for failures it never saw, by the executor;
//! - a soft failure is recorded as a skipped sub-feature and execution
//!   continues; a hard failure stops the step list.
//!
//! [`Action::Group`] nests a named block of steps. The first inner failure
//! that is hard in its own right ends the group, which then fails with the
//! group's severity. Inner soft failures are recorded under the group's path
//! (`calculators/bmi`).

use crate::auth::AuthState;
use crate::config::RunConfig;
use crate::diagnostic::{Diagnostic, DiagnosticRecorder};
use crate::driver::Driver;
use crate::locator::LocatorChain;
use crate::result::{ProbeError, ProbeResult};
use crate::runner::RunListener;
use crate::session::Session;
use crate::wait::{Condition, Resolved, Waiter};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;
use tracing::{debug, info, warn};

/// How a step failure affects its scenario
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Failure aborts the enclosing scenario
    #[default]
    Hard,
    /// Failure is recorded as a skipped sub-feature
    Soft,
}

/// Text to type, resolved against the session at execution time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextValue {
    /// Fixed text
    Literal(String),
    /// Session email
    Email,
    /// Session password
    Password,
    /// Session display name
    DisplayName,
}

impl TextValue {
    /// Concrete text for `session`
    #[must_use]
    pub fn resolve<'s>(&'s self, session: &'s Session) -> &'s str {
        match self {
            Self::Literal(text) => text,
            Self::Email => session.email(),
            Self::Password => session.password(),
            Self::DisplayName => session.display_name(),
        }
    }
}

impl From<&str> for TextValue {
    fn from(text: &str) -> Self {
        Self::Literal(text.to_string())
    }
}

impl From<String> for TextValue {
    fn from(text: String) -> Self {
        Self::Literal(text)
    }
}

/// What a step does
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    /// Load an app path (or an absolute URL)
    Navigate {
        /// Path relative to the base URL
        path: String,
    },
    /// Wait until the target exists
    WaitPresent,
    /// Wait until the target is visible and enabled
    WaitClickable,
    /// Type into the target
    Type {
        /// Text to enter
        text: TextValue,
    },
    /// Click the target
    Click,
    /// Choose the target `<option>`
    Select,
    /// Target must be visible and contain the text
    AssertVisible {
        /// Expected substring; empty matches any visible element
        text: String,
    },
    /// Current location must contain a substring
    AssertLocation {
        /// Expected substring
        contains: String,
    },
    /// Resolve the post-submit authentication state
    ConfirmAuthenticated,
    /// Confirm the login screen after logout
    ConfirmSignedOut,
    /// Save a milestone screenshot
    Checkpoint {
        /// Screenshot label
        label: String,
    },
    /// Let the page settle
    Pause {
        /// Delay in milliseconds
        ms: u64,
    },
    /// Named block forming one optional sub-feature
    Group {
        /// Inner steps, in order
        steps: Vec<Step>,
        /// Best-effort steps run after the group fails
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        recovery: Vec<Step>,
    },
}

/// One atomic UI action
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    target: Option<LocatorChain>,
    action: Action,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    timeout_ms: Option<u64>,
    #[serde(default)]
    severity: Severity,
}

impl Step {
    fn new(description: String, target: Option<LocatorChain>, action: Action) -> Self {
        Self {
            description,
            target,
            action,
            timeout_ms: None,
            severity: Severity::Hard,
        }
    }

    fn targeted(verb: &str, target: impl Into<LocatorChain>, action: Action) -> Self {
        let target = target.into();
        Self::new(format!("{verb} {target}"), Some(target), action)
    }

    /// Navigate to an app path
    #[must_use]
    pub fn navigate(path: impl Into<String>) -> Self {
        let path = path.into();
        Self::new(format!("navigate to {path}"), None, Action::Navigate { path })
    }

    /// Wait for the target to exist
    #[must_use]
    pub fn wait_present(target: impl Into<LocatorChain>) -> Self {
        Self::targeted("wait for", target, Action::WaitPresent)
    }

    /// Wait for the target to become clickable
    #[must_use]
    pub fn wait_clickable(target: impl Into<LocatorChain>) -> Self {
        Self::targeted("wait until clickable", target, Action::WaitClickable)
    }

    /// Type into the target
    #[must_use]
    pub fn type_text(target: impl Into<LocatorChain>, text: impl Into<TextValue>) -> Self {
        Self::targeted("type into", target, Action::Type { text: text.into() })
    }

    /// Click the target
    #[must_use]
    pub fn click(target: impl Into<LocatorChain>) -> Self {
        Self::targeted("click", target, Action::Click)
    }

    /// Select the target option
    #[must_use]
    pub fn select(target: impl Into<LocatorChain>) -> Self {
        Self::targeted("select", target, Action::Select)
    }

    /// Assert the target is visible with the given text
    #[must_use]
    pub fn assert_visible(target: impl Into<LocatorChain>, text: impl Into<String>) -> Self {
        Self::targeted("expect visible", target, Action::AssertVisible { text: text.into() })
    }

    /// Assert the current location contains `fragment`
    #[must_use]
    pub fn assert_location(fragment: impl Into<String>) -> Self {
        let contains = fragment.into();
        Self::new(
            format!("expect location to contain {contains:?}"),
            None,
            Action::AssertLocation { contains },
        )
    }

    /// Resolve the authentication outcome after submitting credentials
    #[must_use]
    pub fn confirm_authenticated() -> Self {
        Self::new(
            "confirm authenticated".to_string(),
            None,
            Action::ConfirmAuthenticated,
        )
    }

    /// Confirm the app is back on the login screen
    #[must_use]
    pub fn confirm_signed_out() -> Self {
        Self::new("confirm signed out".to_string(), None, Action::ConfirmSignedOut)
    }

    /// Save a milestone screenshot
    #[must_use]
    pub fn checkpoint(label: impl Into<String>) -> Self {
        let label = label.into();
        Self::new(format!("checkpoint {label}"), None, Action::Checkpoint { label })
    }

    /// Pause for `delay`
    #[must_use]
    pub fn pause(delay: Duration) -> Self {
        let ms = delay.as_millis() as u64;
        Self::new(format!("pause {ms}ms"), None, Action::Pause { ms })
    }

    /// Named block of steps
    #[must_use]
    pub fn group(name: impl Into<String>, steps: Vec<Step>) -> Self {
        Self::new(
            name.into(),
            None,
            Action::Group {
                steps,
                recovery: Vec::new(),
            },
        )
    }

    /// Steps to run when this group fails; ignored on other actions
    #[must_use]
    pub fn with_recovery(mut self, steps: Vec<Step>) -> Self {
        if let Action::Group { recovery, .. } = &mut self.action {
            *recovery = steps;
        }
        self
    }

    /// Mark as soft
    #[must_use]
    pub const fn soft(mut self) -> Self {
        self.severity = Severity::Soft;
        self
    }

    /// Set the wait timeout for this step
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = Some(timeout.as_millis() as u64);
        self
    }

    /// Replace the generated description
    #[must_use]
    pub fn described(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Human-readable description
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Target chain, if the action needs one
    #[must_use]
    pub const fn target(&self) -> Option<&LocatorChain> {
        self.target.as_ref()
    }

    /// The action
    #[must_use]
    pub const fn action(&self) -> &Action {
        &self.action
    }

    /// Severity
    #[must_use]
    pub const fn severity(&self) -> Severity {
        self.severity
    }

    /// Step-specific timeout
    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }
}

/// Record of one failed step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepFailure {
    /// Step path, nested under group names (`calculators/bmi`)
    pub step: String,
    /// Error kind (`not_found`, `unexpected_state`, ...)
    pub kind: String,
    /// Error message
    pub reason: String,
    /// Evidence captured at the failure point
    pub diagnostic: Option<Diagnostic>,
}

/// Result of running one step
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    /// Step succeeded
    Success,
    /// Soft step failed; the scenario continues
    SoftFailure(StepFailure),
    /// Hard step failed; the scenario stops
    HardFailure(StepFailure),
}

impl StepOutcome {
    /// Whether the step succeeded
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }
}

type StepsFuture<'b> = Pin<Box<dyn Future<Output = Result<(), StepFailure>> + Send + 'b>>;

/// Executes steps against one browser session
#[derive(Debug)]
pub struct StepContext<'a> {
    pub(crate) driver: &'a mut dyn Driver,
    pub(crate) session: &'a Session,
    pub(crate) recorder: &'a mut DiagnosticRecorder,
    pub(crate) config: &'a RunConfig,
    pub(crate) waiter: Waiter,
    pub(crate) auth: AuthState,
    listener: &'a mut dyn RunListener,
    skipped: Vec<StepFailure>,
}

impl<'a> StepContext<'a> {
    /// Create a context for one scenario
    pub fn new(
        driver: &'a mut dyn Driver,
        session: &'a Session,
        recorder: &'a mut DiagnosticRecorder,
        config: &'a RunConfig,
        listener: &'a mut dyn RunListener,
    ) -> Self {
        Self {
            driver,
            session,
            recorder,
            config,
            waiter: Waiter::with_options(config.wait_options()),
            auth: AuthState::Unauthenticated,
            listener,
            skipped: Vec::new(),
        }
    }

    /// Current authentication state
    #[must_use]
    pub const fn auth_state(&self) -> &AuthState {
        &self.auth
    }

    /// Soft failures recorded so far
    #[must_use]
    pub fn skipped(&self) -> &[StepFailure] {
        &self.skipped
    }

    /// Consume the context, keeping its soft failures
    #[must_use]
    pub fn into_skipped(self) -> Vec<StepFailure> {
        self.skipped
    }

    /// Run one top-level step and classify its result
    pub async fn run(&mut self, step: &Step) -> StepOutcome {
        let outcome = self.run_step(step, None).await;
        if let StepOutcome::SoftFailure(failure) = &outcome {
            self.note_soft(failure.clone());
        }
        outcome
    }

    /// Run steps in order, stopping at the first hard failure
    pub async fn run_all(&mut self, steps: &[Step]) -> Result<(), StepFailure> {
        self.run_steps(steps, None).await
    }

    fn run_steps<'b>(&'b mut self, steps: &'b [Step], scope: Option<&'b str>) -> StepsFuture<'b> {
        Box::pin(async move {
            for step in steps {
                match self.run_step(step, scope).await {
                    StepOutcome::Success => {}
                    StepOutcome::SoftFailure(failure) => self.note_soft(failure),
                    StepOutcome::HardFailure(failure) => return Err(failure),
                }
            }
            Ok(())
        })
    }

    fn note_soft(&mut self, failure: StepFailure) {
        warn!(step = %failure.step, reason = %failure.reason, "soft failure, skipping sub-feature");
        self.listener.soft_failure(&failure);
        self.skipped.push(failure);
    }

    async fn run_step(&mut self, step: &Step, scope: Option<&str>) -> StepOutcome {
        let path = match scope {
            Some(scope) => format!("{scope}/{}", step.description),
            None => step.description.clone(),
        };
        debug!(step = %path, "step started");

        let result = match &step.action {
            Action::Group { steps, recovery } => match self.run_steps(steps, Some(&path)).await {
                Ok(()) => Ok(()),
                Err(inner) => {
                    if !recovery.is_empty() {
                        let scope = format!("{path}/recovery");
                        if let Err(e) = self.run_steps(recovery, Some(&scope)).await {
                            warn!(step = %e.step, reason = %e.reason, "recovery step failed");
                        }
                    }
                    Err(StepFailure {
                        step: path.clone(),
                        kind: inner.kind,
                        reason: format!("{}: {}", inner.step, inner.reason),
                        diagnostic: inner.diagnostic,
                    })
                }
            },
            _ => {
                let before = self.recorder.len();
                match self.execute(step).await {
                    Ok(()) => Ok(()),
                    Err(e) => {
                        if self.recorder.len() == before {
                            let context = step
                                .target
                                .as_ref()
                                .map_or_else(|| path.clone(), LocatorChain::description);
                            let _ = self.recorder.capture(&mut *self.driver, &context).await;
                        }
                        Err(StepFailure {
                            step: path.clone(),
                            kind: e.kind().to_string(),
                            reason: e.to_string(),
                            diagnostic: self.recorder.last().cloned(),
                        })
                    }
                }
            }
        };

        match result {
            Ok(()) => {
                info!(step = %path, "step passed");
                self.listener.step_passed(&path);
                StepOutcome::Success
            }
            Err(failure) => match step.severity {
                Severity::Soft => StepOutcome::SoftFailure(failure),
                Severity::Hard => StepOutcome::HardFailure(failure),
            },
        }
    }

    pub(crate) fn timeout_for(&self, step: &Step) -> Option<Duration> {
        let ceiling = Duration::from_millis(self.config.default_timeout_ms);
        step.timeout().map(|t| t.min(ceiling))
    }

    async fn resolve_target(&mut self, step: &Step, condition: &Condition) -> ProbeResult<Resolved> {
        let chain = step.target.as_ref().ok_or_else(|| ProbeError::InvalidPlan {
            message: format!("step {:?} needs a target", step.description),
        })?;
        let timeout = self.timeout_for(step);
        self.waiter
            .await_condition(&mut *self.driver, self.recorder, chain, condition, timeout)
            .await
    }

    async fn execute(&mut self, step: &Step) -> ProbeResult<()> {
        match &step.action {
            Action::Navigate { path } => {
                let url = if path.starts_with("http://") || path.starts_with("https://") {
                    path.clone()
                } else {
                    self.config.url(path)
                };
                self.driver.navigate(&url).await
            }
            Action::WaitPresent => self.resolve_target(step, &Condition::Present).await.map(drop),
            Action::WaitClickable => self.resolve_target(step, &Condition::Clickable).await.map(drop),
            Action::Type { text } => {
                let resolved = self.resolve_target(step, &Condition::Present).await?;
                let text = text.resolve(self.session);
                self.driver.type_text(resolved.locator.selector(), text).await
            }
            Action::Click => {
                let resolved = self.resolve_target(step, &Condition::Clickable).await?;
                self.driver.click(resolved.locator.selector()).await
            }
            Action::Select => {
                let resolved = self.resolve_target(step, &Condition::Present).await?;
                self.driver.select_option(resolved.locator.selector()).await
            }
            Action::AssertVisible { text } => self
                .resolve_target(step, &Condition::VisibleWithText(text.clone()))
                .await
                .map(drop),
            Action::AssertLocation { contains } => {
                let url = self.driver.current_url().await?;
                if url.contains(contains.as_str()) {
                    Ok(())
                } else {
                    Err(ProbeError::assertion(format!(
                        "expected location containing {contains:?}, got {url}"
                    )))
                }
            }
            Action::ConfirmAuthenticated => self.confirm_authenticated().await,
            Action::ConfirmSignedOut => self.confirm_signed_out(step).await,
            Action::Checkpoint { label } => {
                if let Some(path) = self.recorder.checkpoint(&mut *self.driver, label).await {
                    debug!(path = %path.display(), "checkpoint saved");
                }
                Ok(())
            }
            Action::Pause { ms } => {
                let ceiling = Duration::from_millis(self.config.default_timeout_ms);
                tokio::time::sleep(Duration::from_millis(*ms).min(ceiling)).await;
                Ok(())
            }
            Action::Group { .. } => Err(ProbeError::InvalidPlan {
                message: format!("group {:?} cannot execute as a leaf step", step.description),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::{MockDriver, MockElement};
    use crate::locator::{Locator, Selector};
    use crate::runner::NoopListener;

    fn fast_config(dir: &std::path::Path) -> RunConfig {
        RunConfig::new()
            .with_base_url("http://app")
            .with_default_timeout(40)
            .with_strategy_timeout(20)
            .with_poll_interval(5)
            .with_auth_grace(1)
            .with_artifacts_dir(dir)
    }

    fn id(s: &str) -> Selector {
        Selector::Id(s.to_string())
    }

    mod builder_tests {
        use super::*;

        #[test]
        fn test_default_severity_is_hard() {
            let step = Step::click(Locator::id("login-button"));
            assert_eq!(step.severity(), Severity::Hard);
            assert_eq!(step.description(), "click id=login-button");
            assert!(step.target().is_some());
        }

        #[test]
        fn test_soft_and_timeout() {
            let step = Step::click(Locator::id("show-exercise-input-button"))
                .soft()
                .with_timeout(Duration::from_secs(3));
            assert_eq!(step.severity(), Severity::Soft);
            assert_eq!(step.timeout(), Some(Duration::from_secs(3)));
        }

        #[test]
        fn test_text_value_resolution() {
            let session = Session::from_stamp(7);
            assert_eq!(TextValue::Email.resolve(&session), "test_7@example.com");
            assert_eq!(TextValue::Password.resolve(&session), "password123");
            assert_eq!(TextValue::DisplayName.resolve(&session), "Test User");
            assert_eq!(TextValue::from("21").resolve(&session), "21");
        }

        #[test]
        fn test_step_serde() {
            let step = Step::type_text(Locator::id("email-input"), TextValue::Email).soft();
            let json = serde_json::to_string(&step).unwrap();
            let back: Step = serde_json::from_str(&json).unwrap();
            assert_eq!(back, step);
        }
    }

    mod execution_tests {
        use super::*;

        #[tokio::test]
        async fn test_type_uses_session_credentials() {
            let dir = tempfile::tempdir().unwrap();
            let config = fast_config(dir.path());
            let session = Session::from_stamp(1_700_000_000);
            let mut recorder = DiagnosticRecorder::new(dir.path());
            let mut listener = NoopListener;
            let mut driver = MockDriver::new().with_element(&id("email-input"), MockElement::new("input"));
            let probe = driver.clone();

            let mut ctx = StepContext::new(&mut driver, &session, &mut recorder, &config, &mut listener);
            let outcome = ctx
                .run(&Step::type_text(Locator::id("email-input"), TextValue::Email))
                .await;

            assert!(outcome.is_success());
            assert_eq!(
                probe.typed_into(&id("email-input")).as_deref(),
                Some("test_1700000000@example.com")
            );
        }

        #[tokio::test]
        async fn test_soft_failure_continues() {
            let dir = tempfile::tempdir().unwrap();
            let config = fast_config(dir.path());
            let session = Session::from_stamp(1);
            let mut recorder = DiagnosticRecorder::new(dir.path());
            let mut listener = NoopListener;
            let mut driver = MockDriver::new().with_element(&id("next"), MockElement::new("button"));
            let probe = driver.clone();

            let steps = vec![
                Step::click(Locator::id("missing")).soft(),
                Step::click(Locator::id("next")),
            ];
            let mut ctx = StepContext::new(&mut driver, &session, &mut recorder, &config, &mut listener);
            let result = ctx.run_all(&steps).await;

            assert!(result.is_ok());
            assert_eq!(ctx.skipped().len(), 1);
            assert_eq!(ctx.skipped()[0].kind, "not_interactable");
            assert!(probe.was_called("click:id=next"));
            drop(ctx);
            assert_eq!(recorder.len(), 1);
        }

        #[tokio::test]
        async fn test_hard_failure_stops() {
            let dir = tempfile::tempdir().unwrap();
            let config = fast_config(dir.path());
            let session = Session::from_stamp(1);
            let mut recorder = DiagnosticRecorder::new(dir.path());
            let mut listener = NoopListener;
            let mut driver = MockDriver::new().with_element(&id("next"), MockElement::new("button"));
            let probe = driver.clone();

            let steps = vec![
                Step::wait_present(Locator::id("missing")),
                Step::click(Locator::id("next")),
            ];
            let mut ctx = StepContext::new(&mut driver, &session, &mut recorder, &config, &mut listener);
            let failure = ctx.run_all(&steps).await.unwrap_err();

            assert_eq!(failure.kind, "not_found");
            assert!(failure.diagnostic.is_some());
            assert!(!probe.was_called("click:id=next"));
        }

        #[tokio::test]
        async fn test_location_mismatch_gets_one_diagnostic() {
            let dir = tempfile::tempdir().unwrap();
            let config = fast_config(dir.path());
            let session = Session::from_stamp(1);
            let mut recorder = DiagnosticRecorder::new(dir.path());
            let mut listener = NoopListener;
            let mut driver = MockDriver::new();
            driver.navigate("http://app/login").await.unwrap();

            let mut ctx = StepContext::new(&mut driver, &session, &mut recorder, &config, &mut listener);
            let outcome = ctx.run(&Step::assert_location("dashboard")).await;

            assert!(matches!(outcome, StepOutcome::HardFailure(ref f) if f.kind == "assertion_failure"));
            drop(ctx);
            assert_eq!(recorder.len(), 1);
            assert_eq!(
                recorder.records()[0].location.as_deref(),
                Some("http://app/login")
            );
        }

        #[tokio::test]
        async fn test_navigate_joins_base_url() {
            let dir = tempfile::tempdir().unwrap();
            let config = fast_config(dir.path());
            let session = Session::from_stamp(1);
            let mut recorder = DiagnosticRecorder::new(dir.path());
            let mut listener = NoopListener;
            let mut driver = MockDriver::new();
            let probe = driver.clone();

            let mut ctx = StepContext::new(&mut driver, &session, &mut recorder, &config, &mut listener);
            assert!(ctx.run(&Step::navigate("/login")).await.is_success());
            assert_eq!(probe.url(), "http://app/login");
        }
    }

    mod group_tests {
        use super::*;

        #[tokio::test]
        async fn test_soft_group_absent_feature_is_one_failure() {
            let dir = tempfile::tempdir().unwrap();
            let config = fast_config(dir.path());
            let session = Session::from_stamp(1);
            let mut recorder = DiagnosticRecorder::new(dir.path());
            let mut listener = NoopListener;
            let mut driver = MockDriver::new();

            let steps = vec![Step::group(
                "calculators",
                vec![
                    Step::wait_present(Locator::xpath("//h1[contains(text(), 'Calculators')]")),
                    Step::click(Locator::id("calc")),
                ],
            )
            .soft()];
            let mut ctx = StepContext::new(&mut driver, &session, &mut recorder, &config, &mut listener);
            assert!(ctx.run_all(&steps).await.is_ok());

            let skipped = ctx.into_skipped();
            assert_eq!(skipped.len(), 1);
            assert_eq!(skipped[0].step, "calculators");
            assert!(skipped[0].reason.contains("Calculators"));
            assert_eq!(recorder.len(), 1);
        }

        #[tokio::test]
        async fn test_nested_soft_groups_degrade_independently() {
            let dir = tempfile::tempdir().unwrap();
            let config = fast_config(dir.path());
            let session = Session::from_stamp(1);
            let mut recorder = DiagnosticRecorder::new(dir.path());
            let mut listener = NoopListener;
            let mut driver = MockDriver::new()
                .with_element(&id("heading"), MockElement::new("h1"))
                .with_element(&id("tdee"), MockElement::new("button"));
            let probe = driver.clone();

            let steps = vec![Step::group(
                "calculators",
                vec![
                    Step::wait_present(Locator::id("heading")),
                    Step::group("bmi", vec![Step::click(Locator::id("bmi"))]).soft(),
                    Step::group("tdee", vec![Step::click(Locator::id("tdee"))]).soft(),
                ],
            )
            .soft()];
            let mut ctx = StepContext::new(&mut driver, &session, &mut recorder, &config, &mut listener);
            assert!(ctx.run_all(&steps).await.is_ok());

            assert_eq!(ctx.skipped().len(), 1);
            assert_eq!(ctx.skipped()[0].step, "calculators/bmi");
            assert!(probe.was_called("click:id=tdee"));
        }

        #[tokio::test]
        async fn test_recovery_runs_after_group_failure() {
            let dir = tempfile::tempdir().unwrap();
            let config = fast_config(dir.path());
            let session = Session::from_stamp(1);
            let mut recorder = DiagnosticRecorder::new(dir.path());
            let mut listener = NoopListener;
            let mut driver = MockDriver::new();
            let probe = driver.clone();

            let steps = vec![Step::group(
                "verify completion",
                vec![Step::assert_visible(Locator::id("completed"), "Completed Workouts")],
            )
            .with_recovery(vec![Step::navigate("/dashboard")])
            .soft()];
            let mut ctx = StepContext::new(&mut driver, &session, &mut recorder, &config, &mut listener);
            assert!(ctx.run_all(&steps).await.is_ok());

            assert_eq!(ctx.skipped().len(), 1);
            assert_eq!(probe.url(), "http://app/dashboard");
        }

        #[tokio::test]
        async fn test_recovery_skipped_on_success() {
            let dir = tempfile::tempdir().unwrap();
            let config = fast_config(dir.path());
            let session = Session::from_stamp(1);
            let mut recorder = DiagnosticRecorder::new(dir.path());
            let mut listener = NoopListener;
            let mut driver = MockDriver::new().with_element(
                &id("completed"),
                MockElement::new("div").with_text("Completed Workouts: 1"),
            );
            let probe = driver.clone();

            let steps = vec![Step::group(
                "verify completion",
                vec![Step::assert_visible(Locator::id("completed"), "Completed Workouts")],
            )
            .with_recovery(vec![Step::navigate("/dashboard")])];
            let mut ctx = StepContext::new(&mut driver, &session, &mut recorder, &config, &mut listener);
            assert!(ctx.run_all(&steps).await.is_ok());
            assert!(!probe.was_called("navigate"));
        }

        #[tokio::test]
        async fn test_hard_group_propagates() {
            let dir = tempfile::tempdir().unwrap();
            let config = fast_config(dir.path());
            let session = Session::from_stamp(1);
            let mut recorder = DiagnosticRecorder::new(dir.path());
            let mut listener = NoopListener;
            let mut driver = MockDriver::new();

            let steps = vec![Step::group("login", vec![Step::click(Locator::id("login-button"))])];
            let mut ctx = StepContext::new(&mut driver, &session, &mut recorder, &config, &mut listener);
            let failure = ctx.run_all(&steps).await.unwrap_err();

            assert_eq!(failure.step, "login");
            assert!(failure.reason.starts_with("login/click id=login-button"));
            assert!(failure.diagnostic.is_some());
        }
    }
}
