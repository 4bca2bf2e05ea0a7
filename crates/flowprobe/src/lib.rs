//! Flowprobe: Resilient UI-Flow Verification for Hypertrio
//!
//! Drives the Hypertrio fitness app through a real browser and checks its
//! key journeys: registration and sign-in, the health calculators, and the
//! workout lifecycle.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                    FLOWPROBE Architecture                         │
//! ├──────────────────────────────────────────────────────────────────┤
//! │   ┌────────────┐    ┌────────────┐    ┌────────────┐             │
//! │   │ Scenario   │    │ Step       │    │ Locator    │             │
//! │   │ Runner     │───►│ (hard/soft)│───►│ Chain +    │             │
//! │   │            │    │            │    │ Wait/Poll  │             │
//! │   └────────────┘    └────────────┘    └─────┬──────┘             │
//! │         │                                   │ on failure         │
//! │         ▼                                   ▼                    │
//! │   ┌────────────┐                      ┌────────────┐             │
//! │   │ Driver     │                      │ Diagnostic │             │
//! │   │ (CDP/mock) │                      │ Recorder   │             │
//! │   └────────────┘                      └────────────┘             │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use flowprobe::{hypertrio, MockDriver, NoopListener, RunConfig, ScenarioRunner, Session};
//!
//! # async fn run() -> flowprobe::ProbeResult<()> {
//! let session = Session::generate();
//! let plan = hypertrio::suite(&session)?;
//! let runner = ScenarioRunner::new(RunConfig::default(), Box::new(MockDriver::new()));
//! let report = runner.run(&plan, &session, &mut NoopListener).await;
//! println!("{} passed, {} failed", report.passed(), report.failed());
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
// Lints are configured in workspace Cargo.toml [workspace.lints.clippy]

#[allow(clippy::missing_errors_doc)]
mod auth;
#[cfg(feature = "browser")]
#[allow(
    clippy::missing_errors_doc,
    clippy::significant_drop_tightening,
    clippy::cast_possible_truncation
)]
mod browser;
#[allow(clippy::missing_errors_doc)]
mod config;
mod diagnostic;
#[allow(clippy::missing_errors_doc, clippy::must_use_candidate)]
mod driver;
/// Hypertrio scenario suite
pub mod hypertrio;
mod locator;
mod result;
#[allow(clippy::missing_errors_doc, clippy::cast_possible_truncation)]
mod runner;
mod scenario;
mod session;
#[allow(
    clippy::missing_errors_doc,
    clippy::cast_possible_truncation,
    clippy::too_many_lines
)]
mod step;
#[allow(clippy::cast_possible_truncation)]
mod wait;

pub use auth::{
    authenticated_evidence, error_indicator, login_heading, AuthState, ERROR_INDICATOR_TIMEOUT_MS,
    LOGIN_MARKER,
};
#[cfg(feature = "browser")]
pub use browser::{ChromiumDriver, ChromiumFactory};
pub use config::{RunConfig, Viewport, DEFAULT_AUTH_GRACE_MS, DEFAULT_BASE_URL};
pub use diagnostic::{
    excerpt, sanitize_component, Diagnostic, DiagnosticRecorder, DEFAULT_ARTIFACTS_DIR,
    DEFAULT_EXCERPT_CHARS,
};
pub use driver::{Driver, DriverFactory, ElementHandle, MockDriver, MockEffect, MockElement};
pub use locator::{Locator, LocatorChain, Selector};
pub use result::{ProbeError, ProbeResult};
pub use runner::{
    NoopListener, RunListener, RunReport, ScenarioResult, ScenarioRunner, ScenarioStatus,
};
pub use scenario::{Scenario, ScenarioPlan};
pub use session::{slug, Session, DEFAULT_DISPLAY_NAME, DEFAULT_PASSWORD};
pub use step::{Action, Severity, Step, StepContext, StepFailure, StepOutcome, TextValue};
pub use wait::{
    Condition, Resolved, WaitOptions, Waiter, DEFAULT_POLL_INTERVAL_MS,
    DEFAULT_STRATEGY_TIMEOUT_MS, DEFAULT_WAIT_TIMEOUT_MS,
};

/// Prelude for convenient imports
pub mod prelude {
    pub use super::{
        Condition, Driver, DriverFactory, Locator, LocatorChain, MockDriver, MockElement,
        ProbeError, ProbeResult, RunConfig, RunListener, Scenario, ScenarioPlan, ScenarioRunner,
        Session, Severity, Step, TextValue,
    };
}
