//! Wait Mechanisms
//!
//! Bounded polling for element conditions, plus fallback-chain resolution.
//!
//! - Every wait has a finite deadline; there is no "wait forever".
//! - A chain of several strategies gives each one its own, shorter budget and
//!   stops at the first hit. Misses along the way are absorbed.
//! - [`Waiter::await_condition`] records exactly one diagnostic when the whole
//!   wait fails and none when it succeeds. [`Waiter::resolve`] is the quiet
//!   variant used where a miss is an expected branch (auth error probing).

use crate::diagnostic::DiagnosticRecorder;
use crate::driver::{Driver, ElementHandle};
use crate::locator::{Locator, LocatorChain};
use crate::result::{ProbeError, ProbeResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info};

// =============================================================================
// CONSTANTS
// =============================================================================

/// Default timeout for a step's wait (10 seconds)
pub const DEFAULT_WAIT_TIMEOUT_MS: u64 = 10_000;

/// Default budget per strategy inside a fallback chain (5 seconds)
pub const DEFAULT_STRATEGY_TIMEOUT_MS: u64 = 5_000;

/// Default polling interval (250ms)
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 250;

// =============================================================================
// CONDITION
// =============================================================================

/// What must hold for a located element to count as resolved
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Condition {
    /// Element exists in the document
    Present,
    /// Element is visible and enabled
    Clickable,
    /// Element is visible and its text contains the given string
    VisibleWithText(String),
}

impl Condition {
    /// Check a probed element against the condition
    #[must_use]
    pub fn is_met(&self, element: &ElementHandle) -> bool {
        match self {
            Self::Present => true,
            Self::Clickable => element.is_clickable(),
            Self::VisibleWithText(text) => element.visible && element.text.contains(text.as_str()),
        }
    }

    /// Error for a single locator that never satisfied the condition
    fn timeout_error(&self, locator: &str, timeout_ms: u64) -> ProbeError {
        match self {
            Self::Present => ProbeError::NotFound {
                locator: locator.to_string(),
                attempted: vec![locator.to_string()],
                timeout_ms,
            },
            Self::Clickable => ProbeError::NotInteractable {
                locator: locator.to_string(),
                timeout_ms,
            },
            Self::VisibleWithText(text) => ProbeError::AssertionFailure {
                message: format!("{locator} did not show text {text:?} within {timeout_ms}ms"),
            },
        }
    }
}

impl std::fmt::Display for Condition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Present => f.write_str("present"),
            Self::Clickable => f.write_str("clickable"),
            Self::VisibleWithText(text) => write!(f, "visible with text {text:?}"),
        }
    }
}

// =============================================================================
// WAIT OPTIONS
// =============================================================================

/// Options for wait operations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaitOptions {
    /// Timeout for a whole wait, in milliseconds
    pub timeout_ms: u64,
    /// Budget for each strategy of a fallback chain, in milliseconds
    pub strategy_timeout_ms: u64,
    /// Polling interval in milliseconds
    pub poll_interval_ms: u64,
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_WAIT_TIMEOUT_MS,
            strategy_timeout_ms: DEFAULT_STRATEGY_TIMEOUT_MS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
        }
    }
}

impl WaitOptions {
    /// Create new wait options with defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set timeout in milliseconds
    #[must_use]
    pub const fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Set per-strategy timeout in milliseconds
    #[must_use]
    pub const fn with_strategy_timeout(mut self, timeout_ms: u64) -> Self {
        self.strategy_timeout_ms = timeout_ms;
        self
    }

    /// Set polling interval in milliseconds
    #[must_use]
    pub const fn with_poll_interval(mut self, poll_interval_ms: u64) -> Self {
        self.poll_interval_ms = poll_interval_ms;
        self
    }

    /// Get timeout as Duration
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Get per-strategy timeout as Duration
    #[must_use]
    pub const fn strategy_timeout(&self) -> Duration {
        Duration::from_millis(self.strategy_timeout_ms)
    }

    /// Get poll interval as Duration
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

// =============================================================================
// RESOLUTION
// =============================================================================

/// A chain strategy that satisfied its condition
#[derive(Debug, Clone)]
pub struct Resolved {
    /// The element as last probed
    pub element: ElementHandle,
    /// The strategy that won
    pub locator: Locator,
    /// Zero-based position of the winning strategy in its chain
    pub strategy_index: usize,
    /// Time spent across all strategies
    pub elapsed: Duration,
}

// =============================================================================
// WAITER IMPLEMENTATION
// =============================================================================

/// Waiter for synchronization operations
#[derive(Debug, Clone, Default)]
pub struct Waiter {
    options: WaitOptions,
}

impl Waiter {
    /// Create a new waiter with default options
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create with custom options
    #[must_use]
    pub const fn with_options(options: WaitOptions) -> Self {
        Self { options }
    }

    /// Current options
    #[must_use]
    pub const fn options(&self) -> &WaitOptions {
        &self.options
    }

    /// Caller timeouts never exceed the default wait timeout
    fn capped(&self, timeout: Duration) -> Duration {
        timeout.min(self.options.timeout())
    }

    /// Poll one locator until the condition holds or `timeout` elapses.
    ///
    /// Probes at least once. Transport errors count as "not yet".
    pub async fn poll(
        &self,
        driver: &mut dyn Driver,
        locator: &Locator,
        condition: &Condition,
        timeout: Duration,
    ) -> Option<ElementHandle> {
        let deadline = Instant::now() + timeout;
        loop {
            match driver.probe(locator.selector()).await {
                Ok(Some(element)) if condition.is_met(&element) => return Some(element),
                Ok(_) => {}
                Err(e) => debug!(locator = %locator, error = %e, "probe failed, retrying"),
            }
            let now = Instant::now();
            if now >= deadline {
                return None;
            }
            let remaining = deadline - now;
            tokio::time::sleep(self.options.poll_interval().min(remaining)).await;
        }
    }

    /// Resolve a chain without recording diagnostics.
    ///
    /// A single-strategy chain gets the full `timeout` (or the step default)
    /// and fails with the condition's own error kind. A multi-strategy chain
    /// gives each strategy its own budget and fails with `NotFound` listing
    /// every attempt.
    ///
    /// No strategy waits longer than the step timeout, and the step timeout
    /// never exceeds the default timeout.
    pub async fn resolve(
        &self,
        driver: &mut dyn Driver,
        chain: &LocatorChain,
        condition: &Condition,
        timeout: Option<Duration>,
    ) -> ProbeResult<Resolved> {
        let started = Instant::now();
        let step_timeout = timeout.map_or_else(|| self.options.timeout(), |t| self.capped(t));

        if chain.is_empty() {
            return Err(ProbeError::NotFound {
                locator: chain.description(),
                attempted: Vec::new(),
                timeout_ms: 0,
            });
        }

        if !chain.is_fallback() {
            let locator = &chain.strategies()[0];
            let budget = locator.timeout().map_or(step_timeout, |t| t.min(step_timeout));
            return match self.poll(driver, locator, condition, budget).await {
                Some(element) => Ok(Resolved {
                    element,
                    locator: locator.clone(),
                    strategy_index: 0,
                    elapsed: started.elapsed(),
                }),
                None => Err(condition.timeout_error(&chain.description(), budget.as_millis() as u64)),
            };
        }

        for (index, locator) in chain.strategies().iter().enumerate() {
            let budget = locator
                .timeout()
                .unwrap_or_else(|| self.options.strategy_timeout())
                .min(step_timeout);
            if let Some(element) = self.poll(driver, locator, condition, budget).await {
                if index > 0 {
                    info!(chain = %chain, strategy = %locator, index, "fallback strategy matched");
                }
                return Ok(Resolved {
                    element,
                    locator: locator.clone(),
                    strategy_index: index,
                    elapsed: started.elapsed(),
                });
            }
            debug!(chain = %chain, strategy = %locator, "strategy missed, trying next");
        }

        Err(ProbeError::NotFound {
            locator: chain.description(),
            attempted: chain.attempted(),
            timeout_ms: started.elapsed().as_millis() as u64,
        })
    }

    /// Wait for a chain to satisfy `condition`, capturing one diagnostic on
    /// failure and none on success.
    pub async fn await_condition(
        &self,
        driver: &mut dyn Driver,
        recorder: &mut DiagnosticRecorder,
        chain: &LocatorChain,
        condition: &Condition,
        timeout: Option<Duration>,
    ) -> ProbeResult<Resolved> {
        match self.resolve(driver, chain, condition, timeout).await {
            Ok(resolved) => Ok(resolved),
            Err(e) => {
                let _ = recorder.capture(driver, &chain.description()).await;
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::{MockDriver, MockElement};
    use crate::locator::Selector;

    fn fast() -> Waiter {
        Waiter::with_options(
            WaitOptions::new()
                .with_timeout(60)
                .with_strategy_timeout(30)
                .with_poll_interval(5),
        )
    }

    fn id(s: &str) -> Selector {
        Selector::Id(s.to_string())
    }

    mod condition_tests {
        use super::*;

        #[test]
        fn test_present_accepts_hidden() {
            let mut el = ElementHandle::new("id=x", "div");
            el.visible = false;
            assert!(Condition::Present.is_met(&el));
            assert!(!Condition::Clickable.is_met(&el));
        }

        #[test]
        fn test_visible_with_text() {
            let mut el = ElementHandle::new("id=x", "div");
            el.text = "Your BMI is 22.2".to_string();
            assert!(Condition::VisibleWithText("Your BMI".into()).is_met(&el));
            assert!(!Condition::VisibleWithText("Your TDEE".into()).is_met(&el));
        }

        #[test]
        fn test_display() {
            assert_eq!(Condition::Clickable.to_string(), "clickable");
            assert_eq!(
                Condition::VisibleWithText("Hi".into()).to_string(),
                "visible with text \"Hi\""
            );
        }
    }

    mod wait_options_tests {
        use super::*;

        #[test]
        fn test_wait_options_default() {
            let opts = WaitOptions::default();
            assert_eq!(opts.timeout_ms, DEFAULT_WAIT_TIMEOUT_MS);
            assert_eq!(opts.strategy_timeout_ms, DEFAULT_STRATEGY_TIMEOUT_MS);
            assert_eq!(opts.poll_interval_ms, DEFAULT_POLL_INTERVAL_MS);
        }

        #[test]
        fn test_wait_options_chained() {
            let opts = WaitOptions::new()
                .with_timeout(10_000)
                .with_strategy_timeout(3_000)
                .with_poll_interval(200);
            assert_eq!(opts.timeout(), Duration::from_secs(10));
            assert_eq!(opts.strategy_timeout(), Duration::from_secs(3));
            assert_eq!(opts.poll_interval(), Duration::from_millis(200));
        }
    }

    mod await_tests {
        use super::*;

        #[tokio::test]
        async fn test_present_element_returns_without_diagnostic() {
            let dir = tempfile::tempdir().unwrap();
            let mut recorder = DiagnosticRecorder::new(dir.path());
            let mut driver = MockDriver::new()
                .with_element(&id("email-input"), MockElement::new("input").appearing_after(2));
            let chain = LocatorChain::from(Locator::id("email-input"));

            let resolved = fast()
                .await_condition(&mut driver, &mut recorder, &chain, &Condition::Present, None)
                .await
                .unwrap();

            assert_eq!(resolved.element.tag_name, "input");
            assert_eq!(resolved.strategy_index, 0);
            assert!(recorder.is_empty());
        }

        #[tokio::test]
        async fn test_missing_element_times_out_with_one_diagnostic() {
            let dir = tempfile::tempdir().unwrap();
            let mut recorder = DiagnosticRecorder::new(dir.path());
            let mut driver = MockDriver::new();
            let chain = LocatorChain::from(Locator::id("ghost"));

            let err = fast()
                .await_condition(&mut driver, &mut recorder, &chain, &Condition::Present, None)
                .await
                .unwrap_err();

            assert!(matches!(err, ProbeError::NotFound { .. }));
            assert_eq!(recorder.len(), 1);
            assert_eq!(recorder.records()[0].context, "id=ghost");
        }

        #[tokio::test]
        async fn test_disabled_element_is_not_interactable() {
            let dir = tempfile::tempdir().unwrap();
            let mut recorder = DiagnosticRecorder::new(dir.path());
            let mut driver =
                MockDriver::new().with_element(&id("login-button"), MockElement::new("button").disabled());
            let chain = LocatorChain::from(Locator::id("login-button"));

            let err = fast()
                .await_condition(&mut driver, &mut recorder, &chain, &Condition::Clickable, None)
                .await
                .unwrap_err();

            assert!(matches!(err, ProbeError::NotInteractable { .. }));
            assert_eq!(recorder.len(), 1);
        }

        #[tokio::test]
        async fn test_element_enabling_late_becomes_clickable() {
            let dir = tempfile::tempdir().unwrap();
            let mut recorder = DiagnosticRecorder::new(dir.path());
            let mut driver = MockDriver::new()
                .with_element(&id("register-button"), MockElement::new("button").enabling_after(3));
            let chain = LocatorChain::from(Locator::id("register-button"));

            let resolved = fast()
                .await_condition(&mut driver, &mut recorder, &chain, &Condition::Clickable, None)
                .await
                .unwrap();

            assert!(resolved.element.enabled);
            assert!(recorder.is_empty());
        }

        #[tokio::test]
        async fn test_missing_text_is_assertion_failure() {
            let dir = tempfile::tempdir().unwrap();
            let mut recorder = DiagnosticRecorder::new(dir.path());
            let mut driver = MockDriver::new()
                .with_element(&id("result"), MockElement::new("div").with_text("pending"));
            let chain = LocatorChain::from(Locator::id("result"));

            let err = fast()
                .await_condition(
                    &mut driver,
                    &mut recorder,
                    &chain,
                    &Condition::VisibleWithText("Your BMI".into()),
                    None,
                )
                .await
                .unwrap_err();

            assert!(matches!(err, ProbeError::AssertionFailure { .. }));
            assert_eq!(recorder.len(), 1);
        }

        #[tokio::test]
        async fn test_zero_timeout_probes_once() {
            let mut driver = MockDriver::new()
                .with_element(&id("now"), MockElement::new("div"));
            let found = fast()
                .poll(&mut driver, &Locator::id("now"), &Condition::Present, Duration::ZERO)
                .await;
            assert!(found.is_some());
        }
    }

    mod chain_tests {
        use super::*;

        fn auth_chain() -> LocatorChain {
            LocatorChain::labeled("authenticated")
                .or(Locator::xpath("//h1[contains(text(), 'Dashboard')]"))
                .or(Locator::id("nav-dashboard"))
                .or(Locator::id("nav-logout"))
        }

        #[tokio::test]
        async fn test_second_strategy_wins_without_diagnostic() {
            let dir = tempfile::tempdir().unwrap();
            let mut recorder = DiagnosticRecorder::new(dir.path());
            let mut driver =
                MockDriver::new().with_element(&id("nav-dashboard"), MockElement::new("a"));

            let resolved = fast()
                .await_condition(&mut driver, &mut recorder, &auth_chain(), &Condition::Present, None)
                .await
                .unwrap();

            assert_eq!(resolved.strategy_index, 1);
            assert_eq!(resolved.locator, Locator::id("nav-dashboard"));
            assert!(recorder.is_empty());
        }

        #[tokio::test]
        async fn test_first_hit_short_circuits() {
            let dir = tempfile::tempdir().unwrap();
            let mut recorder = DiagnosticRecorder::new(dir.path());
            let heading = Selector::XPath("//h1[contains(text(), 'Dashboard')]".into());
            let mut driver = MockDriver::new()
                .with_element(&heading, MockElement::new("h1").with_text("Dashboard"))
                .with_element(&id("nav-logout"), MockElement::new("button"));

            let resolved = fast()
                .await_condition(&mut driver, &mut recorder, &auth_chain(), &Condition::Present, None)
                .await
                .unwrap();

            assert_eq!(resolved.strategy_index, 0);
            let probes = driver.history();
            assert!(probes.iter().all(|c| !c.contains("nav-logout")));
        }

        #[tokio::test]
        async fn test_all_strategies_fail_with_aggregate() {
            let dir = tempfile::tempdir().unwrap();
            let mut recorder = DiagnosticRecorder::new(dir.path());
            let mut driver = MockDriver::new();

            let err = fast()
                .await_condition(&mut driver, &mut recorder, &auth_chain(), &Condition::Present, None)
                .await
                .unwrap_err();

            match err {
                ProbeError::NotFound {
                    locator, attempted, ..
                } => {
                    assert_eq!(locator, "authenticated");
                    assert_eq!(attempted.len(), 3);
                    assert_eq!(attempted[2], "id=nav-logout");
                }
                other => panic!("unexpected error: {other}"),
            }
            assert_eq!(recorder.len(), 1);
        }

        #[tokio::test]
        async fn test_clickable_chain_failure_is_not_found() {
            let mut driver = MockDriver::new()
                .with_element(&id("a"), MockElement::new("button").disabled());
            let chain = LocatorChain::single(Locator::id("a")).or(Locator::id("b"));

            let err = fast()
                .resolve(&mut driver, &chain, &Condition::Clickable, None)
                .await
                .unwrap_err();

            assert!(matches!(err, ProbeError::NotFound { .. }));
        }

        #[tokio::test]
        async fn test_locator_override_capped_by_default_timeout() {
            let mut driver = MockDriver::new();
            let chain = LocatorChain::single(Locator::id("a").with_timeout(Duration::from_secs(30)))
                .or(Locator::id("b").with_timeout(Duration::from_secs(30)));
            let started = std::time::Instant::now();

            let err = fast()
                .resolve(&mut driver, &chain, &Condition::Present, None)
                .await
                .unwrap_err();

            assert!(matches!(err, ProbeError::NotFound { .. }));
            assert!(started.elapsed() < Duration::from_secs(5));
        }

        #[tokio::test]
        async fn test_strategy_budget_capped_by_step_timeout() {
            let waiter = Waiter::with_options(
                WaitOptions::new()
                    .with_timeout(100)
                    .with_strategy_timeout(400)
                    .with_poll_interval(5),
            );
            let mut driver = MockDriver::new();
            let chain = LocatorChain::single(Locator::id("a")).or(Locator::id("b"));
            let started = std::time::Instant::now();

            let err = waiter
                .resolve(
                    &mut driver,
                    &chain,
                    &Condition::Present,
                    Some(Duration::from_millis(50)),
                )
                .await
                .unwrap_err();

            assert!(matches!(err, ProbeError::NotFound { .. }));
            assert!(started.elapsed() < Duration::from_millis(400));
        }

        #[tokio::test]
        async fn test_strategy_budget_capped_by_default_timeout() {
            let waiter = Waiter::with_options(
                WaitOptions::new()
                    .with_timeout(60)
                    .with_strategy_timeout(2_000)
                    .with_poll_interval(5),
            );
            let mut driver = MockDriver::new();
            let chain = LocatorChain::single(Locator::id("a"))
                .or(Locator::id("b"))
                .or(Locator::id("c"));
            let started = std::time::Instant::now();

            let _ = waiter
                .resolve(&mut driver, &chain, &Condition::Present, None)
                .await;

            assert!(started.elapsed() < Duration::from_secs(1));
        }

        #[tokio::test]
        async fn test_empty_chain_fails_immediately() {
            let mut driver = MockDriver::new();
            let chain = LocatorChain::labeled("nothing");
            let err = fast()
                .resolve(&mut driver, &chain, &Condition::Present, None)
                .await
                .unwrap_err();
            assert!(matches!(err, ProbeError::NotFound { .. }));
        }
    }
}
