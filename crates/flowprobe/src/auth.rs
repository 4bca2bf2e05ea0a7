//! Authentication flow state machine.
//!
//! ```text
//! Unauthenticated ──submit──► CredentialsSubmitted ──evidence──► Authenticated
//!        ▲                            │
//!        │                            └──no evidence──► AuthError
//!        └──────────── ConfirmSignedOut ◄── logout
//! ```
//!
//! After credentials are submitted the app may redirect slowly or not at all.
//! Confirmation waits a grace period, nudges the browser to `/dashboard` once
//! if it is still on the login page, then accepts any of the
//! authenticated-evidence strategies.

use crate::locator::{Locator, LocatorChain};
use crate::result::{ProbeError, ProbeResult};
use crate::step::{Step, StepContext};
use crate::wait::Condition;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{info, warn};

/// Location fragment that means "still on the login page"
pub const LOGIN_MARKER: &str = "login";

/// Budget for reading the error indicator after a failed login (3 seconds)
pub const ERROR_INDICATOR_TIMEOUT_MS: u64 = 3_000;

/// Authentication state of the current browser session
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum AuthState {
    /// No credentials submitted, or signed out
    #[default]
    Unauthenticated,
    /// Credentials submitted, outcome pending
    CredentialsSubmitted,
    /// Signed in; `evidence` names the strategy that proved it
    Authenticated {
        /// Winning locator description
        evidence: String,
    },
    /// Sign-in did not produce any authenticated evidence
    AuthError {
        /// What went wrong, including any on-page error text
        message: String,
    },
}

impl AuthState {
    /// Whether the session is signed in
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated { .. })
    }
}

/// Equivalent evidence that the user is signed in
#[must_use]
pub fn authenticated_evidence() -> LocatorChain {
    LocatorChain::labeled("authenticated")
        .or(Locator::xpath("//h1[contains(text(), 'Dashboard')]"))
        .or(Locator::id("nav-dashboard"))
        .or(Locator::id("nav-logout"))
}

/// Error or toast banner shown on failed sign-in
#[must_use]
pub fn error_indicator() -> Locator {
    Locator::xpath("//div[contains(@class, 'error') or contains(@class, 'toast')]")
}

/// Heading of the login screen
#[must_use]
pub fn login_heading() -> Locator {
    Locator::xpath("//h1[contains(text(), 'Login')]")
}

impl StepContext<'_> {
    pub(crate) async fn confirm_authenticated(&mut self) -> ProbeResult<()> {
        self.auth = AuthState::CredentialsSubmitted;
        let grace = self.config.auth_grace();
        tokio::time::sleep(grace).await;

        // An unreadable location is treated like the login page.
        let location = match self.driver.current_url().await {
            Ok(url) => Some(url),
            Err(e) => {
                warn!(error = %e, "could not read location after submit");
                None
            }
        };
        if location.as_deref().map_or(true, |l| l.contains(LOGIN_MARKER)) {
            info!(
                location = location.as_deref().unwrap_or("<unknown>"),
                "not on the dashboard after submit, navigating to it"
            );
            let dashboard = self.config.url("/dashboard");
            self.driver.navigate(&dashboard).await?;
            tokio::time::sleep(grace).await;
        }

        let evidence = authenticated_evidence();
        match self
            .waiter
            .resolve(&mut *self.driver, &evidence, &Condition::Present, None)
            .await
        {
            Ok(resolved) => {
                let evidence = resolved.locator.to_string();
                info!(evidence = %evidence, "authenticated");
                self.auth = AuthState::Authenticated { evidence };
                Ok(())
            }
            Err(missing) => {
                let banner = self.read_auth_error().await;
                let _ = self
                    .recorder
                    .capture(&mut *self.driver, &evidence.description())
                    .await;
                match banner {
                    Some(message) => {
                        warn!(message = %message, "authentication failed");
                        self.auth = AuthState::AuthError {
                            message: message.clone(),
                        };
                        Err(ProbeError::unexpected(message))
                    }
                    // No banner either: the outcome is unknown, so the state stays
                    // at CredentialsSubmitted.
                    None => {
                        let message = format!("no authenticated evidence: {missing}");
                        warn!(message = %message, "authentication not confirmed");
                        Err(ProbeError::unexpected(message))
                    }
                }
            }
        }
    }

    async fn read_auth_error(&mut self) -> Option<String> {
        let budget = Duration::from_millis(
            ERROR_INDICATOR_TIMEOUT_MS.min(self.config.default_timeout_ms),
        );
        let indicator = LocatorChain::from(error_indicator());
        match self
            .waiter
            .resolve(&mut *self.driver, &indicator, &Condition::Present, Some(budget))
            .await
        {
            Ok(resolved) if !resolved.element.text.is_empty() => Some(format!(
                "authentication error shown: {}",
                resolved.element.text
            )),
            Ok(_) => Some("authentication error shown without text".to_string()),
            Err(_) => None,
        }
    }

    pub(crate) async fn confirm_signed_out(&mut self, step: &Step) -> ProbeResult<()> {
        let heading = LocatorChain::from(login_heading());
        let timeout = self.timeout_for(step);
        self.waiter
            .await_condition(
                &mut *self.driver,
                self.recorder,
                &heading,
                &Condition::Present,
                timeout,
            )
            .await?;
        let location = self.driver.current_url().await?;
        if !location.contains(LOGIN_MARKER) {
            return Err(ProbeError::assertion(format!(
                "expected to be on the login page after logout, got {location}"
            )));
        }
        info!("signed out");
        self.auth = AuthState::Unauthenticated;
        Ok(())
    }
}
