//! Result and error types for Flowprobe.

use thiserror::Error;

/// Result type for Flowprobe operations
pub type ProbeResult<T> = Result<T, ProbeError>;

/// Errors that can occur while driving a scenario
#[derive(Debug, Error)]
pub enum ProbeError {
    /// No locator strategy resolved before its timeout
    #[error("Element {locator} not found within {timeout_ms}ms (tried: {})", .attempted.join(", "))]
    NotFound {
        /// Description of the locator or chain
        locator: String,
        /// Every strategy that was attempted, in order
        attempted: Vec<String>,
        /// Total time budget that elapsed
        timeout_ms: u64,
    },

    /// Element present but never became actionable
    #[error("Element {locator} not clickable within {timeout_ms}ms")]
    NotInteractable {
        /// Description of the locator
        locator: String,
        /// Timeout in milliseconds
        timeout_ms: u64,
    },

    /// Expected UI state or text absent
    #[error("Assertion failed: {message}")]
    AssertionFailure {
        /// Error message
        message: String,
    },

    /// The page is in a state the flow cannot continue from
    #[error("Unexpected state: {message}")]
    UnexpectedState {
        /// Error message
        message: String,
    },

    /// Automation transport error
    #[error("Driver error: {message}")]
    Driver {
        /// Error message
        message: String,
    },

    /// Browser launch error
    #[error("Failed to launch browser: {message}")]
    BrowserLaunch {
        /// Error message
        message: String,
    },

    /// Scenario list violates ordering or dependency rules
    #[error("Invalid scenario plan: {message}")]
    InvalidPlan {
        /// Error message
        message: String,
    },

    /// Configuration error
    #[error("Configuration error: {message}")]
    Config {
        /// Error message
        message: String,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),
}

impl ProbeError {
    /// Create a driver error
    #[must_use]
    pub fn driver(message: impl Into<String>) -> Self {
        Self::Driver {
            message: message.into(),
        }
    }

    /// Create an assertion failure
    #[must_use]
    pub fn assertion(message: impl Into<String>) -> Self {
        Self::AssertionFailure {
            message: message.into(),
        }
    }

    /// Create an unexpected-state error
    #[must_use]
    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::UnexpectedState {
            message: message.into(),
        }
    }

    /// Short name of the failure kind, used in reports
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "not_found",
            Self::NotInteractable { .. } => "not_interactable",
            Self::AssertionFailure { .. } => "assertion_failure",
            Self::UnexpectedState { .. } => "unexpected_state",
            Self::Driver { .. } => "driver",
            Self::BrowserLaunch { .. } => "browser_launch",
            Self::InvalidPlan { .. } => "invalid_plan",
            Self::Config { .. } => "config",
            Self::Io(_) => "io",
            Self::Json(_) => "json",
            Self::Yaml(_) => "yaml",
        }
    }
}
