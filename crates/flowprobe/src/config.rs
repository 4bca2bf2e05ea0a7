//! Run Configuration
//!
//! Settings for one verification run, loadable from YAML and overridable
//! field by field.

use crate::diagnostic::{DEFAULT_ARTIFACTS_DIR, DEFAULT_EXCERPT_CHARS};
use crate::result::{ProbeError, ProbeResult};
use crate::wait::{
    WaitOptions, DEFAULT_POLL_INTERVAL_MS, DEFAULT_STRATEGY_TIMEOUT_MS, DEFAULT_WAIT_TIMEOUT_MS,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default application URL
pub const DEFAULT_BASE_URL: &str = "http://localhost:3000";

/// Default settle time after submitting credentials (2 seconds)
pub const DEFAULT_AUTH_GRACE_MS: u64 = 2_000;

/// Browser window size
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 900,
        }
    }
}

/// Configuration for a verification run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Root URL of the application under test
    pub base_url: String,
    /// Run the browser without a window
    pub headless: bool,
    /// Explicit Chromium executable
    pub chromium_path: Option<PathBuf>,
    /// Browser window size
    pub viewport: Viewport,
    /// Default wait timeout for a step
    pub default_timeout_ms: u64,
    /// Budget for each strategy of a fallback chain
    pub strategy_timeout_ms: u64,
    /// Interval between probes
    pub poll_interval_ms: u64,
    /// Settle time after submitting credentials
    pub auth_grace_ms: u64,
    /// Where screenshots and the run report go
    pub artifacts_dir: PathBuf,
    /// Page-source characters kept per diagnostic
    pub excerpt_chars: usize,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            headless: true,
            chromium_path: None,
            viewport: Viewport::default(),
            default_timeout_ms: DEFAULT_WAIT_TIMEOUT_MS,
            strategy_timeout_ms: DEFAULT_STRATEGY_TIMEOUT_MS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            auth_grace_ms: DEFAULT_AUTH_GRACE_MS,
            artifacts_dir: PathBuf::from(DEFAULT_ARTIFACTS_DIR),
            excerpt_chars: DEFAULT_EXCERPT_CHARS,
        }
    }
}

impl RunConfig {
    /// Create config with defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse from YAML; missing fields take their defaults
    pub fn from_yaml_str(yaml: &str) -> ProbeResult<Self> {
        let config: Self = serde_yaml_ng::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a YAML file
    pub fn load(path: &Path) -> ProbeResult<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&raw)
    }

    /// Reject settings that would make every wait degenerate
    pub fn validate(&self) -> ProbeResult<()> {
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(ProbeError::Config {
                message: format!("base_url must be an http(s) URL, got {:?}", self.base_url),
            });
        }
        if self.poll_interval_ms == 0 {
            return Err(ProbeError::Config {
                message: "poll_interval_ms must be greater than zero".to_string(),
            });
        }
        if self.default_timeout_ms == 0 || self.strategy_timeout_ms == 0 {
            return Err(ProbeError::Config {
                message: "timeouts must be greater than zero".to_string(),
            });
        }
        Ok(())
    }

    /// Set the base URL
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set headless mode
    #[must_use]
    pub const fn with_headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    /// Set the Chromium executable
    #[must_use]
    pub fn with_chromium_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.chromium_path = Some(path.into());
        self
    }

    /// Set viewport dimensions
    #[must_use]
    pub const fn with_viewport(mut self, width: u32, height: u32) -> Self {
        self.viewport = Viewport { width, height };
        self
    }

    /// Set default step timeout in milliseconds
    #[must_use]
    pub const fn with_default_timeout(mut self, timeout_ms: u64) -> Self {
        self.default_timeout_ms = timeout_ms;
        self
    }

    /// Set per-strategy timeout in milliseconds
    #[must_use]
    pub const fn with_strategy_timeout(mut self, timeout_ms: u64) -> Self {
        self.strategy_timeout_ms = timeout_ms;
        self
    }

    /// Set poll interval in milliseconds
    #[must_use]
    pub const fn with_poll_interval(mut self, interval_ms: u64) -> Self {
        self.poll_interval_ms = interval_ms;
        self
    }

    /// Set auth settle time in milliseconds
    #[must_use]
    pub const fn with_auth_grace(mut self, grace_ms: u64) -> Self {
        self.auth_grace_ms = grace_ms;
        self
    }

    /// Set artifacts directory
    #[must_use]
    pub fn with_artifacts_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.artifacts_dir = dir.into();
        self
    }

    /// Set page excerpt length
    #[must_use]
    pub const fn with_excerpt_chars(mut self, chars: usize) -> Self {
        self.excerpt_chars = chars;
        self
    }

    /// Absolute URL for an app path such as `/login`
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    /// Wait settings derived from this config
    #[must_use]
    pub const fn wait_options(&self) -> WaitOptions {
        WaitOptions {
            timeout_ms: self.default_timeout_ms,
            strategy_timeout_ms: self.ceiling(self.strategy_timeout_ms),
            poll_interval_ms: self.poll_interval_ms,
        }
    }

    /// Auth settle time, never longer than the default timeout
    #[must_use]
    pub const fn auth_grace(&self) -> Duration {
        Duration::from_millis(self.ceiling(self.auth_grace_ms))
    }

    const fn ceiling(&self, ms: u64) -> u64 {
        if ms > self.default_timeout_ms {
            self.default_timeout_ms
        } else {
            ms
        }
    }
}
