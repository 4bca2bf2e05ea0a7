//! Diagnostic capture on failure.
//!
//! Capture is best-effort: the screenshot, the location, and the page source
//! are collected independently and any of them may be missing. A failure while
//! capturing is logged and swallowed so it never replaces the failure it was
//! meant to explain.

use crate::driver::Driver;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Default directory for screenshots and diagnostics
pub const DEFAULT_ARTIFACTS_DIR: &str = "screenshots";

/// Default number of page-source characters kept in a diagnostic
pub const DEFAULT_EXCERPT_CHARS: usize = 500;

/// Longest file-name component derived from a locator description
const MAX_NAME_COMPONENT: usize = 80;

/// Forensic record of one failure point
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// When the capture happened
    pub timestamp: DateTime<Utc>,
    /// What was being looked for (locator or chain description)
    pub context: String,
    /// Screenshot file, if it could be written
    pub screenshot_path: Option<PathBuf>,
    /// Page location at failure time, if readable
    pub location: Option<String>,
    /// Leading slice of the page source, if readable
    pub page_excerpt: Option<String>,
}

/// Captures and keeps diagnostics for one run.
#[derive(Debug, Clone)]
pub struct DiagnosticRecorder {
    dir: PathBuf,
    excerpt_chars: usize,
    seq: u64,
    records: Vec<Diagnostic>,
}

impl Default for DiagnosticRecorder {
    fn default() -> Self {
        Self::new(DEFAULT_ARTIFACTS_DIR)
    }
}

impl DiagnosticRecorder {
    /// Create a recorder writing into `dir` (created on first capture)
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            excerpt_chars: DEFAULT_EXCERPT_CHARS,
            seq: 0,
            records: Vec::new(),
        }
    }

    /// Set the page excerpt length
    #[must_use]
    pub const fn with_excerpt_chars(mut self, chars: usize) -> Self {
        self.excerpt_chars = chars;
        self
    }

    /// Artifact directory
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Every diagnostic captured so far, oldest first
    #[must_use]
    pub fn records(&self) -> &[Diagnostic] {
        &self.records
    }

    /// Number of diagnostics captured so far
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether nothing has been captured
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Most recent diagnostic
    #[must_use]
    pub fn last(&self) -> Option<&Diagnostic> {
        self.records.last()
    }

    /// Capture evidence for a failure. Never fails.
    pub async fn capture(&mut self, driver: &mut dyn Driver, context: &str) -> Diagnostic {
        let timestamp = Utc::now();
        self.seq += 1;
        let file_name = format!(
            "error_{}_{}_{}.png",
            timestamp.timestamp_millis(),
            self.seq,
            sanitize_component(context)
        );
        let screenshot_path = self.write_screenshot(driver, &file_name).await;

        let location = match driver.current_url().await {
            Ok(url) => Some(url),
            Err(e) => {
                warn!(error = %e, "diagnostic: could not read current location");
                None
            }
        };

        let page_excerpt = match driver.page_source().await {
            Ok(source) => Some(excerpt(&source, self.excerpt_chars)),
            Err(e) => {
                warn!(error = %e, "diagnostic: could not read page source");
                None
            }
        };

        let diagnostic = Diagnostic {
            timestamp,
            context: context.to_string(),
            screenshot_path,
            location,
            page_excerpt,
        };
        debug!(
            context,
            location = diagnostic.location.as_deref().unwrap_or("<unknown>"),
            "captured diagnostic"
        );
        self.records.push(diagnostic.clone());
        diagnostic
    }

    /// Save a named milestone screenshot. Not a diagnostic; never fails.
    pub async fn checkpoint(&mut self, driver: &mut dyn Driver, label: &str) -> Option<PathBuf> {
        self.seq += 1;
        let file_name = format!(
            "{}_{}_{}.png",
            sanitize_component(label),
            Utc::now().timestamp_millis(),
            self.seq
        );
        self.write_screenshot(driver, &file_name).await
    }

    async fn write_screenshot(&self, driver: &mut dyn Driver, file_name: &str) -> Option<PathBuf> {
        let png = match driver.screenshot().await {
            Ok(png) => png,
            Err(e) => {
                warn!(error = %e, file_name, "screenshot capture failed");
                return None;
            }
        };
        if let Err(e) = tokio::fs::create_dir_all(&self.dir).await {
            warn!(error = %e, dir = %self.dir.display(), "could not create artifacts directory");
            return None;
        }
        let path = self.dir.join(file_name);
        match tokio::fs::write(&path, png).await {
            Ok(()) => Some(path),
            Err(e) => {
                warn!(error = %e, path = %path.display(), "could not write screenshot");
                None
            }
        }
    }
}

/// Turn a locator description into a safe file-name component
#[must_use]
pub fn sanitize_component(raw: &str) -> String {
    let mut out: String = raw
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '.' {
                c
            } else {
                '_'
            }
        })
        .take(MAX_NAME_COMPONENT)
        .collect();
    if out.is_empty() {
        out.push_str("unnamed");
    }
    out
}

/// First `chars` characters of `source`, with an ellipsis when truncated
#[must_use]
pub fn excerpt(source: &str, chars: usize) -> String {
    let mut it = source.chars();
    let head: String = it.by_ref().take(chars).collect();
    if it.next().is_some() {
        format!("{head}...")
    } else {
        head
    }
}
