//! Driver - Abstract Browser Automation Trait
//!
//! The engine never talks to a browser directly. Every locate, click, type,
//! navigate, and screenshot goes through [`Driver`], so the real CDP transport
//! ([`crate::ChromiumDriver`], behind the `browser` feature) and the scripted
//! [`MockDriver`] used in tests are interchangeable.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │  Driver (Abstract Trait)                                      │
//! ├──────────────────────────────────────────────────────────────┤
//! │  ┌─────────────────────┐        ┌─────────────────────────┐  │
//! │  │  ChromiumDriver     │        │  MockDriver             │  │
//! │  │  CDP via            │        │  scripted page model,   │  │
//! │  │  chromiumoxide      │        │  call history           │  │
//! │  └─────────────────────┘        └─────────────────────────┘  │
//! └──────────────────────────────────────────────────────────────┘
//! ```

use crate::locator::Selector;
use crate::result::{ProbeError, ProbeResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

/// Snapshot of a located element at probe time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementHandle {
    /// Description of the selector that resolved it
    pub selector: String,
    /// Element tag name (lowercase)
    pub tag_name: String,
    /// Rendered text content, trimmed
    pub text: String,
    /// Whether the element has a rendered box and is not hidden
    pub visible: bool,
    /// Whether the element accepts input (not `disabled`)
    pub enabled: bool,
}

impl ElementHandle {
    /// Create a visible, enabled element handle
    #[must_use]
    pub fn new(selector: impl Into<String>, tag_name: impl Into<String>) -> Self {
        Self {
            selector: selector.into(),
            tag_name: tag_name.into(),
            text: String::new(),
            visible: true,
            enabled: true,
        }
    }

    /// Whether a click would land on this element
    #[must_use]
    pub const fn is_clickable(&self) -> bool {
        self.visible && self.enabled
    }
}

/// Abstract driver trait for browser automation
///
/// One driver is one exclusively owned browser session. Methods take
/// `&mut self` because a session is never shared between steps.
#[async_trait]
pub trait Driver: Send + fmt::Debug {
    /// Navigate to an absolute URL
    async fn navigate(&mut self, url: &str) -> ProbeResult<()>;

    /// Current location of the page
    async fn current_url(&mut self) -> ProbeResult<String>;

    /// Full page source
    async fn page_source(&mut self) -> ProbeResult<String>;

    /// PNG screenshot of the viewport
    async fn screenshot(&mut self) -> ProbeResult<Vec<u8>>;

    /// Look up an element once, without waiting
    async fn probe(&mut self, selector: &Selector) -> ProbeResult<Option<ElementHandle>>;

    /// Click an element
    async fn click(&mut self, selector: &Selector) -> ProbeResult<()>;

    /// Clear an input and type text into it
    async fn type_text(&mut self, selector: &Selector, text: &str) -> ProbeResult<()>;

    /// Select an `<option>` element within its parent `<select>`
    async fn select_option(&mut self, selector: &Selector) -> ProbeResult<()>;

    /// Tear the session down
    async fn close(&mut self) -> ProbeResult<()>;
}

/// Source of fresh browser sessions, one per scenario
#[async_trait]
pub trait DriverFactory: Send + Sync + fmt::Debug {
    /// Acquire a new, exclusively owned session
    async fn acquire(&self) -> ProbeResult<Box<dyn Driver>>;
}

// ============================================================================
// Mock driver
// ============================================================================

/// Scripted element in the mock page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockElement {
    /// Tag name
    pub tag_name: String,
    /// Text content
    pub text: String,
    /// Visibility
    pub visible: bool,
    /// Enabled state
    pub enabled: bool,
    /// Number of probes that report the element absent before it appears
    pub present_after: u32,
    /// Number of probes that report the element disabled before it enables
    pub enabled_after: u32,
}

impl MockElement {
    /// A visible, enabled element
    #[must_use]
    pub fn new(tag_name: impl Into<String>) -> Self {
        Self {
            tag_name: tag_name.into(),
            text: String::new(),
            visible: true,
            enabled: true,
            present_after: 0,
            enabled_after: 0,
        }
    }

    /// Set text content
    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    /// Mark as disabled (never clickable)
    #[must_use]
    pub const fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Mark as hidden
    #[must_use]
    pub const fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    /// Appear only after `probes` lookups
    #[must_use]
    pub const fn appearing_after(mut self, probes: u32) -> Self {
        self.present_after = probes;
        self
    }

    /// Become enabled only after `probes` lookups
    #[must_use]
    pub const fn enabling_after(mut self, probes: u32) -> Self {
        self.enabled_after = probes;
        self
    }
}

/// Side effect triggered by a click or a navigation in the mock page
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockEffect {
    /// Change the current location
    SetUrl(String),
    /// Add (or replace) an element
    Show(String, MockElement),
    /// Remove an element
    Hide(String),
}

#[derive(Debug, Default)]
struct MockState {
    current_url: String,
    page_source: String,
    elements: HashMap<String, MockElement>,
    probe_counts: HashMap<String, u32>,
    on_click: HashMap<String, Vec<MockEffect>>,
    on_navigate: Vec<(String, Vec<MockEffect>)>,
    typed: HashMap<String, String>,
    call_history: Vec<String>,
    fail_screenshots: bool,
    fail_location: bool,
    acquired: usize,
    closed: usize,
}

impl MockState {
    fn apply(&mut self, effects: &[MockEffect]) {
        for effect in effects {
            match effect {
                MockEffect::SetUrl(url) => self.current_url.clone_from(url),
                MockEffect::Show(key, element) => {
                    let _ = self.probe_counts.remove(key);
                    let _ = self.elements.insert(key.clone(), element.clone());
                }
                MockEffect::Hide(key) => {
                    let _ = self.elements.remove(key);
                }
            }
        }
    }
}

/// Mock driver for unit testing
///
/// A scripted page model: elements keyed by selector description
/// (`id=login-button`, `xpath=//h1[...]`), plus click and navigation effects.
/// Clones share state, so one `MockDriver` can act as a [`DriverFactory`] and
/// every acquired session sees the same application, like a persistent
/// backend would.
#[derive(Debug, Clone, Default)]
pub struct MockDriver {
    state: Arc<Mutex<MockState>>,
}

impl MockDriver {
    /// Create new mock driver
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut MockState) -> R) -> R {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut state)
    }

    /// Add a mock element keyed by its selector description
    #[must_use]
    pub fn with_element(self, selector: &Selector, element: MockElement) -> Self {
        self.add_element(selector, element);
        self
    }

    /// Add a mock element in place
    pub fn add_element(&self, selector: &Selector, element: MockElement) {
        self.with_state(|s| {
            let _ = s.elements.insert(selector.to_string(), element);
        });
    }

    /// Remove a mock element in place
    pub fn remove_element(&self, selector: &Selector) {
        self.with_state(|s| {
            let _ = s.elements.remove(&selector.to_string());
        });
    }

    /// Register effects for clicking an element
    #[must_use]
    pub fn on_click(self, selector: &Selector, effects: Vec<MockEffect>) -> Self {
        self.with_state(|s| {
            s.on_click
                .entry(selector.to_string())
                .or_default()
                .extend(effects);
        });
        self
    }

    /// Register effects for navigating to a URL ending with `path`
    #[must_use]
    pub fn on_navigate(self, path: impl Into<String>, effects: Vec<MockEffect>) -> Self {
        let path = path.into();
        self.with_state(|s| s.on_navigate.push((path, effects)));
        self
    }

    /// Set the page source returned by `page_source`
    #[must_use]
    pub fn with_page_source(self, source: impl Into<String>) -> Self {
        let source = source.into();
        self.with_state(|s| s.page_source = source);
        self
    }

    /// Make every screenshot fail
    #[must_use]
    pub fn failing_screenshots(self) -> Self {
        self.with_state(|s| s.fail_screenshots = true);
        self
    }

    /// Make every location read fail
    #[must_use]
    pub fn failing_location(self) -> Self {
        self.with_state(|s| s.fail_location = true);
        self
    }

    /// Get call history
    #[must_use]
    pub fn history(&self) -> Vec<String> {
        self.with_state(|s| s.call_history.clone())
    }

    /// Check if method was called
    #[must_use]
    pub fn was_called(&self, method: &str) -> bool {
        self.with_state(|s| s.call_history.iter().any(|c| c.starts_with(method)))
    }

    /// Last text typed into an element
    #[must_use]
    pub fn typed_into(&self, selector: &Selector) -> Option<String> {
        self.with_state(|s| s.typed.get(&selector.to_string()).cloned())
    }

    /// Current URL of the mock page
    #[must_use]
    pub fn url(&self) -> String {
        self.with_state(|s| s.current_url.clone())
    }

    /// Number of sessions handed out as a factory
    #[must_use]
    pub fn acquired_count(&self) -> usize {
        self.with_state(|s| s.acquired)
    }

    /// Number of sessions closed
    #[must_use]
    pub fn closed_count(&self) -> usize {
        self.with_state(|s| s.closed)
    }
}

#[async_trait]
impl Driver for MockDriver {
    async fn navigate(&mut self, url: &str) -> ProbeResult<()> {
        self.with_state(|s| {
            s.call_history.push(format!("navigate:{url}"));
            s.current_url = url.to_string();
            let effects: Vec<MockEffect> = s
                .on_navigate
                .iter()
                .filter(|(path, _)| url.ends_with(path.as_str()))
                .flat_map(|(_, effects)| effects.iter().cloned())
                .collect();
            s.apply(&effects);
        });
        Ok(())
    }

    async fn current_url(&mut self) -> ProbeResult<String> {
        self.with_state(|s| {
            if s.fail_location {
                Err(ProbeError::driver("location unavailable"))
            } else {
                Ok(s.current_url.clone())
            }
        })
    }

    async fn page_source(&mut self) -> ProbeResult<String> {
        Ok(self.with_state(|s| {
            if s.page_source.is_empty() {
                format!("<html><body data-url=\"{}\"></body></html>", s.current_url)
            } else {
                s.page_source.clone()
            }
        }))
    }

    async fn screenshot(&mut self) -> ProbeResult<Vec<u8>> {
        self.with_state(|s| {
            s.call_history.push("screenshot".to_string());
            if s.fail_screenshots {
                Err(ProbeError::driver("screenshot unavailable"))
            } else {
                Ok(b"\x89PNG\r\n\x1a\nmock".to_vec())
            }
        })
    }

    async fn probe(&mut self, selector: &Selector) -> ProbeResult<Option<ElementHandle>> {
        let key = selector.to_string();
        Ok(self.with_state(|s| {
            let count = s.probe_counts.entry(key.clone()).or_insert(0);
            *count += 1;
            let seen = *count;
            s.elements.get(&key).and_then(|el| {
                if seen <= el.present_after {
                    return None;
                }
                Some(ElementHandle {
                    selector: key.clone(),
                    tag_name: el.tag_name.clone(),
                    text: el.text.clone(),
                    visible: el.visible,
                    enabled: el.enabled && seen > el.enabled_after,
                })
            })
        }))
    }

    async fn click(&mut self, selector: &Selector) -> ProbeResult<()> {
        let key = selector.to_string();
        self.with_state(|s| {
            s.call_history.push(format!("click:{key}"));
            if !s.elements.contains_key(&key) {
                return Err(ProbeError::driver(format!("no element for {key}")));
            }
            let effects = s.on_click.get(&key).cloned().unwrap_or_default();
            s.apply(&effects);
            Ok(())
        })
    }

    async fn type_text(&mut self, selector: &Selector, text: &str) -> ProbeResult<()> {
        let key = selector.to_string();
        self.with_state(|s| {
            s.call_history.push(format!("type:{key}"));
            if !s.elements.contains_key(&key) {
                return Err(ProbeError::driver(format!("no element for {key}")));
            }
            let _ = s.typed.insert(key, text.to_string());
            Ok(())
        })
    }

    async fn select_option(&mut self, selector: &Selector) -> ProbeResult<()> {
        let key = selector.to_string();
        self.with_state(|s| {
            s.call_history.push(format!("select:{key}"));
            if s.elements.contains_key(&key) {
                Ok(())
            } else {
                Err(ProbeError::driver(format!("no option for {key}")))
            }
        })
    }

    async fn close(&mut self) -> ProbeResult<()> {
        self.with_state(|s| {
            s.call_history.push("close".to_string());
            s.closed += 1;
        });
        Ok(())
    }
}

#[async_trait]
impl DriverFactory for MockDriver {
    async fn acquire(&self) -> ProbeResult<Box<dyn Driver>> {
        self.with_state(|s| {
            s.call_history.push("acquire".to_string());
            s.acquired += 1;
        });
        Ok(Box::new(self.clone()))
    }
}
