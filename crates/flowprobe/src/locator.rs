//! Locators and fallback chains.
//!
//! A [`Locator`] names one way of finding an element. A [`LocatorChain`] is an
//! ordered list of locators that count as equivalent evidence for the same
//! semantic element ("the user is signed in" may show up as a heading, a nav
//! link, or a logout control). The wait engine resolves a chain by trying each
//! strategy in order and stopping at the first hit.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Selector type for locating elements
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "by", content = "value", rename_all = "snake_case")]
pub enum Selector {
    /// Element id attribute
    Id(String),
    /// CSS selector (e.g., "button.primary")
    Css(String),
    /// XPath expression
    XPath(String),
    /// Test ID selector (data-testid attribute)
    TestId(String),
}

impl Selector {
    /// Convert to a JavaScript expression evaluating to the element or `null`
    #[must_use]
    pub fn to_query(&self) -> String {
        match self {
            Self::Id(id) => format!("document.getElementById({})", js_string(id)),
            Self::Css(s) => format!("document.querySelector({})", js_string(s)),
            Self::XPath(s) => format!(
                "document.evaluate({}, document, null, XPathResult.FIRST_ORDERED_NODE_TYPE, null).singleNodeValue",
                js_string(s)
            ),
            Self::TestId(id) => format!(
                "document.querySelector({})",
                js_string(&format!("[data-testid=\"{id}\"]"))
            ),
        }
    }

    /// Strategy prefix used in descriptions and artifact names
    #[must_use]
    pub const fn strategy(&self) -> &'static str {
        match self {
            Self::Id(_) => "id",
            Self::Css(_) => "css",
            Self::XPath(_) => "xpath",
            Self::TestId(_) => "testid",
        }
    }

    /// The raw selector value
    #[must_use]
    pub fn value(&self) -> &str {
        match self {
            Self::Id(v) | Self::Css(v) | Self::XPath(v) | Self::TestId(v) => v,
        }
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.strategy(), self.value())
    }
}

/// Quote a string as a JavaScript string literal
pub(crate) fn js_string(s: &str) -> String {
    // JSON string literals are valid JS string literals
    serde_json::to_string(s).unwrap_or_else(|_| format!("{s:?}"))
}

/// One strategy for locating an element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Locator {
    selector: Selector,
    /// Per-strategy timeout; `None` defers to the chain/step budget
    #[serde(default, skip_serializing_if = "Option::is_none")]
    timeout_ms: Option<u64>,
}

impl Locator {
    /// Create a locator from a selector
    #[must_use]
    pub const fn from_selector(selector: Selector) -> Self {
        Self {
            selector,
            timeout_ms: None,
        }
    }

    /// Locate by element id
    #[must_use]
    pub fn id(id: impl Into<String>) -> Self {
        Self::from_selector(Selector::Id(id.into()))
    }

    /// Locate by CSS selector
    #[must_use]
    pub fn css(selector: impl Into<String>) -> Self {
        Self::from_selector(Selector::Css(selector.into()))
    }

    /// Locate by XPath expression
    #[must_use]
    pub fn xpath(expr: impl Into<String>) -> Self {
        Self::from_selector(Selector::XPath(expr.into()))
    }

    /// Locate by `data-testid`
    #[must_use]
    pub fn test_id(id: impl Into<String>) -> Self {
        Self::from_selector(Selector::TestId(id.into()))
    }

    /// Set a strategy-specific timeout
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = Some(timeout.as_millis() as u64);
        self
    }

    /// Get the selector
    #[must_use]
    pub const fn selector(&self) -> &Selector {
        &self.selector
    }

    /// Get the strategy-specific timeout, if any
    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.selector.fmt(f)
    }
}

/// Ordered list of locators considered equivalent evidence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocatorChain {
    /// Semantic label for the evidence ("authenticated", "workout item")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    label: Option<String>,
    strategies: Vec<Locator>,
}

impl LocatorChain {
    /// Create an empty chain with a semantic label
    #[must_use]
    pub fn labeled(label: impl Into<String>) -> Self {
        Self {
            label: Some(label.into()),
            strategies: Vec::new(),
        }
    }

    /// Create a chain from a single locator
    #[must_use]
    pub fn single(locator: Locator) -> Self {
        Self {
            label: None,
            strategies: vec![locator],
        }
    }

    /// Append a fallback strategy
    #[must_use]
    pub fn or(mut self, locator: Locator) -> Self {
        self.strategies.push(locator);
        self
    }

    /// Strategies in the order they are attempted
    #[must_use]
    pub fn strategies(&self) -> &[Locator] {
        &self.strategies
    }

    /// Number of strategies
    #[must_use]
    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    /// Whether the chain has no strategies
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }

    /// Whether more than one strategy is declared
    #[must_use]
    pub fn is_fallback(&self) -> bool {
        self.strategies.len() > 1
    }

    /// Human-readable description: the label if any, otherwise the strategies
    #[must_use]
    pub fn description(&self) -> String {
        match &self.label {
            Some(label) => label.clone(),
            None => self
                .strategies
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(" | "),
        }
    }

    /// Descriptions of every strategy, in order
    #[must_use]
    pub fn attempted(&self) -> Vec<String> {
        self.strategies.iter().map(ToString::to_string).collect()
    }
}

impl From<Locator> for LocatorChain {
    fn from(locator: Locator) -> Self {
        Self::single(locator)
    }
}

impl fmt::Display for LocatorChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.description())
    }
}
