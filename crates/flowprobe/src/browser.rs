//! Chromium transport over the Chrome `DevTools` Protocol.
//!
//! Each [`ChromiumFactory::acquire`] launches its own browser process, so
//! every scenario starts from a clean profile. Element operations are
//! expressed as small JavaScript snippets built from [`Selector::to_query`],
//! which keeps id, CSS, and XPath lookups on one code path.

use crate::config::{RunConfig, Viewport};
use crate::driver::{Driver, DriverFactory, ElementHandle};
use crate::locator::{js_string, Selector};
use crate::result::{ProbeError, ProbeResult};
use async_trait::async_trait;
use base64::Engine;
use chromiumoxide::browser::{Browser as CdpBrowser, BrowserConfig as CdpConfig};
use chromiumoxide::cdp::browser_protocol::page::{CaptureScreenshotFormat, CaptureScreenshotParams};
use chromiumoxide::page::Page as CdpPage;
use futures::StreamExt;
use serde::Deserialize;
use std::path::PathBuf;
use tracing::{debug, warn};

/// Launch settings for Chromium sessions
#[derive(Debug, Clone)]
pub struct ChromiumFactory {
    headless: bool,
    chromium_path: Option<PathBuf>,
    viewport: Viewport,
    sandbox: bool,
}

impl ChromiumFactory {
    /// Settings taken from a run config
    #[must_use]
    pub fn from_config(config: &RunConfig) -> Self {
        Self {
            headless: config.headless,
            chromium_path: config.chromium_path.clone(),
            viewport: config.viewport,
            sandbox: true,
        }
    }

    /// Disable the Chromium sandbox (containers, CI)
    #[must_use]
    pub const fn with_no_sandbox(mut self) -> Self {
        self.sandbox = false;
        self
    }
}

#[async_trait]
impl DriverFactory for ChromiumFactory {
    async fn acquire(&self) -> ProbeResult<Box<dyn Driver>> {
        let driver = ChromiumDriver::launch(self).await?;
        Ok(Box::new(driver))
    }
}

/// One browser process with one page
#[derive(Debug)]
pub struct ChromiumDriver {
    browser: CdpBrowser,
    page: CdpPage,
    handle: tokio::task::JoinHandle<()>,
    closed: bool,
}

#[derive(Debug, Deserialize)]
struct ProbeSnapshot {
    found: bool,
    #[serde(default)]
    tag: String,
    #[serde(default)]
    text: String,
    #[serde(default)]
    visible: bool,
    #[serde(default)]
    enabled: bool,
}

fn launch_error(e: impl std::fmt::Display) -> ProbeError {
    ProbeError::BrowserLaunch {
        message: e.to_string(),
    }
}

impl ChromiumDriver {
    /// Launch a browser and open a blank page
    ///
    /// # Errors
    ///
    /// Returns error if Chromium cannot be started
    pub async fn launch(settings: &ChromiumFactory) -> ProbeResult<Self> {
        let mut builder =
            CdpConfig::builder().window_size(settings.viewport.width, settings.viewport.height);
        if !settings.headless {
            builder = builder.with_head();
        }
        if !settings.sandbox {
            builder = builder.no_sandbox();
        }
        if let Some(ref path) = settings.chromium_path {
            builder = builder.chrome_executable(path);
        }
        let cdp_config = builder.build().map_err(launch_error)?;

        let (browser, mut handler) = CdpBrowser::launch(cdp_config).await.map_err(launch_error)?;
        let handle = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        let page = browser.new_page("about:blank").await.map_err(launch_error)?;
        debug!(headless = settings.headless, "chromium session launched");
        Ok(Self {
            browser,
            page,
            handle,
            closed: false,
        })
    }

    async fn eval<T: serde::de::DeserializeOwned>(&self, script: String) -> ProbeResult<T> {
        let result = self
            .page
            .evaluate(script)
            .await
            .map_err(|e| ProbeError::driver(e.to_string()))?;
        result
            .into_value()
            .map_err(|e| ProbeError::driver(e.to_string()))
    }

    async fn act(&self, selector: &Selector, script: String) -> ProbeResult<()> {
        if self.eval::<bool>(script).await? {
            Ok(())
        } else {
            Err(ProbeError::driver(format!("element {selector} is gone")))
        }
    }
}

#[async_trait]
impl Driver for ChromiumDriver {
    async fn navigate(&mut self, url: &str) -> ProbeResult<()> {
        self.page
            .goto(url)
            .await
            .map_err(|e| ProbeError::driver(format!("navigation to {url} failed: {e}")))?;
        Ok(())
    }

    async fn current_url(&mut self) -> ProbeResult<String> {
        let url = self
            .page
            .url()
            .await
            .map_err(|e| ProbeError::driver(e.to_string()))?;
        Ok(url.unwrap_or_default())
    }

    async fn page_source(&mut self) -> ProbeResult<String> {
        self.page
            .content()
            .await
            .map_err(|e| ProbeError::driver(e.to_string()))
    }

    async fn screenshot(&mut self) -> ProbeResult<Vec<u8>> {
        let params = CaptureScreenshotParams::builder()
            .format(CaptureScreenshotFormat::Png)
            .build();
        let screenshot = self
            .page
            .execute(params)
            .await
            .map_err(|e| ProbeError::driver(e.to_string()))?;
        base64::engine::general_purpose::STANDARD
            .decode(&screenshot.data)
            .map_err(|e| ProbeError::driver(e.to_string()))
    }

    async fn probe(&mut self, selector: &Selector) -> ProbeResult<Option<ElementHandle>> {
        let snapshot: ProbeSnapshot = self.eval(probe_script(selector)).await?;
        if !snapshot.found {
            return Ok(None);
        }
        Ok(Some(ElementHandle {
            selector: selector.to_string(),
            tag_name: snapshot.tag,
            text: snapshot.text,
            visible: snapshot.visible,
            enabled: snapshot.enabled,
        }))
    }

    async fn click(&mut self, selector: &Selector) -> ProbeResult<()> {
        self.act(selector, click_script(selector)).await
    }

    async fn type_text(&mut self, selector: &Selector, text: &str) -> ProbeResult<()> {
        self.act(selector, type_script(selector, text)).await
    }

    async fn select_option(&mut self, selector: &Selector) -> ProbeResult<()> {
        self.act(selector, select_script(selector)).await
    }

    async fn close(&mut self) -> ProbeResult<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        let result = self.browser.close().await.map(drop);
        if let Err(e) = self.browser.wait().await {
            warn!(error = %e, "chromium process did not exit cleanly");
        }
        self.handle.abort();
        result.map_err(|e| ProbeError::driver(e.to_string()))
    }
}

impl Drop for ChromiumDriver {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn probe_script(selector: &Selector) -> String {
    format!(
        "(() => {{ const el = {q}; if (!el) return {{ found: false }}; \
         const r = el.getBoundingClientRect(); const s = window.getComputedStyle(el); \
         return {{ found: true, tag: el.tagName.toLowerCase(), \
         text: (el.innerText || el.textContent || '').trim(), \
         visible: r.width > 0 && r.height > 0 && s.visibility !== 'hidden' && s.display !== 'none', \
         enabled: !el.disabled }}; }})()",
        q = selector.to_query()
    )
}

fn click_script(selector: &Selector) -> String {
    format!(
        "(() => {{ const el = {q}; if (!el) return false; \
         el.scrollIntoView({{ block: 'center' }}); el.click(); return true; }})()",
        q = selector.to_query()
    )
}

// React tracks input values through the prototype setter, so assigning
// `el.value` directly would be discarded on the next render.
fn type_script(selector: &Selector, text: &str) -> String {
    format!(
        "(() => {{ const el = {q}; if (!el) return false; el.focus(); \
         const proto = el instanceof HTMLTextAreaElement ? HTMLTextAreaElement.prototype : HTMLInputElement.prototype; \
         Object.getOwnPropertyDescriptor(proto, 'value').set.call(el, {text}); \
         el.dispatchEvent(new Event('input', {{ bubbles: true }})); \
         el.dispatchEvent(new Event('change', {{ bubbles: true }})); return true; }})()",
        q = selector.to_query(),
        text = js_string(text)
    )
}

fn select_script(selector: &Selector) -> String {
    format!(
        "(() => {{ const el = {q}; if (!el) return false; const sel = el.closest('select'); \
         if (!sel) {{ el.click(); return true; }} \
         Object.getOwnPropertyDescriptor(HTMLSelectElement.prototype, 'value').set.call(sel, el.value); \
         el.selected = true; sel.dispatchEvent(new Event('change', {{ bubbles: true }})); return true; }})()",
        q = selector.to_query()
    )
}
