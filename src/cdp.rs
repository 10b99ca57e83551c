//! Chrome DevTools Protocol driver implementation

use crate::{BrowserConfig, Error, PageDriver, Result};
use headless_chrome::browser::tab::Tab;
use headless_chrome::protocol::cdp::Page;
use headless_chrome::{Browser, LaunchOptions};
use log::debug;
use std::sync::Arc;
use std::time::Duration;

/// CDP-based page driver (uses the `headless_chrome` crate)
///
/// Launches a Chrome instance, manages a single tab, and implements
/// [`PageDriver`] over it. Dropping the driver terminates the Chrome process.
pub struct CdpDriver {
    browser: Browser,
    tab: Arc<Tab>,
}

impl PageDriver for CdpDriver {
    fn new(config: BrowserConfig) -> Result<Self>
    where
        Self: Sized,
    {
        let launch_options = LaunchOptions::default_builder()
            .headless(config.headless)
            .window_size(Some((config.viewport.width, config.viewport.height)))
            .path(config.chrome_path.clone())
            .idle_browser_timeout(idle_timeout(&config))
            .build()
            .map_err(|e| Error::InitializationError(format!("Failed to build launch options: {}", e)))?;

        let browser = Browser::new(launch_options)
            .map_err(|e| Error::InitializationError(format!("Failed to launch browser: {}", e)))?;

        let tab = browser
            .new_tab()
            .map_err(|e| Error::InitializationError(format!("Failed to create tab: {}", e)))?;

        tab.set_default_timeout(Duration::from_millis(config.timeout_ms));

        if let Some(ua) = &config.user_agent {
            tab.set_user_agent(ua, None, None)
                .map_err(|e| Error::InitializationError(format!("Failed to set user agent: {}", e)))?;
        }

        Ok(Self { browser, tab })
    }

    fn navigate(&mut self, url: &str) -> Result<()> {
        debug!("navigating to {}", url);

        self.tab
            .navigate_to(url)
            .map_err(|e| Error::LoadError(format!("Navigation failed: {}", e)))?;

        self.tab
            .wait_until_navigated()
            .map_err(|e| Error::LoadError(format!("Wait for navigation failed: {}", e)))?;

        Ok(())
    }

    fn current_url(&self) -> Result<String> {
        Ok(self.tab.get_url())
    }

    fn evaluate(&mut self, script: &str) -> Result<serde_json::Value> {
        let result = self
            .tab
            .evaluate(script, true)
            .map_err(|e| Error::ScriptError(format!("Evaluation failed: {}", e)))?;

        Ok(result.value.unwrap_or(serde_json::Value::Null))
    }

    fn capture_png(&self) -> Result<Vec<u8>> {
        self.tab
            .capture_screenshot(Page::CaptureScreenshotFormatOption::Png, None, None, true)
            .map_err(|e| Error::RenderError(format!("Screenshot failed: {}", e)))
    }

    fn fill(&mut self, selector: &str, value: &str) -> Result<()> {
        let sel = serde_json::to_string(selector).map_err(|e| Error::ScriptError(e.to_string()))?;
        let val = serde_json::to_string(value).map_err(|e| Error::ScriptError(e.to_string()))?;

        // Assign the value directly and fire the events frameworks listen for,
        // so pre-filled inputs are replaced rather than appended to.
        let script = format!(
            r#"(function() {{
                const el = document.querySelector({sel});
                if (!el) return false;
                el.focus();
                el.value = {val};
                el.dispatchEvent(new Event('input', {{ bubbles: true }}));
                el.dispatchEvent(new Event('change', {{ bubbles: true }}));
                return true;
            }})()"#
        );

        match self.evaluate(&script)?.as_bool() {
            Some(true) => Ok(()),
            _ => Err(Error::ElementNotFound(selector.to_string())),
        }
    }

    fn click(&mut self, selector: &str) -> Result<()> {
        let element = self
            .tab
            .find_element(selector)
            .map_err(|e| Error::ElementNotFound(format!("{}: {}", selector, e)))?;

        element
            .click()
            .map_err(|e| Error::CdpError(format!("Click on {} failed: {}", selector, e)))?;

        Ok(())
    }

    fn close(self) -> Result<()> {
        // Drop the tab before the browser so the child process is terminated
        // promptly.
        let closed = self.tab.close(true);
        drop(self.tab);
        drop(self.browser);
        closed?;
        Ok(())
    }
}

/// How long the CDP connection may stay silent. Covers the slowest automation
/// call as well as the longest wait between calls.
pub fn idle_timeout(config: &BrowserConfig) -> Duration {
    Duration::from_millis(config.timeout_ms.max(config.idle_timeout_ms))
}
