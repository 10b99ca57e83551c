//! Scripted in-memory driver used by unit tests.

use crate::{BrowserConfig, Error, PageDriver, Result};
use std::sync::{Arc, Mutex};

pub(crate) const PNG_MAGIC: &[u8] = b"\x89PNG\r\n\x1a\n";

#[derive(Debug, Default)]
pub(crate) struct Log {
    pub navigations: Vec<String>,
    pub scrolls: Vec<f64>,
    pub fills: Vec<(String, String)>,
    pub clicks: Vec<String>,
    pub screenshots: usize,
    pub ready_checks: usize,
    pub closed: bool,
}

/// What the fake page reports back.
#[derive(Clone)]
pub(crate) struct Script {
    pub viewport: f64,
    /// Successive content height readings; the last one repeats forever.
    pub heights: Vec<f64>,
    /// Clamp the scroll offset to `height - viewport` like a real page.
    pub clamp_scroll: bool,
    /// Navigations land here until a login form has been submitted.
    pub login_url: Option<String>,
    /// Whether submitting the login form returns to the requested URL.
    pub login_returns: bool,
    pub elements: Vec<String>,
    /// `document.readyState` reads "loading" this many times per navigation.
    pub loading_polls: usize,
    pub fail_close: bool,
    pub log: Arc<Mutex<Log>>,
}

impl Script {
    pub fn with_heights(heights: &[f64]) -> Self {
        Self {
            viewport: 600.0,
            heights: heights.to_vec(),
            clamp_scroll: false,
            login_url: None,
            login_returns: true,
            elements: Vec::new(),
            loading_polls: 0,
            fail_close: false,
            log: Arc::new(Mutex::new(Log::default())),
        }
    }

    pub fn login_form(mut self, login_url: &str) -> Self {
        self.login_url = Some(login_url.to_string());
        self.elements = vec![
            r#"input[name="username"]"#.to_string(),
            r#"input[name="password"]"#.to_string(),
            r#"button[type="submit"]"#.to_string(),
        ];
        self
    }
}

pub(crate) struct MockPage {
    script: Script,
    url: String,
    target: String,
    logged_in: bool,
    offset: f64,
    reads: usize,
    last_height: f64,
    loading_left: usize,
}

impl MockPage {
    pub fn new(script: Script) -> Self {
        Self {
            script,
            url: "about:blank".to_string(),
            target: String::new(),
            logged_in: false,
            offset: 0.0,
            reads: 0,
            last_height: 0.0,
            loading_left: 0,
        }
    }

    fn log(&self) -> std::sync::MutexGuard<'_, Log> {
        self.script.log.lock().unwrap()
    }
}

impl PageDriver for MockPage {
    fn new(_config: BrowserConfig) -> Result<Self> {
        Ok(MockPage::new(Script::with_heights(&[600.0])))
    }

    fn navigate(&mut self, url: &str) -> Result<()> {
        self.log().navigations.push(url.to_string());
        self.target = url.to_string();
        self.loading_left = self.script.loading_polls;
        self.url = match (&self.script.login_url, self.logged_in) {
            (Some(login), false) => login.clone(),
            _ => url.to_string(),
        };
        Ok(())
    }

    fn current_url(&self) -> Result<String> {
        Ok(self.url.clone())
    }

    fn evaluate(&mut self, script: &str) -> Result<serde_json::Value> {
        if script == "document.readyState" {
            self.log().ready_checks += 1;
            if self.loading_left > 0 {
                self.loading_left -= 1;
                return Ok(serde_json::json!("loading"));
            }
            return Ok(serde_json::json!("complete"));
        }
        Ok(serde_json::Value::Null)
    }

    fn capture_png(&self) -> Result<Vec<u8>> {
        let mut log = self.log();
        log.screenshots += 1;
        let mut png = PNG_MAGIC.to_vec();
        png.extend_from_slice(&(log.screenshots as u32).to_be_bytes());
        Ok(png)
    }

    fn fill(&mut self, selector: &str, value: &str) -> Result<()> {
        if !self.script.elements.iter().any(|e| e == selector) {
            return Err(Error::ElementNotFound(selector.to_string()));
        }
        self.log().fills.push((selector.to_string(), value.to_string()));
        Ok(())
    }

    fn click(&mut self, selector: &str) -> Result<()> {
        if !self.script.elements.iter().any(|e| e == selector) {
            return Err(Error::ElementNotFound(selector.to_string()));
        }
        let filled = self.log().fills.len() >= 2;
        self.log().clicks.push(selector.to_string());
        if filled && self.script.login_returns {
            self.logged_in = true;
            self.url = self.target.clone();
        }
        Ok(())
    }

    fn has_element(&mut self, selector: &str) -> Result<bool> {
        Ok(self.script.elements.iter().any(|e| e == selector))
    }

    fn viewport_height(&mut self) -> Result<f64> {
        Ok(self.script.viewport)
    }

    fn content_height(&mut self) -> Result<f64> {
        let heights = &self.script.heights;
        let h = heights[self.reads.min(heights.len() - 1)];
        self.reads += 1;
        self.last_height = h;
        Ok(h)
    }

    fn scroll_offset(&mut self) -> Result<f64> {
        Ok(self.offset)
    }

    fn scroll_by(&mut self, dy: f64) -> Result<()> {
        self.log().scrolls.push(dy);
        self.offset += dy;
        if self.script.clamp_scroll {
            let max = (self.last_height - self.script.viewport).max(0.0);
            self.offset = self.offset.min(max);
        }
        Ok(())
    }

    fn close(self) -> Result<()> {
        self.log().closed = true;
        if self.script.fail_close {
            return Err(Error::CdpError("target closed unexpectedly".into()));
        }
        Ok(())
    }
}
