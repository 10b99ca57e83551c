//! page2vid
//!
//! Records a webpage as a video: the page is scrolled half a viewport at a
//! time, each position is captured as a PNG frame, and the frame sequence is
//! handed to `ffmpeg`.
//!
//! # Pipeline
//!
//! - **Browser**: headless Chrome driven over CDP (`headless_chrome`), wrapped
//!   in an async facade that owns the tab on a worker thread
//! - **Login**: optional form fill when the page looks like a sign-in page
//! - **Capture**: scroll-and-screenshot loop into a scratch directory
//! - **Encode**: `ffmpeg` turns the numbered frames into a video
//!
//! # Example
//!
//! ```no_run
//! use page2vid::{record_page, RecordOptions};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let options = RecordOptions {
//!     output: "page.mp4".into(),
//!     ..RecordOptions::new("https://example.com")
//! };
//!
//! let summary = record_page(options).await?;
//! println!("{} frames -> {}", summary.frames, summary.output.display());
//! # Ok(())
//! # }
//! ```

use serde::{Deserialize, Serialize};

pub mod error;
pub use error::{Error, Result};

pub mod cdp;

// Async-friendly browser API (worker-thread-backed)
pub mod async_api;
pub use async_api::{Browser, Page};

pub mod auth;
pub mod capture;
pub mod cli;
pub mod encode;
pub mod record;
pub mod scratch;

pub use auth::{Credentials, LoginConfig};
pub use capture::{CaptureConfig, Pacing, Termination};
pub use encode::{EncodeConfig, Encoder};
pub use record::{record_page, record_with, RecordOptions, RecordingSummary};
pub use scratch::{CaptureSession, ScratchDir};

#[cfg(test)]
pub(crate) mod testing;

/// Configuration for the controlled browser session
///
/// The defaults launch a headless Chrome with a 1280x720 window and a 30
/// second timeout for each automation call.
///
/// # Examples
///
/// ```
/// let cfg = page2vid::BrowserConfig::default();
/// assert!(cfg.headless);
/// assert_eq!(cfg.viewport.height, 720);
/// ```
#[derive(Debug, Clone)]
pub struct BrowserConfig {
    /// Viewport dimensions
    pub viewport: Viewport,
    /// Run Chrome without a visible window
    pub headless: bool,
    /// Timeout for navigation and element lookups in milliseconds
    pub timeout_ms: u64,
    /// How long the browser connection may stay idle between calls in
    /// milliseconds (never shorter than `timeout_ms`)
    pub idle_timeout_ms: u64,
    /// Extra wait after a page reports it has finished loading, in milliseconds
    pub settle_ms: u64,
    /// User agent override
    pub user_agent: Option<String>,
    /// Path to a Chrome/Chromium executable (auto-detected when `None`)
    pub chrome_path: Option<std::path::PathBuf>,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            viewport: Viewport::default(),
            headless: true,
            timeout_ms: 30000,
            idle_timeout_ms: 30000,
            settle_ms: 500,
            user_agent: None,
            chrome_path: None,
        }
    }
}

/// Viewport dimensions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
        }
    }
}

/// Synchronous single-page automation backend.
///
/// Implementations own one browser page. The async [`Browser`] facade moves
/// an implementation onto a worker thread, so it does not need to be `Send`.
pub trait PageDriver {
    /// Launch a browser with the given configuration and open one page
    fn new(config: BrowserConfig) -> Result<Self>
    where
        Self: Sized;

    /// Navigate to a URL and wait for the navigation to finish
    fn navigate(&mut self, url: &str) -> Result<()>;

    /// URL of the current document (after redirects)
    fn current_url(&self) -> Result<String>;

    /// Evaluate a JavaScript expression in the page and return its value
    fn evaluate(&mut self, script: &str) -> Result<serde_json::Value>;

    /// Capture the visible viewport as PNG bytes
    fn capture_png(&self) -> Result<Vec<u8>>;

    /// Replace the value of the input matched by `selector`
    fn fill(&mut self, selector: &str, value: &str) -> Result<()>;

    /// Click the element matched by `selector`
    fn click(&mut self, selector: &str) -> Result<()>;

    /// Whether any element matches `selector`
    fn has_element(&mut self, selector: &str) -> Result<bool> {
        let script = format!(
            "document.querySelector({}) !== null",
            serde_json::to_string(selector).map_err(|e| Error::ScriptError(e.to_string()))?
        );
        Ok(self.evaluate(&script)?.as_bool().unwrap_or(false))
    }

    // --- DOM measurements (default implementations over `evaluate`) ---

    /// Visible height of the window in CSS pixels
    fn viewport_height(&mut self) -> Result<f64> {
        let value = self.evaluate("window.innerHeight")?;
        as_number(&value, "window.innerHeight")
    }

    /// Total scrollable height of the document body
    fn content_height(&mut self) -> Result<f64> {
        let value = self.evaluate("document.body ? document.body.scrollHeight : 0")?;
        as_number(&value, "document.body.scrollHeight")
    }

    /// Current vertical scroll position
    fn scroll_offset(&mut self) -> Result<f64> {
        let value = self.evaluate("window.scrollY")?;
        as_number(&value, "window.scrollY")
    }

    /// Scroll the window down by `dy` pixels
    fn scroll_by(&mut self, dy: f64) -> Result<()> {
        self.evaluate(&format!("window.scrollBy(0, {dy}); true"))?;
        Ok(())
    }

    /// Close the page and release the browser
    fn close(self) -> Result<()>;
}

fn as_number(value: &serde_json::Value, what: &str) -> Result<f64> {
    value
        .as_f64()
        .ok_or_else(|| Error::ScriptError(format!("{what} returned a non-numeric value: {value}")))
}
