//! End-to-end recording: browse, log in, capture, encode.

use crate::async_api::Browser;
use crate::auth::{authenticate, Credentials, LoginConfig};
use crate::capture::{capture, CaptureConfig};
use crate::encode::{EncodeConfig, Encoder};
use crate::{BrowserConfig, Error, Result};
use log::{info, warn};
use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;

/// Everything needed for one recording.
#[derive(Debug, Clone)]
pub struct RecordOptions {
    pub url: String,
    pub credentials: Option<Credentials>,
    /// Video file to write
    pub output: PathBuf,
    pub browser: BrowserConfig,
    pub capture: CaptureConfig,
    pub login: LoginConfig,
    pub encode: EncodeConfig,
}

impl RecordOptions {
    /// Options for `url` with every other setting at its default.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            credentials: None,
            output: default_output(),
            browser: BrowserConfig::default(),
            capture: CaptureConfig::default(),
            login: LoginConfig::default(),
            encode: EncodeConfig::default(),
        }
    }

    /// Browser settings for this recording. The idle connection timeout is
    /// stretched so the longest pause between browser calls (a scroll step's
    /// wait plus the post-load settle) cannot outlast it.
    pub fn browser_config(&self) -> BrowserConfig {
        let floor = self.browser.timeout_ms.max(self.browser.idle_timeout_ms);
        let pause = self.capture.max_wait().as_millis() as u64 + self.browser.settle_ms;
        BrowserConfig {
            idle_timeout_ms: floor.saturating_add(pause),
            ..self.browser.clone()
        }
    }

    /// Check the URL before any browser is launched.
    pub fn validate(&self) -> Result<()> {
        let parsed = url::Url::parse(&self.url)
            .map_err(|e| Error::ConfigError(format!("invalid URL {:?}: {}", self.url, e)))?;
        match parsed.scheme() {
            "http" | "https" | "file" => {}
            other => {
                return Err(Error::ConfigError(format!("unsupported URL scheme {:?}", other)));
            }
        }
        if self.output.as_os_str().is_empty() {
            return Err(Error::ConfigError("output path is empty".into()));
        }
        Ok(())
    }
}

/// `output.mp4` in the current directory.
pub fn default_output() -> PathBuf {
    std::env::current_dir()
        .unwrap_or_else(|_| PathBuf::from("."))
        .join("output.mp4")
}

#[derive(Debug, Clone, Serialize)]
pub struct RecordingSummary {
    pub output: PathBuf,
    pub frames: usize,
    pub logged_in: bool,
}

/// Record `options.url` with a freshly launched headless Chrome.
pub async fn record_page(options: RecordOptions) -> Result<RecordingSummary> {
    options.validate()?;
    let browser = Browser::launch(options.browser_config()).await?;
    record_with(browser, &options).await
}

/// Record using an already started browser; the browser is closed before
/// this returns, on success and on error alike.
pub async fn record_with(browser: Browser, options: &RecordOptions) -> Result<RecordingSummary> {
    options.validate()?;
    let encoder = Encoder::new(options.encode.clone())?;

    let page = browser.page();
    let load_timeout = Duration::from_millis(options.browser.timeout_ms);
    let settle = Duration::from_millis(options.browser.settle_ms);
    let captured = async {
        page.goto(&options.url).await?;
        page.wait_until_ready(load_timeout, settle).await?;
        let logged_in = authenticate(
            &page,
            &options.url,
            options.credentials.as_ref(),
            &options.login,
        )
        .await?;
        if logged_in {
            page.wait_until_ready(load_timeout, settle).await?;
        }
        let session = capture(&page, &options.capture).await?;
        Ok::<_, Error>((session, logged_in))
    }
    .await;

    if let Err(e) = browser.close().await {
        warn!("browser did not close cleanly: {}", e);
    }
    // The scratch directory (if any) is dropped and removed on early return.
    let (session, logged_in) = captured?;

    let frames = session.frames();
    let encoded = encoder.encode(&session, &options.output).await;
    let cleaned = session.finish();
    encoded?;
    cleaned?;

    info!("recorded {} frames into {}", frames, options.output.display());
    Ok(RecordingSummary {
        output: options.output.clone(),
        frames,
        logged_in,
    })
}
