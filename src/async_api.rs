use crate::cdp::CdpDriver;
use crate::{BrowserConfig, Error, PageDriver, Result};
use log::debug;
use std::path::PathBuf;
use std::sync::mpsc::{self, Sender};
use std::thread;
use std::time::Duration;
use tokio::sync::oneshot;

enum Command {
    Goto(String, oneshot::Sender<Result<()>>),
    CurrentUrl(oneshot::Sender<Result<String>>),
    Eval(String, oneshot::Sender<Result<serde_json::Value>>),
    Screenshot(Option<PathBuf>, oneshot::Sender<Result<Vec<u8>>>),

    // Forms
    Fill(String, String, oneshot::Sender<Result<()>>),
    Click(String, oneshot::Sender<Result<()>>),
    HasElement(String, oneshot::Sender<Result<bool>>),

    // Measurements
    ViewportHeight(oneshot::Sender<Result<f64>>),
    ContentHeight(oneshot::Sender<Result<f64>>),
    ScrollOffset(oneshot::Sender<Result<f64>>),
    ScrollBy(f64, oneshot::Sender<Result<()>>),

    Close(oneshot::Sender<Result<()>>),
}

/// An async-friendly browser abstraction backed by a dedicated worker thread.
///
/// The worker thread owns a synchronous [`PageDriver`] and executes commands
/// sent from async tasks, so callers get an async interface without the
/// driver having to be `Send`. When every handle is dropped the worker exits
/// and drops the driver, which closes the browser.
#[derive(Clone)]
pub struct Browser {
    cmd_tx: Sender<Command>,
}

/// A handle representing the page owned by the browser worker.
#[derive(Clone)]
pub struct Page {
    cmd_tx: Sender<Command>,
}

impl Browser {
    /// Launch headless Chrome (spawns a background thread that owns the driver).
    pub async fn launch(config: BrowserConfig) -> Result<Self> {
        Self::with_driver(move || CdpDriver::new(config)).await
    }

    /// Start a worker around any driver. `factory` runs on the worker thread.
    pub async fn with_driver<D, F>(factory: F) -> Result<Self>
    where
        D: PageDriver + 'static,
        F: FnOnce() -> Result<D> + Send + 'static,
    {
        let (cmd_tx, cmd_rx) = mpsc::channel::<Command>();
        let (init_tx, init_rx): (oneshot::Sender<Result<()>>, oneshot::Receiver<Result<()>>) =
            oneshot::channel();

        thread::spawn(move || {
            let mut driver = match factory() {
                Ok(d) => d,
                Err(err) => {
                    let _ = init_tx.send(Err(err));
                    return;
                }
            };

            let _ = init_tx.send(Ok(()));

            while let Ok(cmd) = cmd_rx.recv() {
                match cmd {
                    Command::Goto(url, resp) => {
                        let _ = resp.send(driver.navigate(&url));
                    }
                    Command::CurrentUrl(resp) => {
                        let _ = resp.send(driver.current_url());
                    }
                    Command::Eval(script, resp) => {
                        let _ = resp.send(driver.evaluate(&script));
                    }
                    Command::Screenshot(path_opt, resp) => {
                        let res = driver.capture_png().and_then(|data| {
                            // If a path is provided, also write to disk
                            if let Some(path) = path_opt {
                                std::fs::write(&path, &data)?;
                            }
                            Ok(data)
                        });
                        let _ = resp.send(res);
                    }

                    Command::Fill(selector, value, resp) => {
                        let _ = resp.send(driver.fill(&selector, &value));
                    }
                    Command::Click(selector, resp) => {
                        let _ = resp.send(driver.click(&selector));
                    }
                    Command::HasElement(selector, resp) => {
                        let _ = resp.send(driver.has_element(&selector));
                    }

                    Command::ViewportHeight(resp) => {
                        let _ = resp.send(driver.viewport_height());
                    }
                    Command::ContentHeight(resp) => {
                        let _ = resp.send(driver.content_height());
                    }
                    Command::ScrollOffset(resp) => {
                        let _ = resp.send(driver.scroll_offset());
                    }
                    Command::ScrollBy(dy, resp) => {
                        let _ = resp.send(driver.scroll_by(dy));
                    }

                    Command::Close(resp) => {
                        let _ = resp.send(driver.close());
                        return;
                    }
                }
            }
            debug!("browser handles dropped; closing driver");
            let _ = driver.close();
        });

        // Wait for the worker to report initialization success or failure
        let init_res = init_rx
            .await
            .map_err(|e| Error::Other(format!("Worker init canceled: {}", e)))?;
        init_res?;

        Ok(Self { cmd_tx })
    }

    /// Handle to the page backed by the same worker thread.
    pub fn page(&self) -> Page {
        Page {
            cmd_tx: self.cmd_tx.clone(),
        }
    }

    /// Shutdown the background worker and close the browser.
    pub async fn close(self) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(Command::Close(tx))
            .map_err(|_| Error::Other("Browser worker already stopped".into()))?;
        rx.await
            .map_err(|e| Error::Other(format!("Close canceled: {}", e)))?
    }
}

impl Page {
    async fn request<T>(
        &self,
        what: &str,
        make: impl FnOnce(oneshot::Sender<Result<T>>) -> Command,
    ) -> Result<T> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(make(tx))
            .map_err(|_| Error::Other(format!("{} failed: browser worker stopped", what)))?;
        rx.await
            .map_err(|e| Error::Other(format!("{} canceled: {}", what, e)))?
    }

    /// Navigate to a URL
    pub async fn goto(&self, url: &str) -> Result<()> {
        self.request("Goto", |tx| Command::Goto(url.to_string(), tx)).await
    }

    /// URL of the current document
    pub async fn current_url(&self) -> Result<String> {
        self.request("CurrentUrl", Command::CurrentUrl).await
    }

    /// Evaluate JavaScript and return the result value
    pub async fn eval(&self, script: &str) -> Result<serde_json::Value> {
        self.request("Eval", |tx| Command::Eval(script.to_string(), tx)).await
    }

    /// Take a viewport screenshot; if `path` is Some, the PNG is also written there.
    pub async fn screenshot(&self, path: Option<&std::path::Path>) -> Result<Vec<u8>> {
        let path_opt = path.map(|p| p.to_path_buf());
        self.request("Screenshot", |tx| Command::Screenshot(path_opt, tx)).await
    }

    /// Replace the value of an input
    pub async fn fill(&self, selector: &str, value: &str) -> Result<()> {
        self.request("Fill", |tx| {
            Command::Fill(selector.to_string(), value.to_string(), tx)
        })
        .await
    }

    /// Click an element
    pub async fn click(&self, selector: &str) -> Result<()> {
        self.request("Click", |tx| Command::Click(selector.to_string(), tx)).await
    }

    /// Whether an element matching `selector` exists
    pub async fn has_element(&self, selector: &str) -> Result<bool> {
        self.request("HasElement", |tx| Command::HasElement(selector.to_string(), tx))
            .await
    }

    pub async fn viewport_height(&self) -> Result<f64> {
        self.request("ViewportHeight", Command::ViewportHeight).await
    }

    pub async fn content_height(&self) -> Result<f64> {
        self.request("ContentHeight", Command::ContentHeight).await
    }

    pub async fn scroll_offset(&self) -> Result<f64> {
        self.request("ScrollOffset", Command::ScrollOffset).await
    }

    /// Scroll the window down by `dy` pixels
    pub async fn scroll_by(&self, dy: f64) -> Result<()> {
        self.request("ScrollBy", |tx| Command::ScrollBy(dy, tx)).await
    }

    /// Wait for `document.readyState` to report "complete", then give late
    /// scripts and images `settle` more time before the page is measured.
    pub async fn wait_until_ready(&self, timeout: Duration, settle: Duration) -> Result<()> {
        let polled = tokio::time::timeout(timeout, async {
            loop {
                let state = self.eval("document.readyState").await?;
                if state.as_str() == Some("complete") {
                    return Ok::<(), Error>(());
                }
                tokio::time::sleep(Duration::from_millis(100)).await;
            }
        })
        .await;

        match polled {
            Ok(res) => res?,
            Err(_) => return Err(Error::Timeout(timeout.as_millis() as u64)),
        }
        if !settle.is_zero() {
            debug!("page loaded; settling for {:?}", settle);
            tokio::time::sleep(settle).await;
        }
        Ok(())
    }

    /// Poll the page URL until it matches `target` (fragment ignored).
    pub async fn wait_for_url(&self, target: &str, timeout: Duration) -> Result<()> {
        let wanted = normalize_url(target);
        let polled = tokio::time::timeout(timeout, async {
            loop {
                let current = self.current_url().await?;
                if normalize_url(&current) == wanted {
                    return Ok::<(), Error>(());
                }
                tokio::time::sleep(Duration::from_millis(100)).await;
            }
        })
        .await;

        match polled {
            Ok(res) => res,
            Err(_) => Err(Error::Timeout(timeout.as_millis() as u64)),
        }
    }
}

/// Canonical form used when comparing page URLs.
pub(crate) fn normalize_url(raw: &str) -> String {
    match url::Url::parse(raw) {
        Ok(mut u) => {
            u.set_fragment(None);
            u.to_string()
        }
        Err(_) => raw.trim_end_matches('/').to_string(),
    }
}
