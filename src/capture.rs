//! Scroll-and-capture loop.
//!
//! The page is captured, scrolled down by half a viewport, given time to load,
//! and measured again until the termination policy says the page has been
//! fully traversed. Consecutive frames overlap by 50% vertically.

use crate::async_api::Page;
use crate::scratch::{CaptureSession, ScratchDir};
use crate::{Error, Result};
use log::{debug, info, warn};
use std::path::PathBuf;
use std::time::Duration;
use tokio::time::Instant;

/// How long to wait after each scroll step before measuring and capturing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pacing {
    /// Sleep for a fixed duration.
    Fixed(Duration),
    /// Poll the content height every `interval` until two consecutive
    /// readings agree, giving up after `timeout`.
    Settle { interval: Duration, timeout: Duration },
}

/// When the capture loop considers the page fully traversed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Termination {
    /// Stop as soon as the content height is unchanged after a scroll step.
    /// Pages whose height never changes stop after a single frame.
    #[default]
    ContentHeight,
    /// Stop only once both the content height and the scroll offset are
    /// unchanged after a scroll step.
    HeightAndOffset,
}

#[derive(Debug, Clone)]
pub struct CaptureConfig {
    pub pacing: Pacing,
    pub termination: Termination,
    /// Upper bound on captured frames, for pages that never stop growing.
    pub max_frames: usize,
    /// Scratch directory for the frame sequence.
    pub frames_dir: PathBuf,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            pacing: Pacing::Fixed(Duration::from_millis(1000)),
            termination: Termination::default(),
            max_frames: 10000,
            frames_dir: PathBuf::from("screenshots"),
        }
    }
}

impl CaptureConfig {
    /// Longest pause between two browser calls caused by pacing.
    pub fn max_wait(&self) -> Duration {
        match self.pacing {
            Pacing::Fixed(delay) => delay,
            Pacing::Settle { interval, timeout } => timeout + interval,
        }
    }
}

/// Distance scrolled per step: half of the measured viewport height.
pub fn scroll_step(viewport_height: f64) -> f64 {
    viewport_height / 2.0
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Measurement {
    height: f64,
    offset: f64,
}

fn converged(termination: Termination, prev: Measurement, next: Measurement) -> bool {
    match termination {
        Termination::ContentHeight => next.height == prev.height,
        Termination::HeightAndOffset => next.height == prev.height && next.offset == prev.offset,
    }
}

/// Capture the loaded page into a fresh scratch directory.
///
/// The returned session owns the directory; dropping it deletes the frames.
pub async fn capture(page: &Page, config: &CaptureConfig) -> Result<CaptureSession> {
    if config.max_frames == 0 {
        return Err(Error::ConfigError("max_frames must be at least 1".into()));
    }

    let viewport = page.viewport_height().await?;
    if !(viewport.is_finite() && viewport > 0.0) {
        return Err(Error::ScriptError(format!("unusable viewport height {viewport}")));
    }
    let step = scroll_step(viewport);

    let mut session = CaptureSession::new(ScratchDir::create(&config.frames_dir)?);
    let mut last = Measurement {
        height: page.content_height().await?,
        offset: page.scroll_offset().await?,
    };
    info!(
        "capturing: viewport {}px, content {}px, step {}px",
        viewport, last.height, step
    );

    loop {
        let path = session.next_frame_path();
        page.screenshot(Some(path.as_path())).await?;
        session.commit_frame();
        debug!("frame {} -> {}", session.frames() - 1, path.display());

        if session.frames() >= config.max_frames {
            warn!("stopping after {} frames (frame limit reached)", session.frames());
            break;
        }

        page.scroll_by(step).await?;
        let settled = pace(page, config.pacing).await?;

        let next = Measurement {
            height: match settled {
                Some(h) => h,
                None => page.content_height().await?,
            },
            offset: page.scroll_offset().await?,
        };
        if converged(config.termination, last, next) {
            break;
        }
        last = next;
    }

    info!("captured {} frames", session.frames());
    Ok(session)
}

/// Wait after a scroll step. Returns the final height when pacing measured it.
async fn pace(page: &Page, pacing: Pacing) -> Result<Option<f64>> {
    match pacing {
        Pacing::Fixed(delay) => {
            tokio::time::sleep(delay).await;
            Ok(None)
        }
        Pacing::Settle { interval, timeout } => {
            let deadline = Instant::now() + timeout;
            let mut height = page.content_height().await?;
            loop {
                tokio::time::sleep(interval).await;
                let next = page.content_height().await?;
                if next == height || Instant::now() >= deadline {
                    return Ok(Some(next));
                }
                height = next;
            }
        }
    }
}
