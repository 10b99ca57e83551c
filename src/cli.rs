//! Command-line surface.

use crate::auth::{Credentials, LoginConfig};
use crate::capture::{CaptureConfig, Pacing, Termination};
use crate::encode::EncodeConfig;
use crate::record::{default_output, RecordOptions};
use crate::{BrowserConfig, Result, Viewport};
use clap::error::ErrorKind;
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "page2vid", version, about = "Record a webpage as a video")]
pub struct Cli {
    /// Log every frame and encoder invocation
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Scroll through a page, capture it, and encode the frames as a video
    Record(RecordArgs),
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Until {
    /// Stop once the page height stops changing
    Height,
    /// Stop once both page height and scroll position stop changing
    HeightAndOffset,
}

#[derive(Args, Debug)]
pub struct RecordArgs {
    /// URL of the webpage to record
    pub url: String,

    /// Username for login (if required)
    #[arg(short, long)]
    pub username: Option<String>,

    /// Password for login (if required)
    #[arg(short, long)]
    pub password: Option<String>,

    /// Output video file path [default: ./output.mp4]
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Scroll speed in milliseconds (wait after each scroll step)
    #[arg(short, long, default_value_t = 1000)]
    pub speed: u64,

    /// Poll the page height until it settles (at most --speed ms) instead of a fixed wait
    #[arg(long)]
    pub settle: bool,

    /// When to consider the page fully scrolled
    #[arg(long, value_enum, default_value_t = Until::Height)]
    pub until: Until,

    /// Stop after this many frames
    #[arg(long, default_value_t = 10000)]
    pub max_frames: usize,

    /// Viewport width in pixels
    #[arg(long, default_value_t = 1280)]
    pub width: u32,

    /// Viewport height in pixels
    #[arg(long, default_value_t = 720)]
    pub height: u32,

    /// Output video frame rate
    #[arg(long, default_value_t = 30)]
    pub fps: u32,

    /// Screenshots shown per second of video
    #[arg(long, default_value_t = 1)]
    pub input_fps: u32,

    /// ffmpeg executable
    #[arg(long, default_value = "ffmpeg")]
    pub ffmpeg: PathBuf,

    /// Scratch directory for frames (removed after encoding)
    #[arg(long, default_value = "screenshots")]
    pub frames_dir: PathBuf,

    /// Timeout for page loads and login navigation in milliseconds
    #[arg(long, default_value_t = 30000)]
    pub timeout: u64,

    /// Regex matched against the page URL to detect a login page
    #[arg(long)]
    pub login_pattern: Option<String>,

    /// Chrome/Chromium executable
    #[arg(long)]
    pub chrome: Option<PathBuf>,

    /// Show the browser window
    #[arg(long)]
    pub headed: bool,

    /// Print a JSON summary on success
    #[arg(long)]
    pub json: bool,
}

/// Process exit code for a failed parse: help and version output succeed,
/// every usage error exits with 1.
pub fn usage_exit_code(err: &clap::Error) -> i32 {
    match err.kind() {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => 0,
        _ => 1,
    }
}

impl RecordArgs {
    pub fn into_options(self) -> Result<RecordOptions> {
        let speed = Duration::from_millis(self.speed);
        let pacing = if self.settle {
            Pacing::Settle {
                interval: Duration::from_millis(100).min(speed),
                timeout: speed,
            }
        } else {
            Pacing::Fixed(speed)
        };

        let mut login = LoginConfig {
            navigation_timeout: Duration::from_millis(self.timeout),
            ..LoginConfig::default()
        };
        if let Some(pattern) = &self.login_pattern {
            login = login.with_pattern(pattern)?;
        }

        let options = RecordOptions {
            url: self.url,
            credentials: Credentials::from_parts(self.username, self.password),
            output: self.output.unwrap_or_else(default_output),
            browser: BrowserConfig {
                viewport: Viewport {
                    width: self.width,
                    height: self.height,
                },
                headless: !self.headed,
                timeout_ms: self.timeout,
                chrome_path: self.chrome,
                ..BrowserConfig::default()
            },
            capture: CaptureConfig {
                pacing,
                termination: match self.until {
                    Until::Height => Termination::ContentHeight,
                    Until::HeightAndOffset => Termination::HeightAndOffset,
                },
                max_frames: self.max_frames,
                frames_dir: self.frames_dir,
            },
            login,
            encode: EncodeConfig {
                program: self.ffmpeg,
                input_fps: self.input_fps,
                output_fps: self.fps,
                ..EncodeConfig::default()
            },
        };
        options.validate()?;
        Ok(options)
    }
}
