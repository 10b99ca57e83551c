//! Hand the captured frame sequence to `ffmpeg`.

use crate::scratch::CaptureSession;
use crate::{Error, Result};
use log::{debug, info};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;

/// Lines of encoder stderr kept in error messages.
const STDERR_TAIL_LINES: usize = 12;

#[derive(Debug, Clone)]
pub struct EncodeConfig {
    /// Encoder executable
    pub program: PathBuf,
    /// Input frames per second; 1 shows each screenshot for one second
    pub input_fps: u32,
    /// Output frame rate, applied through the `fps` video filter
    pub output_fps: u32,
    pub pixel_format: String,
}

impl Default for EncodeConfig {
    fn default() -> Self {
        Self {
            program: PathBuf::from("ffmpeg"),
            input_fps: 1,
            output_fps: 30,
            pixel_format: "yuv420p".to_string(),
        }
    }
}

/// Runs the external encoder over a [`CaptureSession`].
#[derive(Debug, Clone, Default)]
pub struct Encoder {
    config: EncodeConfig,
}

impl Encoder {
    pub fn new(config: EncodeConfig) -> Result<Self> {
        if config.input_fps == 0 || config.output_fps == 0 {
            return Err(Error::ConfigError("frame rates must be positive".into()));
        }
        Ok(Self { config })
    }

    /// Arguments passed to the encoder for `input_pattern` -> `output`.
    pub fn args(&self, input_pattern: &Path, output: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = Vec::new();
        args.push("-y".into());
        args.push("-framerate".into());
        args.push(self.config.input_fps.to_string().into());
        args.push("-start_number".into());
        args.push("0".into());
        args.push("-i".into());
        args.push(input_pattern.as_os_str().to_owned());
        args.push("-vf".into());
        args.push(format!("fps={}", self.config.output_fps).into());
        args.push("-pix_fmt".into());
        args.push(self.config.pixel_format.clone().into());
        args.push(output.as_os_str().to_owned());
        args
    }

    /// Encode every frame of `session` into `output`.
    pub async fn encode(&self, session: &CaptureSession, output: &Path) -> Result<()> {
        if session.frames() == 0 {
            return Err(Error::EncodeError("no frames were captured".into()));
        }

        if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let args = self.args(&session.input_pattern(), output);
        info!(
            "encoding {} frames with {} -> {}",
            session.frames(),
            self.config.program.display(),
            output.display()
        );
        debug!("encoder args: {:?}", args);

        let out = Command::new(&self.config.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                Error::EncodeError(format!(
                    "failed to run {}: {}",
                    self.config.program.display(),
                    e
                ))
            })?;

        if !out.status.success() {
            let stderr = String::from_utf8_lossy(&out.stderr);
            return Err(Error::EncodeError(format!(
                "{} exited with {}: {}",
                self.config.program.display(),
                out.status,
                stderr_tail(&stderr)
            )));
        }

        Ok(())
    }
}

fn stderr_tail(stderr: &str) -> String {
    let lines: Vec<&str> = stderr.lines().filter(|l| !l.trim().is_empty()).collect();
    let start = lines.len().saturating_sub(STDERR_TAIL_LINES);
    lines[start..].join("\n")
}
