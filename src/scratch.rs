//! Scratch directory holding the numbered frames of one recording.

use crate::{Error, Result};
use log::{debug, warn};
use std::path::{Path, PathBuf};

/// Prefix of every frame file name.
pub const FRAME_PREFIX: &str = "screenshot_";

/// `ffmpeg` image2 pattern matching [`frame_file_name`].
pub const FRAME_PATTERN: &str = "screenshot_%04d.png";

/// File name of the frame at `index`: zero-based, zero-padded to 4 digits.
///
/// ```
/// assert_eq!(page2vid::scratch::frame_file_name(7), "screenshot_0007.png");
/// ```
pub fn frame_file_name(index: usize) -> String {
    format!("{FRAME_PREFIX}{index:04}.png")
}

/// Transient directory that is removed when dropped.
///
/// Creation refuses a non-empty existing directory, so removal can never take
/// unrelated files with it.
#[derive(Debug)]
pub struct ScratchDir {
    path: PathBuf,
    removed: bool,
}

impl ScratchDir {
    pub fn create(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if path.exists() {
            let mut entries = std::fs::read_dir(&path)?;
            if entries.next().is_some() {
                return Err(Error::ConfigError(format!(
                    "scratch directory {} already exists and is not empty",
                    path.display()
                )));
            }
        }
        std::fs::create_dir_all(&path)?;
        debug!("created scratch directory {}", path.display());
        Ok(Self { path, removed: false })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Remove the directory now, reporting failures.
    pub fn close(mut self) -> Result<()> {
        self.removed = true;
        remove(&self.path).map_err(Error::from)
    }
}

impl Drop for ScratchDir {
    fn drop(&mut self) {
        if self.removed {
            return;
        }
        if let Err(e) = remove(&self.path) {
            warn!("failed to remove scratch directory {}: {}", self.path.display(), e);
        }
    }
}

fn remove(path: &Path) -> std::io::Result<()> {
    match std::fs::remove_dir_all(path) {
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        res => {
            debug!("removed scratch directory {}", path.display());
            res
        }
    }
}

/// Frames captured so far, carried from the capture stage to the encoder.
#[derive(Debug)]
pub struct CaptureSession {
    dir: ScratchDir,
    frames: usize,
}

impl CaptureSession {
    pub fn new(dir: ScratchDir) -> Self {
        Self { dir, frames: 0 }
    }

    pub fn dir(&self) -> &Path {
        self.dir.path()
    }

    /// Number of frames written; frame names cover `0..frames` without gaps.
    pub fn frames(&self) -> usize {
        self.frames
    }

    /// Path where the next frame should be written.
    pub fn next_frame_path(&self) -> PathBuf {
        self.dir.path().join(frame_file_name(self.frames))
    }

    /// Record that the frame at [`next_frame_path`](Self::next_frame_path) exists.
    pub fn commit_frame(&mut self) {
        self.frames += 1;
    }

    /// Input pattern for the encoder.
    pub fn input_pattern(&self) -> PathBuf {
        self.dir.path().join(FRAME_PATTERN)
    }

    /// Delete the scratch directory, reporting failures.
    pub fn finish(self) -> Result<()> {
        self.dir.close()
    }
}
