//! Startup checks for streamvault
//!
//! Preflight verification that the external collaborators the server shells
//! out to are actually present before the library scan begins.

use std::process::{Command, Stdio};
use thiserror::Error;

/// Error types for startup checks
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("ffmpeg not available: {0}")]
    FfmpegUnavailable(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Check that `ffmpeg -version` executes successfully.
///
/// ffmpeg backs both the transcoding collaborator and the emitter, so a
/// missing binary means neither ladder repair nor playback can work.
pub fn check_ffmpeg_available() -> Result<(), StartupError> {
    let status = Command::new("ffmpeg")
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map_err(|e| StartupError::FfmpegUnavailable(e.to_string()))?;

    if status.success() {
        Ok(())
    } else {
        Err(StartupError::FfmpegUnavailable(format!(
            "ffmpeg -version exited with {}",
            status
        )))
    }
}

/// Run all startup checks in order.
pub fn run_startup_checks() -> Result<(), StartupError> {
    check_ffmpeg_available()?;
    Ok(())
}
