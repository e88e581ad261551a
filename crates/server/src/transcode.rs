//! Transcoding collaborator for ladder repair.
//!
//! Wraps the external ffmpeg engine behind the `Transcoder` trait so the
//! catalog builder can be exercised without a real encoder present.

use crate::asset::ResolutionTier;
use std::path::Path;
use std::process::Command;
use thiserror::Error;
use tracing::debug;

/// Error type for transcoding operations
#[derive(Debug, Error)]
pub enum TranscodeError {
    /// ffmpeg process exited with non-zero status
    #[error("ffmpeg failed with exit code: {0}")]
    FfmpegFailed(i32),

    /// ffmpeg process was terminated by signal
    #[error("ffmpeg process was terminated by signal")]
    FfmpegTerminated,

    /// IO error during transcoding
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// External engine that re-encodes a source file into a target resolution.
///
/// Invoked synchronously; each conversion blocks until the engine exits.
pub trait Transcoder {
    fn convert(
        &self,
        input: &Path,
        output: &Path,
        target: ResolutionTier,
    ) -> Result<(), TranscodeError>;
}

/// The real collaborator: `ffmpeg` invoked as a subprocess.
#[derive(Debug, Clone, Copy, Default)]
pub struct FfmpegTranscoder;

/// Build the ffmpeg conversion command for one ladder entry.
///
/// Width is derived from the aspect ratio (`-2`) so only the target height is
/// fixed; the container format follows from the output extension.
pub fn build_ffmpeg_command(input: &Path, output: &Path, target: ResolutionTier) -> Command {
    let mut cmd = Command::new("ffmpeg");
    cmd.arg("-y");
    cmd.arg("-i").arg(input);
    cmd.arg("-c:v").arg("libx264");
    cmd.arg("-crf").arg("25");
    cmd.arg("-vf").arg(format!("scale=-2:{}", target.height()));
    cmd.arg(output);
    cmd
}

impl Transcoder for FfmpegTranscoder {
    fn convert(
        &self,
        input: &Path,
        output: &Path,
        target: ResolutionTier,
    ) -> Result<(), TranscodeError> {
        let mut cmd = build_ffmpeg_command(input, output, target);
        debug!(input = %input.display(), output = %output.display(), "running ffmpeg");

        let status = cmd.status()?;

        if status.success() {
            Ok(())
        } else {
            match status.code() {
                Some(code) => Err(TranscodeError::FfmpegFailed(code)),
                None => Err(TranscodeError::FfmpegTerminated),
            }
        }
    }
}
