//! Short alternating video via the system `ffmpeg` binary.
//!
//! Frames are streamed as raw RGB24 on ffmpeg's stdin; ffmpeg encodes
//! H.264/yuv420p without an audio track and moves the `moov` atom to the
//! front (`+faststart`). yuv420p needs even dimensions, so odd sizes are
//! padded by one black row/column with a `pad` filter.

use super::align::FramePair;
use super::backend::EncodeError;
use super::calculations::calculate_video_fps;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tracing::debug;

const EVEN_PAD_FILTER: &str = "pad=ceil(iw/2)*2:ceil(ih/2)*2";

/// How to run the video encoder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoOptions {
    /// ffmpeg executable, looked up on `PATH` when not absolute.
    pub ffmpeg: PathBuf,
    /// How many times the left/right pair is repeated in the stream.
    pub cycles: u32,
}

impl Default for VideoOptions {
    fn default() -> Self {
        Self {
            ffmpeg: PathBuf::from("ffmpeg"),
            cycles: 1,
        }
    }
}

/// Whether the configured ffmpeg binary can be run.
pub fn is_ffmpeg_available(ffmpeg: &Path) -> bool {
    Command::new(ffmpeg)
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

/// Encode the pair as a silent video at `round(1000 / duration_ms)` fps.
pub fn encode_video(
    pair: &FramePair,
    duration_ms: u32,
    path: &Path,
    options: &VideoOptions,
) -> Result<(), EncodeError> {
    let fps = calculate_video_fps(duration_ms).ok_or(EncodeError::InvalidDuration(duration_ms))?;
    let size = format!("{}x{}", pair.width(), pair.height());

    let mut cmd = Command::new(&options.ffmpeg);
    cmd.stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .args([
            "-y",
            "-loglevel",
            "error",
            "-f",
            "rawvideo",
            "-pix_fmt",
            "rgb24",
            "-s",
            &size,
            "-r",
            &fps.to_string(),
            "-i",
            "pipe:0",
            "-an",
            "-vf",
            EVEN_PAD_FILTER,
            "-c:v",
            "libx264",
            "-pix_fmt",
            "yuv420p",
            "-movflags",
            "+faststart",
        ])
        .arg(path);

    debug!(fps, size = %size, path = %path.display(), "spawning ffmpeg");

    let mut child = cmd.spawn().map_err(|e| {
        EncodeError::CodecUnavailable(format!(
            "failed to run '{}' (is it installed and on PATH?): {e}",
            options.ffmpeg.display()
        ))
    })?;

    let Some(mut stdin) = child.stdin.take() else {
        return Err(EncodeError::CodecUnavailable(
            "failed to open ffmpeg stdin".into(),
        ));
    };

    // A write error usually means ffmpeg already quit; its stderr explains why
    let mut write_result = Ok(());
    'frames: for _ in 0..options.cycles.max(1) {
        for view in pair.frames() {
            if let Err(e) = stdin.write_all(view.as_raw()) {
                write_result = Err(e);
                break 'frames;
            }
        }
    }
    drop(stdin);

    let output = child.wait_with_output()?;
    if !output.status.success() {
        return Err(EncodeError::Ffmpeg {
            status: output.status.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }
    write_result?;
    Ok(())
}
