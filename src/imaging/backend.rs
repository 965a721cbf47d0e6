//! Export backend trait and shared error types.
//!
//! The [`ExportBackend`] trait defines the three writes an export performs:
//! a still frame, the loop animation and the video. The session talks only to
//! this trait, so its export policy (which failures are fatal, which are
//! reported) can be tested with the recording mock below.
//!
//! The production implementation is
//! [`NativeBackend`](super::native_backend::NativeBackend).

use super::align::FramePair;
use super::animation::LoopFormat;
use super::params::Quality;
use image::RgbImage;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Processing failed: {0}")]
    ProcessingFailed(String),
}

#[derive(Error, Debug)]
pub enum EncodeError {
    #[error("Frame duration must be positive, got {0}ms")]
    InvalidDuration(u32),
    #[error("Frames of {width}x{height} are too large for {format}")]
    FrameTooLarge {
        width: u32,
        height: u32,
        format: &'static str,
    },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("{format} encoder failed: {message}")]
    Codec {
        format: &'static str,
        message: String,
    },
    #[error("Video codec unavailable: {0}")]
    CodecUnavailable(String),
    #[error("ffmpeg exited with status {status}: {stderr}")]
    Ffmpeg { status: String, stderr: String },
}

/// Trait for export backends.
///
/// Every backend must implement all three writes so the session is
/// backend-agnostic. Destination directories already exist when these are
/// called.
pub trait ExportBackend: Sync {
    /// Write one view as a baseline JPEG.
    fn write_still(&self, image: &RgbImage, path: &Path, quality: Quality)
    -> Result<(), BackendError>;

    /// Write the two-frame, infinitely looping animation.
    fn encode_loop(
        &self,
        pair: &FramePair,
        duration_ms: u32,
        path: &Path,
        format: LoopFormat,
    ) -> Result<(), EncodeError>;

    /// Write the short alternating video.
    fn encode_video(&self, pair: &FramePair, duration_ms: u32, path: &Path)
    -> Result<(), EncodeError>;
}

/// Lets parallel sessions share one backend.
impl<B: ExportBackend + ?Sized> ExportBackend for &B {
    fn write_still(
        &self,
        image: &RgbImage,
        path: &Path,
        quality: Quality,
    ) -> Result<(), BackendError> {
        (**self).write_still(image, path, quality)
    }

    fn encode_loop(
        &self,
        pair: &FramePair,
        duration_ms: u32,
        path: &Path,
        format: LoopFormat,
    ) -> Result<(), EncodeError> {
        (**self).encode_loop(pair, duration_ms, path, format)
    }

    fn encode_video(
        &self,
        pair: &FramePair,
        duration_ms: u32,
        path: &Path,
    ) -> Result<(), EncodeError> {
        (**self).encode_video(pair, duration_ms, path)
    }
}
