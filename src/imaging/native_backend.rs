//! Production export backend.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Still → JPEG | `image::codecs::jpeg::JpegEncoder` (baseline) |
//! | Loop → GIF | `gif` encoder, see [`animation`](super::animation) |
//! | Loop → APNG | `png` encoder, see [`animation`](super::animation) |
//! | Video → MP4 | system `ffmpeg`, see [`video`](super::video) |

use super::align::FramePair;
use super::animation::{self, LoopFormat};
use super::backend::{BackendError, EncodeError, ExportBackend};
use super::params::Quality;
use super::video::{self, VideoOptions};
use image::codecs::jpeg::JpegEncoder;
use image::{ExtendedColorType, ImageEncoder, RgbImage};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Backend writing real files with the `image`/`gif`/`png` crates and ffmpeg.
#[derive(Debug, Clone, Default)]
pub struct NativeBackend {
    video: VideoOptions,
}

impl NativeBackend {
    pub fn new(video: VideoOptions) -> Self {
        Self { video }
    }

    pub fn video_options(&self) -> &VideoOptions {
        &self.video
    }
}

impl ExportBackend for NativeBackend {
    fn write_still(
        &self,
        image: &RgbImage,
        path: &Path,
        quality: Quality,
    ) -> Result<(), BackendError> {
        let mut writer = BufWriter::new(File::create(path)?);
        JpegEncoder::new_with_quality(&mut writer, quality.value() as u8)
            .write_image(
                image.as_raw(),
                image.width(),
                image.height(),
                ExtendedColorType::Rgb8,
            )
            .map_err(|e| {
                BackendError::ProcessingFailed(format!(
                    "JPEG encode of {} failed: {}",
                    path.display(),
                    e
                ))
            })?;
        writer.flush()?;
        Ok(())
    }

    fn encode_loop(
        &self,
        pair: &FramePair,
        duration_ms: u32,
        path: &Path,
        format: LoopFormat,
    ) -> Result<(), EncodeError> {
        animation::encode_loop(pair, duration_ms, path, format)
    }

    fn encode_video(
        &self,
        pair: &FramePair,
        duration_ms: u32,
        path: &Path,
    ) -> Result<(), EncodeError> {
        video::encode_video(pair, duration_ms, path, &self.video)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{gradient_frame, read_gif_frames};
    use std::path::PathBuf;

    #[test]
    fn write_still_produces_decodable_jpeg() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("view_left.jpg");
        let backend = NativeBackend::default();

        backend
            .write_still(&gradient_frame(200, 150, 0), &path, Quality::default())
            .unwrap();

        assert_eq!(image::image_dimensions(&path).unwrap(), (200, 150));
    }

    #[test]
    fn write_still_into_missing_directory_is_io_error() {
        let backend = NativeBackend::default();
        let result = backend.write_still(
            &gradient_frame(4, 4, 0),
            Path::new("/nonexistent/dir/x.jpg"),
            Quality::default(),
        );
        assert!(matches!(result, Err(BackendError::Io(_))));
    }

    #[test]
    fn encode_loop_delegates_to_animation() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("a.gif");
        let pair = FramePair::new(gradient_frame(30, 20, 0), gradient_frame(30, 20, 5)).unwrap();

        NativeBackend::default()
            .encode_loop(&pair, 200, &path, LoopFormat::Gif)
            .unwrap();

        let frames = read_gif_frames(&std::fs::read(&path).unwrap());
        assert_eq!(frames, vec![(30, 20, 20), (30, 20, 20)]);
    }

    #[test]
    fn encode_video_uses_configured_binary() {
        let backend = NativeBackend::new(VideoOptions {
            ffmpeg: PathBuf::from("/nonexistent/ffmpeg"),
            cycles: 2,
        });
        assert_eq!(backend.video_options().cycles, 2);

        let pair = FramePair::new(gradient_frame(8, 8, 0), gradient_frame(8, 8, 1)).unwrap();
        let tmp = tempfile::TempDir::new().unwrap();
        let result = backend.encode_video(&pair, 100, &tmp.path().join("a.mp4"));
        assert!(matches!(result, Err(EncodeError::CodecUnavailable(_))));
    }
}
