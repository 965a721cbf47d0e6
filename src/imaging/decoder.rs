//! Dual-view container decoding.
//!
//! | Container | How frames are found |
//! |---|---|
//! | MPO / JPEG | MP Index in the APP2 `MPF` segment ([`mpo_parser`](super::mpo_parser)), each image decoded as JPEG |
//! | GIF | frames counted from their descriptors, the first two composited by `image::codecs::gif::GifDecoder` |
//! | anything else `image` reads | a single frame, so always [`DecodeError::InsufficientFrames`] |
//!
//! Only the first two frames are decoded; the rest are counted and dropped.
//! Frames come back as owned 8-bit RGB buffers that share nothing with the
//! file bytes or with each other.

use super::mpo_parser::{self, MpfError};
use image::codecs::gif::GifDecoder;
use image::{AnimationDecoder, DynamicImage, ImageFormat, RgbImage};
use std::fmt;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Not a readable image container: {0}")]
    Format(String),
    #[error("Container holds {found} frame(s), at least 2 are required")]
    InsufficientFrames { found: usize },
}

impl From<MpfError> for DecodeError {
    fn from(err: MpfError) -> Self {
        DecodeError::Format(err.to_string())
    }
}

/// Which container layout the frames were read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerKind {
    Mpo,
    Gif,
}

impl fmt::Display for ContainerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContainerKind::Mpo => f.write_str("MPO"),
            ContainerKind::Gif => f.write_str("GIF"),
        }
    }
}

/// A decoded dual-view container: its first two frames plus bookkeeping.
#[derive(Debug, Clone)]
pub struct SourceContainer {
    kind: ContainerKind,
    frame_count: usize,
    left: RgbImage,
    right: RgbImage,
}

impl SourceContainer {
    pub fn kind(&self) -> ContainerKind {
        self.kind
    }

    /// Total number of frames in the container, including ones not decoded.
    pub fn frame_count(&self) -> usize {
        self.frame_count
    }

    pub fn left(&self) -> &RgbImage {
        &self.left
    }

    pub fn right(&self) -> &RgbImage {
        &self.right
    }

    /// Dimensions of the left (first) frame.
    pub fn dimensions(&self) -> (u32, u32) {
        self.left.dimensions()
    }

    /// Release the container, keeping only the two views.
    pub fn into_frames(self) -> (RgbImage, RgbImage) {
        (self.left, self.right)
    }
}

/// Open a container file and decode its first two frames.
pub fn decode(path: &Path) -> Result<SourceContainer, DecodeError> {
    let bytes = std::fs::read(path).map_err(|source| DecodeError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let container = decode_bytes(&bytes)?;
    debug!(
        path = %path.display(),
        kind = %container.kind,
        frames = container.frame_count,
        width = container.left.width(),
        height = container.left.height(),
        "decoded container"
    );
    Ok(container)
}

/// Decode a container already in memory.
pub fn decode_bytes(bytes: &[u8]) -> Result<SourceContainer, DecodeError> {
    if bytes.starts_with(&[0xFF, 0xD8]) {
        decode_mpo(bytes)
    } else if bytes.starts_with(b"GIF8") {
        decode_gif(bytes)
    } else {
        // Readable but single-frame, or not an image at all
        image::load_from_memory(bytes).map_err(|e| DecodeError::Format(e.to_string()))?;
        Err(DecodeError::InsufficientFrames { found: 1 })
    }
}

fn decode_jpeg(bytes: &[u8]) -> Result<RgbImage, DecodeError> {
    image::load_from_memory_with_format(bytes, ImageFormat::Jpeg)
        .map(|img| img.to_rgb8())
        .map_err(|e| DecodeError::Format(format!("JPEG decode failed: {e}")))
}

fn decode_mpo(bytes: &[u8]) -> Result<SourceContainer, DecodeError> {
    let ranges = mpo_parser::locate_images(bytes)?;

    let left = decode_jpeg(&bytes[ranges[0].clone()])?;
    let Some(second) = ranges.get(1) else {
        return Err(DecodeError::InsufficientFrames { found: 1 });
    };
    let right = decode_jpeg(&bytes[second.clone()])?;

    Ok(SourceContainer {
        kind: ContainerKind::Mpo,
        frame_count: ranges.len(),
        left,
        right,
    })
}

fn decode_gif(bytes: &[u8]) -> Result<SourceContainer, DecodeError> {
    let frame_count = count_gif_frames(bytes)?;
    if frame_count < 2 {
        return Err(DecodeError::InsufficientFrames { found: frame_count });
    }

    let decoder = GifDecoder::new(Cursor::new(bytes))
        .map_err(|e| DecodeError::Format(format!("GIF decode failed: {e}")))?;
    let mut views = Vec::with_capacity(2);
    for frame in decoder.into_frames().take(2) {
        let frame = frame.map_err(|e| DecodeError::Format(format!("GIF frame decode failed: {e}")))?;
        views.push(DynamicImage::ImageRgba8(frame.into_buffer()).to_rgb8());
    }

    let mut views = views.into_iter();
    match (views.next(), views.next()) {
        (Some(left), Some(right)) => Ok(SourceContainer {
            kind: ContainerKind::Gif,
            frame_count,
            left,
            right,
        }),
        _ => Err(DecodeError::InsufficientFrames { found: frame_count }),
    }
}

/// Count frames from their descriptors alone; pixel data is skipped.
fn count_gif_frames(bytes: &[u8]) -> Result<usize, DecodeError> {
    let mut decoder = gif::DecodeOptions::new()
        .read_info(bytes)
        .map_err(|e| DecodeError::Format(format!("GIF decode failed: {e}")))?;
    let mut count = 0;
    while decoder
        .next_frame_info()
        .map_err(|e| DecodeError::Format(format!("GIF frame decode failed: {e}")))?
        .is_some()
    {
        count += 1;
    }
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::animation::{LoopFormat, encode_loop_to_writer};
    use crate::imaging::FramePair;
    use crate::test_helpers::{build_mpo, build_mpo_with_exif, encode_png, gradient_frame};

    #[test]
    fn decodes_two_frame_mpo() {
        let bytes = build_mpo(&[gradient_frame(64, 48, 0), gradient_frame(64, 48, 90)]);
        let container = decode_bytes(&bytes).unwrap();

        assert_eq!(container.kind(), ContainerKind::Mpo);
        assert_eq!(container.frame_count(), 2);
        assert_eq!(container.dimensions(), (64, 48));
        assert_eq!(container.right().dimensions(), (64, 48));
    }

    #[test]
    fn mpo_frames_keep_their_order() {
        // Solid frames survive JPEG well enough to tell apart
        let dark = RgbImage::from_pixel(32, 32, image::Rgb([20, 20, 20]));
        let bright = RgbImage::from_pixel(32, 32, image::Rgb([230, 230, 230]));
        let container = decode_bytes(&build_mpo(&[dark, bright])).unwrap();

        assert!(container.left().get_pixel(16, 16)[0] < 60);
        assert!(container.right().get_pixel(16, 16)[0] > 190);
    }

    #[test]
    fn camera_layout_with_exif_first_decodes() {
        let dark = RgbImage::from_pixel(24, 16, image::Rgb([20, 20, 20]));
        let bright = RgbImage::from_pixel(24, 16, image::Rgb([230, 230, 230]));
        let container = decode_bytes(&build_mpo_with_exif(&[dark, bright])).unwrap();

        assert_eq!(container.frame_count(), 2);
        assert!(container.left().get_pixel(12, 8)[0] < 60);
        assert!(container.right().get_pixel(12, 8)[0] > 190);
    }

    #[test]
    fn extra_frames_are_counted_but_only_two_exposed() {
        let frames = [
            gradient_frame(16, 16, 0),
            gradient_frame(16, 16, 1),
            gradient_frame(16, 16, 2),
        ];
        let container = decode_bytes(&build_mpo(&frames)).unwrap();
        assert_eq!(container.frame_count(), 3);
        let (left, right) = container.into_frames();
        assert_eq!(left.dimensions(), (16, 16));
        assert_eq!(right.dimensions(), (16, 16));
    }

    #[test]
    fn single_jpeg_has_insufficient_frames() {
        let bytes = build_mpo(&[gradient_frame(16, 16, 0)]);
        assert!(matches!(
            decode_bytes(&bytes),
            Err(DecodeError::InsufficientFrames { found: 1 })
        ));
    }

    #[test]
    fn single_png_has_insufficient_frames() {
        let bytes = encode_png(&gradient_frame(8, 8, 0));
        assert!(matches!(
            decode_bytes(&bytes),
            Err(DecodeError::InsufficientFrames { found: 1 })
        ));
    }

    #[test]
    fn garbage_is_a_format_error() {
        assert!(matches!(
            decode_bytes(b"definitely not an image"),
            Err(DecodeError::Format(_))
        ));
    }

    #[test]
    fn truncated_jpeg_is_a_format_error() {
        let bytes = build_mpo(&[gradient_frame(16, 16, 0), gradient_frame(16, 16, 1)]);
        assert!(matches!(
            decode_bytes(&bytes[..40]),
            Err(DecodeError::Format(_))
        ));
    }

    #[test]
    fn decodes_two_frame_gif() {
        let pair = FramePair::new(gradient_frame(20, 10, 0), gradient_frame(20, 10, 77)).unwrap();
        let mut bytes = Vec::new();
        encode_loop_to_writer(&pair, 100, LoopFormat::Gif, &mut bytes).unwrap();

        let container = decode_bytes(&bytes).unwrap();
        assert_eq!(container.kind(), ContainerKind::Gif);
        assert_eq!(container.frame_count(), 2);
        assert_eq!(container.dimensions(), (20, 10));
    }

    fn gif_with_frames(count: u8) -> Vec<u8> {
        let mut bytes = Vec::new();
        {
            let mut encoder = gif::Encoder::new(&mut bytes, 12, 8, &[]).unwrap();
            for i in 0..count {
                let view = gradient_frame(12, 8, i.wrapping_mul(40));
                let frame = gif::Frame::from_rgb(12, 8, view.as_raw());
                encoder.write_frame(&frame).unwrap();
            }
        }
        bytes
    }

    #[test]
    fn gif_frames_beyond_two_are_counted() {
        let container = decode_bytes(&gif_with_frames(4)).unwrap();
        assert_eq!(container.frame_count(), 4);
        assert_eq!(container.dimensions(), (12, 8));
    }

    #[test]
    fn single_frame_gif_has_insufficient_frames() {
        assert!(matches!(
            decode_bytes(&gif_with_frames(1)),
            Err(DecodeError::InsufficientFrames { found: 1 })
        ));
    }

    #[test]
    fn decode_reads_from_disk() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("pair.mpo");
        std::fs::write(
            &path,
            build_mpo(&[gradient_frame(40, 30, 0), gradient_frame(40, 30, 9)]),
        )
        .unwrap();

        let container = decode(&path).unwrap();
        assert_eq!(container.dimensions(), (40, 30));
    }

    #[test]
    fn decode_missing_file_is_io_error() {
        let result = decode(Path::new("/nonexistent/pair.mpo"));
        assert!(matches!(result, Err(DecodeError::Io { .. })));
    }
}
