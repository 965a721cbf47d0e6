//! Stereo alignment: opposite horizontal shift plus a shared crop.
//!
//! The left view is windowed at column `-overlap` and the right view at
//! `+overlap`; the same crop rectangle is then cut from both windows. Both
//! steps are fused into a single row-copy pass per view.
//!
//! Window columns that fall outside the source frame are filled with opaque
//! black ([`PAD_PIXEL`]).

use super::calculations::{calculate_cropped_dimensions, calculate_row_span};
use super::params::AlignmentParams;
use image::{Rgb, RgbImage};
use thiserror::Error;

/// Fill for window columns outside the source frame.
pub const PAD_PIXEL: Rgb<u8> = Rgb([0, 0, 0]);

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AlignError {
    #[error("Source frames differ in size: left {left:?}, right {right:?}")]
    DimensionMismatch { left: (u32, u32), right: (u32, u32) },
    #[error(
        "Crop (l{left} t{top} r{right} b{bottom}) leaves no pixels of a {width}x{height} frame"
    )]
    InvalidCrop {
        width: u32,
        height: u32,
        left: u32,
        top: u32,
        right: u32,
        bottom: u32,
    },
}

/// Two views of identical size, left first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FramePair {
    left: RgbImage,
    right: RgbImage,
}

impl FramePair {
    /// Pair two views, rejecting views of different sizes.
    pub fn new(left: RgbImage, right: RgbImage) -> Result<Self, AlignError> {
        if left.dimensions() != right.dimensions() {
            return Err(AlignError::DimensionMismatch {
                left: left.dimensions(),
                right: right.dimensions(),
            });
        }
        Ok(Self { left, right })
    }

    pub fn left(&self) -> &RgbImage {
        &self.left
    }

    pub fn right(&self) -> &RgbImage {
        &self.right
    }

    pub fn width(&self) -> u32 {
        self.left.width()
    }

    pub fn height(&self) -> u32 {
        self.left.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.left.dimensions()
    }

    /// The two views in display order.
    pub fn frames(&self) -> [&RgbImage; 2] {
        [&self.left, &self.right]
    }
}

/// Shift both views by the overlap and apply the shared crop.
pub fn align_and_crop(
    left: &RgbImage,
    right: &RgbImage,
    params: &AlignmentParams,
) -> Result<FramePair, AlignError> {
    if left.dimensions() != right.dimensions() {
        return Err(AlignError::DimensionMismatch {
            left: left.dimensions(),
            right: right.dimensions(),
        });
    }

    let (width, height) = left.dimensions();
    let (crop_left, crop_top, crop_right, crop_bottom) = params.crop();
    let (out_w, out_h) =
        calculate_cropped_dimensions((width, height), params.crop()).ok_or(
            AlignError::InvalidCrop {
                width,
                height,
                left: crop_left,
                top: crop_top,
                right: crop_right,
                bottom: crop_bottom,
            },
        )?;

    let overlap = i64::from(params.overlap);
    let origin = i64::from(crop_left);

    Ok(FramePair {
        left: window(left, origin - overlap, crop_top, out_w, out_h),
        right: window(right, origin + overlap, crop_top, out_w, out_h),
    })
}

/// Copy an `out_w`×`out_h` window whose top-left sits at (`origin_x`, `top`)
/// in `src`. `top + out_h` must not exceed the source height.
fn window(src: &RgbImage, origin_x: i64, top: u32, out_w: u32, out_h: u32) -> RgbImage {
    let mut out = RgbImage::from_pixel(out_w, out_h, PAD_PIXEL);
    let Some(span) = calculate_row_span(origin_x, out_w, src.width()) else {
        return out;
    };

    const CHANNELS: usize = 3;
    let src_stride = src.width() as usize * CHANNELS;
    let dst_stride = out_w as usize * CHANNELS;
    let len = span.len as usize * CHANNELS;
    let src_raw = src.as_raw();
    let dst_raw: &mut [u8] = &mut out;

    for y in 0..out_h as usize {
        let s = (top as usize + y) * src_stride + span.src_start as usize * CHANNELS;
        let d = y * dst_stride + span.dst_start as usize * CHANNELS;
        dst_raw[d..d + len].copy_from_slice(&src_raw[s..s + len]);
    }
    out
}
