//! Parameter types for the alignment pipeline.
//!
//! These structs describe *what* to do, not *how* to do it. They are the
//! interface between callers (the session, the terminal controller, batch
//! mode) and the pixel work in [`align`](super::align) and the encoders.
//!
//! ## Types
//!
//! - [`Quality`]: JPEG quality for still exports (1–100, default 90). Clamped on construction.
//! - [`AlignmentParams`]: overlap, shared crop and frame duration for one source.
//! - [`ParamUpdate`]: a sparse edit merged onto [`AlignmentParams`].

use serde::{Deserialize, Serialize};
use std::fmt;

/// Frame duration used when nothing else is configured.
pub const DEFAULT_FRAME_DURATION_MS: u32 = 175;

/// Quality setting for lossy image encoding (1-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quality(pub u32);

impl Quality {
    pub fn new(value: u32) -> Self {
        Self(value.clamp(1, 100))
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(90)
    }
}

/// Alignment and timing for one stereo pair.
///
/// `overlap` shifts the left view by `-overlap` and the right view by
/// `+overlap` columns. The four crop edges are pixels removed from the
/// respective side of both views.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AlignmentParams {
    pub overlap: i32,
    pub crop_left: u32,
    pub crop_top: u32,
    pub crop_right: u32,
    pub crop_bottom: u32,
    pub frame_duration_ms: u32,
}

impl Default for AlignmentParams {
    fn default() -> Self {
        Self {
            overlap: 0,
            crop_left: 0,
            crop_top: 0,
            crop_right: 0,
            crop_bottom: 0,
            frame_duration_ms: DEFAULT_FRAME_DURATION_MS,
        }
    }
}

impl AlignmentParams {
    /// Return a copy with `update` applied. Fields absent from the update keep their value.
    pub fn merged(&self, update: &ParamUpdate) -> Self {
        Self {
            overlap: update.overlap.unwrap_or(self.overlap),
            crop_left: update.crop_left.unwrap_or(self.crop_left),
            crop_top: update.crop_top.unwrap_or(self.crop_top),
            crop_right: update.crop_right.unwrap_or(self.crop_right),
            crop_bottom: update.crop_bottom.unwrap_or(self.crop_bottom),
            frame_duration_ms: update.frame_duration_ms.unwrap_or(self.frame_duration_ms),
        }
    }

    /// The crop edges as `(left, top, right, bottom)`.
    pub fn crop(&self) -> (u32, u32, u32, u32) {
        (
            self.crop_left,
            self.crop_top,
            self.crop_right,
            self.crop_bottom,
        )
    }
}

impl fmt::Display for AlignmentParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "overlap={} crop=(l{} t{} r{} b{}) duration={}ms",
            self.overlap,
            self.crop_left,
            self.crop_top,
            self.crop_right,
            self.crop_bottom,
            self.frame_duration_ms
        )
    }
}

/// Sparse edit to [`AlignmentParams`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParamUpdate {
    pub overlap: Option<i32>,
    pub crop_left: Option<u32>,
    pub crop_top: Option<u32>,
    pub crop_right: Option<u32>,
    pub crop_bottom: Option<u32>,
    pub frame_duration_ms: Option<u32>,
}

impl ParamUpdate {
    pub fn overlap(value: i32) -> Self {
        Self {
            overlap: Some(value),
            ..Self::default()
        }
    }

    pub fn frame_duration(ms: u32) -> Self {
        Self {
            frame_duration_ms: Some(ms),
            ..Self::default()
        }
    }

    /// Replace every field, as when applying a full parameter set.
    pub fn from_params(params: &AlignmentParams) -> Self {
        Self {
            overlap: Some(params.overlap),
            crop_left: Some(params.crop_left),
            crop_top: Some(params.crop_top),
            crop_right: Some(params.crop_right),
            crop_bottom: Some(params.crop_bottom),
            frame_duration_ms: Some(params.frame_duration_ms),
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}
