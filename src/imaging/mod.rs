//! Stereo pair processing: decode, align, encode.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Locate views** | custom MPF index parser (JPEG APP2 + TIFF IFD) |
//! | **Decode views** | `image` JPEG and GIF decoders |
//! | **Align + crop** | row copies into fresh `RgbImage` buffers |
//! | **Loop artifact** | `gif` / `png` (APNG) encoders |
//! | **Video artifact** | system `ffmpeg` over a stdin pipe |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for crop geometry and timing (unit testable)
//! - **Parameters**: Data structures describing the alignment
//! - **Decoder / Align / Animation / Video**: the pipeline stages
//! - **Backend**: [`ExportBackend`] trait + [`NativeBackend`]

pub mod align;
pub mod animation;
pub mod backend;
mod calculations;
pub mod decoder;
pub(crate) mod mpo_parser;
pub mod native_backend;
mod params;
pub mod video;

pub use align::{AlignError, FramePair, align_and_crop};
pub use animation::{LoopFormat, encode_loop, encode_loop_to_writer};
pub use backend::{BackendError, EncodeError, ExportBackend};
pub use calculations::{calculate_cropped_dimensions, calculate_video_fps};
pub use decoder::{ContainerKind, DecodeError, SourceContainer, decode, decode_bytes};
pub use native_backend::NativeBackend;
pub use params::{AlignmentParams, DEFAULT_FRAME_DURATION_MS, ParamUpdate, Quality};
pub use video::{VideoOptions, encode_video, is_ffmpeg_available};
