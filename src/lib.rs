//! # mpo-wiggle
//!
//! Turns stereoscopic photos from twin-lens cameras (`.mpo` files from a
//! Nintendo 3DS, Fujifilm W3 and friends) into "wiggle" animations: the left
//! and right views alternating forever, exported as a looping GIF or APNG, a
//! short silent video, and the two aligned stills.
//!
//! # Architecture: Decode Once, Align Many Times
//!
//! ```text
//! 1. Decode    file.mpo  →  two RGB frames       (MPF index + JPEG decode)
//! 2. Align     frames    →  FramePair            (opposite shift + shared crop)
//! 3. Encode    FramePair →  _left/_right.jpg, .gif/.png, .mp4
//! ```
//!
//! Stages 1 to 3 are pure functions in [`imaging`]. [`session::PipelineSession`]
//! holds the decoded frames of one file so that every parameter edit re-runs
//! only stage 2, always from the original frames. Crops therefore never
//! compound, and the container is read once per file.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`imaging`] | Decoding, alignment, loop and video encoding, the export backend seam |
//! | [`session`] | Stateful decode-once/edit/export façade over one container |
//! | [`command`] | Terminal command language (`o12`, `c l8`, `e`, ...) and parameter limits |
//! | [`editor`] | Interactive loop driving a session from command lines |
//! | [`batch`] | Parallel, non-interactive export of a folder with a JSON manifest |
//! | [`scan`] | Finds containers in a folder |
//! | [`naming`] | Output base names: file stem or `3DS_0001_<timestamp>` |
//! | [`config`] | `mpo-wiggle.toml` loading, merging and validation |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Black Padding for Shifted Views
//!
//! Shifting the left view by `-overlap` and the right by `+overlap` exposes
//! columns outside the source frame. They are filled with opaque black rather
//! than clamped or cropped away automatically, so the output size depends
//! only on the crop and the user stays in control of what gets trimmed.
//!
//! ## Two Loop Formats
//!
//! GIF stores frame delays in centiseconds, so the default 175 ms becomes
//! 180 ms. APNG stores the delay as an exact fraction and is offered for
//! users who care about timing; GIF remains the default for compatibility.
//!
//! ## Video Is Best-Effort
//!
//! The video artifact needs an external `ffmpeg`. Stills and the loop
//! artifact are written first and are the real product; a missing or failing
//! ffmpeg is reported per export and never throws that work away.

pub mod batch;
pub mod command;
pub mod config;
pub mod editor;
pub mod imaging;
pub mod naming;
pub mod output;
pub mod scan;
pub mod session;

#[cfg(test)]
pub(crate) mod test_helpers;
