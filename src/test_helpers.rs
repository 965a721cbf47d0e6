//! Shared test utilities for the mpo-wiggle test suite.
//!
//! Builds synthetic containers in memory so no binary fixtures are needed:
//! MPO files assembled from `image`-encoded JPEGs plus a hand-written MPF
//! index, and inspectors for the GIF artifacts the encoders produce.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let tmp = tempfile::TempDir::new().unwrap();
//! let path = write_mpo(tmp.path(), "pair.mpo", &[
//!     gradient_frame(64, 48, 0),
//!     gradient_frame(64, 48, 90),
//! ]);
//! let container = crate::imaging::decode(&path).unwrap();
//! assert_eq!(container.frame_count(), 2);
//! ```

use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder, Rgb, RgbImage};
use std::path::{Path, PathBuf};

// =========================================================================
// Frames
// =========================================================================

/// Smooth gradient, offset by `seed` so different seeds give different frames.
pub fn gradient_frame(width: u32, height: u32, seed: u8) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        Rgb([
            (x as u8).wrapping_add(seed),
            (y as u8).wrapping_add(seed / 2),
            seed,
        ])
    })
}

/// Every column gets a unique color, and no pixel is pure black.
///
/// Lets alignment tests tell which source column a pixel came from and tell
/// copied pixels apart from padding.
pub fn column_frame(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, _| {
        Rgb([(x % 256) as u8, (x / 256) as u8, 255])
    })
}

// =========================================================================
// Encoded fixtures
// =========================================================================

pub fn encode_jpeg(frame: &RgbImage) -> Vec<u8> {
    let mut bytes = Vec::new();
    JpegEncoder::new_with_quality(&mut bytes, 95)
        .write_image(
            frame.as_raw(),
            frame.width(),
            frame.height(),
            ExtendedColorType::Rgb8,
        )
        .unwrap();
    bytes
}

pub fn encode_png(frame: &RgbImage) -> Vec<u8> {
    let mut bytes = Vec::new();
    PngEncoder::new(&mut bytes)
        .write_image(
            frame.as_raw(),
            frame.width(),
            frame.height(),
            ExtendedColorType::Rgb8,
        )
        .unwrap();
    bytes
}

/// TIFF-structured MP Index block, as stored after `"MPF\0"` in APP2.
///
/// Layout: 8-byte TIFF header, an IFD with version / NumberOfImages /
/// MPEntry tags, a zero next-IFD pointer, then the 16-byte MP entries.
/// `entries` are `(size, offset)` pairs.
pub fn mpf_block(big_endian: bool, entries: &[(u32, u32)]) -> Vec<u8> {
    let u16b = |v: u16| {
        if big_endian {
            v.to_be_bytes()
        } else {
            v.to_le_bytes()
        }
    };
    let u32b = |v: u32| {
        if big_endian {
            v.to_be_bytes()
        } else {
            v.to_le_bytes()
        }
    };

    const IFD_OFFSET: u32 = 8;
    const TAG_COUNT: u16 = 3;
    // count (2) + tags (12 each) + next IFD (4)
    let entries_offset = IFD_OFFSET + 2 + u32::from(TAG_COUNT) * 12 + 4;

    let mut block = Vec::new();
    block.extend_from_slice(if big_endian { b"MM" } else { b"II" });
    block.extend_from_slice(&u16b(42));
    block.extend_from_slice(&u32b(IFD_OFFSET));

    block.extend_from_slice(&u16b(TAG_COUNT));
    // MPFVersion, UNDEFINED x4, inline
    block.extend_from_slice(&u16b(0xB000));
    block.extend_from_slice(&u16b(7));
    block.extend_from_slice(&u32b(4));
    block.extend_from_slice(b"0100");
    // NumberOfImages, LONG x1, inline
    block.extend_from_slice(&u16b(0xB001));
    block.extend_from_slice(&u16b(4));
    block.extend_from_slice(&u32b(1));
    block.extend_from_slice(&u32b(entries.len() as u32));
    // MPEntry, UNDEFINED x16n, at entries_offset
    block.extend_from_slice(&u16b(0xB002));
    block.extend_from_slice(&u16b(7));
    block.extend_from_slice(&u32b(16 * entries.len() as u32));
    block.extend_from_slice(&u32b(entries_offset));
    // next IFD
    block.extend_from_slice(&u32b(0));

    for (i, &(size, offset)) in entries.iter().enumerate() {
        // Representative image flag on the first entry
        let attribute: u32 = if i == 0 { 0x2003_0000 } else { 0x0002_0002 };
        block.extend_from_slice(&u32b(attribute));
        block.extend_from_slice(&u32b(size));
        block.extend_from_slice(&u32b(offset));
        block.extend_from_slice(&u16b(0));
        block.extend_from_slice(&u16b(0));
    }
    block
}

/// Assemble an MPO file from `frames`.
///
/// One frame gives a plain JPEG without an MPF segment. Otherwise the first
/// JPEG gets an APP2 MPF segment right after its SOI, indexing every image.
pub fn build_mpo(frames: &[RgbImage]) -> Vec<u8> {
    build_mpo_with_leading(frames, &[])
}

/// Like [`build_mpo`], with an APP1 Exif segment ahead of the MPF segment as
/// cameras write it.
pub fn build_mpo_with_exif(frames: &[RgbImage]) -> Vec<u8> {
    build_mpo_with_leading(frames, &exif_segment())
}

/// Minimal APP1 Exif segment: big-endian TIFF header and an empty IFD.
pub fn exif_segment() -> Vec<u8> {
    let mut payload = b"Exif\0\0".to_vec();
    payload.extend_from_slice(b"MM\0\x2A");
    payload.extend_from_slice(&8u32.to_be_bytes());
    payload.extend_from_slice(&0u16.to_be_bytes());
    payload.extend_from_slice(&0u32.to_be_bytes());

    let mut segment = vec![0xFF, 0xE1];
    segment.extend_from_slice(&((payload.len() + 2) as u16).to_be_bytes());
    segment.extend_from_slice(&payload);
    segment
}

/// `leading` is raw marker segments placed between SOI and the APP2 MPF.
fn build_mpo_with_leading(frames: &[RgbImage], leading: &[u8]) -> Vec<u8> {
    let jpegs: Vec<Vec<u8>> = frames.iter().map(encode_jpeg).collect();
    if jpegs.len() < 2 {
        return jpegs.into_iter().next().unwrap_or_default();
    }

    // SOI (2) + leading + APP2 marker (2) + length (2) + "MPF\0" (4)
    let tiff_start = 2 + leading.len() + 8;
    let block_len = mpf_block(true, &vec![(0, 0); jpegs.len()]).len();
    let first_size = jpegs[0].len() + leading.len() + 8 + block_len;

    let mut entries = Vec::with_capacity(jpegs.len());
    let mut start = 0usize;
    for (i, jpeg) in jpegs.iter().enumerate() {
        let size = if i == 0 { first_size } else { jpeg.len() };
        let offset = if i == 0 { 0 } else { start - tiff_start };
        entries.push((size as u32, offset as u32));
        start += size;
    }
    let block = mpf_block(true, &entries);

    let mut out = Vec::with_capacity(start);
    out.extend_from_slice(&jpegs[0][..2]);
    out.extend_from_slice(leading);
    out.extend_from_slice(&[0xFF, 0xE2]);
    out.extend_from_slice(&((2 + 4 + block.len()) as u16).to_be_bytes());
    out.extend_from_slice(b"MPF\0");
    out.extend_from_slice(&block);
    out.extend_from_slice(&jpegs[0][2..]);
    for jpeg in &jpegs[1..] {
        out.extend_from_slice(jpeg);
    }
    out
}

/// Write an MPO built from `frames` into `dir` and return its path.
pub fn write_mpo(dir: &Path, name: &str, frames: &[RgbImage]) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, build_mpo(frames)).unwrap();
    path
}

/// Write a two-view 64x48 MPO into `dir`.
pub fn write_stereo_mpo(dir: &Path, name: &str) -> PathBuf {
    write_mpo(
        dir,
        name,
        &[gradient_frame(64, 48, 0), gradient_frame(64, 48, 90)],
    )
}

// =========================================================================
// Artifact inspection
// =========================================================================

/// `(width, height, delay_cs)` for every frame of a GIF.
pub fn read_gif_frames(bytes: &[u8]) -> Vec<(u32, u32, u16)> {
    let mut options = gif::DecodeOptions::new();
    options.set_color_output(gif::ColorOutput::RGBA);
    let mut decoder = options.read_info(std::io::Cursor::new(bytes)).unwrap();

    let mut frames = Vec::new();
    while let Some(frame) = decoder.read_next_frame().unwrap() {
        frames.push((u32::from(frame.width), u32::from(frame.height), frame.delay));
    }
    frames
}

/// Loop count from the NETSCAPE2.0 extension; `Some(0)` means forever.
pub fn gif_loop_count(bytes: &[u8]) -> Option<u16> {
    const APP_ID: &[u8] = b"NETSCAPE2.0";
    let pos = bytes.windows(APP_ID.len()).position(|w| w == APP_ID)?;
    // Sub-block: size 3, id 1, then the u16 LE count
    let sub = bytes.get(pos + APP_ID.len()..pos + APP_ID.len() + 4)?;
    if sub[0] != 3 || sub[1] != 1 {
        return None;
    }
    Some(u16::from_le_bytes([sub[2], sub[3]]))
}
