//! Minimal Multi-Picture Format (MPF) index parser for MPO files.
//!
//! An MPO file is a sequence of complete JPEG images laid end to end. The
//! first JPEG carries an APP2 segment starting with `"MPF\0"`, followed by a
//! TIFF-structured block whose first IFD (the MP Index IFD) lists every image:
//!
//! - `0xB000` MPFVersion (`"0100"`)
//! - `0xB001` NumberOfImages
//! - `0xB002` MPEntry: `16 * NumberOfImages` bytes, one entry per image
//!
//! Each MP entry is `attribute (4) | size (4) | offset (4) | dep1 (2) | dep2 (2)`.
//! Offsets are relative to the start of the TIFF header inside the APP2
//! segment; the first image always has offset 0 and starts the file.
//!
//! Zero external dependencies: the JPEG payloads are handed to the `image`
//! crate by [`decoder`](super::decoder).

use std::ops::Range;
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum MpfError {
    #[error("MPF header truncated")]
    Truncated,
    #[error("MPF header has unknown byte order")]
    ByteOrder,
    #[error("MPF header has bad TIFF magic {0}")]
    Magic(u16),
    #[error("MP index has no image entries")]
    NoEntries,
    #[error("MP entry {index} points outside the file ({start}..{end} of {len} bytes)")]
    EntryOutOfBounds {
        index: usize,
        start: usize,
        end: usize,
        len: usize,
    },
}

const APP2: u8 = 0xE2;
const SOS: u8 = 0xDA;
const MPF_IDENTIFIER: &[u8] = b"MPF\0";
const TAG_NUMBER_OF_IMAGES: u16 = 0xB001;
const TAG_MP_ENTRY: u16 = 0xB002;
const MP_ENTRY_SIZE: usize = 16;

/// One image listed in the MP index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MpEntry {
    pub attribute: u32,
    pub size: u32,
    pub offset: u32,
}

/// Byte ranges of every image in an MPO/JPEG file, in index order.
///
/// A JPEG without an MPF segment is a single image spanning the whole buffer.
pub fn locate_images(data: &[u8]) -> Result<Vec<Range<usize>>, MpfError> {
    let Some((tiff_start, tiff)) = find_mpf_segment(data) else {
        return Ok(vec![0..data.len()]);
    };

    let entries = parse_mp_index(tiff)?;
    entries
        .iter()
        .enumerate()
        .map(|(index, entry)| {
            let start = if entry.offset == 0 {
                0
            } else {
                tiff_start + entry.offset as usize
            };
            let end = start + entry.size as usize;
            if entry.size == 0 || end > data.len() {
                return Err(MpfError::EntryOutOfBounds {
                    index,
                    start,
                    end,
                    len: data.len(),
                });
            }
            Ok(start..end)
        })
        .collect()
}

// ---------------------------------------------------------------------------
// JPEG: locate the APP2 / MPF segment
// ---------------------------------------------------------------------------

/// Find the MPF block inside the first JPEG's APP2 segment.
///
/// Returns the absolute offset of the TIFF header and the bytes from there to
/// the end of the segment.
fn find_mpf_segment(data: &[u8]) -> Option<(usize, &[u8])> {
    if data.len() < 4 || data[0] != 0xFF || data[1] != 0xD8 {
        return None;
    }

    let mut pos = 2;
    while pos + 4 <= data.len() {
        if data[pos] != 0xFF {
            return None;
        }
        let marker = data[pos + 1];
        // Fill bytes
        if marker == 0xFF {
            pos += 1;
            continue;
        }
        // Entropy-coded data begins; metadata segments are all before it
        if marker == SOS {
            return None;
        }
        if (0xD0..=0xD7).contains(&marker) || marker == 0x01 {
            pos += 2;
            continue;
        }

        let seg_len = u16::from_be_bytes([data[pos + 2], data[pos + 3]]) as usize;
        let seg_start = pos + 4;
        let seg_end = (pos + 2 + seg_len).min(data.len());
        if seg_len < 2 || seg_start > seg_end {
            return None;
        }

        if marker == APP2 && data[seg_start..seg_end].starts_with(MPF_IDENTIFIER) {
            let tiff_start = seg_start + MPF_IDENTIFIER.len();
            return Some((tiff_start, &data[tiff_start..seg_end]));
        }

        pos += 2 + seg_len;
    }
    None
}

// ---------------------------------------------------------------------------
// TIFF: the MP Index IFD
// ---------------------------------------------------------------------------

/// Parse the MP Index IFD at the start of an MPF block.
fn parse_mp_index(tiff: &[u8]) -> Result<Vec<MpEntry>, MpfError> {
    if tiff.len() < 8 {
        return Err(MpfError::Truncated);
    }

    let big_endian = match &tiff[0..2] {
        b"MM" => true,
        b"II" => false,
        _ => return Err(MpfError::ByteOrder),
    };

    let read_u16 = |offset: usize| -> Result<u16, MpfError> {
        let bytes: [u8; 2] = tiff
            .get(offset..offset + 2)
            .and_then(|b| b.try_into().ok())
            .ok_or(MpfError::Truncated)?;
        Ok(if big_endian {
            u16::from_be_bytes(bytes)
        } else {
            u16::from_le_bytes(bytes)
        })
    };

    let read_u32 = |offset: usize| -> Result<u32, MpfError> {
        let bytes: [u8; 4] = tiff
            .get(offset..offset + 4)
            .and_then(|b| b.try_into().ok())
            .ok_or(MpfError::Truncated)?;
        Ok(if big_endian {
            u32::from_be_bytes(bytes)
        } else {
            u32::from_le_bytes(bytes)
        })
    };

    let magic = read_u16(2)?;
    if magic != 42 {
        return Err(MpfError::Magic(magic));
    }

    let ifd_offset = read_u32(4)? as usize;
    let entry_count = read_u16(ifd_offset)? as usize;
    let entries_start = ifd_offset + 2;

    let mut image_count = None;
    let mut mp_entry = None;

    for i in 0..entry_count {
        let entry_offset = entries_start + i * 12;
        let tag = read_u16(entry_offset)?;
        let count = read_u32(entry_offset + 4)? as usize;

        match tag {
            // LONG, stored inline
            TAG_NUMBER_OF_IMAGES => image_count = Some(read_u32(entry_offset + 8)? as usize),
            // UNDEFINED, count is in bytes; always > 4 so stored at an offset
            TAG_MP_ENTRY => {
                let value_offset = read_u32(entry_offset + 8)? as usize;
                mp_entry = Some((value_offset, count));
            }
            _ => {}
        }
    }

    let Some((value_offset, byte_len)) = mp_entry else {
        return Err(MpfError::NoEntries);
    };
    let listed = byte_len / MP_ENTRY_SIZE;
    let n = image_count.map_or(listed, |c| c.min(listed));
    if n == 0 {
        return Err(MpfError::NoEntries);
    }

    (0..n)
        .map(|i| {
            let base = value_offset + i * MP_ENTRY_SIZE;
            Ok(MpEntry {
                attribute: read_u32(base)?,
                size: read_u32(base + 4)?,
                offset: read_u32(base + 8)?,
            })
        })
        .collect()
}
