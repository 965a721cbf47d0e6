//! Two-frame looping animations.
//!
//! | Format | Crate | Delay precision |
//! |---|---|---|
//! | GIF | `gif` (NeuQuant palette per frame) | centiseconds, rounded to nearest |
//! | APNG | `png` (`acTL`/`fcTL` chunks) | exact milliseconds |
//!
//! Both loop forever: GIF through a NETSCAPE2.0 extension with repeat count
//! 0, APNG with `num_plays = 0`.

use super::align::FramePair;
use super::backend::EncodeError;
use super::calculations::{calculate_apng_delay, calculate_gif_delay};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// NeuQuant sampling speed: 1 is best quality, 30 is fastest.
const GIF_QUANTIZE_SPEED: i32 = 10;

/// Container for the loop artifact.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoopFormat {
    #[default]
    Gif,
    Apng,
}

impl LoopFormat {
    pub fn extension(self) -> &'static str {
        match self {
            LoopFormat::Gif => "gif",
            LoopFormat::Apng => "png",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            LoopFormat::Gif => "GIF",
            LoopFormat::Apng => "APNG",
        }
    }
}

impl std::str::FromStr for LoopFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "gif" => Ok(LoopFormat::Gif),
            "apng" | "png" => Ok(LoopFormat::Apng),
            other => Err(format!("unknown loop format '{other}' (expected gif or apng)")),
        }
    }
}

/// Write the loop animation to `path`, creating or truncating the file.
pub fn encode_loop(
    pair: &FramePair,
    duration_ms: u32,
    path: &Path,
    format: LoopFormat,
) -> Result<(), EncodeError> {
    if duration_ms == 0 {
        return Err(EncodeError::InvalidDuration(duration_ms));
    }
    let mut writer = BufWriter::new(File::create(path)?);
    encode_loop_to_writer(pair, duration_ms, format, &mut writer)?;
    writer.flush()?;
    Ok(())
}

/// Encode the loop animation into any writer (left frame first).
pub fn encode_loop_to_writer<W: Write>(
    pair: &FramePair,
    duration_ms: u32,
    format: LoopFormat,
    writer: W,
) -> Result<(), EncodeError> {
    if duration_ms == 0 {
        return Err(EncodeError::InvalidDuration(duration_ms));
    }
    match format {
        LoopFormat::Gif => write_gif(pair, duration_ms, writer),
        LoopFormat::Apng => write_apng(pair, duration_ms, writer),
    }
}

fn write_gif<W: Write>(pair: &FramePair, duration_ms: u32, writer: W) -> Result<(), EncodeError> {
    let codec = |e: gif::EncodingError| EncodeError::Codec {
        format: LoopFormat::Gif.name(),
        message: e.to_string(),
    };
    let too_large = || EncodeError::FrameTooLarge {
        width: pair.width(),
        height: pair.height(),
        format: LoopFormat::Gif.name(),
    };
    let width = u16::try_from(pair.width()).map_err(|_| too_large())?;
    let height = u16::try_from(pair.height()).map_err(|_| too_large())?;

    let mut encoder = gif::Encoder::new(writer, width, height, &[]).map_err(codec)?;
    encoder.set_repeat(gif::Repeat::Infinite).map_err(codec)?;

    let delay = calculate_gif_delay(duration_ms);
    for view in pair.frames() {
        let mut frame = gif::Frame::from_rgb_speed(width, height, view.as_raw(), GIF_QUANTIZE_SPEED);
        frame.delay = delay;
        encoder.write_frame(&frame).map_err(codec)?;
    }

    // Writes the trailer
    encoder.into_inner()?;
    Ok(())
}

fn write_apng<W: Write>(pair: &FramePair, duration_ms: u32, writer: W) -> Result<(), EncodeError> {
    let codec = |e: png::EncodingError| EncodeError::Codec {
        format: LoopFormat::Apng.name(),
        message: e.to_string(),
    };

    let mut encoder = png::Encoder::new(writer, pair.width(), pair.height());
    encoder.set_color(png::ColorType::Rgb);
    encoder.set_depth(png::BitDepth::Eight);
    encoder.set_animated(2, 0).map_err(codec)?;
    let (num, den) = calculate_apng_delay(duration_ms);
    encoder.set_frame_delay(num, den).map_err(codec)?;

    let mut png_writer = encoder.write_header().map_err(codec)?;
    for view in pair.frames() {
        png_writer.write_image_data(view.as_raw()).map_err(codec)?;
    }
    png_writer.finish().map_err(codec)?;
    Ok(())
}
