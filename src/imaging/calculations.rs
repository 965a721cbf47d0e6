//! Pure calculation functions for frame geometry and timing.
//!
//! All functions here are pure and testable without any I/O or images.

/// Calculate the output size left after removing crop edges from a frame.
///
/// # Arguments
/// * `source` - Source frame dimensions (width, height)
/// * `crop` - Pixels removed from each edge as (left, top, right, bottom)
///
/// # Returns
/// * `Some((width, height))` when both are strictly positive, `None` otherwise
///
/// # Examples
/// ```
/// # use mpo_wiggle::imaging::calculate_cropped_dimensions;
/// assert_eq!(calculate_cropped_dimensions((400, 300), (10, 0, 10, 50)), Some((380, 250)));
/// assert_eq!(calculate_cropped_dimensions((400, 300), (200, 0, 200, 0)), None);
/// ```
pub fn calculate_cropped_dimensions(
    source: (u32, u32),
    crop: (u32, u32, u32, u32),
) -> Option<(u32, u32)> {
    let (w, h) = source;
    let (left, top, right, bottom) = crop;

    // i64 so huge crop values can't wrap around
    let width = i64::from(w) - i64::from(left) - i64::from(right);
    let height = i64::from(h) - i64::from(top) - i64::from(bottom);

    if width <= 0 || height <= 0 {
        return None;
    }
    Some((width as u32, height as u32))
}

/// The part of one output row that maps onto real source pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowSpan {
    /// First output column that receives source data.
    pub dst_start: u32,
    /// First source column copied.
    pub src_start: u32,
    /// Number of columns copied.
    pub len: u32,
}

/// Map an output row of `out_width` columns, starting at source column
/// `origin` (may be negative or past the edge), onto a source row of
/// `src_width` columns.
///
/// Returns `None` when the window lies entirely outside the source.
pub fn calculate_row_span(origin: i64, out_width: u32, src_width: u32) -> Option<RowSpan> {
    let start = origin.max(0);
    let end = (origin + i64::from(out_width)).min(i64::from(src_width));
    if start >= end {
        return None;
    }
    Some(RowSpan {
        dst_start: (start - origin) as u32,
        src_start: start as u32,
        len: (end - start) as u32,
    })
}

/// Derive a video frame rate from a per-frame display duration.
///
/// `round(1000 / duration_ms)`, never below 1 fps so durations over two
/// seconds still produce a playable stream. Returns `None` for zero.
pub fn calculate_video_fps(duration_ms: u32) -> Option<u32> {
    if duration_ms == 0 {
        return None;
    }
    let fps = (1000.0 / f64::from(duration_ms)).round() as u32;
    Some(fps.max(1))
}

/// GIF frame delay in centiseconds, rounded to nearest (min 1).
pub fn calculate_gif_delay(duration_ms: u32) -> u16 {
    let centis = (u64::from(duration_ms) + 5) / 10;
    centis.clamp(1, u64::from(u16::MAX)) as u16
}

/// APNG frame delay as a `(numerator, denominator)` fraction of a second.
///
/// Exact for durations that fit in a `u16` of milliseconds; longer durations
/// fall back to centisecond, then whole-second precision.
pub fn calculate_apng_delay(duration_ms: u32) -> (u16, u16) {
    if let Ok(ms) = u16::try_from(duration_ms) {
        return (ms, 1000);
    }
    let ms = u64::from(duration_ms);
    if let Ok(cs) = u16::try_from((ms + 5) / 10) {
        return (cs, 100);
    }
    let secs = ((ms + 500) / 1000).min(u64::from(u16::MAX));
    (secs as u16, 1)
}
