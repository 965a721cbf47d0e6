//! CLI output formatting.
//!
//! Every user-facing line goes through a pure `format_*` function that returns
//! `Vec<String>`, so the output can be tested without capturing stdout. The
//! `print_*` wrappers write those lines to stdout. Diagnostics go through
//! `tracing` to stderr instead.
//!
//! # Output Format
//!
//! ## Scan
//!
//! ```text
//! Found 3 containers in photos/
//! 001 DSCF0001.MPO
//! 002 DSCF0002.MPO
//! 003 nested/DSCF0003.MPO
//! ```
//!
//! ## Edit
//!
//! ```text
//! 001/003 DSCF0001.MPO → 3DS_0001_20240101_120000
//!     Source: MPO, 2 frames, 3584x1344
//!     overlap=0 crop=(l0 t0 r0 b0) duration=175ms → 3584x1344
//! ```
//!
//! ## Export
//!
//! ```text
//! Exported 3DS_0001_20240101_120000 (3564x1344)
//!     Still: out/3DS_0001_20240101_120000_left.jpg
//!     Still: out/3DS_0001_20240101_120000_right.jpg
//!     Loop: out/3DS_0001_20240101_120000.gif
//!     Video: failed (Video codec unavailable: ...)
//! ```
//!
//! ## Batch
//!
//! ```text
//! Exporting 3 containers
//! [1/3] 001 a.mpo → a
//! [2/3] 003 c.mpo: decode failed
//!     Error: Container holds 1 frame(s), at least 2 are required
//! Batch: 2 exported (1 without video), 1 failed
//! ```

use crate::batch::{BatchEntry, BatchEvent, BatchSummary, FileOutcome};
use crate::imaging::{AlignmentParams, ContainerKind};
use crate::session::{ExportReport, VideoOutcome};
use std::path::Path;

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// Path relative to `root` when possible, for shorter lines.
fn display_path(path: &Path, root: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .display()
        .to_string()
}

fn plural(n: usize, word: &str) -> String {
    if n == 1 {
        format!("{n} {word}")
    } else {
        format!("{n} {word}s")
    }
}

// ============================================================================
// Scan
// ============================================================================

pub fn format_scan_output(files: &[impl AsRef<Path>], root: &Path) -> Vec<String> {
    let mut lines = vec![format!(
        "Found {} in {}",
        plural(files.len(), "container"),
        root.display()
    )];
    for (i, file) in files.iter().enumerate() {
        lines.push(format!(
            "{} {}",
            format_index(i + 1),
            display_path(file.as_ref(), root)
        ));
    }
    lines
}

pub fn print_scan_output(files: &[impl AsRef<Path>], root: &Path) {
    for line in format_scan_output(files, root) {
        println!("{}", line);
    }
}

// ============================================================================
// Edit
// ============================================================================

/// Header shown when the editor opens a file.
pub fn format_edit_header(
    position: usize,
    total: usize,
    path: &Path,
    root: &Path,
    name: &str,
) -> Vec<String> {
    vec![format!(
        "{}/{} {} → {}",
        format_index(position),
        format_index(total),
        display_path(path, root),
        name
    )]
}

/// What was decoded from a container.
pub fn format_source(kind: ContainerKind, frame_count: usize, dimensions: (u32, u32)) -> Vec<String> {
    vec![format!(
        "{}Source: {}, {}, {}x{}",
        indent(1),
        kind,
        plural(frame_count, "frame"),
        dimensions.0,
        dimensions.1
    )]
}

/// Current parameters and the size of the pair they produce.
pub fn format_status(params: &AlignmentParams, output: (u32, u32)) -> Vec<String> {
    vec![format!(
        "{}{} → {}x{}",
        indent(1),
        params,
        output.0,
        output.1
    )]
}

pub fn format_command_help() -> Vec<String> {
    [
        "Commands:",
        "    o<n>         overlap in pixels (o-4, o12)",
        "    f<n>         frame duration in ms (f175)",
        "    c <side><n>  crop one edge: l, t, r, b (c l10)",
        "    e            export and go to the next file",
        "    s            skip to the next file",
        "    s<n>         skip ahead n files (s3)",
        "    x            reset every parameter to the defaults",
        "    p            print the current parameters",
        "    q, exit      quit",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

// ============================================================================
// Export
// ============================================================================

pub fn format_export_report(name: &str, report: &ExportReport) -> Vec<String> {
    let (w, h) = report.dimensions;
    let mut lines = vec![format!("Exported {} ({}x{})", name, w, h)];
    for still in &report.stills {
        lines.push(format!("{}Still: {}", indent(1), still.display()));
    }
    lines.push(format!(
        "{}Loop: {}",
        indent(1),
        report.loop_artifact.display()
    ));
    lines.push(format!("{}Video: {}", indent(1), video_status(&report.video)));
    lines
}

pub fn print_export_report(name: &str, report: &ExportReport) {
    for line in format_export_report(name, report) {
        println!("{}", line);
    }
}

fn video_status(outcome: &VideoOutcome) -> String {
    match outcome {
        VideoOutcome::Written(path) => path.display().to_string(),
        VideoOutcome::Skipped => "disabled".to_string(),
        VideoOutcome::Failed(reason) => format!("failed ({})", reason),
    }
}

// ============================================================================
// Batch
// ============================================================================

pub fn format_batch_event(event: &BatchEvent, root: &Path) -> Vec<String> {
    match event {
        BatchEvent::Started { total } => {
            vec![format!("Exporting {}", plural(*total, "container"))]
        }
        BatchEvent::FileFinished { total, entry } => format_batch_entry(entry, *total, root),
    }
}

/// One finished file, prefixed with its position in the input list.
fn format_batch_entry(entry: &BatchEntry, total: usize, root: &Path) -> Vec<String> {
    let source = display_path(&entry.source, root);
    let prefix = format!(
        "[{}/{}] {} {}",
        entry.index + 1,
        total,
        format_index(entry.index + 1),
        source
    );
    match &entry.outcome {
        FileOutcome::Exported { report } => {
            let mut lines = vec![format!(
                "{} → {}",
                prefix,
                entry.name.as_deref().unwrap_or("?")
            )];
            if let VideoOutcome::Failed(reason) = &report.video {
                lines.push(format!("{}Video failed: {}", indent(1), reason));
            }
            lines
        }
        FileOutcome::Failed { stage, error } => vec![
            format!("{}: {} failed", prefix, stage),
            format!("{}Error: {}", indent(1), error),
        ],
    }
}

pub fn format_batch_summary(summary: &BatchSummary) -> Vec<String> {
    let degraded = summary.degraded();
    let exported = if degraded > 0 {
        format!("{} exported ({} without video)", summary.exported(), degraded)
    } else {
        format!("{} exported", summary.exported())
    };
    vec![format!("Batch: {}, {} failed", exported, summary.failed())]
}
