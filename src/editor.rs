//! Interactive, line-driven editing of a list of containers.
//!
//! For each file: load it, show its parameters, then read [`command`] lines
//! until the user exports, skips or quits. Parameter commands are checked
//! against [`Limits`] before reaching the session, and a rejected command
//! changes nothing. When a preview path is set, the loop artifact of the
//! current pair is rewritten there after every load and every successful
//! edit so an external viewer can show it.
//!
//! A failed export keeps the file open with its edits, so it can be retried.
//!
//! Input and output are generic so the loop runs on stdin/stdout in the
//! binary and on in-memory buffers in tests.
//!
//! [`command`]: crate::command

use crate::command::{CommandError, ControlCommand, Limits, parse_command};
use crate::config::{NamingConfig, WiggleConfig};
use crate::imaging::{ExportBackend, LoopFormat, ParamUpdate};
use crate::naming::{self, NamingError};
use crate::output;
use crate::session::{ExportTargets, PipelineSession};
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use tracing::warn;

/// Settings for an editing run.
#[derive(Debug, Clone)]
pub struct EditorOptions {
    /// Folder the files were scanned from, for shorter display paths.
    pub root: PathBuf,
    pub output_dir: PathBuf,
    pub loop_format: LoopFormat,
    /// `None` disables video export.
    pub video_extension: Option<String>,
    pub naming: NamingConfig,
    pub limits: Limits,
    /// Refreshed after every change when set.
    pub preview: Option<PathBuf>,
}

impl EditorOptions {
    pub fn from_config(config: &WiggleConfig, root: &Path, output_dir: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
            output_dir: output_dir.to_path_buf(),
            loop_format: config.output.loop_format,
            video_extension: config
                .video
                .enabled
                .then(|| config.video.extension.clone()),
            naming: config.naming.clone(),
            limits: Limits::from(&config.limits),
            preview: None,
        }
    }
}

/// Counts for a finished run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EditorSummary {
    pub exported: usize,
    pub skipped: usize,
    /// Files that could not be named, loaded or exported.
    pub failed: usize,
    /// The user quit, or input ended, before every file was handled.
    pub quit: bool,
}

enum FileResult {
    Exported,
    Skipped,
    /// Leave this file and the next `n - 1`.
    SkipAhead(usize),
    Failed,
    Quit,
}

/// Edit `files` in order, reading commands from `input`.
///
/// Only I/O errors on `input`/`out` are returned; everything else is printed
/// and editing moves on.
pub fn run_editor<B: ExportBackend, R: BufRead, W: Write>(
    files: &[PathBuf],
    options: &EditorOptions,
    session: &mut PipelineSession<B>,
    mut input: R,
    mut out: W,
) -> io::Result<EditorSummary> {
    let mut summary = EditorSummary::default();
    let names = naming::output_names(&options.naming, files);

    let mut index = 0;
    while index < files.len() {
        let file = FileSlot {
            index,
            total: files.len(),
            path: &files[index],
            name: &names[index],
        };
        match edit_file(&file, options, session, &mut input, &mut out)? {
            FileResult::Exported => summary.exported += 1,
            FileResult::Skipped => summary.skipped += 1,
            FileResult::SkipAhead(n) => {
                summary.skipped += n;
                index += n;
                continue;
            }
            FileResult::Failed => summary.failed += 1,
            FileResult::Quit => {
                summary.quit = true;
                break;
            }
        }
        index += 1;
    }
    Ok(summary)
}

/// One file and its place in the list.
struct FileSlot<'a> {
    index: usize,
    total: usize,
    path: &'a Path,
    name: &'a Result<String, NamingError>,
}

impl FileSlot<'_> {
    /// Files after this one.
    fn remaining(&self) -> usize {
        self.total - self.index - 1
    }
}

fn edit_file<B: ExportBackend, R: BufRead, W: Write>(
    file: &FileSlot<'_>,
    options: &EditorOptions,
    session: &mut PipelineSession<B>,
    input: &mut R,
    out: &mut W,
) -> io::Result<FileResult> {
    let name = match file.name {
        Ok(name) => name.as_str(),
        Err(e) => {
            writeln!(out, "{e}")?;
            return Ok(FileResult::Failed);
        }
    };
    write_lines(
        out,
        output::format_edit_header(file.index + 1, file.total, file.path, &options.root, name),
    )?;

    if let Err(e) = session.load(file.path) {
        writeln!(out, "    Cannot edit: {e}")?;
        return Ok(FileResult::Failed);
    }
    if let (Some(kind), Some(frames), Some(dims)) = (
        session.source_kind(),
        session.source_frame_count(),
        session.source_dimensions(),
    ) {
        write_lines(out, output::format_source(kind, frames, dims))?;
    }
    print_status(session, out)?;
    refresh_preview(session, options);

    let targets = ExportTargets::for_basename(
        &options.output_dir,
        name,
        options.loop_format,
        options.video_extension.as_deref(),
    );

    let mut line = String::new();
    loop {
        write!(out, "> ")?;
        out.flush()?;
        line.clear();
        if input.read_line(&mut line)? == 0 {
            return Ok(FileResult::Quit);
        }

        let command = match parse_command(&line) {
            Ok(command) => command,
            Err(CommandError::Empty) => continue,
            Err(e) => {
                writeln!(out, "{e}")?;
                continue;
            }
        };

        match command {
            // Stays on the file on failure so the edits can be exported again
            ControlCommand::Export => match session.export(&targets) {
                Ok(report) => {
                    write_lines(out, output::format_export_report(name, &report))?;
                    return Ok(FileResult::Exported);
                }
                Err(e) => writeln!(out, "Export failed: {e}")?,
            },
            ControlCommand::Skip => {
                skip(session, out)?;
                writeln!(out, "Skipped {name}")?;
                return Ok(FileResult::Skipped);
            }
            ControlCommand::SkipAhead(n) => {
                let n = n as usize;
                let remaining = file.remaining();
                if n > remaining {
                    writeln!(out, "Cannot skip {n} files: only {remaining} remain")?;
                    continue;
                }
                skip(session, out)?;
                writeln!(out, "Skipping ahead {n} files")?;
                return Ok(FileResult::SkipAhead(n));
            }
            ControlCommand::Quit => return Ok(FileResult::Quit),
            ControlCommand::Status => print_status(session, out)?,
            ControlCommand::Reset => {
                let update = ParamUpdate::from_params(&session.defaults());
                apply_update(session, &update, options, out)?;
            }
            edit => {
                if let Err(e) = options.limits.check(&edit) {
                    writeln!(out, "{e}")?;
                    continue;
                }
                if let Some(update) = edit.param_update() {
                    apply_update(session, &update, options, out)?;
                }
            }
        }
    }
}

fn apply_update<B: ExportBackend, W: Write>(
    session: &mut PipelineSession<B>,
    update: &ParamUpdate,
    options: &EditorOptions,
    out: &mut W,
) -> io::Result<()> {
    match session.set_params(update) {
        Ok(_) => {
            print_status(session, out)?;
            refresh_preview(session, options);
        }
        Err(e) => writeln!(out, "{e}")?,
    }
    Ok(())
}

/// Mark the loaded file as skipped; a failure here is only printed.
fn skip<B: ExportBackend, W: Write>(
    session: &mut PipelineSession<B>,
    out: &mut W,
) -> io::Result<()> {
    if let Err(e) = session.skip() {
        writeln!(out, "{e}")?;
    }
    Ok(())
}

fn print_status<B: ExportBackend, W: Write>(
    session: &PipelineSession<B>,
    out: &mut W,
) -> io::Result<()> {
    if let Some(pair) = session.current_pair() {
        write_lines(out, output::format_status(&session.params(), pair.dimensions()))?;
    }
    Ok(())
}

/// Preview failures are not worth interrupting the edit for.
fn refresh_preview<B: ExportBackend>(session: &PipelineSession<B>, options: &EditorOptions) {
    let Some(preview) = &options.preview else {
        return;
    };
    if let Err(e) = session.write_preview(preview, options.loop_format) {
        warn!(path = %preview.display(), error = %e, "preview not updated");
    }
}

fn write_lines<W: Write>(out: &mut W, lines: Vec<String>) -> io::Result<()> {
    for line in lines {
        writeln!(out, "{line}")?;
    }
    Ok(())
}
