//! Non-interactive export of a whole folder.
//!
//! Every container gets its own [`PipelineSession`] with the configured
//! default parameters, and sessions run in parallel on the rayon pool. A
//! file that fails to decode or export is recorded and the batch carries on;
//! a failed video is recorded as degraded.
//!
//! Results are written to `wiggle-manifest.json` in the output directory:
//!
//! ```json
//! {
//!   "entries": [
//!     { "index": 0, "source": "in/a.mpo", "name": "a", "status": "exported",
//!       "report": { "stills": [...], "loop_artifact": "out/a.gif", "video": { "status": "written", ... } } },
//!     { "index": 1, "source": "in/b.mpo", "name": "b", "status": "failed",
//!       "stage": "decode", "error": "..." }
//!   ]
//! }
//! ```

use crate::config::{NamingConfig, WiggleConfig};
use crate::imaging::{AlignmentParams, ExportBackend, LoopFormat, Quality};
use crate::naming::{self, NamingError};
use crate::session::{ExportReport, ExportTargets, PipelineSession, SessionError};
use rayon::prelude::*;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use thiserror::Error;
use tracing::{info, warn};

/// Manifest file written to the output directory.
pub const MANIFEST_FILE: &str = "wiggle-manifest.json";

#[derive(Error, Debug)]
pub enum BatchError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Everything a batch run needs besides the file list and the backend.
#[derive(Debug, Clone)]
pub struct BatchOptions {
    pub output_dir: PathBuf,
    pub params: AlignmentParams,
    pub quality: Quality,
    pub loop_format: LoopFormat,
    /// `None` disables video export.
    pub video_extension: Option<String>,
    pub naming: NamingConfig,
}

impl BatchOptions {
    pub fn from_config(config: &WiggleConfig, output_dir: &Path) -> Self {
        Self {
            output_dir: output_dir.to_path_buf(),
            params: config.alignment,
            quality: config.output.quality(),
            loop_format: config.output.loop_format,
            video_extension: config
                .video
                .enabled
                .then(|| config.video.extension.clone()),
            naming: config.naming.clone(),
        }
    }
}

/// Result for one input file.
#[derive(Debug, Clone, Serialize)]
pub struct BatchEntry {
    /// Position in the input list.
    pub index: usize,
    pub source: PathBuf,
    /// Output base name, absent if naming itself failed.
    pub name: Option<String>,
    #[serde(flatten)]
    pub outcome: FileOutcome,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum FileOutcome {
    Exported { report: ExportReport },
    Failed { stage: String, error: String },
}

/// Progress events sent while the batch runs.
#[derive(Debug, Clone)]
pub enum BatchEvent {
    Started { total: usize },
    FileFinished { total: usize, entry: BatchEntry },
}

/// All entries, in input order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchSummary {
    pub entries: Vec<BatchEntry>,
}

impl BatchSummary {
    pub fn exported(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| matches!(e.outcome, FileOutcome::Exported { .. }))
            .count()
    }

    /// Exported, but the video failed.
    pub fn degraded(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| matches!(&e.outcome, FileOutcome::Exported { report } if report.is_degraded()))
            .count()
    }

    pub fn failed(&self) -> usize {
        self.entries.len() - self.exported()
    }
}

/// Export every file in `files` and write the manifest.
///
/// Per-file failures end up in the summary; only failing to create the
/// output directory or to write the manifest is an error.
pub fn run_batch<B: ExportBackend>(
    files: &[PathBuf],
    options: &BatchOptions,
    backend: &B,
    events: Option<Sender<BatchEvent>>,
) -> Result<BatchSummary, BatchError> {
    std::fs::create_dir_all(&options.output_dir)?;

    let total = files.len();
    info!(total, output = %options.output_dir.display(), "batch started");
    if let Some(tx) = &events {
        tx.send(BatchEvent::Started { total }).ok();
    }

    // Names are settled before any worker writes, so no two files share artifacts
    let names = naming::output_names(&options.naming, files);
    let entries: Vec<BatchEntry> = files
        .par_iter()
        .zip(&names)
        .enumerate()
        .map(|(index, (path, name))| {
            let entry = export_one(index, path, name, options, backend);
            if let Some(tx) = &events {
                tx.send(BatchEvent::FileFinished {
                    total,
                    entry: entry.clone(),
                })
                .ok();
            }
            entry
        })
        .collect();

    let summary = BatchSummary { entries };
    write_manifest(&summary, &options.output_dir)?;
    info!(
        exported = summary.exported(),
        degraded = summary.degraded(),
        failed = summary.failed(),
        "batch finished"
    );
    Ok(summary)
}

fn export_one<B: ExportBackend>(
    index: usize,
    path: &Path,
    name: &Result<String, NamingError>,
    options: &BatchOptions,
    backend: &B,
) -> BatchEntry {
    let failed = |name, stage: &str, error: String| {
        warn!(path = %path.display(), stage, %error, "batch entry failed");
        BatchEntry {
            index,
            source: path.to_path_buf(),
            name,
            outcome: FileOutcome::Failed {
                stage: stage.to_string(),
                error,
            },
        }
    };

    let name = match name {
        Ok(name) => name.clone(),
        Err(e) => return failed(None, "naming", e.to_string()),
    };

    let mut session = PipelineSession::new(backend)
        .with_defaults(options.params)
        .with_quality(options.quality);
    let targets = ExportTargets::for_basename(
        &options.output_dir,
        &name,
        options.loop_format,
        options.video_extension.as_deref(),
    );

    let stage_of = |e: &SessionError| e.stage().map_or_else(|| "session".to_string(), |s| s.to_string());

    if let Err(e) = session.load(path) {
        return failed(Some(name), &stage_of(&e), e.to_string());
    }
    match session.export(&targets) {
        Ok(report) => BatchEntry {
            index,
            source: path.to_path_buf(),
            name: Some(name),
            outcome: FileOutcome::Exported { report },
        },
        Err(e) => failed(Some(name), &stage_of(&e), e.to_string()),
    }
}

/// Write the summary as pretty JSON to [`MANIFEST_FILE`] in `dir`.
pub fn write_manifest(summary: &BatchSummary, dir: &Path) -> Result<PathBuf, BatchError> {
    let path = dir.join(MANIFEST_FILE);
    let json = serde_json::to_string_pretty(summary)?;
    std::fs::write(&path, json)?;
    Ok(path)
}
