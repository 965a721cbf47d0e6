//! Stateful editing session over one container at a time.
//!
//! A [`PipelineSession`] decodes a container once, then recomputes the
//! aligned pair from the original frames on every parameter edit, so crops
//! never compound and the container is never re-read.
//!
//! ```text
//! Empty ──load──▶ Previewing ──export──▶ Exported
//!                  ▲    │  ▲                │
//!                  │    │  └──set_params────┘
//!                  │    └──skip──▶ Skipped
//!                  └──load (next file)
//! ```
//!
//! Every operation either succeeds completely or leaves the session as it
//! was. The one exception to "errors are returned" is the video artifact:
//! export reports a failed video in its [`ExportReport`] instead of failing,
//! because the stills and loop artifact are already on disk by then.

use crate::imaging::{
    AlignError, AlignmentParams, BackendError, ContainerKind, DecodeError, EncodeError,
    ExportBackend, FramePair, LoopFormat, NativeBackend, ParamUpdate, Quality, align_and_crop,
    decode, encode_loop,
};
use image::RgbImage;
use serde::Serialize;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

/// Where a session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    Empty,
    Previewing,
    Exported,
    Skipped,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SessionState::Empty => "empty",
            SessionState::Previewing => "previewing",
            SessionState::Exported => "exported",
            SessionState::Skipped => "skipped",
        };
        f.write_str(s)
    }
}

/// Pipeline stage an error came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Decode,
    Align,
    Crop,
    Encode,
    Write,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Stage::Decode => "decode",
            Stage::Align => "align",
            Stage::Crop => "crop",
            Stage::Encode => "encode",
            Stage::Write => "write",
        };
        f.write_str(s)
    }
}

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("No container loaded")]
    NotLoaded,
    #[error("decode of {path} failed: {source}")]
    Decode {
        path: PathBuf,
        params: AlignmentParams,
        source: DecodeError,
    },
    #[error("{stage} failed with {params}: {source}")]
    Align {
        stage: Stage,
        params: AlignmentParams,
        source: AlignError,
    },
    #[error("write of {path} failed with {params}: {source}")]
    Still {
        path: PathBuf,
        params: AlignmentParams,
        source: BackendError,
    },
    #[error("encode of {path} failed with {params}: {source}")]
    Encode {
        path: PathBuf,
        params: AlignmentParams,
        source: EncodeError,
    },
    #[error("cannot create {path}: {source}")]
    Io {
        path: PathBuf,
        params: AlignmentParams,
        source: std::io::Error,
    },
}

impl SessionError {
    /// Stage that failed; `None` for [`SessionError::NotLoaded`].
    pub fn stage(&self) -> Option<Stage> {
        match self {
            SessionError::NotLoaded => None,
            SessionError::Decode { .. } => Some(Stage::Decode),
            SessionError::Align { stage, .. } => Some(*stage),
            SessionError::Encode { .. } => Some(Stage::Encode),
            SessionError::Still { .. } | SessionError::Io { .. } => Some(Stage::Write),
        }
    }

    /// Parameters in effect when the error happened.
    pub fn params(&self) -> Option<&AlignmentParams> {
        match self {
            SessionError::NotLoaded => None,
            SessionError::Decode { params, .. }
            | SessionError::Align { params, .. }
            | SessionError::Still { params, .. }
            | SessionError::Encode { params, .. }
            | SessionError::Io { params, .. } => Some(params),
        }
    }
}

fn align_error(params: AlignmentParams, source: AlignError) -> SessionError {
    let stage = match source {
        AlignError::InvalidCrop { .. } => Stage::Crop,
        AlignError::DimensionMismatch { .. } => Stage::Align,
    };
    SessionError::Align {
        stage,
        params,
        source,
    }
}

/// Destination paths for one export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportTargets {
    pub left_still: PathBuf,
    pub right_still: PathBuf,
    pub loop_artifact: PathBuf,
    pub loop_format: LoopFormat,
    /// `None` disables the video artifact.
    pub video: Option<PathBuf>,
}

impl ExportTargets {
    /// `<dir>/<name>_left.jpg`, `<dir>/<name>_right.jpg`, `<dir>/<name>.<loop ext>`
    /// and, when `video_ext` is given, `<dir>/<name>.<video ext>`.
    pub fn for_basename(
        dir: &Path,
        name: &str,
        loop_format: LoopFormat,
        video_ext: Option<&str>,
    ) -> Self {
        Self {
            left_still: dir.join(format!("{name}_left.jpg")),
            right_still: dir.join(format!("{name}_right.jpg")),
            loop_artifact: dir.join(format!("{name}.{}", loop_format.extension())),
            loop_format,
            video: video_ext.map(|ext| dir.join(format!("{name}.{}", ext.trim_start_matches('.')))),
        }
    }

    fn paths(&self) -> impl Iterator<Item = &Path> {
        [&self.left_still, &self.right_still, &self.loop_artifact]
            .into_iter()
            .chain(self.video.as_ref())
            .map(PathBuf::as_path)
    }
}

/// What happened to the video artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "detail", rename_all = "lowercase")]
pub enum VideoOutcome {
    Written(PathBuf),
    /// No video target was requested.
    Skipped,
    Failed(String),
}

/// Per-artifact outcome of a successful export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportReport {
    pub stills: [PathBuf; 2],
    pub loop_artifact: PathBuf,
    pub video: VideoOutcome,
    pub params: AlignmentParams,
    pub dimensions: (u32, u32),
}

impl ExportReport {
    /// True when the video was requested but could not be written.
    pub fn is_degraded(&self) -> bool {
        matches!(self.video, VideoOutcome::Failed(_))
    }
}

/// The decoded source plus the pair computed for the current parameters.
struct Loaded {
    path: PathBuf,
    kind: ContainerKind,
    frame_count: usize,
    left: RgbImage,
    right: RgbImage,
    params: AlignmentParams,
    pair: FramePair,
}

/// Decode once, edit many times, export.
pub struct PipelineSession<B: ExportBackend = NativeBackend> {
    backend: B,
    defaults: AlignmentParams,
    quality: Quality,
    state: SessionState,
    loaded: Option<Loaded>,
}

impl PipelineSession<NativeBackend> {
    /// Session writing real files with default settings.
    pub fn native() -> Self {
        Self::new(NativeBackend::default())
    }
}

impl<B: ExportBackend> PipelineSession<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            defaults: AlignmentParams::default(),
            quality: Quality::default(),
            state: SessionState::Empty,
            loaded: None,
        }
    }

    /// Parameters every `load` resets to.
    pub fn with_defaults(mut self, defaults: AlignmentParams) -> Self {
        self.defaults = defaults;
        self
    }

    /// JPEG quality for the still exports.
    pub fn with_quality(mut self, quality: Quality) -> Self {
        self.quality = quality;
        self
    }

    /// Parameters every `load` starts from.
    pub fn defaults(&self) -> AlignmentParams {
        self.defaults
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Current parameters, or the load defaults when nothing is loaded.
    pub fn params(&self) -> AlignmentParams {
        self.loaded.as_ref().map_or(self.defaults, |l| l.params)
    }

    pub fn source_path(&self) -> Option<&Path> {
        self.loaded.as_ref().map(|l| l.path.as_path())
    }

    /// Dimensions of the decoded views, before alignment.
    pub fn source_dimensions(&self) -> Option<(u32, u32)> {
        self.loaded.as_ref().map(|l| l.left.dimensions())
    }

    pub fn source_kind(&self) -> Option<ContainerKind> {
        self.loaded.as_ref().map(|l| l.kind)
    }

    /// Frames present in the container, including ones beyond the first two.
    pub fn source_frame_count(&self) -> Option<usize> {
        self.loaded.as_ref().map(|l| l.frame_count)
    }

    /// Latest successfully computed pair.
    pub fn current_pair(&self) -> Option<&FramePair> {
        self.loaded.as_ref().map(|l| &l.pair)
    }

    /// Decode `path`, reset the parameters to the defaults and compute the
    /// first pair. A failure leaves the previous source in place.
    #[instrument(skip_all, fields(path = %path.display()))]
    pub fn load(&mut self, path: &Path) -> Result<&FramePair, SessionError> {
        let params = self.defaults;
        let container = decode(path).map_err(|source| SessionError::Decode {
            path: path.to_path_buf(),
            params,
            source,
        })?;
        let kind = container.kind();
        let frame_count = container.frame_count();
        let (left, right) = container.into_frames();
        let pair = align_and_crop(&left, &right, &params).map_err(|e| align_error(params, e))?;

        info!(
            kind = %kind,
            frames = frame_count,
            width = left.width(),
            height = left.height(),
            "loaded"
        );
        self.state = SessionState::Previewing;
        let loaded = self.loaded.insert(Loaded {
            path: path.to_path_buf(),
            kind,
            frame_count,
            left,
            right,
            params,
            pair,
        });
        Ok(&loaded.pair)
    }

    /// Merge `update` onto the current parameters and recompute from the
    /// decoded frames. A failure changes nothing.
    pub fn set_params(&mut self, update: &ParamUpdate) -> Result<&FramePair, SessionError> {
        let loaded = self.loaded.as_mut().ok_or(SessionError::NotLoaded)?;
        let params = loaded.params.merged(update);
        let pair = align_and_crop(&loaded.left, &loaded.right, &params)
            .map_err(|e| align_error(params, e))?;

        debug!(%params, width = pair.width(), height = pair.height(), "recomputed pair");
        loaded.params = params;
        loaded.pair = pair;
        self.state = SessionState::Previewing;
        Ok(&loaded.pair)
    }

    /// Write both stills, the loop artifact and, if targeted, the video.
    ///
    /// Stills and loop failures are returned as errors. A video failure is
    /// logged and reported in [`ExportReport::video`].
    #[instrument(skip_all, fields(name = %targets.loop_artifact.display()))]
    pub fn export(&mut self, targets: &ExportTargets) -> Result<ExportReport, SessionError> {
        let loaded = self.loaded.as_ref().ok_or(SessionError::NotLoaded)?;
        let params = loaded.params;
        let pair = &loaded.pair;

        for dir in targets.paths().filter_map(Path::parent) {
            if dir.as_os_str().is_empty() {
                continue;
            }
            fs::create_dir_all(dir).map_err(|source| SessionError::Io {
                path: dir.to_path_buf(),
                params,
                source,
            })?;
        }

        for (view, path) in [
            (pair.left(), &targets.left_still),
            (pair.right(), &targets.right_still),
        ] {
            self.backend
                .write_still(view, path, self.quality)
                .map_err(|source| SessionError::Still {
                    path: path.clone(),
                    params,
                    source,
                })?;
        }

        self.backend
            .encode_loop(
                pair,
                params.frame_duration_ms,
                &targets.loop_artifact,
                targets.loop_format,
            )
            .map_err(|source| SessionError::Encode {
                path: targets.loop_artifact.clone(),
                params,
                source,
            })?;

        let video = match &targets.video {
            None => VideoOutcome::Skipped,
            Some(path) => match self.backend.encode_video(pair, params.frame_duration_ms, path) {
                Ok(()) => VideoOutcome::Written(path.clone()),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "video export failed");
                    VideoOutcome::Failed(e.to_string())
                }
            },
        };

        let report = ExportReport {
            stills: [targets.left_still.clone(), targets.right_still.clone()],
            loop_artifact: targets.loop_artifact.clone(),
            video,
            params,
            dimensions: pair.dimensions(),
        };
        info!(%params, degraded = report.is_degraded(), "exported");
        self.state = SessionState::Exported;
        Ok(report)
    }

    /// Move on without writing anything.
    pub fn skip(&mut self) -> Result<(), SessionError> {
        let loaded = self.loaded.as_ref().ok_or(SessionError::NotLoaded)?;
        info!(path = %loaded.path.display(), "skipped");
        self.state = SessionState::Skipped;
        Ok(())
    }

    /// Encode the current pair as a loop animation at `path` for an external
    /// viewer. Does not change the session state.
    pub fn write_preview(&self, path: &Path, format: LoopFormat) -> Result<(), SessionError> {
        let loaded = self.loaded.as_ref().ok_or(SessionError::NotLoaded)?;
        encode_loop(&loaded.pair, loaded.params.frame_duration_ms, path, format).map_err(
            |source| SessionError::Encode {
                path: path.to_path_buf(),
                params: loaded.params,
                source,
            },
        )
    }
}
