//! Configuration module.
//!
//! Handles loading, validating, and merging `mpo-wiggle.toml`. Stock defaults
//! are overridden by whatever the user file specifies; the file is sparse and
//! only needs the values that differ.
//!
//! ## Config File Location
//!
//! `mpo-wiggle.toml` in the working directory, or any file passed with
//! `--config`. Without either, stock defaults apply.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [alignment]
//! overlap = 0               # Starting horizontal disparity for every file
//! crop_left = 0             # Pixels removed from each edge of both views
//! crop_top = 0
//! crop_right = 0
//! crop_bottom = 0
//! frame_duration_ms = 175   # How long each view is shown
//!
//! [limits]
//! overlap = 100             # Controller accepts -overlap..=overlap
//! crop = 200                # Controller accepts 0..=crop per edge
//! duration_min_ms = 50
//! duration_max_ms = 1000
//!
//! [output]
//! loop_format = "gif"       # "gif" or "apng"
//! jpeg_quality = 90         # Still frames (1-100)
//!
//! [video]
//! enabled = true
//! ffmpeg = "ffmpeg"         # Binary name or path
//! extension = "mp4"
//! cycles = 1                # Left/right repetitions in the video
//!
//! [naming]
//! scheme = "stem"           # "stem" or "sequence"
//! prefix = "3DS"            # sequence: <prefix>_<NNNN>_<YYYYmmdd_HHMMSS>
//! start = 1
//!
//! [scan]
//! extensions = ["mpo"]
//!
//! [processing]
//! max_processes = 4         # Batch workers (omit for auto = CPU cores)
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::imaging::{AlignmentParams, LoopFormat, Quality, VideoOptions};
use crate::naming::NamingScheme;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Config file looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "mpo-wiggle.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Tool configuration loaded from `mpo-wiggle.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WiggleConfig {
    /// Parameters every file starts from.
    pub alignment: AlignmentParams,
    /// Ranges the interactive controller accepts.
    pub limits: LimitsConfig,
    /// Still and loop artifact settings.
    pub output: OutputConfig,
    /// Video artifact settings.
    pub video: VideoConfig,
    /// Output base names.
    pub naming: NamingConfig,
    /// Input discovery.
    pub scan: ScanConfig,
    /// Batch parallelism.
    pub processing: ProcessingConfig,
}

impl WiggleConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: &str| Err(ConfigError::Validation(msg.into()));

        if !(1..=100).contains(&self.output.jpeg_quality) {
            return invalid("output.jpeg_quality must be 1-100");
        }
        if self.alignment.frame_duration_ms == 0 {
            return invalid("alignment.frame_duration_ms must be positive");
        }
        if self.limits.duration_min_ms == 0 || self.limits.duration_min_ms > self.limits.duration_max_ms
        {
            return invalid("limits.duration_min_ms must be positive and not above duration_max_ms");
        }
        if self.alignment.overlap.unsigned_abs() > self.limits.overlap {
            return invalid("alignment.overlap is outside limits.overlap");
        }
        let (l, t, r, b) = self.alignment.crop();
        if [l, t, r, b].iter().any(|&edge| edge > self.limits.crop) {
            return invalid("alignment crop edges must not exceed limits.crop");
        }
        if self.video.cycles == 0 {
            return invalid("video.cycles must be at least 1");
        }
        if self.video.extension.trim().is_empty() {
            return invalid("video.extension must not be empty");
        }
        if self.scan.extensions.is_empty() {
            return invalid("scan.extensions must not be empty");
        }
        Ok(())
    }
}

/// Caller-side parameter ranges for the interactive controller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LimitsConfig {
    /// Largest accepted absolute overlap.
    pub overlap: u32,
    /// Largest accepted crop per edge.
    pub crop: u32,
    pub duration_min_ms: u32,
    pub duration_max_ms: u32,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            overlap: 100,
            crop: 200,
            duration_min_ms: 50,
            duration_max_ms: 1000,
        }
    }
}

/// Still and loop artifact settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    pub loop_format: LoopFormat,
    /// JPEG quality for `<name>_left.jpg` / `<name>_right.jpg`.
    pub jpeg_quality: u32,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            loop_format: LoopFormat::Gif,
            jpeg_quality: 90,
        }
    }
}

impl OutputConfig {
    pub fn quality(&self) -> Quality {
        Quality::new(self.jpeg_quality)
    }
}

/// Video artifact settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct VideoConfig {
    /// Write `<name>.<extension>` next to the loop artifact.
    pub enabled: bool,
    /// ffmpeg binary name or path.
    pub ffmpeg: String,
    pub extension: String,
    /// How many left/right repetitions the video holds.
    pub cycles: u32,
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ffmpeg: "ffmpeg".to_string(),
            extension: "mp4".to_string(),
            cycles: 1,
        }
    }
}

impl VideoConfig {
    pub fn options(&self) -> VideoOptions {
        VideoOptions {
            ffmpeg: PathBuf::from(&self.ffmpeg),
            cycles: self.cycles,
        }
    }
}

/// Output base name settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NamingConfig {
    pub scheme: NamingScheme,
    /// Prefix for the `sequence` scheme.
    pub prefix: String,
    /// First counter value for the `sequence` scheme.
    pub start: u32,
}

impl Default for NamingConfig {
    fn default() -> Self {
        Self {
            scheme: NamingScheme::Stem,
            prefix: "3DS".to_string(),
            start: 1,
        }
    }
}

/// Input discovery settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScanConfig {
    /// File extensions treated as containers, matched case-insensitively.
    pub extensions: Vec<String>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            extensions: vec!["mpo".to_string()],
        }
    }
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel batch workers.
    /// When absent, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_processes: Option<usize>,
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config
        .max_processes
        .map(|n| n.clamp(1, cores))
        .unwrap_or(cores)
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the base layer user overrides are merged onto.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(WiggleConfig::default()).expect("default config must serialize")
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Read a config file as a raw TOML value; `Ok(None)` if it does not exist.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto the stock defaults, then deserialize and validate.
pub fn resolve_config(overlay: Option<toml::Value>) -> Result<WiggleConfig, ConfigError> {
    let base = stock_defaults_value();
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: WiggleConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from a file, falling back to stock defaults when it is absent.
pub fn load_config(path: &Path) -> Result<WiggleConfig, ConfigError> {
    resolve_config(load_raw_config(path)?)
}

/// Returns a fully-commented stock config file.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# mpo-wiggle configuration
# ========================
# Every key is optional. Remove what you don't change.

[alignment]
# Starting parameters for every file. The controller edits these per file.
overlap = 0               # Left view shifts by -overlap, right by +overlap (pixels)
crop_left = 0             # Pixels removed from each edge of both views
crop_top = 0
crop_right = 0
crop_bottom = 0
frame_duration_ms = 175   # How long each view is shown

[limits]
# Ranges the interactive controller accepts.
overlap = 100
crop = 200
duration_min_ms = 50
duration_max_ms = 1000

[output]
loop_format = "gif"       # "gif" (delay rounded to 10ms) or "apng" (exact delay)
jpeg_quality = 90         # Still frames, 1-100

[video]
enabled = true            # Needs ffmpeg; failures are reported, never fatal
ffmpeg = "ffmpeg"
extension = "mp4"
cycles = 1                # Left/right repetitions in the video

[naming]
scheme = "stem"           # "stem": input file name; "sequence": <prefix>_<NNNN>_<timestamp>
prefix = "3DS"
start = 1

[scan]
extensions = ["mpo"]

[processing]
# max_processes = 4       # Batch workers; omit for one per CPU core
"##
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_config_values() {
        let config = WiggleConfig::default();
        assert_eq!(config.alignment, AlignmentParams::default());
        assert_eq!(config.limits.overlap, 100);
        assert_eq!(config.limits.crop, 200);
        assert_eq!(config.output.loop_format, LoopFormat::Gif);
        assert_eq!(config.output.quality().value(), 90);
        assert!(config.video.enabled);
        assert_eq!(config.naming.scheme, NamingScheme::Stem);
        assert_eq!(config.scan.extensions, vec!["mpo"]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn parse_partial_config() {
        let toml = r#"
[alignment]
overlap = 12

[output]
loop_format = "apng"
"#;
        let config: WiggleConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.alignment.overlap, 12);
        // Default values preserved
        assert_eq!(config.alignment.frame_duration_ms, 175);
        assert_eq!(config.output.loop_format, LoopFormat::Apng);
        assert_eq!(config.output.jpeg_quality, 90);
    }

    #[test]
    fn video_config_builds_options() {
        let video = VideoConfig {
            ffmpeg: "/opt/ffmpeg/bin/ffmpeg".into(),
            cycles: 3,
            ..VideoConfig::default()
        };
        let opts = video.options();
        assert_eq!(opts.ffmpeg, PathBuf::from("/opt/ffmpeg/bin/ffmpeg"));
        assert_eq!(opts.cycles, 3);
    }

    // =========================================================================
    // Validation
    // =========================================================================

    #[test]
    fn validate_rejects_bad_quality() {
        let mut config = WiggleConfig::default();
        config.output.jpeg_quality = 0;
        assert!(config.validate().is_err());
        config.output.jpeg_quality = 101;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_duration() {
        let mut config = WiggleConfig::default();
        config.alignment.frame_duration_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_inverted_duration_limits() {
        let mut config = WiggleConfig::default();
        config.limits.duration_min_ms = 500;
        config.limits.duration_max_ms = 100;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_defaults_outside_limits() {
        let mut config = WiggleConfig::default();
        config.alignment.overlap = -150;
        assert!(config.validate().is_err());

        let mut config = WiggleConfig::default();
        config.alignment.crop_bottom = 201;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_empty_extensions() {
        let mut config = WiggleConfig::default();
        config.scan.extensions.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_cycles() {
        let mut config = WiggleConfig::default();
        config.video.cycles = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn effective_threads_caps_at_cores() {
        let cores = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        let config = ProcessingConfig {
            max_processes: Some(cores + 64),
        };
        assert_eq!(effective_threads(&config), cores);
        assert_eq!(effective_threads(&ProcessingConfig::default()), cores);
        assert_eq!(
            effective_threads(&ProcessingConfig {
                max_processes: Some(1)
            }),
            1
        );
    }

    // =========================================================================
    // merge_toml
    // =========================================================================

    #[test]
    fn merge_toml_scalar_override() {
        let base: toml::Value = toml::from_str(r#"quality = 90"#).unwrap();
        let overlay: toml::Value = toml::from_str(r#"quality = 70"#).unwrap();
        let merged = merge_toml(base, overlay);
        assert_eq!(merged.get("quality").unwrap().as_integer(), Some(70));
    }

    #[test]
    fn merge_toml_preserves_sibling_keys() {
        let base: toml::Value = toml::from_str(
            r#"
[alignment]
overlap = 0
frame_duration_ms = 175
"#,
        )
        .unwrap();
        let overlay: toml::Value = toml::from_str(
            r#"
[alignment]
overlap = 8
"#,
        )
        .unwrap();
        let merged = merge_toml(base, overlay);
        let alignment = merged.get("alignment").unwrap();
        assert_eq!(alignment.get("overlap").unwrap().as_integer(), Some(8));
        assert_eq!(
            alignment.get("frame_duration_ms").unwrap().as_integer(),
            Some(175)
        );
    }

    // =========================================================================
    // Unknown key rejection
    // =========================================================================

    #[test]
    fn unknown_key_rejected() {
        let toml_str = r#"
[alignment]
overlapp = 3
"#;
        let result: Result<WiggleConfig, _> = toml::from_str(toml_str);
        let err = result.unwrap_err().to_string();
        assert!(err.contains("unknown field"));
    }

    #[test]
    fn unknown_section_rejected() {
        let result: Result<WiggleConfig, _> = toml::from_str("[vidoe]\nenabled = false\n");
        assert!(result.is_err());
    }

    #[test]
    fn unknown_loop_format_rejected() {
        let result: Result<WiggleConfig, _> =
            toml::from_str("[output]\nloop_format = \"webp\"\n");
        assert!(result.is_err());
    }

    // =========================================================================
    // Loading
    // =========================================================================

    #[test]
    fn load_missing_file_gives_defaults() {
        let tmp = TempDir::new().unwrap();
        let config = load_config(&tmp.path().join(DEFAULT_CONFIG_FILE)).unwrap();
        assert_eq!(config, WiggleConfig::default());
    }

    #[test]
    fn load_merges_user_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(DEFAULT_CONFIG_FILE);
        fs::write(
            &path,
            r#"
[alignment]
frame_duration_ms = 250

[naming]
scheme = "sequence"
"#,
        )
        .unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.alignment.frame_duration_ms, 250);
        assert_eq!(config.naming.scheme, NamingScheme::Sequence);
        assert_eq!(config.naming.prefix, "3DS");
    }

    #[test]
    fn load_runs_validation() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(DEFAULT_CONFIG_FILE);
        fs::write(&path, "[output]\njpeg_quality = 0\n").unwrap();
        assert!(matches!(
            load_config(&path),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn load_reports_bad_toml() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(DEFAULT_CONFIG_FILE);
        fs::write(&path, "[alignment\n").unwrap();
        assert!(matches!(load_config(&path), Err(ConfigError::Toml(_))));
    }

    #[test]
    fn stock_config_parses_to_defaults() {
        let config: WiggleConfig = toml::from_str(stock_config_toml()).unwrap();
        assert_eq!(config, WiggleConfig::default());
    }
}
