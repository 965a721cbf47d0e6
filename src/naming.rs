//! Output base names for exported files.
//!
//! Every export writes `<name>_left.jpg`, `<name>_right.jpg`, the loop
//! artifact and the video under one base name. Two schemes:
//!
//! - `stem`: the container's file stem (`DSCF0042.MPO` → `DSCF0042`)
//! - `sequence`: `<prefix>_<NNNN>_<YYYYmmdd_HHMMSS>`, numbered by position in
//!   the scanned list and stamped with the file's modification time in local
//!   time (`3DS_0001_20240101_120000`)
//!
//! The sequence counter advances for every scanned file, skipped or not, so a
//! file keeps its number regardless of what happened to its neighbours.
//!
//! Stem names can repeat in a recursive scan: a 3DS card restarts at
//! `HNI_0001.MPO` in every `1xxNIN03` folder. [`output_names`] keeps the
//! first one and prefixes later ones with their folder
//! (`101NIN03_HNI_0001`), so no two files write the same artifacts.

use crate::config::NamingConfig;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum NamingError {
    #[error("Cannot read modification time of {path}: {source}")]
    Mtime {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("No file name in {0}")]
    NoStem(PathBuf),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NamingScheme {
    #[default]
    Stem,
    Sequence,
}

/// Base name for the file at `index` (0-based) in the scanned list.
pub fn output_name(config: &NamingConfig, index: usize, path: &Path) -> Result<String, NamingError> {
    match config.scheme {
        NamingScheme::Stem => stem_name(path),
        NamingScheme::Sequence => {
            let counter = config.start as usize + index;
            Ok(sequence_name(&config.prefix, counter, modified_time(path)?))
        }
    }
}

/// Base names for every file in `files`, in order, with no two equal.
///
/// Names compare case-insensitively, as on FAT camera cards. A repeated
/// name gets its parent folder prepended, then a `_2`, `_3`... suffix if
/// that is taken too.
pub fn output_names(
    config: &NamingConfig,
    files: &[PathBuf],
) -> Vec<Result<String, NamingError>> {
    let mut names: Vec<_> = files
        .iter()
        .enumerate()
        .map(|(index, path)| output_name(config, index, path))
        .collect();

    let mut taken: HashSet<String> = names.iter().flatten().map(|n| n.to_lowercase()).collect();
    let mut seen = HashSet::new();
    for (name, path) in names.iter_mut().zip(files) {
        let Ok(name) = name else {
            continue;
        };
        if seen.insert(name.to_lowercase()) {
            continue;
        }
        let unique = disambiguate(name, path, &taken);
        taken.insert(unique.to_lowercase());
        seen.insert(unique.to_lowercase());
        *name = unique;
    }
    names
}

fn disambiguate(name: &str, path: &Path, taken: &HashSet<String>) -> String {
    let base = match path.parent().and_then(Path::file_name) {
        Some(folder) => format!("{}_{}", folder.to_string_lossy(), name),
        None => name.to_string(),
    };
    if !taken.contains(&base.to_lowercase()) {
        return base;
    }
    let mut n = 2;
    loop {
        let candidate = format!("{base}_{n}");
        if !taken.contains(&candidate.to_lowercase()) {
            return candidate;
        }
        n += 1;
    }
}

/// The file stem, extension removed.
pub fn stem_name(path: &Path) -> Result<String, NamingError> {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| NamingError::NoStem(path.to_path_buf()))
}

/// `<prefix>_<NNNN>_<YYYYmmdd_HHMMSS>`; the counter widens past 9999.
pub fn sequence_name(prefix: &str, counter: usize, time: DateTime<Local>) -> String {
    format!("{}_{:04}_{}", prefix, counter, time.format("%Y%m%d_%H%M%S"))
}

fn modified_time(path: &Path) -> Result<DateTime<Local>, NamingError> {
    let mtime = std::fs::metadata(path)
        .and_then(|m| m.modified())
        .map_err(|source| NamingError::Mtime {
            path: path.to_path_buf(),
            source,
        })?;
    Ok(DateTime::<Local>::from(mtime))
}
