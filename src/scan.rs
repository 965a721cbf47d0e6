//! Input discovery.
//!
//! Lists the dual-view containers in a folder, sorted by path so that runs
//! are reproducible and the `sequence` naming scheme numbers files the same
//! way every time.
//!
//! Extensions are matched case-insensitively (`.MPO` straight off a camera
//! card matches `mpo`). Hidden files are ignored. Only the folder itself is
//! listed unless `recursive` is set.

use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),
    #[error("Walk error: {0}")]
    Walk(#[from] walkdir::Error),
}

/// Find every container under `root` whose extension is in `extensions`.
pub fn scan(root: &Path, extensions: &[String], recursive: bool) -> Result<Vec<PathBuf>, ScanError> {
    if !root.is_dir() {
        return Err(ScanError::NotADirectory(root.to_path_buf()));
    }

    let walker = WalkDir::new(root)
        .min_depth(1)
        .max_depth(if recursive { usize::MAX } else { 1 })
        .into_iter()
        // Don't descend into hidden directories
        .filter_entry(|e| !is_hidden(e.file_name()));

    let mut found = Vec::new();
    for entry in walker {
        let entry = entry?;
        if entry.file_type().is_file() && has_extension(entry.path(), extensions) {
            found.push(entry.into_path());
        }
    }

    found.sort();
    Ok(found)
}

fn is_hidden(name: &std::ffi::OsStr) -> bool {
    name.to_string_lossy().starts_with('.')
}

fn has_extension(path: &Path, extensions: &[String]) -> bool {
    let Some(ext) = path.extension() else {
        return false;
    };
    let ext = ext.to_string_lossy();
    extensions
        .iter()
        .any(|wanted| wanted.trim_start_matches('.').eq_ignore_ascii_case(&ext))
}
