//! Finding the manifests a `--path` argument refers to.
//!
//! ```text
//! mods/                     # --path mods        -> every */info.json
//! ├── qol-lite/info.json
//! └── qol-plus/info.json    # --path mods/qol-plus -> that info.json
//! ```

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur while discovering manifests.
#[derive(Error, Debug)]
pub enum DiscoverError {
    #[error("path not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("expected {expected}, got {}", .path.display())]
    WrongFileName { path: PathBuf, expected: String },

    #[error("no {manifest_file} found in {} or its subdirectories", .dir.display())]
    NoManifests { dir: PathBuf, manifest_file: String },

    #[error("invalid glob pattern: {0}")]
    Pattern(#[from] glob::PatternError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Resolve `path` to the manifest files it names.
///
/// A file must be called `manifest_file`. A directory holding
/// `manifest_file` yields just that file; any other directory yields the
/// manifests of its immediate subdirectories, sorted by path.
pub fn discover_manifests(path: &Path, manifest_file: &str) -> Result<Vec<PathBuf>, DiscoverError> {
    if path.is_file() {
        if path.file_name().and_then(|n| n.to_str()) != Some(manifest_file) {
            return Err(DiscoverError::WrongFileName {
                path: path.to_path_buf(),
                expected: manifest_file.to_string(),
            });
        }
        return Ok(vec![path.to_path_buf()]);
    }

    if !path.is_dir() {
        return Err(DiscoverError::NotFound(path.to_path_buf()));
    }

    let direct = path.join(manifest_file);
    if direct.is_file() {
        return Ok(vec![direct]);
    }

    let pattern = Path::new(&glob::Pattern::escape(&path.to_string_lossy()))
        .join("*")
        .join(glob::Pattern::escape(manifest_file));

    let mut manifests = Vec::new();
    for entry in glob::glob(&pattern.to_string_lossy())? {
        let found = entry.map_err(glob::GlobError::into_error)?;
        if found.is_file() {
            manifests.push(found);
        }
    }
    manifests.sort();

    if manifests.is_empty() {
        return Err(DiscoverError::NoManifests {
            dir: path.to_path_buf(),
            manifest_file: manifest_file.to_string(),
        });
    }
    Ok(manifests)
}
