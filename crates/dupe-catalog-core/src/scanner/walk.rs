use crate::media::MediaClass;
use glob::Pattern;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{error, warn};
use walkdir::WalkDir;

/// A file under the watched root with a recognized media extension.
#[derive(Debug, Clone)]
pub struct MediaFile {
    pub path: PathBuf,
    /// Normalized form used as the catalog key.
    pub key: String,
    pub media_class: MediaClass,
}

/// Compiled glob ignore patterns. Invalid globs are logged and dropped.
#[derive(Debug, Clone, Default)]
pub struct WalkFilter {
    ignore_patterns: Vec<Pattern>,
}

impl WalkFilter {
    pub fn new(ignore_globs: &[String]) -> Self {
        let ignore_patterns = ignore_globs
            .iter()
            .filter_map(|glob| match Pattern::new(glob) {
                Ok(p) => Some(p),
                Err(e) => {
                    error!("Invalid glob pattern '{}': {}", glob, e);
                    None
                }
            })
            .collect();
        Self { ignore_patterns }
    }

    pub fn is_ignored(&self, path: &Path) -> bool {
        self.ignore_patterns
            .iter()
            .any(|pattern| pattern.matches_path(path))
    }
}

/// Absolute form of the watched root. Fails when it is not a directory.
pub fn resolve_root(root: &Path) -> io::Result<PathBuf> {
    let absolute = std::path::absolute(root)?;
    if !absolute.is_dir() {
        return Err(io::Error::new(
            io::ErrorKind::NotFound,
            format!("watched root {} is not a directory", absolute.display()),
        ));
    }
    Ok(absolute)
}

/// Catalog key for a path: the platform's native separators, lossily
/// converted to UTF-8.
pub fn normalize_path(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

/// A part of the tree the walk could not read. `path` is the unreadable
/// entry, or `None` when walkdir could not say which one.
#[derive(Debug, Clone)]
pub struct WalkFailure {
    pub path: Option<PathBuf>,
    pub message: String,
}

/// Lazily walk `root` recursively, yielding media files and the places
/// that could not be read. Symlinks are not followed.
pub fn media_files<'a>(
    root: &Path,
    filter: &'a WalkFilter,
) -> impl Iterator<Item = Result<MediaFile, WalkFailure>> + 'a {
    WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_entry(move |entry| !filter.is_ignored(entry.path()))
        .filter_map(|entry| match entry {
            Ok(entry) => {
                if !entry.file_type().is_file() {
                    return None;
                }
                let media_class = MediaClass::from_path(entry.path())?;
                let path = entry.into_path();
                Some(Ok(MediaFile {
                    key: normalize_path(&path),
                    path,
                    media_class,
                }))
            }
            Err(err) => {
                warn!("Skipping unreadable entry: {}", err);
                Some(Err(WalkFailure {
                    path: err.path().map(Path::to_path_buf),
                    message: err.to_string(),
                }))
            }
        })
}

/// First pass of a run: how many media files the second pass will see.
pub fn count_media_files(root: &Path, filter: &WalkFilter) -> usize {
    media_files(root, filter).filter(Result::is_ok).count()
}
