//! Finding the folders to process and the media inside them.
//!
//! Every directory below the root, at any depth, is one unit of work. Only
//! the files directly inside a directory belong to it; files in nested
//! directories belong to those directories' own units.

use std::fs;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::error::MediafoldError;
use crate::replace;

/// Extensions recognised as videos (compared case-insensitively).
pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mov"];

/// Extensions recognised as folder images (compared case-insensitively).
pub const IMAGE_EXTENSIONS: &[&str] = &["png"];

/// One directory to process, with its matching media files.
///
/// Both lists are sorted by file name so runs are reproducible.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderEntry {
    /// The directory itself.
    pub path: PathBuf,
    /// Videos directly inside the directory.
    pub videos: Vec<PathBuf>,
    /// PNG images directly inside the directory.
    pub images: Vec<PathBuf>,
}

impl FolderEntry {
    /// List the media files directly inside `directory`.
    ///
    /// # Errors
    ///
    /// Returns [`MediafoldError::IoError`] if the directory cannot be read.
    pub fn scan<P: AsRef<Path>>(directory: P) -> Result<Self, MediafoldError> {
        let directory = directory.as_ref();
        let mut videos = Vec::new();
        let mut images = Vec::new();

        for entry in fs::read_dir(directory)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let path = entry.path();
            if replace::is_temporary(&path) {
                continue;
            }
            if is_video(&path) {
                videos.push(path);
            } else if is_image(&path) {
                images.push(path);
            }
        }

        videos.sort();
        images.sort();

        Ok(Self {
            path: directory.to_path_buf(),
            videos,
            images,
        })
    }

    /// Returns `true` if the folder has neither videos nor images.
    pub fn is_empty(&self) -> bool {
        self.videos.is_empty() && self.images.is_empty()
    }
}

/// Every directory below `root`, sorted by path, excluding `root` itself.
///
/// Entries that cannot be read are logged and skipped.
///
/// # Errors
///
/// Returns [`MediafoldError::InvalidRoot`] if `root` is not a directory,
/// or [`MediafoldError::IoError`] if it cannot be listed.
pub fn discover<P: AsRef<Path>>(root: P) -> Result<Vec<PathBuf>, MediafoldError> {
    let root = root.as_ref();
    if !root.is_dir() {
        return Err(MediafoldError::InvalidRoot(root.to_path_buf()));
    }
    // Surface an unreadable root as an error instead of an empty run.
    fs::read_dir(root)?;

    let mut directories: Vec<PathBuf> = WalkDir::new(root)
        .min_depth(1)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(error) => {
                log::warn!("Skipping unreadable entry under {}: {error}", root.display());
                None
            }
        })
        .filter(|entry| entry.file_type().is_dir())
        .map(walkdir::DirEntry::into_path)
        .collect();

    directories.sort();
    Ok(directories)
}

/// Returns `true` if `path` has a video extension.
pub fn is_video(path: &Path) -> bool {
    has_extension(path, VIDEO_EXTENSIONS)
}

/// Returns `true` if `path` has an image extension.
pub fn is_image(path: &Path) -> bool {
    has_extension(path, IMAGE_EXTENSIONS)
}

fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .and_then(|extension| extension.to_str())
        .is_some_and(|extension| {
            extensions
                .iter()
                .any(|candidate| extension.eq_ignore_ascii_case(candidate))
        })
}
