//! Replacing a file with a processed copy.
//!
//! Every step that rewrites a media file writes its output next to the
//! original under a hidden temporary name and then renames it over the
//! original. On the platforms we target `fs::rename` replaces an existing
//! target atomically, so a crash leaves either the old file or the new one.
//! Only when that rename fails do we fall back to removing the target first,
//! which leaves a window in which neither file exists.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::MediafoldError;

/// File name prefix shared by all temporary files this crate writes.
///
/// Folder discovery ignores files carrying it, so leftovers from an
/// interrupted run are never mistaken for input.
pub const TEMPORARY_PREFIX: &str = ".mediafold-";

/// Path of a temporary file next to `path`.
///
/// The original file name (and therefore its extension, which `ffmpeg` and
/// the image encoder use to pick a format) is preserved:
/// `dir/clip.mp4` with tag `trim` becomes `dir/.mediafold-trim-clip.mp4`.
pub fn temporary_sibling(path: &Path, tag: &str) -> PathBuf {
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!("{TEMPORARY_PREFIX}{tag}-{file_name}"))
}

/// Returns `true` if `path` names a temporary file written by this crate.
pub fn is_temporary(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.starts_with(TEMPORARY_PREFIX))
}

/// Move `replacement` over `target`.
///
/// # Errors
///
/// Returns [`MediafoldError::Replace`] if neither the atomic rename nor the
/// delete-then-rename fallback succeeds. The replacement file is removed in
/// that case so it does not linger.
pub fn replace_file(replacement: &Path, target: &Path) -> Result<(), MediafoldError> {
    match fs::rename(replacement, target) {
        Ok(()) => return Ok(()),
        // Never delete the target for a replacement that is not there.
        Err(error) if !replacement.is_file() => {
            return Err(MediafoldError::Replace {
                path: target.to_path_buf(),
                reason: error.to_string(),
            });
        }
        Err(error) => log::warn!(
            "Atomic rename of {} over {} failed ({error}); falling back to delete-then-rename",
            replacement.display(),
            target.display()
        ),
    }

    let fallback = fs::remove_file(target).and_then(|()| fs::rename(replacement, target));
    fallback.map_err(|error| {
        let _ = fs::remove_file(replacement);
        MediafoldError::Replace {
            path: target.to_path_buf(),
            reason: error.to_string(),
        }
    })
}

/// Remove a temporary file if it exists, ignoring errors.
pub(crate) fn discard(path: &Path) {
    if path.exists() {
        if let Err(error) = fs::remove_file(path) {
            log::warn!("Could not remove temporary file {}: {error}", path.display());
        }
    }
}
