//! Resizing folder images in place.

use std::path::Path;

use image::{ImageFormat, ImageReader, imageops::FilterType};

use crate::error::MediafoldError;
use crate::replace;

/// Resize the image at `path` to exactly `width` x `height` and overwrite it.
///
/// The aspect ratio is not preserved. The resized image is written to a
/// temporary sibling in the original format and then moved over the
/// original. Returns the image's dimensions before resizing.
///
/// # Errors
///
/// - [`MediafoldError::ImageDecode`] if the file cannot be read as an image.
/// - [`MediafoldError::ImageError`] if encoding fails.
/// - [`MediafoldError::Replace`] if the original cannot be overwritten.
pub fn resize_exact<P: AsRef<Path>>(
    path: P,
    width: u32,
    height: u32,
) -> Result<(u32, u32), MediafoldError> {
    let path = path.as_ref();
    let decode_error = |reason: String| MediafoldError::ImageDecode {
        path: path.to_path_buf(),
        reason,
    };

    let reader = ImageReader::open(path)
        .map_err(|error| decode_error(error.to_string()))?
        .with_guessed_format()
        .map_err(|error| decode_error(error.to_string()))?;
    let format = reader.format().unwrap_or(ImageFormat::Png);
    let image = reader
        .decode()
        .map_err(|error| decode_error(error.to_string()))?;

    let original = (image.width(), image.height());
    if original == (width, height) {
        log::debug!("{} is already {width}x{height}", path.display());
        return Ok(original);
    }

    let resized = image.resize_exact(width, height, FilterType::Triangle);

    let temporary = replace::temporary_sibling(path, "resize");
    if let Err(error) = resized.save_with_format(&temporary, format) {
        replace::discard(&temporary);
        return Err(error.into());
    }
    replace::replace_file(&temporary, path)?;

    log::debug!(
        "Resized {} from {}x{} to {width}x{height}",
        path.display(),
        original.0,
        original.1
    );
    Ok(original)
}
