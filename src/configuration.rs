//! Job configuration.
//!
//! [`JobConfig`] carries the two inputs a user supplies (the root folder and
//! the trim duration) plus optional knobs with sensible defaults: codecs,
//! target image size, which files in a folder are processed, and where the
//! `ffmpeg` executable lives.
//!
//! # Example
//!
//! ```no_run
//! use mediafold::{JobConfig, SelectionPolicy, parse_trim_duration};
//!
//! let trim = parse_trim_duration("5.96")?;
//! let config = JobConfig::new("companies", trim)
//!     .with_selection(SelectionPolicy::FirstOnly)
//!     .with_image_size(1920, 1080);
//! # Ok::<(), mediafold::MediafoldError>(())
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::MediafoldError;
use crate::tool;

/// Trim duration used when the user does not supply one, in seconds.
pub const DEFAULT_TRIM_SECONDS: f64 = 5.96;

/// Default target resolution for folder images.
pub const DEFAULT_IMAGE_SIZE: (u32, u32) = (1920, 1080);

/// Which of the matching files in a folder are processed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SelectionPolicy {
    /// Process every video and every PNG. Frame thumbnails are prefixed with
    /// the video's file stem so several videos can share a folder.
    #[default]
    Every,
    /// Process only the first video and the first PNG (by file name).
    /// Thumbnails are written as `first_frame.jpg` / `last_frame.jpg`.
    FirstOnly,
}

impl SelectionPolicy {
    /// Restrict `items` according to the policy.
    pub fn select<'a, T>(&self, items: &'a [T]) -> &'a [T] {
        match self {
            SelectionPolicy::Every => items,
            SelectionPolicy::FirstOnly => &items[..items.len().min(1)],
        }
    }

    /// File name for the first or last frame thumbnail of `video`.
    pub fn frame_file_name(&self, video: &Path, which: FramePosition) -> String {
        let suffix = match which {
            FramePosition::First => "first_frame.jpg",
            FramePosition::Last => "last_frame.jpg",
        };
        match self {
            SelectionPolicy::FirstOnly => suffix.to_string(),
            SelectionPolicy::Every => {
                let stem = video
                    .file_stem()
                    .map(|stem| stem.to_string_lossy().into_owned())
                    .unwrap_or_else(|| "video".to_string());
                format!("{stem}_{suffix}")
            }
        }
    }
}

/// First or last frame of a video.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FramePosition {
    /// Frame index 0.
    First,
    /// Frame index `frame_count - 1`.
    Last,
}

/// Configuration for one processing run.
///
/// Built with [`JobConfig::new`] and the `with_*` methods, then handed to
/// [`Pipeline::new`](crate::Pipeline::new) or
/// [`Supervisor::start`](crate::Supervisor::start), which validate it before
/// any file is touched.
#[derive(Debug, Clone)]
pub struct JobConfig {
    pub(crate) root_folder: PathBuf,
    pub(crate) trim_duration: Duration,
    pub(crate) ffmpeg_path: Option<PathBuf>,
    pub(crate) selection: SelectionPolicy,
    pub(crate) transcode: bool,
    pub(crate) video_codec: String,
    pub(crate) audio_codec: String,
    pub(crate) image_size: (u32, u32),
}

impl JobConfig {
    /// Create a configuration with default codecs (`libx264` / `aac`),
    /// a 1920x1080 image size, transcoding enabled, and
    /// [`SelectionPolicy::Every`].
    pub fn new<P: AsRef<Path>>(root_folder: P, trim_duration: Duration) -> Self {
        Self {
            root_folder: root_folder.as_ref().to_path_buf(),
            trim_duration,
            ffmpeg_path: None,
            selection: SelectionPolicy::default(),
            transcode: true,
            video_codec: "libx264".to_string(),
            audio_codec: "aac".to_string(),
            image_size: DEFAULT_IMAGE_SIZE,
        }
    }

    /// Use a specific `ffmpeg` executable instead of searching for one.
    #[must_use]
    pub fn with_ffmpeg_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.ffmpeg_path = Some(path.as_ref().to_path_buf());
        self
    }

    /// Choose which files in each folder are processed.
    #[must_use]
    pub fn with_selection(mut self, selection: SelectionPolicy) -> Self {
        self.selection = selection;
        self
    }

    /// Enable or disable the H.264/AAC re-encode step.
    #[must_use]
    pub fn with_transcode(mut self, transcode: bool) -> Self {
        self.transcode = transcode;
        self
    }

    /// Encoder name passed to `ffmpeg -vcodec`.
    #[must_use]
    pub fn with_video_codec(mut self, codec: impl Into<String>) -> Self {
        self.video_codec = codec.into();
        self
    }

    /// Encoder name passed to `ffmpeg -acodec`.
    #[must_use]
    pub fn with_audio_codec(mut self, codec: impl Into<String>) -> Self {
        self.audio_codec = codec.into();
        self
    }

    /// Exact output size for resized images. Zero dimensions are clamped
    /// to 1.
    #[must_use]
    pub fn with_image_size(mut self, width: u32, height: u32) -> Self {
        self.image_size = (width.max(1), height.max(1));
        self
    }

    /// The root folder whose subdirectories are processed.
    pub fn root_folder(&self) -> &Path {
        &self.root_folder
    }

    /// How much of each video is kept.
    pub fn trim_duration(&self) -> Duration {
        self.trim_duration
    }

    /// The configured selection policy.
    pub fn selection(&self) -> SelectionPolicy {
        self.selection
    }

    /// Target image size as `(width, height)`.
    pub fn image_size(&self) -> (u32, u32) {
        self.image_size
    }

    /// Check the configuration and resolve the `ffmpeg` executable.
    ///
    /// # Errors
    ///
    /// - [`MediafoldError::InvalidTrimDuration`] for a zero trim duration.
    /// - [`MediafoldError::InvalidRoot`] if the root is not a directory.
    /// - [`MediafoldError::ToolNotFound`] if no `ffmpeg` can be located.
    pub fn validate(&self) -> Result<PathBuf, MediafoldError> {
        if self.trim_duration.is_zero() {
            return Err(MediafoldError::InvalidTrimDuration(format!(
                "{}",
                self.trim_duration.as_secs_f64()
            )));
        }
        if !self.root_folder.is_dir() {
            return Err(MediafoldError::InvalidRoot(self.root_folder.clone()));
        }
        tool::resolve_ffmpeg(self.ffmpeg_path.as_deref())
    }
}

/// Parse a user-entered trim duration in seconds.
///
/// Accepts any decimal number (`"5"`, `"5.96"`, `" 2.5 "`). Rejects text,
/// zero, negatives, and non-finite values.
///
/// # Errors
///
/// Returns [`MediafoldError::InvalidTrimDuration`] carrying the input.
pub fn parse_trim_duration(value: &str) -> Result<Duration, MediafoldError> {
    let trimmed = value.trim();
    let seconds: f64 = trimmed
        .parse()
        .map_err(|_| MediafoldError::InvalidTrimDuration(trimmed.to_string()))?;
    if !seconds.is_finite() || seconds <= 0.0 {
        return Err(MediafoldError::InvalidTrimDuration(trimmed.to_string()));
    }
    Duration::try_from_secs_f64(seconds)
        .map_err(|_| MediafoldError::InvalidTrimDuration(trimmed.to_string()))
}
