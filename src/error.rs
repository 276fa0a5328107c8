//! Error types for the `mediafold` crate.
//!
//! [`MediafoldError`] is returned by every fallible operation. The pipeline
//! converts most variants into progress messages and keeps going; only the
//! ones that escape [`Pipeline::run`](crate::Pipeline::run) end a run.

use std::{io::Error as IoError, path::PathBuf, process::ExitStatus};

use ffmpeg_next::Error as FfmpegError;
use image::ImageError;
use thiserror::Error;

/// The unified error type for all `mediafold` operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum MediafoldError {
    /// A video file could not be opened by the decoder.
    #[error("Failed to open media file at {path}: {reason}")]
    FileOpen {
        /// Path that was passed to [`crate::VideoSource::open`].
        path: PathBuf,
        /// Underlying reason the open failed.
        reason: String,
    },

    /// The file does not contain a video stream.
    #[error("No video stream found in file")]
    NoVideoStream,

    /// The video reports zero frames, so there is no last frame to read.
    #[error("No frames found in {0}")]
    NoFrames(PathBuf),

    /// The requested frame index exceeds the total frame count.
    #[error("Frame {frame_number} is out of range (video has {total_frames} frames)")]
    FrameOutOfRange {
        /// The frame index that was requested.
        frame_number: u64,
        /// The total number of frames in the video.
        total_frames: u64,
    },

    /// A video frame could not be decoded.
    #[error("Failed to decode video frame: {0}")]
    VideoDecodeError(String),

    /// An error originating from the FFmpeg libraries.
    #[error("FFmpeg error: {0}")]
    FfmpegError(String),

    /// A still image could not be decoded.
    #[error("Failed to load image {path}: {reason}")]
    ImageDecode {
        /// The image that failed to decode.
        path: PathBuf,
        /// Decoder diagnostic.
        reason: String,
    },

    /// An error from the `image` crate while encoding or resizing.
    #[error("Image processing error: {0}")]
    ImageError(#[from] ImageError),

    /// An I/O error occurred while reading or writing files.
    #[error("I/O error: {0}")]
    IoError(#[from] IoError),

    /// No usable `ffmpeg` executable could be located.
    #[error("FFmpeg not found: {0}")]
    ToolNotFound(String),

    /// The external tool could not be started at all.
    #[error("Failed to run {tool}: {reason}")]
    ToolSpawn {
        /// Executable that was invoked.
        tool: PathBuf,
        /// OS-level reason.
        reason: String,
    },

    /// The external tool ran and exited unsuccessfully.
    #[error("{tool} exited with {status}: {stderr}")]
    ToolFailed {
        /// Executable that was invoked.
        tool: PathBuf,
        /// Exit status reported by the OS.
        status: ExitStatus,
        /// Captured standard error, trimmed.
        stderr: String,
    },

    /// Replacing a file with its processed version failed.
    #[error("Failed to replace {path}: {reason}")]
    Replace {
        /// The file that was being replaced.
        path: PathBuf,
        /// Underlying reason.
        reason: String,
    },

    /// The trim duration was not a positive, finite number of seconds.
    #[error("Trim duration must be a positive number of seconds, got {0:?}")]
    InvalidTrimDuration(String),

    /// The root folder is missing or is not a directory.
    #[error("Root folder {0} does not exist or is not a directory")]
    InvalidRoot(PathBuf),

    /// A run was requested while another one is still outstanding.
    #[error("A processing run is already in progress")]
    RunInProgress,

    /// The background worker panicked.
    #[error("Processing worker panicked: {0}")]
    WorkerPanicked(String),
}

impl From<FfmpegError> for MediafoldError {
    fn from(error: FfmpegError) -> Self {
        MediafoldError::FfmpegError(error.to_string())
    }
}

impl MediafoldError {
    /// Text suitable for a progress message.
    ///
    /// For tool failures this is just the captured diagnostic output, which
    /// is what a user needs to see; everything else uses `Display`.
    pub fn diagnostic(&self) -> String {
        match self {
            MediafoldError::ToolFailed { stderr, status, .. } if stderr.is_empty() => {
                format!("exited with {status}")
            }
            MediafoldError::ToolFailed { stderr, .. } => stderr.clone(),
            other => other.to_string(),
        }
    }
}
