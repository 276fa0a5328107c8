//! The per-folder processing pipeline.
//!
//! For every directory below the root, in path order:
//!
//! 1. each selected video is trimmed (stream copy), re-encoded to the
//!    configured codecs, and has its first and last frames saved as JPEG;
//! 2. each selected PNG is resized to the configured size in place.
//!
//! Every step is best effort. A failing step is reported as a message and
//! skips only the remaining steps for that video (or that image); the next
//! video, image, and folder are still processed, and so is a folder that
//! cannot be listed. Only an unreadable root ends the run early.
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//!
//! use mediafold::{FnSink, JobConfig, Pipeline, PipelineEvent};
//!
//! let config = JobConfig::new("companies", Duration::from_secs_f64(5.96));
//! let pipeline = Pipeline::new(config)?;
//! let summary = pipeline.execute(&FnSink(|event: PipelineEvent| println!("{event:?}")))?;
//! println!("{} videos processed", summary.videos_processed);
//! # Ok::<(), mediafold::MediafoldError>(())
//! ```

use std::path::Path;

use crate::configuration::{FramePosition, JobConfig};
use crate::discovery::{self, FolderEntry};
use crate::error::MediafoldError;
use crate::frames::{self, VideoSource};
use crate::progress::{EventSink, PipelineEvent, ProgressTracker, RunSummary};
use crate::replace;
use crate::still;
use crate::tool::{self, Transcoder};

/// Message emitted after the last folder, before the terminal event.
pub const COMPLETE_MESSAGE: &str = "Processing complete.";

/// A validated, ready-to-run job.
#[derive(Debug, Clone)]
pub struct Pipeline {
    config: JobConfig,
    transcoder: Transcoder,
}

impl Pipeline {
    /// Validate `config` and resolve the `ffmpeg` executable.
    ///
    /// # Errors
    ///
    /// Any error from [`JobConfig::validate`]. Nothing on disk is touched.
    pub fn new(config: JobConfig) -> Result<Self, MediafoldError> {
        let binary = config.validate()?;
        log::debug!("Using ffmpeg at {}", binary.display());
        Ok(Self {
            config,
            transcoder: Transcoder::new(binary),
        })
    }

    /// The configuration this pipeline runs with.
    pub fn config(&self) -> &JobConfig {
        &self.config
    }

    /// The external tool wrapper this pipeline runs with.
    pub fn transcoder(&self) -> &Transcoder {
        &self.transcoder
    }

    /// Process every folder and emit progress to `sink`, without a terminal
    /// event.
    ///
    /// # Errors
    ///
    /// Returns an error only if the root cannot be walked. A folder that
    /// cannot be listed, and every media failure, is reported to `sink`
    /// and the run moves on.
    pub fn run(&self, sink: &dyn EventSink) -> Result<RunSummary, MediafoldError> {
        let directories = discovery::discover(&self.config.root_folder)?;
        log::info!(
            "Processing {} folder(s) under {}",
            directories.len(),
            self.config.root_folder.display()
        );

        let mut tracker = ProgressTracker::new(directories.len() as u64);
        let mut summary = RunSummary::default();

        for directory in &directories {
            // A folder can vanish or become unreadable after discovery.
            match FolderEntry::scan(directory) {
                Ok(folder) => self.process_folder(&folder, sink, &mut summary),
                Err(error) => warn(
                    sink,
                    format!("Error reading folder {}: {error}", directory.display()),
                ),
            }
            summary.folders += 1;
            tracker.advance(sink);
        }

        tracker.finish(sink);
        sink.emit(PipelineEvent::Message(COMPLETE_MESSAGE.to_string()));
        log::info!("Run finished: {summary:?}");
        Ok(summary)
    }

    /// [`run`](Pipeline::run), followed by exactly one terminal event:
    /// [`PipelineEvent::Finished`] or [`PipelineEvent::Failed`] carrying the
    /// error text.
    ///
    /// # Errors
    ///
    /// Same as [`run`](Pipeline::run); the error is also emitted.
    pub fn execute(&self, sink: &dyn EventSink) -> Result<RunSummary, MediafoldError> {
        match self.run(sink) {
            Ok(summary) => {
                sink.emit(PipelineEvent::Finished(summary));
                Ok(summary)
            }
            Err(error) => {
                log::error!("Run aborted: {error}");
                sink.emit(PipelineEvent::Failed(error.to_string()));
                Err(error)
            }
        }
    }

    fn process_folder(&self, folder: &FolderEntry, sink: &dyn EventSink, summary: &mut RunSummary) {
        let directory = folder.path.display();
        say(sink, format!("Processing folder: {directory}"));

        let selection = self.config.selection;

        let videos = selection.select(&folder.videos);
        if videos.is_empty() {
            say(sink, format!("No video file found in {directory}"));
        }
        for video in videos {
            if self.process_video(video, &folder.path, sink) {
                summary.videos_processed += 1;
            } else {
                summary.videos_failed += 1;
            }
        }

        let images = selection.select(&folder.images);
        if images.is_empty() {
            say(sink, format!("No PNG file found in {directory}"));
        }
        for image in images {
            if self.resize_image(image, &folder.path, sink) {
                summary.images_resized += 1;
            } else {
                summary.images_failed += 1;
            }
        }
    }

    /// Trim, transcode, and extract frames. Returns `true` if every step
    /// succeeded.
    fn process_video(&self, video: &Path, directory: &Path, sink: &dyn EventSink) -> bool {
        log::info!("Processing video {}", video.display());
        self.trim_video(video, directory, sink)
            && (!self.config.transcode || self.transcode_video(video, directory, sink))
            && self.extract_frames(video, directory, sink)
    }

    fn trim_video(&self, video: &Path, directory: &Path, sink: &dyn EventSink) -> bool {
        let directory = directory.display();
        say(sink, format!("Trimming video: {}", video.display()));

        let seconds = tool::format_seconds(self.config.trim_duration);
        let trimmed = replace::temporary_sibling(video, "trim");
        if let Err(error) = self
            .transcoder
            .trim(video, &trimmed, self.config.trim_duration)
        {
            replace::discard(&trimmed);
            warn(
                sink,
                format!("Failed to trim video in {directory}: {}", error.diagnostic()),
            );
            return false;
        }
        say(sink, format!("Trimmed video to {seconds} seconds."));

        if let Err(error) = replace::replace_file(&trimmed, video) {
            warn(sink, format!("Error replacing video in {directory}: {error}"));
            return false;
        }
        say(
            sink,
            format!("Replaced original video with trimmed video in {directory}."),
        );
        true
    }

    fn transcode_video(&self, video: &Path, directory: &Path, sink: &dyn EventSink) -> bool {
        let directory = directory.display();
        let codec = codec_label(&self.config.video_codec);
        say(
            sink,
            format!("Converting video codec to {codec}: {}", video.display()),
        );

        let converted = replace::temporary_sibling(video, "convert");
        if let Err(error) = self.transcoder.transcode(
            video,
            &converted,
            &self.config.video_codec,
            &self.config.audio_codec,
        ) {
            replace::discard(&converted);
            warn(
                sink,
                format!(
                    "Failed to convert video in {directory} to {codec}: {}",
                    error.diagnostic()
                ),
            );
            return false;
        }
        say(sink, format!("Converted video to {codec} successfully."));

        if let Err(error) = replace::replace_file(&converted, video) {
            warn(sink, format!("Error replacing video in {directory}: {error}"));
            return false;
        }
        say(
            sink,
            format!("Replaced original video with {codec} encoded video."),
        );
        true
    }

    fn extract_frames(&self, video: &Path, directory: &Path, sink: &dyn EventSink) -> bool {
        say(
            sink,
            format!("Extracting frames from video: {}", video.display()),
        );

        // Dropped at the end of this function on every path, which closes
        // the file before the next video is opened.
        let mut source = match VideoSource::open(video) {
            Ok(source) => source,
            Err(error) => {
                warn(
                    sink,
                    format!("Error opening video file {}: {error}", video.display()),
                );
                return false;
            }
        };

        let first_saved = self.save_frame(&mut source, video, directory, FramePosition::First, sink);

        let last_saved = if source.frame_count() == 0 {
            warn(sink, format!("No frames found in {}", video.display()));
            false
        } else {
            self.save_frame(&mut source, video, directory, FramePosition::Last, sink)
        };

        first_saved && last_saved
    }

    fn save_frame(
        &self,
        source: &mut VideoSource,
        video: &Path,
        directory: &Path,
        position: FramePosition,
        sink: &dyn EventSink,
    ) -> bool {
        let label = match position {
            FramePosition::First => "first",
            FramePosition::Last => "last",
        };
        let decoded = match position {
            FramePosition::First => source.first_frame(),
            FramePosition::Last => source.last_frame(),
        };
        let image = match decoded {
            Ok(image) => image,
            Err(error) => {
                warn(
                    sink,
                    format!(
                        "Failed to read {label} frame from {}: {error}",
                        video.display()
                    ),
                );
                return false;
            }
        };

        let output = directory.join(self.config.selection.frame_file_name(video, position));
        match frames::save_jpeg(&image, &output) {
            Ok(()) => {
                say(
                    sink,
                    format!("Saved {label} frame to {}", output.display()),
                );
                true
            }
            Err(error) => {
                warn(
                    sink,
                    format!("Failed to save {label} frame to {}: {error}", output.display()),
                );
                false
            }
        }
    }

    fn resize_image(&self, image: &Path, directory: &Path, sink: &dyn EventSink) -> bool {
        let (width, height) = self.config.image_size;
        say(sink, format!("Resizing PNG image: {}", image.display()));

        match still::resize_exact(image, width, height) {
            Ok(_) => {
                say(
                    sink,
                    format!(
                        "Resized PNG image in {} to {width}x{height}.",
                        directory.display()
                    ),
                );
                true
            }
            Err(error @ MediafoldError::ImageDecode { .. }) => {
                warn(
                    sink,
                    format!("Failed to load PNG image {}: {error}", image.display()),
                );
                false
            }
            Err(error) => {
                warn(
                    sink,
                    format!("Failed to resize PNG image {}: {error}", image.display()),
                );
                false
            }
        }
    }
}

/// Friendly name for the common encoders, the encoder name otherwise.
fn codec_label(encoder: &str) -> &str {
    match encoder {
        "libx264" | "h264" => "H.264",
        "libx265" | "hevc" => "H.265",
        other => other,
    }
}

fn say(sink: &dyn EventSink, message: String) {
    log::debug!("{message}");
    sink.emit(PipelineEvent::Message(message));
}

fn warn(sink: &dyn EventSink, message: String) {
    log::warn!("{message}");
    sink.emit(PipelineEvent::Message(message));
}
