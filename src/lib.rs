//! # mediafold
//!
//! Batch-process a tree of per-company folders: trim every video to a fixed
//! length, re-encode it to H.264/AAC, save its first and last frames as
//! JPEG thumbnails, and resize the folder's PNG to 1920x1080.
//!
//! Trimming and re-encoding run the external `ffmpeg` executable. Frames
//! are decoded through the FFmpeg libraries via
//! [`ffmpeg-next`](https://crates.io/crates/ffmpeg-next), and still images
//! are handled by the [`image`](https://crates.io/crates/image) crate.
//!
//! ## Quick Start
//!
//! ### Run in the foreground
//!
//! ```no_run
//! use mediafold::{FnSink, JobConfig, Pipeline, PipelineEvent, parse_trim_duration};
//!
//! let config = JobConfig::new("companies", parse_trim_duration("5.96")?);
//! let pipeline = Pipeline::new(config)?;
//! pipeline.execute(&FnSink(|event: PipelineEvent| {
//!     if let PipelineEvent::Message(text) = event {
//!         println!("{text}");
//!     }
//! }))?;
//! # Ok::<(), mediafold::MediafoldError>(())
//! ```
//!
//! ### Run in the background
//!
//! ```no_run
//! use std::time::Duration;
//!
//! use mediafold::{JobConfig, PipelineEvent, Supervisor};
//!
//! let mut supervisor = Supervisor::new();
//! let events = supervisor.start(JobConfig::new("companies", Duration::from_secs(6)))?;
//! for event in events {
//!     println!("{event:?}");
//! }
//! supervisor.wait()?;
//! # Ok::<(), mediafold::MediafoldError>(())
//! ```
//!
//! ## Failure handling
//!
//! A problem with one video, image, or folder is reported as a progress
//! message and the run moves on. Only an unreadable root ends a run, with a
//! terminal [`PipelineEvent::Failed`].
//!
//! ## Requirements
//!
//! FFmpeg development libraries must be installed to build, and an `ffmpeg`
//! executable must be available at run time (next to the binary under
//! `bin/`, on `PATH`, or named by `MEDIAFOLD_FFMPEG`).

pub mod configuration;
pub mod discovery;
pub mod error;
pub mod ffmpeg;
pub mod frames;
pub mod pipeline;
pub mod progress;
pub mod replace;
pub mod still;
pub mod supervisor;
pub mod tool;

pub use configuration::{
    DEFAULT_IMAGE_SIZE, DEFAULT_TRIM_SECONDS, FramePosition, JobConfig, SelectionPolicy,
    parse_trim_duration,
};
pub use discovery::{FolderEntry, discover};
pub use error::MediafoldError;
pub use ffmpeg::{FfmpegLogLevel, set_ffmpeg_log_level};
pub use frames::{VideoMetadata, VideoSource};
pub use pipeline::{COMPLETE_MESSAGE, Pipeline};
pub use progress::{EventSink, FnSink, NoOpSink, PipelineEvent, RunSummary};
pub use supervisor::Supervisor;
pub use tool::{Transcoder, resolve_ffmpeg};
