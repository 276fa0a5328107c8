//! First and last frame extraction.
//!
//! [`VideoSource`] opens a video through the FFmpeg libraries, reports its
//! frame count, and decodes individual frames by 0-based index into
//! [`image::DynamicImage`] values. The demuxer and every decoder created for
//! it are released when the `VideoSource` is dropped, so a video is never
//! held open past the scope that processes it.
//!
//! # Example
//!
//! ```no_run
//! use mediafold::VideoSource;
//!
//! let mut source = VideoSource::open("clip.mp4")?;
//! let first = source.first_frame()?;
//! mediafold::frames::save_jpeg(&first, "first_frame.jpg")?;
//! if source.frame_count() > 0 {
//!     let last = source.last_frame()?;
//!     mediafold::frames::save_jpeg(&last, "last_frame.jpg")?;
//! }
//! # Ok::<(), mediafold::MediafoldError>(())
//! ```

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use ffmpeg_next::{
    Rational,
    codec::context::Context as CodecContext,
    format::{Pixel, context::Input},
    frame::Video as VideoFrame,
    media::Type,
    software::scaling::{Context as ScalingContext, Flags as ScalingFlags},
};
use image::{DynamicImage, RgbImage, codecs::jpeg::JpegEncoder};

use crate::error::MediafoldError;

/// JPEG quality used for frame thumbnails.
pub const JPEG_QUALITY: u8 = 95;

/// Properties of the video stream read at open time.
#[derive(Debug, Clone)]
#[must_use]
pub struct VideoMetadata {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Average frames per second, `0.0` if the container does not say.
    pub frames_per_second: f64,
    /// Total frames: the stream's own count when the container records one,
    /// otherwise estimated from duration and frame rate.
    pub frame_count: u64,
    /// Container duration.
    pub duration: Duration,
    /// Decoder name (e.g. `"h264"`).
    pub codec: String,
}

/// An open video file that can decode frames by index.
pub struct VideoSource {
    input_context: Input,
    path: PathBuf,
    stream_index: usize,
    time_base: Rational,
    start_pts: i64,
    metadata: VideoMetadata,
    /// Set once packets have been read, so the next read must reposition.
    consumed: bool,
}

impl std::fmt::Debug for VideoSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VideoSource")
            .field("path", &self.path)
            .field("stream_index", &self.stream_index)
            .field("metadata", &self.metadata)
            .finish_non_exhaustive()
    }
}

impl VideoSource {
    /// Open `path` and read its video stream properties.
    ///
    /// # Errors
    ///
    /// - [`MediafoldError::FileOpen`] if FFmpeg cannot open the file.
    /// - [`MediafoldError::NoVideoStream`] if there is no video stream.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, MediafoldError> {
        let path = path.as_ref().to_path_buf();
        log::debug!("Opening video: {}", path.display());

        let input_context = open_input(&path)?;

        let stream = input_context
            .streams()
            .best(Type::Video)
            .ok_or(MediafoldError::NoVideoStream)?;
        let stream_index = stream.index();
        let time_base = stream.time_base();
        let start_pts = match stream.start_time() {
            // AV_NOPTS_VALUE
            i64::MIN => 0,
            value => value,
        };

        let decoder = CodecContext::from_parameters(stream.parameters())
            .and_then(|context| context.decoder().video())
            .map_err(|error| MediafoldError::FileOpen {
                path: path.clone(),
                reason: format!("Failed to create video decoder: {error}"),
            })?;

        let duration_microseconds = input_context.duration();
        let duration = if duration_microseconds > 0 {
            Duration::from_micros(duration_microseconds as u64)
        } else {
            Duration::ZERO
        };

        let frames_per_second = rational_to_f64(stream.avg_frame_rate())
            .or_else(|| rational_to_f64(stream.rate()))
            .unwrap_or(0.0);

        let frame_count = match stream.frames() {
            count if count > 0 => count as u64,
            _ if frames_per_second > 0.0 => (duration.as_secs_f64() * frames_per_second) as u64,
            _ => 0,
        };

        let codec = decoder
            .codec()
            .map(|codec| codec.name().to_string())
            .unwrap_or_else(|| "unknown".to_string());

        let metadata = VideoMetadata {
            width: decoder.width(),
            height: decoder.height(),
            frames_per_second,
            frame_count,
            duration,
            codec,
        };

        log::debug!(
            "Video stream {stream_index}: {}x{}, {:.2} fps, {} frames, codec={}",
            metadata.width,
            metadata.height,
            metadata.frames_per_second,
            metadata.frame_count,
            metadata.codec,
        );

        Ok(Self {
            input_context,
            path,
            stream_index,
            time_base,
            start_pts,
            metadata,
            consumed: false,
        })
    }

    /// Stream properties read at open time.
    pub fn metadata(&self) -> &VideoMetadata {
        &self.metadata
    }

    /// Total number of frames. May be zero for empty or unusual files.
    pub fn frame_count(&self) -> u64 {
        self.metadata.frame_count
    }

    /// Decode frame 0.
    ///
    /// # Errors
    ///
    /// See [`frame`](VideoSource::frame).
    pub fn first_frame(&mut self) -> Result<DynamicImage, MediafoldError> {
        self.frame(0)
    }

    /// Decode the frame at index `frame_count - 1`.
    ///
    /// # Errors
    ///
    /// Returns [`MediafoldError::NoFrames`] if the frame count is zero, or
    /// any error from [`frame`](VideoSource::frame).
    pub fn last_frame(&mut self) -> Result<DynamicImage, MediafoldError> {
        let total = self.metadata.frame_count;
        if total == 0 {
            return Err(MediafoldError::NoFrames(self.path.clone()));
        }
        self.frame(total - 1)
    }

    /// Decode a single frame by 0-based index.
    ///
    /// Seeks to the nearest keyframe before the target and decodes forward
    /// until a frame at or past the target appears. Frame counts in
    /// container headers are sometimes estimates, so if the stream ends
    /// first the last decoded frame is returned instead.
    ///
    /// # Errors
    ///
    /// - [`MediafoldError::FrameOutOfRange`] if `frame_number` is not below
    ///   a known frame count.
    /// - [`MediafoldError::VideoDecodeError`] if no frame could be decoded.
    pub fn frame(&mut self, frame_number: u64) -> Result<DynamicImage, MediafoldError> {
        let total_frames = self.metadata.frame_count;
        if total_frames > 0 && frame_number >= total_frames {
            return Err(MediafoldError::FrameOutOfRange {
                frame_number,
                total_frames,
            });
        }

        self.reposition(frame_number)?;
        self.consumed = true;

        let stream = self
            .input_context
            .stream(self.stream_index)
            .ok_or(MediafoldError::NoVideoStream)?;
        let mut decoder = CodecContext::from_parameters(stream.parameters())?
            .decoder()
            .video()?;

        let width = decoder.width();
        let height = decoder.height();
        let mut scaler = ScalingContext::get(
            decoder.format(),
            width,
            height,
            Pixel::RGB24,
            width,
            height,
            ScalingFlags::BILINEAR,
        )?;

        let stream_index = self.stream_index;
        let scale = PtsScale {
            time_base: self.time_base,
            start_pts: self.start_pts,
            frames_per_second: self.metadata.frames_per_second,
        };

        let mut decoded_frame = VideoFrame::empty();
        let mut rgb_frame = VideoFrame::empty();
        let mut have_frame = false;

        for (stream, packet) in self.input_context.packets() {
            if stream.index() != stream_index {
                continue;
            }
            // Corrupt packets are skipped; the decoder usually recovers at
            // the next keyframe.
            if let Err(error) = decoder.send_packet(&packet) {
                log::debug!("Skipping undecodable packet: {error}");
                continue;
            }
            while decoder.receive_frame(&mut decoded_frame).is_ok() {
                scaler.run(&decoded_frame, &mut rgb_frame)?;
                have_frame = true;
                if scale.frame_number_of(&decoded_frame) >= frame_number {
                    return rgb_frame_to_image(&rgb_frame, width, height);
                }
            }
        }

        decoder.send_eof()?;
        while decoder.receive_frame(&mut decoded_frame).is_ok() {
            scaler.run(&decoded_frame, &mut rgb_frame)?;
            have_frame = true;
            if scale.frame_number_of(&decoded_frame) >= frame_number {
                return rgb_frame_to_image(&rgb_frame, width, height);
            }
        }

        if have_frame {
            log::debug!(
                "Stream ended before frame {frame_number} in {}; using the last decoded frame",
                self.path.display()
            );
            return rgb_frame_to_image(&rgb_frame, width, height);
        }

        Err(MediafoldError::VideoDecodeError(format!(
            "Could not decode frame {frame_number} of {}",
            self.path.display()
        )))
    }

    /// Put the demuxer at or before `frame_number`.
    ///
    /// Reading frame 0 of a fresh file needs no seek. Otherwise a keyframe
    /// seek is attempted; containers that refuse it are reopened and read
    /// from the start.
    fn reposition(&mut self, frame_number: u64) -> Result<(), MediafoldError> {
        if frame_number == 0 {
            if self.consumed {
                self.input_context = open_input(&self.path)?;
            }
            return Ok(());
        }

        let fps = self.metadata.frames_per_second;
        if fps <= 0.0 {
            self.input_context = open_input(&self.path)?;
            return Ok(());
        }

        let timestamp = frame_number_to_seek_timestamp(frame_number, fps);
        if let Err(error) = self.input_context.seek(timestamp, ..timestamp) {
            log::debug!(
                "Seek to frame {frame_number} failed in {} ({error}); decoding from the start",
                self.path.display()
            );
            self.input_context = open_input(&self.path)?;
        }
        Ok(())
    }
}

/// What is needed to turn a decoded frame's timestamp into its index.
#[derive(Debug, Clone, Copy)]
struct PtsScale {
    time_base: Rational,
    start_pts: i64,
    frames_per_second: f64,
}

impl PtsScale {
    fn frame_number_of(&self, frame: &VideoFrame) -> u64 {
        let pts = frame
            .timestamp()
            .or_else(|| frame.pts())
            .unwrap_or(self.start_pts);
        pts_to_frame_number(
            pts.saturating_sub(self.start_pts).max(0),
            self.time_base,
            self.frames_per_second,
        )
    }
}

/// Encode `image` as a JPEG at `path`.
///
/// # Errors
///
/// [`MediafoldError::IoError`] if the file cannot be created, or
/// [`MediafoldError::ImageError`] if encoding fails.
pub fn save_jpeg<P: AsRef<Path>>(image: &DynamicImage, path: P) -> Result<(), MediafoldError> {
    let mut writer = BufWriter::new(File::create(path.as_ref())?);
    let encoder = JpegEncoder::new_with_quality(&mut writer, JPEG_QUALITY);
    image.to_rgb8().write_with_encoder(encoder)?;
    writer.flush()?;
    Ok(())
}

fn open_input(path: &Path) -> Result<Input, MediafoldError> {
    ffmpeg_next::init().map_err(|error| MediafoldError::FileOpen {
        path: path.to_path_buf(),
        reason: format!("FFmpeg initialisation failed: {error}"),
    })?;
    ffmpeg_next::format::input(&path).map_err(|error| MediafoldError::FileOpen {
        path: path.to_path_buf(),
        reason: error.to_string(),
    })
}

fn rational_to_f64(rational: Rational) -> Option<f64> {
    (rational.numerator() > 0 && rational.denominator() > 0)
        .then(|| rational.numerator() as f64 / rational.denominator() as f64)
}

/// Rescale a PTS value to a frame number.
fn pts_to_frame_number(pts: i64, time_base: Rational, frames_per_second: f64) -> u64 {
    let seconds = pts as f64 * time_base.numerator() as f64 / time_base.denominator() as f64;
    (seconds * frames_per_second).round() as u64
}

/// Frame number to a container seek timestamp in AV_TIME_BASE
/// (microseconds), as `avformat_seek_file` expects with no stream index.
fn frame_number_to_seek_timestamp(frame_number: u64, frames_per_second: f64) -> i64 {
    let seconds = frame_number as f64 / frames_per_second;
    (seconds * 1_000_000.0) as i64
}

/// Copy a scaled RGB24 frame into an image, dropping per-row padding.
fn rgb_frame_to_image(
    rgb_frame: &VideoFrame,
    width: u32,
    height: u32,
) -> Result<DynamicImage, MediafoldError> {
    let stride = rgb_frame.stride(0);
    let row_bytes = width as usize * 3;
    let data = rgb_frame.data(0);

    let buffer = if stride == row_bytes {
        data[..row_bytes * height as usize].to_vec()
    } else {
        let mut buffer = Vec::with_capacity(row_bytes * height as usize);
        for row in 0..height as usize {
            let start = row * stride;
            buffer.extend_from_slice(&data[start..start + row_bytes]);
        }
        buffer
    };

    RgbImage::from_raw(width, height, buffer)
        .map(DynamicImage::ImageRgb8)
        .ok_or_else(|| {
            MediafoldError::VideoDecodeError(
                "Decoded frame data does not match the frame dimensions".to_string(),
            )
        })
}
