//! The external `ffmpeg` executable.
//!
//! Trimming and re-encoding run an `ffmpeg` subprocess, not the linked
//! libraries. Its standard error is captured and surfaced verbatim when a
//! file is rejected. [`Transcoder`] wraps the two invocations the pipeline
//! needs.
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//!
//! use mediafold::Transcoder;
//!
//! let ffmpeg = Transcoder::new(mediafold::resolve_ffmpeg(None)?);
//! ffmpeg.trim("in.mp4", "short.mp4", Duration::from_secs(5))?;
//! ffmpeg.transcode("short.mp4", "h264.mp4", "libx264", "aac")?;
//! # Ok::<(), mediafold::MediafoldError>(())
//! ```

use std::env;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::Duration;

use crate::error::MediafoldError;

/// Environment variable that overrides `ffmpeg` discovery.
pub const FFMPEG_ENV_VAR: &str = "MEDIAFOLD_FFMPEG";

#[cfg(windows)]
const FFMPEG_EXECUTABLE: &str = "ffmpeg.exe";
#[cfg(not(windows))]
const FFMPEG_EXECUTABLE: &str = "ffmpeg";

/// Locate the `ffmpeg` executable.
///
/// Resolution order: `explicit`, then the `MEDIAFOLD_FFMPEG` environment
/// variable, then `bin/ffmpeg` next to the running executable (the layout a
/// bundled build ships with), then `ffmpeg` on `PATH`. An explicit path or
/// environment override that does not exist is an error rather than a
/// reason to keep searching.
///
/// # Errors
///
/// Returns [`MediafoldError::ToolNotFound`] describing where it looked.
pub fn resolve_ffmpeg(explicit: Option<&Path>) -> Result<PathBuf, MediafoldError> {
    if let Some(path) = explicit {
        return existing_file(path).ok_or_else(|| {
            MediafoldError::ToolNotFound(format!("no executable at {}", path.display()))
        });
    }

    if let Some(value) = env::var_os(FFMPEG_ENV_VAR) {
        let path = PathBuf::from(value);
        return existing_file(&path).ok_or_else(|| {
            MediafoldError::ToolNotFound(format!(
                "{FFMPEG_ENV_VAR} points to {}, which does not exist",
                path.display()
            ))
        });
    }

    if let Some(bundled) = bundled_ffmpeg() {
        return Ok(bundled);
    }

    search_path(env::var_os("PATH")).ok_or_else(|| {
        MediafoldError::ToolNotFound(format!(
            "{FFMPEG_EXECUTABLE} is not bundled next to the executable and not on PATH; \
             install it or set {FFMPEG_ENV_VAR}"
        ))
    })
}

fn existing_file(path: &Path) -> Option<PathBuf> {
    path.is_file().then(|| path.to_path_buf())
}

fn bundled_ffmpeg() -> Option<PathBuf> {
    let executable = env::current_exe().ok()?;
    let directory = executable.parent()?;
    existing_file(&directory.join("bin").join(FFMPEG_EXECUTABLE))
}

fn search_path(path_variable: Option<OsString>) -> Option<PathBuf> {
    let path_variable = path_variable?;
    env::split_paths(&path_variable)
        .map(|directory| directory.join(FFMPEG_EXECUTABLE))
        .find(|candidate| candidate.is_file())
}

/// Runs the external `ffmpeg` binary.
///
/// Every call blocks until the process exits. Standard output and standard
/// error are captured; a non-zero exit becomes
/// [`MediafoldError::ToolFailed`] carrying the trimmed standard error.
#[derive(Debug, Clone)]
pub struct Transcoder {
    binary: PathBuf,
}

impl Transcoder {
    /// Wrap an already-resolved executable path.
    pub fn new<P: AsRef<Path>>(binary: P) -> Self {
        Self {
            binary: binary.as_ref().to_path_buf(),
        }
    }

    /// The executable this transcoder runs.
    pub fn binary(&self) -> &Path {
        &self.binary
    }

    /// Keep the first `duration` of `input`, copying streams without
    /// re-encoding, and write the result to `output`.
    ///
    /// A source shorter than `duration` is copied whole.
    ///
    /// # Errors
    ///
    /// [`MediafoldError::ToolSpawn`] or [`MediafoldError::ToolFailed`].
    pub fn trim<P1: AsRef<Path>, P2: AsRef<Path>>(
        &self,
        input: P1,
        output: P2,
        duration: Duration,
    ) -> Result<(), MediafoldError> {
        let seconds = format_seconds(duration);
        let mut command = self.base_command(input.as_ref());
        command
            .args(["-t", &seconds, "-c", "copy"])
            .arg(output.as_ref());
        self.run(command)
    }

    /// Re-encode `input` with the given encoders and write it to `output`.
    ///
    /// # Errors
    ///
    /// [`MediafoldError::ToolSpawn`] or [`MediafoldError::ToolFailed`].
    pub fn transcode<P1: AsRef<Path>, P2: AsRef<Path>>(
        &self,
        input: P1,
        output: P2,
        video_codec: &str,
        audio_codec: &str,
    ) -> Result<(), MediafoldError> {
        let mut command = self.base_command(input.as_ref());
        command
            .args(["-vcodec", video_codec, "-acodec", audio_codec])
            .arg(output.as_ref());
        self.run(command)
    }

    /// First line of `ffmpeg -version`.
    ///
    /// # Errors
    ///
    /// [`MediafoldError::ToolSpawn`] or [`MediafoldError::ToolFailed`].
    pub fn version(&self) -> Result<String, MediafoldError> {
        let output = Command::new(&self.binary)
            .arg("-version")
            .stdin(Stdio::null())
            .output()
            .map_err(|error| self.spawn_error(error))?;
        if !output.status.success() {
            return Err(self.failure(output.status, &output.stderr));
        }
        Ok(String::from_utf8_lossy(&output.stdout)
            .lines()
            .next()
            .unwrap_or_default()
            .to_string())
    }

    // `-nostdin` and `-y` keep a stale output file from turning into an
    // interactive overwrite prompt that would hang the worker.
    fn base_command(&self, input: &Path) -> Command {
        let mut command = Command::new(&self.binary);
        command
            .args(["-hide_banner", "-nostdin", "-y", "-i"])
            .arg(input)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        command
    }

    fn run(&self, mut command: Command) -> Result<(), MediafoldError> {
        log::debug!("Running {command:?}");
        let output = command.output().map_err(|error| self.spawn_error(error))?;
        if output.status.success() {
            Ok(())
        } else {
            Err(self.failure(output.status, &output.stderr))
        }
    }

    fn spawn_error(&self, error: std::io::Error) -> MediafoldError {
        MediafoldError::ToolSpawn {
            tool: self.binary.clone(),
            reason: error.to_string(),
        }
    }

    fn failure(&self, status: std::process::ExitStatus, stderr: &[u8]) -> MediafoldError {
        MediafoldError::ToolFailed {
            tool: self.binary.clone(),
            status,
            stderr: String::from_utf8_lossy(stderr).trim().to_string(),
        }
    }
}

/// Render a duration the way `ffmpeg -t` expects: plain seconds, no
/// exponent, no trailing zeros.
pub(crate) fn format_seconds(duration: Duration) -> String {
    let rendered = format!("{:.6}", duration.as_secs_f64());
    let rendered = rendered.trim_end_matches('0').trim_end_matches('.');
    if rendered.is_empty() {
        "0".to_string()
    } else {
        rendered.to_string()
    }
}
