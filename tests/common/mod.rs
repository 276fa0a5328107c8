//! Helpers shared by the integration tests.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use mediafold::{EventSink, PipelineEvent};

pub const SAMPLE_VIDEO: &str = "tests/fixtures/sample_video.mp4";
pub const SHORT_VIDEO: &str = "tests/fixtures/short_video.mov";

/// Collects every event it receives.
#[derive(Default)]
pub struct Recorder {
    events: Mutex<Vec<PipelineEvent>>,
}

impl EventSink for Recorder {
    fn emit(&self, event: PipelineEvent) {
        self.events.lock().unwrap().push(event);
    }
}

impl Recorder {
    pub fn events(&self) -> Vec<PipelineEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn messages(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                PipelineEvent::Message(text) => Some(text),
                _ => None,
            })
            .collect()
    }

    pub fn messages_containing(&self, needle: &str) -> Vec<String> {
        self.messages()
            .into_iter()
            .filter(|message| message.contains(needle))
            .collect()
    }
}

/// An `ffmpeg` stand-in that always exits non-zero.
pub fn failing_ffmpeg() -> Option<PathBuf> {
    ["/bin/false", "/usr/bin/false"]
        .iter()
        .map(PathBuf::from)
        .find(|path| path.is_file())
}

/// A real `ffmpeg` plus the sample fixture, or `None` to skip.
pub fn real_ffmpeg_with_fixture() -> Option<PathBuf> {
    if !Path::new(SAMPLE_VIDEO).exists() {
        return None;
    }
    mediafold::resolve_ffmpeg(None).ok()
}

/// Write a small solid-colour PNG.
pub fn write_png(path: &Path, width: u32, height: u32) {
    image::RgbImage::from_pixel(width, height, image::Rgb([200, 40, 40]))
        .save(path)
        .unwrap();
}

/// Write bytes that look like a video by name only.
pub fn write_fake_video(path: &Path) {
    fs::write(path, b"not really a video").unwrap();
}

/// Sorted file names directly inside `directory`.
pub fn file_names(directory: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(directory)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}
