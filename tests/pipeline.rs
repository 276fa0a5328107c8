//! End-to-end pipeline integration tests.
//!
//! Most tests substitute `/bin/false` for `ffmpeg` so every external step
//! fails deterministically. Tests that need a working `ffmpeg` and the
//! generated fixtures skip themselves when either is missing.

mod common;

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use common::Recorder;
use mediafold::{
    COMPLETE_MESSAGE, FnSink, JobConfig, MediafoldError, Pipeline, PipelineEvent,
    SelectionPolicy,
};

fn config_with(root: &Path, ffmpeg: &Path) -> JobConfig {
    JobConfig::new(root, Duration::from_secs_f64(5.96)).with_ffmpeg_path(ffmpeg)
}

/// A stand-in `ffmpeg` whose stream copy copies the input verbatim and
/// whose encoder always fails.
#[cfg(unix)]
fn copy_only_ffmpeg(directory: &Path) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let script = directory.join("copy-only-ffmpeg.sh");
    fs::write(
        &script,
        r#"#!/bin/sh
case "$*" in
    *-vcodec*) echo "encoder unavailable" >&2; exit 1 ;;
esac
input=""
while [ $# -gt 1 ]; do
    if [ "$1" = "-i" ]; then input="$2"; fi
    shift
done
cp "$input" "$1"
"#,
    )
    .unwrap();
    fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();
    script
}

#[test]
fn empty_root_completes_immediately() {
    let Some(ffmpeg) = common::failing_ffmpeg() else {
        return;
    };
    let root = tempfile::tempdir().unwrap();
    let recorder = Recorder::default();

    let summary = Pipeline::new(config_with(root.path(), &ffmpeg))
        .unwrap()
        .execute(&recorder)
        .unwrap();

    assert_eq!(summary.folders, 0);
    assert_eq!(
        recorder.events(),
        vec![
            PipelineEvent::Percent(100),
            PipelineEvent::Message(COMPLETE_MESSAGE.to_string()),
            PipelineEvent::Finished(summary),
        ]
    );
}

#[test]
fn folder_without_media_reports_both_absences() {
    let Some(ffmpeg) = common::failing_ffmpeg() else {
        return;
    };
    let root = tempfile::tempdir().unwrap();
    let folder = root.path().join("acme");
    fs::create_dir(&folder).unwrap();
    fs::write(folder.join("readme.txt"), b"nothing to see").unwrap();

    let recorder = Recorder::default();
    let summary = Pipeline::new(config_with(root.path(), &ffmpeg))
        .unwrap()
        .execute(&recorder)
        .unwrap();

    assert_eq!(summary.folders, 1);
    assert_eq!(recorder.messages_containing("No video file found in").len(), 1);
    assert_eq!(recorder.messages_containing("No PNG file found in").len(), 1);
    assert_eq!(common::file_names(&folder), vec!["readme.txt"]);
}

#[test]
fn failing_trim_is_reported_and_the_run_continues() {
    let Some(ffmpeg) = common::failing_ffmpeg() else {
        return;
    };
    let root = tempfile::tempdir().unwrap();
    for name in ["acme", "globex", "initech"] {
        let folder = root.path().join(name);
        fs::create_dir(&folder).unwrap();
        common::write_fake_video(&folder.join("intro.mp4"));
    }

    let recorder = Recorder::default();
    let summary = Pipeline::new(config_with(root.path(), &ffmpeg))
        .unwrap()
        .execute(&recorder)
        .unwrap();

    assert_eq!(summary.folders, 3);
    assert_eq!(summary.videos_failed, 3);
    assert_eq!(summary.videos_processed, 0);
    assert_eq!(recorder.messages_containing("Failed to trim video in").len(), 3);
    assert_eq!(recorder.messages_containing("Processing folder:").len(), 3);
    assert!(recorder.messages_containing("Converting video codec").is_empty());
    assert!(recorder.messages_containing("Extracting frames").is_empty());

    for name in ["acme", "globex", "initech"] {
        let folder = root.path().join(name);
        assert_eq!(common::file_names(&folder), vec!["intro.mp4"]);
        assert_eq!(
            fs::read(folder.join("intro.mp4")).unwrap(),
            b"not really a video"
        );
    }

    let events = recorder.events();
    assert!(matches!(events.last(), Some(PipelineEvent::Finished(_))));
    assert_eq!(events.iter().filter(|event| event.is_terminal()).count(), 1);
}

#[test]
fn folder_removed_mid_run_does_not_stop_later_folders() {
    let Some(ffmpeg) = common::failing_ffmpeg() else {
        return;
    };
    let root = tempfile::tempdir().unwrap();
    for name in ["a", "b", "c"] {
        let folder = root.path().join(name);
        fs::create_dir(&folder).unwrap();
        common::write_png(&folder.join("logo.png"), 8, 8);
    }

    let first = format!("Processing folder: {}", root.path().join("a").display());
    let doomed = root.path().join("b");
    let events = Mutex::new(Vec::new());
    let sink = FnSink(|event: PipelineEvent| {
        if event == PipelineEvent::Message(first.clone()) {
            fs::remove_dir_all(&doomed).unwrap();
        }
        events.lock().unwrap().push(event);
    });

    let summary = Pipeline::new(config_with(root.path(), &ffmpeg))
        .unwrap()
        .execute(&sink)
        .unwrap();

    let events = events.into_inner().unwrap();
    let messages: Vec<&str> = events
        .iter()
        .filter_map(|event| match event {
            PipelineEvent::Message(text) => Some(text.as_str()),
            _ => None,
        })
        .collect();
    let unreadable = format!("Error reading folder {}", doomed.display());
    assert_eq!(
        messages
            .iter()
            .filter(|message| message.starts_with(&unreadable))
            .count(),
        1
    );
    let last = format!("Processing folder: {}", root.path().join("c").display());
    assert!(messages.contains(&last.as_str()));
    assert_eq!(summary.folders, 3);
    assert_eq!(summary.images_resized, 2);
    assert!(matches!(events.last(), Some(PipelineEvent::Finished(_))));
    assert!(events.contains(&PipelineEvent::Percent(100)));
    assert_eq!(
        image::open(root.path().join("c/logo.png")).unwrap().width(),
        1920
    );
}

#[cfg(unix)]
#[test]
fn failing_transcode_skips_frames_for_each_video_independently() {
    let root = tempfile::tempdir().unwrap();
    let tools = tempfile::tempdir().unwrap();
    let ffmpeg = copy_only_ffmpeg(tools.path());
    let folder = root.path().join("acme");
    fs::create_dir(&folder).unwrap();
    fs::write(folder.join("intro.mp4"), b"intro footage").unwrap();
    fs::write(folder.join("outro.mov"), b"outro footage").unwrap();

    let recorder = Recorder::default();
    let config = config_with(root.path(), &ffmpeg).with_selection(SelectionPolicy::Every);
    let summary = Pipeline::new(config).unwrap().execute(&recorder).unwrap();

    assert_eq!(summary.videos_failed, 2);
    assert_eq!(summary.videos_processed, 0);
    assert_eq!(recorder.messages_containing("Trimmed video to").len(), 2);
    assert_eq!(
        recorder
            .messages_containing("Replaced original video with trimmed video")
            .len(),
        2
    );
    let conversion_failures = recorder.messages_containing("Failed to convert video in");
    assert_eq!(conversion_failures.len(), 2);
    assert!(
        conversion_failures
            .iter()
            .all(|message| message.ends_with("encoder unavailable")),
        "{conversion_failures:?}"
    );
    assert!(recorder.messages_containing("Extracting frames").is_empty());

    assert_eq!(fs::read(folder.join("intro.mp4")).unwrap(), b"intro footage");
    assert_eq!(fs::read(folder.join("outro.mov")).unwrap(), b"outro footage");
    assert_eq!(common::file_names(&folder), vec!["intro.mp4", "outro.mov"]);
    assert!(matches!(recorder.events().last(), Some(PipelineEvent::Finished(_))));
}

#[test]
fn percent_is_monotonic_and_ends_at_one_hundred() {
    let Some(ffmpeg) = common::failing_ffmpeg() else {
        return;
    };
    let root = tempfile::tempdir().unwrap();
    for name in ["a", "b", "c", "d"] {
        fs::create_dir(root.path().join(name)).unwrap();
    }

    let recorder = Recorder::default();
    Pipeline::new(config_with(root.path(), &ffmpeg))
        .unwrap()
        .execute(&recorder)
        .unwrap();

    let percents: Vec<u8> = recorder
        .events()
        .into_iter()
        .filter_map(|event| match event {
            PipelineEvent::Percent(value) => Some(value),
            _ => None,
        })
        .collect();
    assert_eq!(percents, vec![25, 50, 75, 100]);
}

#[test]
fn image_is_resized_even_when_the_video_fails() {
    let Some(ffmpeg) = common::failing_ffmpeg() else {
        return;
    };
    let root = tempfile::tempdir().unwrap();
    let folder = root.path().join("acme");
    fs::create_dir(&folder).unwrap();
    common::write_fake_video(&folder.join("intro.mov"));
    common::write_png(&folder.join("logo.png"), 64, 48);

    let recorder = Recorder::default();
    let summary = Pipeline::new(config_with(root.path(), &ffmpeg))
        .unwrap()
        .execute(&recorder)
        .unwrap();

    assert_eq!(summary.videos_failed, 1);
    assert_eq!(summary.images_resized, 1);
    let resized = image::open(folder.join("logo.png")).unwrap();
    assert_eq!((resized.width(), resized.height()), (1920, 1080));
    assert_eq!(
        recorder
            .messages_containing("Resized PNG image in")
            .first()
            .map(|message| message.ends_with("to 1920x1080.")),
        Some(true)
    );
    assert_eq!(common::file_names(&folder), vec!["intro.mov", "logo.png"]);
}

#[test]
fn undecodable_image_is_reported() {
    let Some(ffmpeg) = common::failing_ffmpeg() else {
        return;
    };
    let root = tempfile::tempdir().unwrap();
    let folder = root.path().join("acme");
    fs::create_dir(&folder).unwrap();
    fs::write(folder.join("broken.png"), b"definitely not a png").unwrap();

    let recorder = Recorder::default();
    let summary = Pipeline::new(config_with(root.path(), &ffmpeg))
        .unwrap()
        .execute(&recorder)
        .unwrap();

    assert_eq!(summary.images_failed, 1);
    assert_eq!(recorder.messages_containing("Failed to load PNG image").len(), 1);
    assert_eq!(
        fs::read(folder.join("broken.png")).unwrap(),
        b"definitely not a png"
    );
}

#[test]
fn first_only_touches_a_single_image() {
    let Some(ffmpeg) = common::failing_ffmpeg() else {
        return;
    };
    let root = tempfile::tempdir().unwrap();
    let folder = root.path().join("acme");
    fs::create_dir(&folder).unwrap();
    common::write_png(&folder.join("a.png"), 10, 10);
    common::write_png(&folder.join("b.png"), 10, 10);
    common::write_fake_video(&folder.join("a.mp4"));
    common::write_fake_video(&folder.join("b.mp4"));

    let recorder = Recorder::default();
    let config = config_with(root.path(), &ffmpeg)
        .with_selection(SelectionPolicy::FirstOnly)
        .with_image_size(32, 16);
    let summary = Pipeline::new(config).unwrap().execute(&recorder).unwrap();

    assert_eq!(summary.images_resized, 1);
    assert_eq!(summary.videos_failed, 1);
    assert_eq!(image::open(folder.join("a.png")).unwrap().width(), 32);
    assert_eq!(image::open(folder.join("b.png")).unwrap().width(), 10);
}

#[test]
fn invalid_configuration_touches_nothing() {
    let root = tempfile::tempdir().unwrap();
    let missing_tool = root.path().join("no-ffmpeg-here");

    let error = Pipeline::new(config_with(root.path(), &missing_tool)).unwrap_err();
    assert!(matches!(error, MediafoldError::ToolNotFound(_)));

    let error = Pipeline::new(JobConfig::new(root.path(), Duration::ZERO)).unwrap_err();
    assert!(matches!(error, MediafoldError::InvalidTrimDuration(_)));
}

#[test]
fn real_ffmpeg_produces_thumbnails() {
    let Some(ffmpeg) = common::real_ffmpeg_with_fixture() else {
        return;
    };
    let root = tempfile::tempdir().unwrap();
    let folder = root.path().join("acme");
    fs::create_dir(&folder).unwrap();
    fs::copy(common::SAMPLE_VIDEO, folder.join("intro.mp4")).unwrap();
    common::write_png(&folder.join("logo.png"), 100, 100);

    let config = JobConfig::new(root.path(), Duration::from_secs(2))
        .with_ffmpeg_path(&ffmpeg)
        .with_selection(SelectionPolicy::FirstOnly);
    let recorder = Recorder::default();
    let summary = Pipeline::new(config).unwrap().execute(&recorder).unwrap();

    assert_eq!(summary.videos_processed, 1, "{:?}", recorder.messages());
    for name in ["first_frame.jpg", "last_frame.jpg"] {
        let thumbnail = image::open(folder.join(name)).unwrap();
        assert_eq!((thumbnail.width(), thumbnail.height()), (320, 240));
    }

    let trimmed = mediafold::VideoSource::open(folder.join("intro.mp4")).unwrap();
    assert!(trimmed.metadata().duration <= Duration::from_millis(2_500));
    assert_eq!(
        common::file_names(&folder),
        vec!["first_frame.jpg", "intro.mp4", "last_frame.jpg", "logo.png"]
    );
}

#[test]
fn real_ffmpeg_rerun_is_stable() {
    let Some(ffmpeg) = common::real_ffmpeg_with_fixture() else {
        return;
    };
    let root = tempfile::tempdir().unwrap();
    let folder = root.path().join("acme");
    fs::create_dir(&folder).unwrap();
    fs::copy(common::SAMPLE_VIDEO, folder.join("intro.mp4")).unwrap();

    let config = JobConfig::new(root.path(), Duration::from_secs(3)).with_ffmpeg_path(&ffmpeg);
    let pipeline = Pipeline::new(config).unwrap();

    let first = pipeline.execute(&Recorder::default()).unwrap();
    let second = pipeline.execute(&Recorder::default()).unwrap();

    assert_eq!(first.videos_processed, 1);
    assert_eq!(second.videos_processed, 1);
    assert_eq!(
        common::file_names(&folder),
        vec!["intro.mp4", "intro_first_frame.jpg", "intro_last_frame.jpg"]
    );
}

#[test]
fn real_ffmpeg_keeps_a_video_shorter_than_the_trim() {
    let Some(ffmpeg) = common::real_ffmpeg_with_fixture() else {
        return;
    };
    if !Path::new(common::SHORT_VIDEO).exists() {
        return;
    }
    let root = tempfile::tempdir().unwrap();
    let folder = root.path().join("acme");
    fs::create_dir(&folder).unwrap();
    fs::copy(common::SHORT_VIDEO, folder.join("clip.mov")).unwrap();

    let config = JobConfig::new(root.path(), Duration::from_secs(10))
        .with_ffmpeg_path(&ffmpeg)
        .with_transcode(false);
    let recorder = Recorder::default();
    let summary = Pipeline::new(config).unwrap().execute(&recorder).unwrap();

    assert_eq!(summary.videos_processed, 1, "{:?}", recorder.messages());
    assert!(recorder.messages_containing("Failed").is_empty());
    assert!(folder.join("clip_last_frame.jpg").is_file());
}
