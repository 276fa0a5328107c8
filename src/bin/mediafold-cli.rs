use std::{
    path::{Path, PathBuf},
    sync::mpsc::Receiver,
};

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use log::LevelFilter;
use mediafold::{
    DEFAULT_IMAGE_SIZE, DEFAULT_TRIM_SECONDS, FfmpegLogLevel, FolderEntry, JobConfig,
    PipelineEvent, RunSummary, SelectionPolicy, Supervisor, Transcoder,
};
use serde_json::json;

const CLI_AFTER_HELP: &str = "Examples:\n  mediafold run ./companies --trim 5.96\n  mediafold run ./companies --first-only --progress\n  mediafold run ./companies --json > events.jsonl\n  mediafold scan ./companies\n  mediafold completions zsh > _mediafold";

#[derive(Debug, Parser)]
#[command(
    name = "mediafold",
    version,
    about = "Trim company videos, extract first/last frames, and resize folder images",
    after_help = CLI_AFTER_HELP
)]
struct Cli {
    #[command(flatten)]
    global: GlobalOptions,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Parser, Clone, Default)]
struct GlobalOptions {
    /// Show debug logging, including every ffmpeg command line.
    #[arg(long, global = true)]
    verbose: bool,

    /// FFmpeg library log level (quiet, fatal, error, warning, info, debug).
    #[arg(long, global = true, default_value = "error")]
    log_level: String,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Process every folder under ROOT.
    #[command(
        about = "Process a companies folder",
        after_help = "Examples:\n  mediafold run ./companies\n  mediafold run ./companies --trim 10 --ffmpeg /opt/ffmpeg/bin/ffmpeg"
    )]
    Run {
        /// Folder whose subfolders hold the videos and images.
        root: PathBuf,

        /// Seconds of each video to keep.
        #[arg(long, default_value_t = DEFAULT_TRIM_SECONDS.to_string())]
        trim: String,

        /// Path to the ffmpeg executable (default: bundled, MEDIAFOLD_FFMPEG, or PATH).
        #[arg(long)]
        ffmpeg: Option<PathBuf>,

        /// Only process the first video and first PNG in each folder.
        #[arg(long)]
        first_only: bool,

        /// Skip the H.264/AAC re-encode.
        #[arg(long)]
        no_transcode: bool,

        /// Image width after resizing.
        #[arg(long, default_value_t = DEFAULT_IMAGE_SIZE.0)]
        width: u32,

        /// Image height after resizing.
        #[arg(long, default_value_t = DEFAULT_IMAGE_SIZE.1)]
        height: u32,

        /// Show a progress bar.
        #[arg(long)]
        progress: bool,

        /// Print every event as a JSON line instead of text.
        #[arg(long, conflicts_with = "progress")]
        json: bool,
    },

    /// List the folders and files a run would touch, without changing anything.
    #[command(about = "Dry run: list folders and media")]
    Scan {
        /// Folder whose subfolders hold the videos and images.
        root: PathBuf,

        /// Only list the first video and first PNG in each folder.
        #[arg(long)]
        first_only: bool,

        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Generate shell completion scripts.
    #[command(about = "Generate shell completions")]
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn init_logging(global: &GlobalOptions) -> Result<(), Box<dyn std::error::Error>> {
    let default_level = if global.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    };
    env_logger::Builder::new()
        .filter_level(default_level)
        .parse_default_env()
        .format_timestamp_secs()
        .init();

    let level: FfmpegLogLevel = global.log_level.parse()?;
    mediafold::set_ffmpeg_log_level(level);
    Ok(())
}

fn selection(first_only: bool) -> SelectionPolicy {
    if first_only {
        SelectionPolicy::FirstOnly
    } else {
        SelectionPolicy::Every
    }
}

fn event_json(event: &PipelineEvent) -> serde_json::Value {
    match event {
        PipelineEvent::Message(text) => json!({ "event": "message", "message": text }),
        PipelineEvent::Percent(value) => json!({ "event": "percent", "percent": value }),
        PipelineEvent::Finished(summary) => json!({
            "event": "finished",
            "folders": summary.folders,
            "videos_processed": summary.videos_processed,
            "videos_failed": summary.videos_failed,
            "images_resized": summary.images_resized,
            "images_failed": summary.images_failed,
        }),
        PipelineEvent::Failed(error) => json!({ "event": "failed", "error": error }),
    }
}

fn is_failure_message(text: &str) -> bool {
    text.starts_with("Failed")
        || text.starts_with("Error")
        || text.starts_with("No frames")
}

fn print_summary(summary: &RunSummary) {
    println!(
        "{} {}",
        "success:".green().bold(),
        format!(
            "All processing complete. {} folder(s), {} video(s) processed, {} video(s) failed, {} image(s) resized, {} image(s) failed",
            summary.folders,
            summary.videos_processed,
            summary.videos_failed,
            summary.images_resized,
            summary.images_failed,
        )
        .green()
    );
}

/// Drain events until the terminal one. Returns the terminal event.
fn drain_events(
    events: Receiver<PipelineEvent>,
    json_output: bool,
    progress_bar: Option<&ProgressBar>,
) -> Result<Option<PipelineEvent>, Box<dyn std::error::Error>> {
    for event in events {
        if json_output {
            println!("{}", serde_json::to_string(&event_json(&event))?);
        } else {
            match &event {
                PipelineEvent::Message(text) => {
                    let line = if is_failure_message(text) {
                        format!("{} {}", "warning:".yellow().bold(), text.yellow())
                    } else {
                        text.clone()
                    };
                    match progress_bar {
                        Some(bar) => bar.println(line),
                        None => println!("{line}"),
                    }
                }
                PipelineEvent::Percent(value) => {
                    if let Some(bar) = progress_bar {
                        bar.set_position(u64::from(*value));
                    }
                }
                PipelineEvent::Finished(_) | PipelineEvent::Failed(_) => {}
            }
        }

        if event.is_terminal() {
            return Ok(Some(event));
        }
    }
    Ok(None)
}

#[allow(clippy::too_many_arguments)]
fn run_pipeline(
    root: &Path,
    trim: &str,
    ffmpeg: Option<PathBuf>,
    first_only: bool,
    no_transcode: bool,
    width: u32,
    height: u32,
    progress: bool,
    json_output: bool,
    verbose: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let trim_duration = mediafold::parse_trim_duration(trim)?;

    let mut config = JobConfig::new(root, trim_duration)
        .with_selection(selection(first_only))
        .with_transcode(!no_transcode)
        .with_image_size(width, height);
    if let Some(path) = ffmpeg {
        config = config.with_ffmpeg_path(path);
    }

    if verbose {
        let binary = config.validate()?;
        match Transcoder::new(&binary).version() {
            Ok(version) => eprintln!("using {} ({version})", binary.display()),
            Err(error) => eprintln!(
                "{} {}",
                "warning:".yellow().bold(),
                format!("could not query {}: {error}", binary.display()).yellow()
            ),
        }
    }

    let mut supervisor = Supervisor::new();
    let events = supervisor.start(config)?;

    if !json_output {
        println!("Starting processing...");
    }

    let progress_bar = if progress {
        let bar = ProgressBar::new(100);
        let style = ProgressStyle::with_template("{spinner:.green} {bar:40.cyan/blue} {pos:>3}%")?;
        bar.set_style(style.progress_chars("##-"));
        Some(bar)
    } else {
        None
    };

    let terminal = drain_events(events, json_output, progress_bar.as_ref())?;

    if let Some(bar) = &progress_bar {
        bar.finish_and_clear();
    }

    let outcome = supervisor.wait();

    match terminal {
        Some(PipelineEvent::Finished(summary)) => {
            if !json_output {
                print_summary(&summary);
            }
            Ok(())
        }
        Some(PipelineEvent::Failed(error)) => Err(error.into()),
        _ => match outcome {
            Ok(Some(summary)) => {
                if !json_output {
                    print_summary(&summary);
                }
                Ok(())
            }
            Ok(None) => Err("processing ended without a result".into()),
            Err(error) => Err(error.into()),
        },
    }
}

fn scan(root: &Path, first_only: bool, json_output: bool) -> Result<(), Box<dyn std::error::Error>> {
    let policy = selection(first_only);
    let directories = mediafold::discover(root)?;

    let mut folders = Vec::with_capacity(directories.len());
    for directory in &directories {
        folders.push(FolderEntry::scan(directory)?);
    }

    if json_output {
        let payload: Vec<_> = folders
            .iter()
            .map(|folder| {
                json!({
                    "folder": folder.path.display().to_string(),
                    "videos": policy
                        .select(&folder.videos)
                        .iter()
                        .map(|path| path.display().to_string())
                        .collect::<Vec<_>>(),
                    "images": policy
                        .select(&folder.images)
                        .iter()
                        .map(|path| path.display().to_string())
                        .collect::<Vec<_>>(),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&payload)?);
        return Ok(());
    }

    for folder in &folders {
        println!("{}", folder.path.display().to_string().bold());
        let videos = policy.select(&folder.videos);
        let images = policy.select(&folder.images);
        if videos.is_empty() {
            println!("  {}", "no video".dimmed());
        }
        for video in videos {
            println!("  video  {}", video.display());
        }
        if images.is_empty() {
            println!("  {}", "no PNG".dimmed());
        }
        for image in images {
            println!("  image  {}", image.display());
        }
    }
    println!("{} folder(s)", folders.len());
    Ok(())
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(&cli.global)?;

    match cli.command {
        Commands::Run {
            root,
            trim,
            ffmpeg,
            first_only,
            no_transcode,
            width,
            height,
            progress,
            json,
        } => run_pipeline(
            &root,
            &trim,
            ffmpeg,
            first_only,
            no_transcode,
            width,
            height,
            progress,
            json,
            cli.global.verbose,
        )?,
        Commands::Scan {
            root,
            first_only,
            json,
        } => scan(&root, first_only, json)?,
        Commands::Completions { shell } => {
            let mut command = Cli::command();
            clap_complete::generate(shell, &mut command, "mediafold", &mut std::io::stdout());
        }
    }

    Ok(())
}

fn main() {
    if let Err(error) = run() {
        eprintln!("{} {error}", "error:".red().bold());
        std::process::exit(1);
    }
}
