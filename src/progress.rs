//! Progress events and where they go.
//!
//! A run reports what it is doing as a stream of [`PipelineEvent`]s: status
//! messages, a completion percentage, and exactly one terminal event.
//! Events are advisory. Delivering one never blocks the pipeline and never
//! changes what it does next.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::mpsc;
//! use std::time::Duration;
//!
//! use mediafold::{JobConfig, Pipeline, PipelineEvent};
//!
//! let (sender, receiver) = mpsc::channel();
//! let pipeline = Pipeline::new(JobConfig::new("companies", Duration::from_secs(6)))?;
//! std::thread::spawn(move || pipeline.execute(&sender));
//!
//! for event in receiver {
//!     match event {
//!         PipelineEvent::Message(text) => println!("{text}"),
//!         PipelineEvent::Percent(value) => println!("{value}%"),
//!         PipelineEvent::Finished(_) => println!("done"),
//!         PipelineEvent::Failed(error) => eprintln!("error: {error}"),
//!     }
//! }
//! # Ok::<(), mediafold::MediafoldError>(())
//! ```

use std::sync::mpsc::Sender;

/// Counts collected over one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Directories visited.
    pub folders: u64,
    /// Videos that went through every step without an error.
    pub videos_processed: u64,
    /// Videos for which some step failed.
    pub videos_failed: u64,
    /// Images resized to the target size.
    pub images_resized: u64,
    /// Images that could not be resized.
    pub images_failed: u64,
}

/// One event emitted by a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineEvent {
    /// A human-readable status line.
    Message(String),
    /// Completion percentage, 0 to 100.
    Percent(u8),
    /// Terminal: the run visited every folder.
    Finished(RunSummary),
    /// Terminal: the run stopped early because of an unexpected error.
    Failed(String),
}

impl PipelineEvent {
    /// Returns `true` for the events that end a run.
    pub fn is_terminal(&self) -> bool {
        matches!(self, PipelineEvent::Finished(_) | PipelineEvent::Failed(_))
    }
}

/// Receives events from a run.
///
/// Implementations must be [`Send`] and [`Sync`] because the run usually
/// lives on a worker thread. `emit` is infallible and must not block.
pub trait EventSink: Send + Sync {
    /// Deliver one event.
    fn emit(&self, event: PipelineEvent);
}

/// An unbounded channel. A dropped receiver is ignored; the run carries on
/// with nobody listening.
impl EventSink for Sender<PipelineEvent> {
    fn emit(&self, event: PipelineEvent) {
        let _ = self.send(event);
    }
}

/// Adapts a closure into an [`EventSink`].
pub struct FnSink<F>(pub F);

impl<F> EventSink for FnSink<F>
where
    F: Fn(PipelineEvent) + Send + Sync,
{
    fn emit(&self, event: PipelineEvent) {
        (self.0)(event);
    }
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpSink;

impl EventSink for NoOpSink {
    fn emit(&self, _event: PipelineEvent) {}
}

/// Turns folder completions into [`PipelineEvent::Percent`] events.
///
/// Both sides of the ratio count folders: `visited / total`.
#[derive(Debug)]
pub(crate) struct ProgressTracker {
    total: u64,
    visited: u64,
    last_reported: Option<u8>,
}

impl ProgressTracker {
    pub(crate) fn new(total: u64) -> Self {
        Self {
            total,
            visited: 0,
            last_reported: None,
        }
    }

    /// Record one finished folder and report the new percentage if it
    /// changed.
    pub(crate) fn advance(&mut self, sink: &dyn EventSink) {
        self.visited = (self.visited + 1).min(self.total);
        self.report(sink);
    }

    /// Report 100% unless it was already reported.
    pub(crate) fn finish(&mut self, sink: &dyn EventSink) {
        self.visited = self.total;
        self.report(sink);
    }

    pub(crate) fn percent(&self) -> u8 {
        if self.total == 0 {
            return 100;
        }
        ((self.visited * 100) / self.total) as u8
    }

    fn report(&mut self, sink: &dyn EventSink) {
        let percent = self.percent();
        if self.last_reported != Some(percent) {
            self.last_reported = Some(percent);
            sink.emit(PipelineEvent::Percent(percent));
        }
    }
}
