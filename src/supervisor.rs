//! Running the pipeline off the caller's thread.
//!
//! [`Supervisor`] is what an interactive front end holds on to. It owns at
//! most one background run at a time and refuses to start another while
//! one is outstanding, so the guard does not depend on disabled buttons or
//! any other UI state. Events come back over a channel in emission order.
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//!
//! use mediafold::{JobConfig, PipelineEvent, Supervisor};
//!
//! let mut supervisor = Supervisor::new();
//! let events = supervisor.start(JobConfig::new("companies", Duration::from_secs(6)))?;
//! for event in events {
//!     if let PipelineEvent::Message(text) = &event {
//!         println!("{text}");
//!     }
//!     if event.is_terminal() {
//!         break;
//!     }
//! }
//! let summary = supervisor.wait()?;
//! # Ok::<(), mediafold::MediafoldError>(())
//! ```

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};

use crate::configuration::JobConfig;
use crate::error::MediafoldError;
use crate::pipeline::Pipeline;
use crate::progress::{EventSink, PipelineEvent, RunSummary};

/// Owns the one in-flight run, if any.
#[derive(Debug, Default)]
pub struct Supervisor {
    active: Option<ActiveRun>,
}

#[derive(Debug)]
struct ActiveRun {
    handle: JoinHandle<Result<RunSummary, MediafoldError>>,
    /// Set just before the terminal event is sent.
    settled: Arc<AtomicBool>,
}

impl ActiveRun {
    fn is_settled(&self) -> bool {
        self.settled.load(Ordering::Acquire) || self.handle.is_finished()
    }
}

/// Forwards events to the channel and marks the run settled on the
/// terminal one.
struct SettlingSender {
    sender: Sender<PipelineEvent>,
    settled: Arc<AtomicBool>,
}

impl EventSink for SettlingSender {
    fn emit(&self, event: PipelineEvent) {
        if event.is_terminal() {
            self.settled.store(true, Ordering::Release);
        }
        self.sender.emit(event);
    }
}

impl Supervisor {
    /// A supervisor with no run in flight.
    pub fn new() -> Self {
        Self { active: None }
    }

    /// Validate `config` and start a run on a background thread.
    ///
    /// Returns the receiving end of the run's event channel. The last event
    /// received is always terminal. There is no way to stop a run once it
    /// has started. Once the previous run's terminal event has been
    /// received, a new run can be started right away; the old worker is
    /// joined first and its result discarded.
    ///
    /// # Errors
    ///
    /// - [`MediafoldError::RunInProgress`] if the previous run has not
    ///   emitted its terminal event.
    /// - Any validation error from [`Pipeline::new`]; no thread is started.
    /// - [`MediafoldError::IoError`] if the thread cannot be spawned.
    pub fn start(&mut self, config: JobConfig) -> Result<Receiver<PipelineEvent>, MediafoldError> {
        if self.is_running() {
            return Err(MediafoldError::RunInProgress);
        }
        if let Some(previous) = self.active.take() {
            // Settled: at most the thread's final return is left to run.
            if previous.handle.join().is_err() {
                log::warn!("Previous worker panicked after its terminal event");
            }
        }

        let pipeline = Pipeline::new(config)?;
        let (sender, receiver) = mpsc::channel();
        let settled = Arc::new(AtomicBool::new(false));
        let sink = SettlingSender {
            sender,
            settled: Arc::clone(&settled),
        };

        let handle = thread::Builder::new()
            .name("mediafold-worker".to_string())
            .spawn(move || {
                match panic::catch_unwind(AssertUnwindSafe(|| pipeline.execute(&sink))) {
                    Ok(result) => result,
                    Err(payload) => {
                        let message = panic_message(payload.as_ref());
                        log::error!("Worker panicked: {message}");
                        sink.emit(PipelineEvent::Failed(message.clone()));
                        Err(MediafoldError::WorkerPanicked(message))
                    }
                }
            })?;

        self.active = Some(ActiveRun { handle, settled });
        Ok(receiver)
    }

    /// Returns `true` while a started run has not emitted its terminal
    /// event.
    pub fn is_running(&self) -> bool {
        self.active.as_ref().is_some_and(|run| !run.is_settled())
    }

    /// Block until the current run ends and return its summary.
    ///
    /// Returns `Ok(None)` if no run was started since the last `wait`.
    ///
    /// # Errors
    ///
    /// The run's own error, or [`MediafoldError::WorkerPanicked`].
    pub fn wait(&mut self) -> Result<Option<RunSummary>, MediafoldError> {
        let Some(run) = self.active.take() else {
            return Ok(None);
        };
        run.handle
            .join()
            .map_err(|payload| MediafoldError::WorkerPanicked(panic_message(payload.as_ref())))?
            .map(Some)
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
