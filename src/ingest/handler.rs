//! The per-event handler and the serial event loop.

use std::path::{Path, PathBuf};

use super::dispatch::Dispatch;
use super::event::{filter_event, filter_path, FilterDecision, RejectReason, WatchEvent};
use crate::detection::io_json::{output_path_for, write_detections_json};
use crate::error::TilewatchError;

/// Anything that reacts to watch events.
pub trait EventHandler {
    /// Handles one event to completion.
    fn handle(&mut self, event: WatchEvent) -> HandleOutcome;
}

/// How the handling of one event ended.
#[derive(Debug)]
pub enum HandleOutcome {
    /// The filter turned the event away; nothing was done.
    Rejected(RejectReason),
    /// Detections were written to `output`.
    Completed {
        source: PathBuf,
        output: PathBuf,
        detections: usize,
    },
    /// Loading, inference or writing failed. Nothing is retried.
    Failed {
        source: PathBuf,
        error: TilewatchError,
    },
}

impl HandleOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, HandleOutcome::Completed { .. })
    }
}

/// Running totals for one handler.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct IngestStats {
    pub rejected: usize,
    pub completed: usize,
    pub failed: usize,
}

impl IngestStats {
    /// Events that made it past the filter.
    pub fn dispatched(&self) -> usize {
        self.completed + self.failed
    }
}

/// Filters events, dispatches accepted images and writes the results.
///
/// The JSON for `in/photo.jpg` goes to `<output_dir>/photo.json`,
/// overwriting any previous result for the same stem.
pub struct IngestHandler<D> {
    dispatcher: D,
    output_dir: PathBuf,
    stats: IngestStats,
}

impl<D: Dispatch> IngestHandler<D> {
    pub fn new(dispatcher: D, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            dispatcher,
            output_dir: output_dir.into(),
            stats: IngestStats::default(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn stats(&self) -> IngestStats {
        self.stats
    }

    /// Runs the dispatch step for `path` directly, skipping event filtering
    /// but still enforcing the extension allow-list.
    pub fn process(&mut self, path: &Path) -> HandleOutcome {
        if let FilterDecision::Reject(reason) = filter_path(path) {
            return self.reject(path, reason);
        }

        log::info!("Processing image {}", path.display());
        match self.dispatch_and_write(path) {
            Ok((output, detections)) => {
                self.stats.completed += 1;
                log::info!(
                    "...done: {} detection(s) written to {}",
                    detections,
                    output.display()
                );
                HandleOutcome::Completed {
                    source: path.to_path_buf(),
                    output,
                    detections,
                }
            }
            Err(error) => {
                self.stats.failed += 1;
                log::error!("Failed to process {}: {}", path.display(), error);
                HandleOutcome::Failed {
                    source: path.to_path_buf(),
                    error,
                }
            }
        }
    }

    fn dispatch_and_write(&self, path: &Path) -> Result<(PathBuf, usize), TilewatchError> {
        let detections = self.dispatcher.dispatch(path)?;
        let output = output_path_for(path, &self.output_dir);
        write_detections_json(&output, &detections)?;
        Ok((output, detections.len()))
    }

    fn reject(&mut self, path: &Path, reason: RejectReason) -> HandleOutcome {
        self.stats.rejected += 1;
        log::debug!("Ignoring {} ({:?})", path.display(), reason);
        HandleOutcome::Rejected(reason)
    }
}

impl<D: Dispatch> EventHandler for IngestHandler<D> {
    fn handle(&mut self, event: WatchEvent) -> HandleOutcome {
        match filter_event(&event) {
            FilterDecision::Accept => self.process(&event.path),
            FilterDecision::Reject(reason) => self.reject(&event.path, reason),
        }
    }
}

/// Feeds every event to `handler`, one at a time and in order.
///
/// Each event is handled to completion before the next is pulled from the
/// source, so two events never race on the same output file. Returns the
/// number of events handled once the source is exhausted; a live folder
/// watcher never is.
pub fn run_event_loop<I, H>(events: I, handler: &mut H) -> usize
where
    I: IntoIterator<Item = WatchEvent>,
    H: EventHandler + ?Sized,
{
    let mut handled = 0;
    for event in events {
        handler.handle(event);
        handled += 1;
    }
    handled
}
