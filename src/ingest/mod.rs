//! Change-driven ingestion: from "a file appeared" to "detections on disk".
//!
//! Each watch event walks a small state machine:
//!
//! ```text
//! Idle -> EventReceived -> Filtered --rejected--> Idle
//!                              |
//!                          accepted
//!                              v
//!                         Dispatched -> Completed | Failed -> Idle
//! ```
//!
//! - [`event`]: watch events and the filter deciding which ones trigger work
//! - [`dispatch`]: how an accepted image gets its detections (in-process or
//!   via a remote server)
//! - [`handler`]: the per-event handler, persistence and the serial loop
//! - [`watcher`]: the filesystem watcher producing events
//!
//! Events are handled strictly one at a time. Failures are logged and the
//! handler returns to idle; nothing is retried until the file changes again.

pub mod dispatch;
pub mod event;
pub mod handler;
pub mod watcher;

pub use dispatch::{Dispatch, LocalDispatch};
#[cfg(feature = "remote")]
pub use dispatch::RemoteDispatch;
pub use event::{filter_event, FilterDecision, RejectReason, WatchEvent, WatchEventKind};
pub use handler::{run_event_loop, EventHandler, HandleOutcome, IngestHandler, IngestStats};
pub use watcher::FolderWatcher;

use std::path::Path;

/// Raster formats the pipeline accepts, without the leading dot.
pub const ALLOWED_EXTENSIONS: [&str; 6] = ["png", "jpg", "jpeg", "tiff", "bmp", "gif"];

/// Returns true if `path` has one of the [`ALLOWED_EXTENSIONS`].
///
/// The comparison is exact: `IMG_0001.JPG` is rejected.
pub fn is_allowed_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            ALLOWED_EXTENSIONS
                .iter()
                .any(|allowed| ext == *allowed)
        })
        .unwrap_or(false)
}
