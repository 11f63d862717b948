//! Watch events and the filter that decides which of them trigger work.

use std::path::{Path, PathBuf};

use super::is_allowed_image;

/// What happened to a path.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum WatchEventKind {
    /// The file was created. Its contents may not be written yet.
    Created,
    /// A write to the file finished.
    Modified,
    /// The file was moved into the watched folder; `path` is the destination.
    Moved,
}

/// A single filesystem notification, consumed once by the filter.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WatchEvent {
    pub kind: WatchEventKind,
    pub path: PathBuf,
}

impl WatchEvent {
    pub fn new(kind: WatchEventKind, path: impl Into<PathBuf>) -> Self {
        Self {
            kind,
            path: path.into(),
        }
    }

    pub fn created(path: impl Into<PathBuf>) -> Self {
        Self::new(WatchEventKind::Created, path)
    }

    pub fn modified(path: impl Into<PathBuf>) -> Self {
        Self::new(WatchEventKind::Modified, path)
    }

    pub fn moved(path: impl Into<PathBuf>) -> Self {
        Self::new(WatchEventKind::Moved, path)
    }
}

/// Why an event did not trigger inference.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RejectReason {
    /// Creation is always followed by the write that fills the file, and
    /// that write is what gets processed.
    CreationEvent,
    /// The file is not one of the accepted raster formats.
    UnsupportedFileType,
}

/// Result of filtering an event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FilterDecision {
    Accept,
    Reject(RejectReason),
}

/// Decides whether an event should be dispatched.
///
/// At most one inference per logical write: a new file raises both a
/// creation and a write event, and only the write is accepted. Moves are
/// accepted since no creation precedes them inside the folder.
pub fn filter_event(event: &WatchEvent) -> FilterDecision {
    match event.kind {
        WatchEventKind::Created => FilterDecision::Reject(RejectReason::CreationEvent),
        WatchEventKind::Modified | WatchEventKind::Moved => filter_path(&event.path),
    }
}

/// Accepts `path` only if it has an allowed image extension.
pub fn filter_path(path: &Path) -> FilterDecision {
    if is_allowed_image(path) {
        FilterDecision::Accept
    } else {
        FilterDecision::Reject(RejectReason::UnsupportedFileType)
    }
}
