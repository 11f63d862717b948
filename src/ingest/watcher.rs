//! Folder watching on top of `notify`.
//!
//! Native events are translated into [`WatchEvent`]s. The translation is
//! where "one logical write" is decided per platform: on Linux, inotify
//! reports a close-after-write exactly once per writer, while a large
//! write raises several data-modification events, so the close is what
//! counts as `Modified`. Other backends have no close notification and use
//! data modification instead.

use std::path::Path;
use std::sync::mpsc::{self, Receiver};

use notify::event::{CreateKind, ModifyKind, RenameMode};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};

use super::event::{WatchEvent, WatchEventKind};
use crate::error::TilewatchError;

/// A live watch on one folder.
///
/// On Linux a file written in several chunks yields one `Modified` event.
/// Elsewhere each data-modification event is reported, so a chunked write
/// can yield several and the file is processed once per event.
///
/// Dropping it stops the watch.
pub struct FolderWatcher {
    _watcher: RecommendedWatcher,
    receiver: Receiver<notify::Result<Event>>,
}

impl FolderWatcher {
    /// Starts watching `folder`. Subfolders are included only if
    /// `recursive` is set.
    pub fn new(folder: &Path, recursive: bool) -> Result<Self, TilewatchError> {
        let (tx, rx) = mpsc::channel();
        let mut watcher = notify::recommended_watcher(tx)?;

        let mode = if recursive {
            RecursiveMode::Recursive
        } else {
            RecursiveMode::NonRecursive
        };
        watcher.watch(folder, mode)?;
        log::info!("Watching {} for new images", folder.display());

        Ok(Self {
            _watcher: watcher,
            receiver: rx,
        })
    }

    /// The events seen so far and from now on, in delivery order.
    ///
    /// Blocks while waiting for the next event and never ends on its own.
    /// Watcher errors are logged and skipped.
    pub fn events(&self) -> impl Iterator<Item = WatchEvent> + '_ {
        self.receiver.iter().flat_map(|result| match result {
            Ok(event) => translate(&event),
            Err(err) => {
                log::warn!("Watch error: {}", err);
                Vec::new()
            }
        })
    }
}

/// Maps one native event onto zero or more watch events.
///
/// Only the Linux mapping collapses a chunked write into a single
/// `Modified`; see [`FolderWatcher`].
pub fn translate(event: &Event) -> Vec<WatchEvent> {
    let kind = match &event.kind {
        EventKind::Create(CreateKind::Folder) => return Vec::new(),
        EventKind::Create(_) => WatchEventKind::Created,
        EventKind::Modify(ModifyKind::Name(RenameMode::To)) => WatchEventKind::Moved,
        // Backends that cannot tell the two sides of a rename apart report
        // both; only the side that now exists was moved in.
        EventKind::Modify(ModifyKind::Name(RenameMode::Any)) => {
            return event
                .paths
                .iter()
                .filter(|path| path.is_file())
                .map(WatchEvent::moved)
                .collect();
        }
        kind if is_finished_write(kind) => WatchEventKind::Modified,
        _ => return Vec::new(),
    };

    event
        .paths
        .iter()
        .map(|path| WatchEvent::new(kind, path))
        .collect()
}

#[cfg(target_os = "linux")]
fn is_finished_write(kind: &EventKind) -> bool {
    use notify::event::{AccessKind, AccessMode};
    matches!(kind, EventKind::Access(AccessKind::Close(AccessMode::Write)))
}

#[cfg(not(target_os = "linux"))]
fn is_finished_write(kind: &EventKind) -> bool {
    matches!(
        kind,
        EventKind::Modify(ModifyKind::Data(_)) | EventKind::Modify(ModifyKind::Any)
    )
}
