// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! EventDetector plugin boundary (spec.md §2, §4.1 table): produces a
//! stream of `EventRecord`s for the TaskProvider. One concrete
//! implementation, a filesystem watcher built on the `notify` crate,
//! modeled on the accept-and-forward-to-a-channel shape of
//! `other_examples/…kubetail…log_metadata_watcher.rs`'s `LogMetadataWatcher`
//! (minus its debouncer, which this workspace does not depend on).

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use hidra_core::EventRecord;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Which filesystem event kinds count as "a file is ready" (spec.md §6
/// `--monitored-events`). A bare `Create` often fires while the detector is
/// still writing; `CloseWrite`/`MovedTo` are the conservative defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MonitoredEvent {
    Create,
    CloseWrite,
    MovedTo,
}

impl MonitoredEvent {
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim() {
            "create" | "IN_CREATE" => Some(MonitoredEvent::Create),
            "close_write" | "IN_CLOSE_WRITE" => Some(MonitoredEvent::CloseWrite),
            "moved_to" | "IN_MOVED_TO" => Some(MonitoredEvent::MovedTo),
            _ => None,
        }
    }

    fn matches(self, kind: &EventKind) -> bool {
        match self {
            MonitoredEvent::Create => matches!(kind, EventKind::Create(_)),
            MonitoredEvent::CloseWrite => {
                matches!(kind, EventKind::Access(notify::event::AccessKind::Close(
                    notify::event::AccessMode::Write,
                )))
            }
            MonitoredEvent::MovedTo => matches!(
                kind,
                EventKind::Modify(notify::event::ModifyKind::Name(
                    notify::event::RenameMode::To
                ))
            ),
        }
    }
}

#[async_trait]
pub trait EventDetector: Send {
    /// Blocks (bounded by an internal timeout) for the next event. Returns
    /// `None` once the detector has permanently stopped (spec.md §4.3: the
    /// TaskProvider keeps draining it, even while asleep, so internal
    /// buffers never overflow).
    async fn next_event(&mut self) -> Option<EventRecord>;
}

#[derive(Debug, Error)]
pub enum WatchError {
    #[error("monitored directory does not exist: {0}")]
    MissingDirectory(PathBuf),
    #[error("fix-subdir does not exist under monitored directory: {0}")]
    MissingFixSubdir(PathBuf),
    #[error("notify watcher error: {0}")]
    Notify(#[from] notify::Error),
}

/// Inotify-style filesystem watcher. Fixed subdirectories (`--fix-subdirs`)
/// are watched non-recursively in addition to the monitored root so events
/// inside them are still seen when the root itself is watched
/// non-recursively (spec.md §6).
#[derive(Debug)]
pub struct FsEventDetector {
    _watcher: RecommendedWatcher,
    rx: mpsc::Receiver<EventRecord>,
    poll_timeout: Duration,
}

impl FsEventDetector {
    pub fn new(
        monitored_dir: &Path,
        fix_subdirs: &[PathBuf],
        monitored_events: Vec<MonitoredEvent>,
    ) -> Result<Self, WatchError> {
        if !monitored_dir.is_dir() {
            return Err(WatchError::MissingDirectory(monitored_dir.to_path_buf()));
        }
        for sub in fix_subdirs {
            let full = monitored_dir.join(sub);
            if !full.is_dir() {
                return Err(WatchError::MissingFixSubdir(full));
            }
        }

        let (tx, rx) = mpsc::channel(256);
        let monitored_dir_owned = monitored_dir.to_path_buf();
        let runtime = tokio::runtime::Handle::current();

        let mut watcher = notify::recommended_watcher(move |result: notify::Result<Event>| {
            let event = match result {
                Ok(event) => event,
                Err(e) => {
                    warn!(error = %e, "notify watcher error");
                    return;
                }
            };
            if !monitored_events.iter().any(|m| m.matches(&event.kind)) {
                return;
            }
            for path in &event.paths {
                if let Some(record) = path_to_event_record(&monitored_dir_owned, path) {
                    let tx = tx.clone();
                    runtime.spawn(async move {
                        if tx.send(record).await.is_err() {
                            debug!("event detector receiver dropped");
                        }
                    });
                }
            }
        })?;

        watcher.watch(monitored_dir, RecursiveMode::Recursive)?;

        Ok(Self { _watcher: watcher, rx, poll_timeout: Duration::from_secs(1) })
    }
}

fn path_to_event_record(root: &Path, path: &Path) -> Option<EventRecord> {
    let relative = path.strip_prefix(root).ok()?;
    let filename = relative.file_name()?.to_string_lossy().into_owned();
    let relative_dir = relative.parent().map(|p| p.to_string_lossy().into_owned()).unwrap_or_default();
    Some(EventRecord::new(root.to_string_lossy().into_owned(), relative_dir, filename))
}

#[async_trait]
impl EventDetector for FsEventDetector {
    async fn next_event(&mut self) -> Option<EventRecord> {
        tokio::time::timeout(self.poll_timeout, self.rx.recv()).await.ok().flatten()
    }
}
