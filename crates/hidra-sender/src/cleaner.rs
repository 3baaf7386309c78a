// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cleaner: tracks per-file confirmation counts from the external `confirm`
//! socket and finalizes files once every chunk has been acknowledged
//! (spec.md §4.5, I5). Registrations arrive from dispatchers over an mpsc
//! channel; confirmation frames arrive over [`InboundListener`].

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use hidra_core::{ConfirmationRecord, RemoveData};
use hidra_plugins::{DataFetcher, FinalizeAction};
use hidra_transport::InboundListener;
use hidra_wire::{ConfirmationFrame, ErrorKind, StatusReply};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::dispatcher::{CleanerRegistration, SharedStatus};

struct TrackedFile {
    record: ConfirmationRecord,
    file_identifier: String,
    registered_at: Instant,
}

pub struct Cleaner<F> {
    fetcher: F,
    store_data: bool,
    local_target: Option<PathBuf>,
    grace_period: Duration,
    status: SharedStatus,
    files: HashMap<String, TrackedFile>,
}

impl<F: DataFetcher> Cleaner<F> {
    pub fn new(
        fetcher: F,
        store_data: bool,
        local_target: Option<PathBuf>,
        grace_period: Duration,
        status: SharedStatus,
    ) -> Self {
        Self { fetcher, store_data, local_target, grace_period, status, files: HashMap::new() }
    }

    pub async fn run(
        mut self,
        listener: InboundListener,
        mut registrations: mpsc::Receiver<CleanerRegistration>,
        cancel: CancellationToken,
    ) {
        let (confirm_tx, mut confirm_rx) = mpsc::channel(256);
        let accept_cancel = cancel.clone();
        let accept = tokio::spawn(listener.run(confirm_tx, accept_cancel));

        let mut sweep = tokio::time::interval(self.grace_period.max(Duration::from_secs(1)));
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                reg = registrations.recv() => {
                    match reg {
                        Some(reg) => self.register(reg).await,
                        None => break,
                    }
                }
                frames = confirm_rx.recv() => {
                    match frames {
                        Some(frames) => self.handle_confirmation(&frames).await,
                        None => break,
                    }
                }
                _ = sweep.tick() => self.sweep_grace_period(),
            }
        }
        let _ = accept.await;
    }

    async fn register(&mut self, reg: CleanerRegistration) {
        let entry = self.files.entry(reg.file_identifier.clone()).or_insert_with(|| TrackedFile {
            record: ConfirmationRecord::new(reg.source_path.clone()),
            file_identifier: reg.file_identifier.clone(),
            registered_at: Instant::now(),
        });
        entry.record.set_total_chunks(reg.total_chunks);
        debug!(file = %reg.file_identifier, total = reg.total_chunks, "cleaner tracking file");
        if entry.record.is_complete() {
            self.finalize_if_complete(&reg.file_identifier).await;
        }
    }

    async fn handle_confirmation(&mut self, frames: &[bytes::Bytes]) {
        let Some(frame) = ConfirmationFrame::from_wire_frames(frames) else {
            warn!("malformed confirmation frame, ignoring");
            return;
        };
        let entry = self.files.entry(frame.file_identifier.clone()).or_insert_with(|| TrackedFile {
            record: ConfirmationRecord::new(PathBuf::new()),
            file_identifier: frame.file_identifier.clone(),
            registered_at: Instant::now(),
        });
        entry.record.observe_chunk(frame.chunk_number);
        if entry.record.is_complete() {
            self.finalize_if_complete(&frame.file_identifier).await;
        }
    }

    async fn finalize_if_complete(&mut self, file_identifier: &str) {
        let Some(tracked) = self.files.remove(file_identifier) else { return };
        if !tracked.record.is_complete() {
            self.files.insert(file_identifier.to_string(), tracked);
            return;
        }
        let action = if self.store_data {
            match &self.local_target {
                Some(dir) => FinalizeAction::Move(dir.join(tracked.record.source_file_path.file_name().unwrap_or_default())),
                None => FinalizeAction::Keep,
            }
        } else {
            FinalizeAction::Delete
        };
        let event = hidra_core::EventRecord::new(
            tracked.record.source_file_path.parent().map(|p| p.to_string_lossy().into_owned()).unwrap_or_default(),
            "",
            tracked.record.source_file_path.file_name().map(|f| f.to_string_lossy().into_owned()).unwrap_or_default(),
        );
        if let Err(e) = self.fetcher.finalize(&event, action).await {
            warn!(error = %e, "cleaner finalize failed");
        }
        debug!(file = %tracked.file_identifier, "confirmed complete, finalized");
    }

    fn sweep_grace_period(&mut self) {
        let now = Instant::now();
        let mut overdue = Vec::new();
        for (id, tracked) in &self.files {
            if now.duration_since(tracked.registered_at) > self.grace_period {
                overdue.push(id.clone());
            }
        }
        for id in overdue {
            warn!(file = %id, "confirmation grace period elapsed, file retained");
            *self.status.lock() =
                StatusReply::Error { kind: ErrorKind::ConfirmationTimeout, value: id };
        }
    }
}

/// `remove_data == with_confirmation` is the only configuration under which
/// a Cleaner instance is useful; callers construct one only in that case.
pub fn requires_cleaner(remove_data: RemoveData) -> bool {
    remove_data.requires_confirmation()
}
