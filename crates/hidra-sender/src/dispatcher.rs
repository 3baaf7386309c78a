// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! DataDispatcher: one per worker id `k/N` (spec.md §4.4). Streams a
//! work item's file to every resolved target, applies the local storage
//! policy, and reports its own health on a shared status handle.
//!
//! Control-bus handling is split into a small background task per
//! dispatcher that turns `SLEEP`/`WAKEUP`/`CLOSE_SOCKETS`/`EXIT` into cheap
//! shared state (`DispatcherState`) the main loop checks between chunks,
//! rather than threading a `&mut BusReceiver` through the chunk loop
//! itself — the same "shared context, independent poll loops" shape as
//! `oj-daemon/src/listener/mod.rs`'s `ListenCtx`.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use hidra_core::{Endpoint, RemoveData, StoragePolicy, Target, TargetMode, WorkItem};
use hidra_plugins::{DataFetcher, FinalizeAction};
use hidra_transport::{BusReceiver, PushCache, RouterReceiver};
use hidra_wire::{chunk_count, ChunkHeader, ControlMessage, DataFrame, ErrorKind, StatusReply};
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

/// A dispatcher's own reported status, shared with the status REQ/REP
/// server (spec.md §4.4, §6).
pub type SharedStatus = Arc<Mutex<StatusReply>>;

pub fn shared_status() -> SharedStatus {
    Arc::new(Mutex::new(StatusReply::Ok))
}

/// Tells the Cleaner to expect confirmations for one file (spec.md §4.4
/// step 6, §4.5).
#[derive(Debug, Clone)]
pub struct CleanerRegistration {
    pub file_identifier: String,
    pub total_chunks: u64,
    pub source_path: PathBuf,
}

struct DispatcherState {
    sleeping: AtomicBool,
    pending_closes: Mutex<Vec<Endpoint>>,
}

impl DispatcherState {
    fn new() -> Self {
        Self { sleeping: AtomicBool::new(false), pending_closes: Mutex::new(Vec::new()) }
    }

    fn drain_closes(&self) -> Vec<Endpoint> {
        std::mem::take(&mut self.pending_closes.lock())
    }
}

async fn run_bus_watcher(mut bus: BusReceiver, state: Arc<DispatcherState>, cancel: CancellationToken) {
    loop {
        match bus.recv().await {
            Some(ControlMessage::Sleep) => state.sleeping.store(true, Ordering::Relaxed),
            Some(ControlMessage::Wakeup) => state.sleeping.store(false, Ordering::Relaxed),
            Some(ControlMessage::CloseSockets { endpoints }) => {
                state.pending_closes.lock().extend(endpoints)
            }
            Some(ControlMessage::Exit) | None => {
                cancel.cancel();
                return;
            }
        }
    }
}

pub struct DataDispatcher<F> {
    worker_id: String,
    fetcher: F,
    push_cache: PushCache,
    chunksize: u64,
    policy: StoragePolicy,
    local_target: Option<PathBuf>,
    cleaner: mpsc::Sender<CleanerRegistration>,
    status: SharedStatus,
}

impl<F: DataFetcher> DataDispatcher<F> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        worker_id: String,
        fetcher: F,
        io_timeout: Duration,
        chunksize: u64,
        policy: StoragePolicy,
        local_target: Option<PathBuf>,
        cleaner: mpsc::Sender<CleanerRegistration>,
        status: SharedStatus,
    ) -> Self {
        Self {
            worker_id,
            fetcher,
            push_cache: PushCache::new(io_timeout),
            chunksize,
            policy,
            local_target,
            cleaner,
            status,
        }
    }

    pub async fn run(mut self, router: RouterReceiver, bus: BusReceiver, cancel: CancellationToken) {
        let state = Arc::new(DispatcherState::new());
        let watcher = tokio::spawn(run_bus_watcher(bus, state.clone(), cancel.clone()));

        loop {
            if cancel.is_cancelled() {
                break;
            }
            if state.sleeping.load(Ordering::Relaxed) {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(Duration::from_millis(50)) => continue,
                }
            }
            tokio::select! {
                _ = cancel.cancelled() => break,
                item = router.recv() => {
                    match item {
                        Some(item) => self.process_item(item, &state, &cancel).await,
                        None => break,
                    }
                }
            }
        }
        watcher.abort();
    }

    async fn process_item(&mut self, item: WorkItem, state: &DispatcherState, cancel: &CancellationToken) {
        let file_identifier = item.event.file_identifier();
        let metadata = match self.fetcher.metadata(&item.event).await {
            Ok(m) => m,
            Err(e) => {
                error!(error = %e, file = %file_identifier, "source read error, abandoning file");
                self.report_error(ErrorKind::SourceReadError, file_identifier);
                return;
            }
        };

        let confirmation_required = self.policy.remove_data.requires_confirmation();
        let confirmation_topic =
            confirmation_required.then(|| format!("confirm/{file_identifier}"));

        let base_header = ChunkHeader {
            filename: item.event.filename.clone(),
            source_path: item.event.source_path.clone(),
            relative_path: item.event.relative_path.clone(),
            filesize: metadata.filesize,
            file_mod_time: metadata.file_mod_time,
            file_create_time: metadata.file_create_time,
            chunksize: self.chunksize,
            chunk_number: 0,
            confirmation_required: confirmation_topic.clone(),
        };

        let (metadata_targets, data_targets): (Vec<Target>, Vec<Target>) =
            item.targets.into_iter().partition(|t| t.mode == TargetMode::Metadata);

        for target in &metadata_targets {
            let frames = DataFrame::Metadata { header: base_header.clone() }.into_wire_frames();
            self.send_to(target, &frames, state).await;
        }

        let total_chunks = chunk_count(metadata.filesize, self.chunksize);
        let mut failed = false;

        for chunk_number in 0..total_chunks {
            if cancel.is_cancelled() {
                debug!(file = %file_identifier, "exiting mid-file, closing cleanly");
                return;
            }
            let closes = state.drain_closes();
            self.push_cache.close_all(&closes);

            let payload = match self.fetcher.read_chunk(&item.event, chunk_number, self.chunksize).await {
                Ok(p) => p,
                Err(e) => {
                    error!(error = %e, file = %file_identifier, "source read error mid-file");
                    self.report_error(ErrorKind::SourceReadError, file_identifier.clone());
                    return;
                }
            };

            let header = ChunkHeader { chunk_number, ..base_header.clone() };
            let frames = DataFrame::Chunk { header, payload }.into_wire_frames();

            for target in &data_targets {
                let ok = self.send_to(target, &frames, state).await;
                if !ok && target.priority == hidra_core::FIXED_STORAGE_PRIORITY {
                    failed = true;
                }
            }
            if failed {
                break;
            }
        }

        if failed {
            return;
        }

        if let (true, Some(topic)) = (confirmation_required, confirmation_topic) {
            let _ = self
                .cleaner
                .send(CleanerRegistration {
                    file_identifier: file_identifier.clone(),
                    total_chunks,
                    source_path: item.event.absolute_path(),
                })
                .await;
            debug!(topic, "registered file with cleaner, awaiting confirmations");
            return;
        }

        self.finalize(&item.event).await;
    }

    /// Returns `false` on a send failure so the caller can apply
    /// priority-0-specific failure handling.
    async fn send_to(&mut self, target: &Target, frames: &[bytes::Bytes], state: &DispatcherState) -> bool {
        let closes = state.drain_closes();
        self.push_cache.close_all(&closes);

        match self.push_cache.send(&target.endpoint, frames).await {
            Ok(()) => true,
            Err(e) => {
                if target.priority == hidra_core::FIXED_STORAGE_PRIORITY {
                    error!(endpoint = %target.endpoint, error = %e, "fixed storage send failed, marking file failed");
                    self.report_error(ErrorKind::TargetSendError, target.endpoint.to_string());
                } else {
                    warn!(endpoint = %target.endpoint, error = %e, "target send failed, continuing");
                }
                false
            }
        }
    }

    async fn finalize(&self, event: &hidra_core::EventRecord) {
        let action = self.resolve_finalize_action(event);
        if let Err(e) = self.fetcher.finalize(event, action).await {
            warn!(error = %e, file = %event.file_identifier(), "finalize failed");
        }
    }

    fn resolve_finalize_action(&self, event: &hidra_core::EventRecord) -> FinalizeAction {
        if self.policy.remove_data.requires_confirmation() {
            return FinalizeAction::Keep;
        }
        match (self.policy.store_data, &self.local_target, self.policy.remove_data) {
            (true, Some(target_dir), RemoveData::True) => {
                FinalizeAction::Move(local_target_path(target_dir, event))
            }
            (true, Some(target_dir), RemoveData::False) => {
                FinalizeAction::Copy(local_target_path(target_dir, event))
            }
            (_, _, RemoveData::True) => FinalizeAction::Delete,
            _ => FinalizeAction::Keep,
        }
    }

    fn report_error(&self, kind: ErrorKind, value: String) {
        *self.status.lock() = StatusReply::Error { kind, value };
    }

    pub fn worker_id(&self) -> &str {
        &self.worker_id
    }
}

fn local_target_path(target_dir: &Path, event: &hidra_core::EventRecord) -> PathBuf {
    target_dir.join(&event.relative_path).join(&event.filename)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use hidra_core::{Endpoint, EventRecord, TargetMode};
    use hidra_plugins::{FetchError, SourceMetadata};
    use hidra_transport::work_router;

    struct FixedFetcher {
        filesize: u64,
    }

    #[async_trait]
    impl DataFetcher for FixedFetcher {
        async fn metadata(&self, _event: &EventRecord) -> Result<SourceMetadata, FetchError> {
            Ok(SourceMetadata { filesize: self.filesize, file_mod_time: 0.0, file_create_time: 0.0 })
        }

        async fn read_chunk(
            &self,
            _event: &EventRecord,
            chunk_number: u64,
            chunksize: u64,
        ) -> Result<bytes::Bytes, FetchError> {
            let len = chunksize.min(self.filesize - chunk_number * chunksize);
            Ok(bytes::Bytes::from(vec![0u8; len as usize]))
        }

        async fn finalize(
            &self,
            _event: &EventRecord,
            _action: FinalizeAction,
        ) -> Result<(), FetchError> {
            Ok(())
        }
    }

    fn work_item(endpoint: Endpoint) -> WorkItem {
        WorkItem::new(
            EventRecord::new("/data", "", "a.cbf"),
            vec![Target { endpoint, priority: 0, mode: TargetMode::Data }],
        )
    }

    #[tokio::test]
    async fn streams_every_chunk_to_a_listening_target() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut count = 0;
            loop {
                match hidra_wire::read_message(&mut stream, Duration::from_secs(1)).await {
                    Ok(_) => count += 1,
                    Err(_) => break,
                }
            }
            count
        });

        let (cleaner_tx, _cleaner_rx) = mpsc::channel(1);
        let dispatcher = DataDispatcher::new(
            "0/1".into(),
            FixedFetcher { filesize: 25 },
            Duration::from_secs(1),
            10,
            StoragePolicy::new(false, RemoveData::False),
            None,
            cleaner_tx,
            shared_status(),
        );

        let (router_tx, router_rx) = work_router();
        let bus = hidra_transport::ControlBus::new();
        let cancel = CancellationToken::new();
        router_tx.send(work_item(Endpoint::new("127.0.0.1", addr.port()))).await.unwrap();

        let run_cancel = cancel.clone();
        let handle = tokio::spawn(dispatcher.run(router_rx, bus.subscribe(), run_cancel));
        tokio::time::sleep(Duration::from_millis(100)).await;
        cancel.cancel();
        let _ = handle.await;
        drop(bus);

        let sent = server.await.unwrap();
        assert_eq!(sent, 3); // ceil(25/10)
    }
}
