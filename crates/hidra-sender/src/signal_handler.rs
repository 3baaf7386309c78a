// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! SignalHandler: owns the two subscription registries and answers every
//! control-plane request that touches them (spec.md §4.2) — external
//! `com` signals, external `request` NEXT/CANCEL, and the internal
//! `request_fw` lookups the TaskProvider makes for every event. Grounded on
//! `oj-daemon/src/listener/mod.rs`'s `ListenCtx` (one shared context, many
//! concurrent accept loops against it).

use std::collections::HashSet;
use std::sync::Arc;

use hidra_core::{
    Endpoint, HostResolver, Mode, QueryNodeSet, Registry, StreamNodeSet, Subscription, Target,
};
use hidra_transport::{PullListener, ReqRepServer, RequestFwServer};
use hidra_wire::{
    ExternalRequest, GetRequestsReply, SenderVersion, SignalKind, SignalReply, SignalRequest,
    TargetSpec,
};
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::warn;

/// Shared state behind every SignalHandler listener. Locks are held only
/// across the synchronous registry calls, never across an `.await`.
pub struct SignalHandler {
    stream_registry: Mutex<Registry<StreamNodeSet>>,
    query_registry: Mutex<Registry<QueryNodeSet>>,
    resolver: Arc<dyn HostResolver>,
    allow_list: Vec<String>,
    store_data: bool,
}

impl SignalHandler {
    pub fn new(resolver: Arc<dyn HostResolver>, allow_list: Vec<String>, store_data: bool) -> Arc<Self> {
        Arc::new(Self {
            stream_registry: Mutex::new(Registry::new()),
            query_registry: Mutex::new(Registry::new()),
            resolver,
            allow_list,
            store_data,
        })
    }

    /// Serves an already-bound external `com` REQ/REP socket (spec.md §4.2,
    /// §6). Binding is the caller's job so it can learn the bound address
    /// (e.g. when `--com-port 0` picks an ephemeral port).
    pub async fn serve_com(self: Arc<Self>, server: ReqRepServer, cancel: CancellationToken) {
        let this = self;
        server
            .serve(move |req: SignalRequest| {
                let this = this.clone();
                async move { this.handle_signal(req) }
            }, cancel)
            .await;
    }

    /// Serves the internal `request_fw` channel (spec.md §4.1, §4.3).
    pub async fn serve_request_fw(self: Arc<Self>, mut server: RequestFwServer) {
        while let Some(call) = server.recv().await {
            let reply = self.get_requests(&call.request.file_identifier);
            call.respond(reply);
        }
        warn!("request_fw channel closed, SignalHandler exiting that loop");
    }

    /// Serves an already-bound external `request` PULL socket's NEXT/CANCEL
    /// commands (spec.md §4.2, §6).
    pub async fn serve_request_pull(self: Arc<Self>, listener: PullListener, cancel: CancellationToken) {
        let (tx, mut rx) = mpsc::channel::<ExternalRequest>(64);
        let accept_cancel = cancel.clone();
        let accept = tokio::spawn(async move { listener.run(tx, accept_cancel).await });

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                msg = rx.recv() => {
                    match msg {
                        Some(ExternalRequest::Next(endpoint)) => self.push_next(&endpoint),
                        Some(ExternalRequest::Cancel(endpoint)) => self.cancel(&endpoint),
                        None => break,
                    }
                }
            }
        }
        let _ = accept.await;
    }

    fn push_next(&self, endpoint: &Endpoint) {
        let mut reg = self.query_registry.lock();
        for ns in reg.nodesets_mut() {
            ns.push_next(endpoint);
        }
    }

    fn cancel(&self, endpoint: &Endpoint) {
        let mut reg = self.query_registry.lock();
        for ns in reg.nodesets_mut() {
            ns.cancel(endpoint);
        }
    }

    /// `GET_REQUESTS`: deliver `file_identifier` through both registries and
    /// collect every nodeset's resolved target (spec.md §4.3).
    fn get_requests(&self, file_identifier: &str) -> GetRequestsReply {
        let mut targets: Vec<Target> = self.stream_registry.lock().deliver(file_identifier);
        targets.extend(self.query_registry.lock().deliver(file_identifier));
        GetRequestsReply::from(targets)
    }

    fn handle_signal(&self, req: SignalRequest) -> SignalReply {
        if req.signal == SignalKind::GetVersion {
            return SignalReply::Version { version: SenderVersion::current().to_string() };
        }

        let peer_version: SenderVersion = match req.version.parse() {
            Ok(v) => v,
            Err(_) => return SignalReply::VersionConflict { sender_version: SenderVersion::current().to_string() },
        };
        if !SenderVersion::current().compatible_with(&peer_version) {
            return SignalReply::VersionConflict { sender_version: SenderVersion::current().to_string() };
        }

        if req.signal.is_start() {
            self.handle_start(req)
        } else {
            self.handle_stop(req)
        }
    }

    fn handle_start(&self, req: SignalRequest) -> SignalReply {
        let mode = req.signal.mode().expect("start signals always carry a mode");
        if mode == Mode::Metadata && !self.store_data {
            return SignalReply::StoringDisabled { sender_version: SenderVersion::current().to_string() };
        }

        if req.targets.is_empty() {
            return SignalReply::NoValidHost;
        }
        if !req.targets.iter().all(|t| self.resolver.is_allowed(&t.host, &self.allow_list)) {
            return SignalReply::NoValidHost;
        }

        let subs: Vec<Subscription> = match build_subscriptions(&req.targets, mode) {
            Ok(s) => s,
            Err(_) => return SignalReply::NoValidSignal,
        };

        let outcome = if req.signal.is_stream() {
            self.stream_registry.lock().admit(StreamNodeSet::new(subs))
        } else {
            self.query_registry.lock().admit(QueryNodeSet::new(subs))
        };

        match outcome {
            // Both a fresh admission and a replace-on-nesting are reported
            // as plain success: `CONNECTION_ALREADY_OPEN` is treated as an
            // idempotent re-open, not a distinct reply (DESIGN.md OQ).
            Ok(_) => SignalReply::Signal { signal: req.signal },
            Err(hidra_core::CoreError::OverlappingNodeset) => SignalReply::NoValidSignal,
            Err(_) => SignalReply::NoValidHost,
        }
    }

    fn handle_stop(&self, req: SignalRequest) -> SignalReply {
        let targets: HashSet<Endpoint> =
            req.targets.iter().map(|t| Endpoint::new(t.host.clone(), t.port)).collect();

        let removed = if req.signal.is_stream() {
            self.stream_registry.lock().remove_matching(&targets)
        } else {
            self.query_registry.lock().remove_matching(&targets)
        };

        if removed.is_empty() {
            SignalReply::NoOpenConnectionFound
        } else {
            SignalReply::Signal { signal: req.signal }
        }
    }
}

fn build_subscriptions(
    specs: &[TargetSpec],
    mode: Mode,
) -> Result<Vec<Subscription>, hidra_core::CoreError> {
    specs
        .iter()
        .map(|spec| {
            let pattern = spec.pattern()?;
            Ok(Subscription::new(Endpoint::new(spec.host.clone(), spec.port), spec.priority, pattern, mode))
        })
        .collect()
}
