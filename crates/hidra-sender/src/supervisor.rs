// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Supervisor (spec.md §4.6): builds the shared transport context, probes
//! the fixed storage stream's liveness, spawns every worker, and drives
//! shutdown on `Ctrl-C` or the `EXIT` control message. Grounded on
//! `oj-daemon`'s startup/shutdown sequencing (bind sockets, spawn workers,
//! wait, drain) generalized from its Unix-socket lifecycle to HiDRA's mix
//! of TCP and in-process transport.

use std::sync::Arc;
use std::time::Duration;

use hidra_core::{Endpoint, StoragePolicy, SystemHostResolver};
use hidra_plugins::{FsEventDetector, LocalFileFetcher, MonitoredEvent};
use hidra_transport::{BindAddress, InboundListener, PullListener, PushCache, ReqRepServer, SocketRole};
use hidra_wire::{ControlMessage, DataFrame, StatusReply, StatusRequest};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::cleaner::Cleaner;
use crate::context::SenderContext;
use crate::dispatcher::{shared_status, CleanerRegistration, DataDispatcher, SharedStatus};
use crate::error::SenderError;
use crate::signal_handler::SignalHandler;
use crate::task_provider::TaskProvider;
use crate::config::SenderConfig;

const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);
const ALIVE_TEST_INTERVAL: Duration = Duration::from_secs(10);
const CLEANER_GRACE_PERIOD: Duration = Duration::from_secs(300);

pub struct Supervisor {
    config: SenderConfig,
}

impl Supervisor {
    pub fn new(config: SenderConfig) -> Self {
        Self { config }
    }

    pub async fn run(self) -> Result<(), SenderError> {
        let config = self.config;
        let mut ctx = SenderContext::new();
        let cancel = CancellationToken::new();

        let resolver = Arc::new(SystemHostResolver);
        let signal_handler = SignalHandler::new(resolver, config.whitelist.clone(), config.store_data);

        let mut tasks = Vec::new();

        let com_bind = BindAddress::on(SocketRole::Com, config.ext_ip, config.com_port);
        let com_server = ReqRepServer::bind(com_bind.addr, config.io_timeout).await?;
        info!(addr = %com_server.local_addr().map_err(SenderError::Io)?, "com socket bound");
        let com_handler = signal_handler.clone();
        let com_cancel = cancel.clone();
        tasks.push(tokio::spawn(com_handler.serve_com(com_server, com_cancel)));

        let request_bind = BindAddress::on(SocketRole::Request, config.ext_ip, config.request_port);
        let request_listener = PullListener::bind(request_bind.addr, config.io_timeout).await?;
        info!(addr = %request_listener.local_addr().map_err(SenderError::Io)?, "request socket bound");
        let request_handler = signal_handler.clone();
        let request_cancel = cancel.clone();
        tasks.push(tokio::spawn(request_handler.serve_request_pull(request_listener, request_cancel)));

        let fw_server = ctx.request_fw_server.take().expect("request_fw server taken once");
        let fw_handler = signal_handler.clone();
        tasks.push(tokio::spawn(fw_handler.serve_request_fw(fw_server)));

        let monitored_events: Vec<MonitoredEvent> = config
            .monitored_events
            .iter()
            .filter_map(|name| {
                let parsed = MonitoredEvent::parse(name);
                if parsed.is_none() {
                    warn!(name, "ignoring unrecognized --monitored-events entry");
                }
                parsed
            })
            .collect();
        let detector = FsEventDetector::new(&config.monitored_dir, &config.fix_subdirs, monitored_events)?;

        let task_provider =
            TaskProvider::new(detector, ctx.request_fw_client.clone(), ctx.router_tx.clone());
        let tp_cancel = cancel.clone();
        let tp_bus = ctx.bus.subscribe();
        tasks.push(tokio::spawn(task_provider.run(tp_bus, tp_cancel)));

        let (cleaner_tx, cleaner_rx) = tokio::sync::mpsc::channel::<CleanerRegistration>(64);
        let policy = StoragePolicy::new(config.store_data, config.remove_data);

        let mut dispatcher_statuses: Vec<SharedStatus> = Vec::with_capacity(config.number_of_streams);
        for k in 0..config.number_of_streams {
            let status = shared_status();
            dispatcher_statuses.push(status.clone());
            let dispatcher = DataDispatcher::new(
                format!("{k}/{}", config.number_of_streams),
                LocalFileFetcher::new(),
                config.io_timeout,
                config.chunksize,
                policy,
                config.local_target.clone(),
                cleaner_tx.clone(),
                status,
            );
            let router_rx = ctx.router_rx.clone();
            let bus_rx = ctx.bus.subscribe();
            let dispatcher_cancel = cancel.clone();
            tasks.push(tokio::spawn(dispatcher.run(router_rx, bus_rx, dispatcher_cancel)));
        }
        drop(cleaner_tx);

        let cleaner_status = shared_status();
        if crate::cleaner::requires_cleaner(config.remove_data) {
            let confirm_bind = BindAddress::on(SocketRole::Confirm, config.ext_ip, config.com_port + 5);
            let listener = InboundListener::bind(confirm_bind.addr, config.io_timeout).await?;
            let cleaner = Cleaner::new(
                LocalFileFetcher::new(),
                config.store_data,
                config.local_target.clone(),
                CLEANER_GRACE_PERIOD,
                cleaner_status.clone(),
            );
            let cleaner_cancel = cancel.clone();
            tasks.push(tokio::spawn(cleaner.run(listener, cleaner_rx, cleaner_cancel)));
        }

        let mut status_handles = dispatcher_statuses;
        status_handles.push(cleaner_status);
        let status_bind = BindAddress::on(SocketRole::Status, config.ext_ip, config.com_port + 1);
        let status_server = ReqRepServer::bind(status_bind.addr, config.io_timeout).await?;
        let status_cancel = cancel.clone();
        tasks.push(tokio::spawn(status_server.serve(
            move |req: StatusRequest| {
                let handles = status_handles.clone();
                async move { handle_status_request(req, &handles) }
            },
            status_cancel,
        )));

        let alive_test_task = config.data_stream_target.clone().map(|target| {
            let bus = ctx.bus.clone();
            let timeout = config.io_timeout;
            let alive_cancel = cancel.clone();
            tokio::spawn(probe_fixed_storage(target, bus, timeout, alive_cancel))
        });

        info!(com_port = config.com_port, "hidra-sender started");
        tokio::signal::ctrl_c().await.map_err(SenderError::Io)?;
        info!("shutdown requested");

        ctx.bus.publish(ControlMessage::Exit);
        cancel.cancel();
        if let Some(handle) = alive_test_task {
            handle.abort();
        }

        let drain = tokio::time::timeout(DRAIN_TIMEOUT, async {
            for task in tasks {
                let _ = task.await;
            }
        });
        if drain.await.is_err() {
            warn!("workers did not drain within the shutdown window");
        }

        Ok(())
    }
}

/// Probes the fixed storage stream's liveness on startup and periodically
/// thereafter; publishes `SLEEP` on failure, `WAKEUP` on recovery (spec.md
/// §4.6). Best-effort: an unreachable target never aborts the process.
async fn probe_fixed_storage(
    target: Endpoint,
    bus: hidra_transport::ControlBus,
    timeout: Duration,
    cancel: CancellationToken,
) {
    let mut cache = PushCache::new(timeout);
    let mut alive = true;
    let mut interval = tokio::time::interval(ALIVE_TEST_INTERVAL);
    loop {
        tokio::select! {
            _ = cancel.cancelled() => return,
            _ = interval.tick() => {
                let frames = DataFrame::AliveTest.into_wire_frames();
                let ok = cache.send(&target, &frames).await.is_ok();
                if ok && !alive {
                    info!(endpoint = %target, "fixed storage stream recovered");
                    bus.publish(ControlMessage::Wakeup);
                    alive = true;
                } else if !ok && alive {
                    warn!(endpoint = %target, "fixed storage stream unreachable");
                    bus.publish(ControlMessage::Sleep);
                    alive = false;
                }
            }
        }
    }
}

/// Aggregates every dispatcher's and the cleaner's [`SharedStatus`] into one
/// reply (spec.md §4.4: "Status is reported back on a status-check
/// REQ/REP"). The first non-`Ok` handle wins; `RESET_STATUS` clears all of
/// them and reports the (now `Ok`) result.
fn handle_status_request(req: StatusRequest, handles: &[SharedStatus]) -> StatusReply {
    match req {
        StatusRequest::StatusCheck => aggregate_status(handles),
        StatusRequest::ResetStatus => {
            for handle in handles {
                *handle.lock() = StatusReply::Ok;
            }
            StatusReply::Ok
        }
    }
}

fn aggregate_status(handles: &[SharedStatus]) -> StatusReply {
    for handle in handles {
        let status = handle.lock().clone();
        if !status.is_ok() {
            return status;
        }
    }
    StatusReply::Ok
}
