// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared transport context (spec.md §4.6 "create the shared transport
//! context"): the handful of in-process channels every worker is wired
//! against. Built once by the Supervisor and handed out to each worker by
//! value or clone.

use hidra_transport::{request_fw_channel, work_router, ControlBus, RequestFwClient, RequestFwServer, RouterReceiver, RouterSender};

pub struct SenderContext {
    pub bus: ControlBus,
    pub request_fw_client: RequestFwClient,
    pub request_fw_server: Option<RequestFwServer>,
    pub router_tx: RouterSender,
    pub router_rx: RouterReceiver,
}

impl SenderContext {
    pub fn new() -> Self {
        let (request_fw_client, request_fw_server) = request_fw_channel();
        let (router_tx, router_rx) = work_router();
        Self { bus: ControlBus::new(), request_fw_client, request_fw_server: Some(request_fw_server), router_tx, router_rx }
    }
}

impl Default for SenderContext {
    fn default() -> Self {
        Self::new()
    }
}
