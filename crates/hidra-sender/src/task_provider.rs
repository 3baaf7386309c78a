// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! TaskProvider: pulls events from the configured [`EventDetector`], asks
//! SignalHandler who wants each file, and hands the resolved [`WorkItem`] to
//! the router (spec.md §4.1, §4.3). Pauses on `control/SLEEP`, resumes on
//! `control/WAKEUP`, exits on `control/EXIT`.

use hidra_core::WorkItem;
use hidra_plugins::EventDetector;
use hidra_transport::{BusReceiver, RequestFwClient, RouterSender};
use hidra_wire::{ControlMessage, GetRequestsRequest};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

pub struct TaskProvider<D> {
    detector: D,
    request_fw: RequestFwClient,
    router: RouterSender,
}

impl<D: EventDetector> TaskProvider<D> {
    pub fn new(detector: D, request_fw: RequestFwClient, router: RouterSender) -> Self {
        Self { detector, request_fw, router }
    }

    pub async fn run(mut self, mut bus: BusReceiver, cancel: CancellationToken) {
        let mut sleeping = false;
        loop {
            if sleeping {
                tokio::select! {
                    _ = cancel.cancelled() => return,
                    msg = bus.recv() => {
                        if !self.apply_control(msg, &mut sleeping) {
                            return;
                        }
                    }
                }
            } else {
                tokio::select! {
                    _ = cancel.cancelled() => return,
                    msg = bus.recv() => {
                        if !self.apply_control(msg, &mut sleeping) {
                            return;
                        }
                    }
                    event = self.detector.next_event() => {
                        if let Some(event) = event {
                            self.dispatch(event).await;
                        }
                    }
                }
            }
        }
    }

    /// Returns `false` when the TaskProvider should exit its run loop.
    fn apply_control(&self, msg: Option<ControlMessage>, sleeping: &mut bool) -> bool {
        match msg {
            Some(ControlMessage::Sleep) => {
                debug!("task provider sleeping");
                *sleeping = true;
                true
            }
            Some(ControlMessage::Wakeup) => {
                debug!("task provider waking up");
                *sleeping = false;
                true
            }
            Some(ControlMessage::Exit) => false,
            Some(ControlMessage::CloseSockets { .. }) => true,
            None => false,
        }
    }

    async fn dispatch(&self, event: hidra_core::EventRecord) {
        let file_identifier = event.file_identifier();
        match self.request_fw.get_requests(GetRequestsRequest { file_identifier }).await {
            Ok(reply) => {
                let item = WorkItem::new(event, reply.into_targets());
                if self.router.send(item).await.is_err() {
                    warn!("router has no receivers, dropping work item");
                }
            }
            Err(e) => warn!(error = %e, "GET_REQUESTS failed, dropping event"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use hidra_core::EventRecord;
    use hidra_transport::{request_fw_channel, work_router};
    use tokio::sync::Mutex;

    struct ScriptedDetector {
        events: Mutex<Vec<EventRecord>>,
    }

    #[async_trait]
    impl EventDetector for ScriptedDetector {
        async fn next_event(&mut self) -> Option<EventRecord> {
            let popped = self.events.get_mut().pop();
            if popped.is_none() {
                tokio::time::sleep(std::time::Duration::from_millis(5)).await;
            }
            popped
        }
    }

    #[tokio::test]
    async fn dispatches_event_through_router() {
        let detector = ScriptedDetector {
            events: Mutex::new(vec![EventRecord::new("/data", "", "a.cbf")]),
        };
        let (fw_client, mut fw_server) = request_fw_channel();
        let (router_tx, router_rx) = work_router();
        tokio::spawn(async move {
            let call = fw_server.recv().await.expect("call");
            call.respond(hidra_wire::GetRequestsReply::none());
        });

        let provider = TaskProvider::new(detector, fw_client, router_tx);
        let bus = hidra_transport::ControlBus::new();
        let cancel = CancellationToken::new();
        let run_cancel = cancel.clone();
        let handle = tokio::spawn(provider.run(bus.subscribe(), run_cancel));

        let item = router_rx.recv().await.expect("work item");
        assert_eq!(item.event.filename, "a.cbf");
        cancel.cancel();
        let _ = handle.await;
    }

    #[tokio::test]
    async fn sleep_suspends_event_polling_until_wakeup() {
        let detector = ScriptedDetector { events: Mutex::new(vec![]) };
        let (fw_client, _fw_server) = request_fw_channel();
        let (router_tx, _router_rx) = work_router();
        let provider = TaskProvider::new(detector, fw_client, router_tx);
        let bus = hidra_transport::ControlBus::new();
        let cancel = CancellationToken::new();
        let run_cancel = cancel.clone();
        let handle = tokio::spawn(provider.run(bus.subscribe(), run_cancel));

        bus.publish(ControlMessage::Sleep);
        bus.publish(ControlMessage::Exit);
        let _ = handle.await;
        cancel.cancel();
    }
}
