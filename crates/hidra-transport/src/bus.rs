// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-process control bus (`control_pub`/`control_sub`, spec.md §4.1):
//! substitutes for the original pub/sub forwarder now that every worker is
//! a task in the same OS process (DESIGN.md Open Question OQ-1). Modeled on
//! the broadcast-channel watcher pattern used for log/event fan-out in
//! `other_examples/kubetail/log_metadata_watcher.rs`.

use hidra_wire::ControlMessage;
use tokio::sync::broadcast;
use tracing::warn;

const DEFAULT_CAPACITY: usize = 64;

#[derive(Clone)]
pub struct ControlBus {
    tx: broadcast::Sender<ControlMessage>,
}

impl ControlBus {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn publish(&self, message: ControlMessage) {
        // No receivers is not an error: a worker may not have subscribed
        // yet, or may already have exited.
        let _ = self.tx.send(message);
    }

    pub fn subscribe(&self) -> BusReceiver {
        BusReceiver { rx: self.tx.subscribe() }
    }
}

impl Default for ControlBus {
    fn default() -> Self {
        Self::new()
    }
}

/// A worker's handle onto the bus. Lagged notifications are logged and
/// skipped rather than surfaced as errors, since a worker only needs the
/// most recent control state, not every message ever published.
pub struct BusReceiver {
    rx: broadcast::Receiver<ControlMessage>,
}

impl BusReceiver {
    pub async fn recv(&mut self) -> Option<ControlMessage> {
        loop {
            match self.rx.recv().await {
                Ok(msg) => return Some(msg),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "control bus receiver lagged, skipping");
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscribers_each_see_published_message() {
        let bus = ControlBus::new();
        let mut a = bus.subscribe();
        let mut b = bus.subscribe();
        bus.publish(ControlMessage::Sleep);
        assert_eq!(a.recv().await, Some(ControlMessage::Sleep));
        assert_eq!(b.recv().await, Some(ControlMessage::Sleep));
    }

    #[tokio::test]
    async fn closing_bus_ends_receiver() {
        let bus = ControlBus::new();
        let mut rx = bus.subscribe();
        drop(bus);
        assert_eq!(rx.recv().await, None);
    }
}
