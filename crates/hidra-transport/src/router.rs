// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Internal `router` channel (spec.md §4.1, §4.3): TaskProvider pushes work
//! items, N DataDispatchers pull. Fairness ("a busy dispatcher does not
//! receive the next item until it finishes") falls out of a single shared
//! mpsc receiver: tokio wakes exactly one waiting `recv` per item, so an
//! idle dispatcher always wins the race over one still processing its
//! previous item. Modeled on the shared-receiver fan-out used for worker
//! pools in `other_examples/kubetail/log_metadata_watcher.rs`.

use std::sync::Arc;

use hidra_core::WorkItem;
use tokio::sync::{mpsc, Mutex};

const DEFAULT_CAPACITY: usize = 256;

#[derive(Clone)]
pub struct RouterSender {
    tx: mpsc::Sender<WorkItem>,
}

impl RouterSender {
    pub async fn send(&self, item: WorkItem) -> Result<(), WorkItem> {
        self.tx.send(item).await.map_err(|e| e.0)
    }
}

/// Cloneable pull handle shared by every dispatcher. Cloning shares the
/// same underlying receiver via the inner mutex, so each dispatcher's
/// `recv` call competes fairly for the next item.
#[derive(Clone)]
pub struct RouterReceiver {
    rx: Arc<Mutex<mpsc::Receiver<WorkItem>>>,
}

impl RouterReceiver {
    pub async fn recv(&self) -> Option<WorkItem> {
        self.rx.lock().await.recv().await
    }
}

pub fn work_router() -> (RouterSender, RouterReceiver) {
    let (tx, rx) = mpsc::channel(DEFAULT_CAPACITY);
    (RouterSender { tx }, RouterReceiver { rx: Arc::new(Mutex::new(rx)) })
}

#[cfg(test)]
mod tests {
    use super::*;
    use hidra_core::EventRecord;

    fn item() -> WorkItem {
        WorkItem::new(
            EventRecord {
                source_path: "/data".into(),
                relative_path: "".into(),
                filename: "a.cbf".into(),
            },
            vec![],
        )
    }

    #[tokio::test]
    async fn idle_dispatcher_wins_next_item() {
        let (tx, rx) = work_router();
        tx.send(item()).await.expect("send");
        let received = rx.recv().await;
        assert!(received.is_some());
    }

    #[tokio::test]
    async fn multiple_receivers_share_one_queue() {
        let (tx, rx) = work_router();
        let rx2 = rx.clone();
        tx.send(item()).await.expect("send");
        tx.send(item()).await.expect("send");
        let a = rx.recv().await;
        let b = rx2.recv().await;
        assert!(a.is_some());
        assert!(b.is_some());
    }
}
