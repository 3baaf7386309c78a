// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Internal `request_fw` channel: TaskProvider asks SignalHandler
//! `GET_REQUESTS` for each event (spec.md §4.1, §4.3). Both ends live in
//! the same process, so this is a request/response pair over an mpsc
//! channel carrying a reply `oneshot`, rather than a REP socket.

use hidra_wire::{GetRequestsReply, GetRequestsRequest};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

#[derive(Debug, Error)]
pub enum RequestFwError {
    #[error("SignalHandler is no longer accepting requests")]
    HandlerGone,
    #[error("SignalHandler dropped the reply channel without answering")]
    NoReply,
}

struct Call {
    request: GetRequestsRequest,
    reply: oneshot::Sender<GetRequestsReply>,
}

/// TaskProvider's handle: call [`RequestFwClient::get_requests`] once per
/// event.
#[derive(Clone)]
pub struct RequestFwClient {
    tx: mpsc::Sender<Call>,
}

impl RequestFwClient {
    pub async fn get_requests(
        &self,
        request: GetRequestsRequest,
    ) -> Result<GetRequestsReply, RequestFwError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(Call { request, reply: reply_tx })
            .await
            .map_err(|_| RequestFwError::HandlerGone)?;
        reply_rx.await.map_err(|_| RequestFwError::NoReply)
    }
}

/// SignalHandler's handle: pull the next call with [`RequestFwServer::recv`]
/// and answer it.
pub struct RequestFwServer {
    rx: mpsc::Receiver<Call>,
}

pub struct PendingCall {
    pub request: GetRequestsRequest,
    reply: oneshot::Sender<GetRequestsReply>,
}

impl PendingCall {
    pub fn respond(self, reply: GetRequestsReply) {
        let _ = self.reply.send(reply);
    }
}

impl RequestFwServer {
    pub async fn recv(&mut self) -> Option<PendingCall> {
        self.rx.recv().await.map(|call| PendingCall { request: call.request, reply: call.reply })
    }
}

/// Default queue depth: GET_REQUESTS calls are synchronous per spec.md
/// §4.3, so only a handful can ever be in flight at once.
const CHANNEL_CAPACITY: usize = 16;

pub fn request_fw_channel() -> (RequestFwClient, RequestFwServer) {
    let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
    (RequestFwClient { tx }, RequestFwServer { rx })
}

#[cfg(test)]
mod tests {
    use super::*;
    use hidra_core::Endpoint;
    use hidra_core::Target;

    #[tokio::test]
    async fn client_receives_servers_reply() {
        let (client, mut server) = request_fw_channel();
        let handle = tokio::spawn(async move {
            let call = server.recv().await.expect("call");
            assert_eq!(call.request.file_identifier, "a.cbf");
            call.respond(GetRequestsReply::from(vec![Target {
                endpoint: Endpoint { host: "h".into(), port: 1 },
                priority: 0,
                mode: hidra_core::TargetMode::Data,
            }]));
        });
        let reply = client
            .get_requests(GetRequestsRequest { file_identifier: "a.cbf".into() })
            .await
            .expect("reply");
        assert_eq!(reply.into_targets().len(), 1);
        handle.await.expect("task");
    }

    #[tokio::test]
    async fn dropped_server_surfaces_handler_gone() {
        let (client, server) = request_fw_channel();
        drop(server);
        let err = client
            .get_requests(GetRequestsRequest { file_identifier: "a.cbf".into() })
            .await
            .unwrap_err();
        assert!(matches!(err, RequestFwError::HandlerGone));
    }
}
