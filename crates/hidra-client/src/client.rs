// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Thin client for the sender's external protocols (spec.md §1: "the
//! client-side `Transfer` API beyond its wire behavior" is out of scope —
//! this implements only that wire behavior). Grounded on
//! `oj-cli/src/client_queries.rs`'s shape: one method per signal, building
//! the request and matching the expected reply variant.

use std::net::SocketAddr;
use std::time::Duration;

use bytes::Bytes;
use hidra_transport::call;
use hidra_wire::{
    write_message, ExternalRequest, SenderVersion, SignalKind, SignalReply, SignalRequest,
    StatusReply, StatusRequest, TargetSpec,
};
use tokio::net::TcpStream;

use crate::error::ClientError;

/// A handle to one sender instance's external sockets.
pub struct HidraClient {
    com_addr: SocketAddr,
    request_addr: SocketAddr,
    status_addr: Option<SocketAddr>,
    timeout: Duration,
}

impl HidraClient {
    pub fn new(com_addr: SocketAddr, request_addr: SocketAddr, timeout: Duration) -> Self {
        Self { com_addr, request_addr, status_addr: None, timeout }
    }

    pub fn with_status(mut self, status_addr: SocketAddr) -> Self {
        self.status_addr = Some(status_addr);
        self
    }

    async fn signal(&self, signal: SignalKind, targets: Vec<TargetSpec>) -> Result<SignalReply, ClientError> {
        let request = SignalRequest { version: SenderVersion::current().to_string(), signal, targets };
        Ok(call(self.com_addr, &request, self.timeout).await?)
    }

    /// `GET_VERSION`: the sender's protocol version, independent of
    /// subscription state.
    pub async fn get_version(&self) -> Result<String, ClientError> {
        match self.signal(SignalKind::GetVersion, Vec::new()).await? {
            SignalReply::Version { version } => Ok(version),
            other => Err(ClientError::Rejected(other)),
        }
    }

    pub async fn start_stream(&self, targets: Vec<TargetSpec>) -> Result<(), ClientError> {
        self.expect_signal_echo(SignalKind::StartStream, targets).await
    }

    pub async fn start_stream_metadata(&self, targets: Vec<TargetSpec>) -> Result<(), ClientError> {
        self.expect_signal_echo(SignalKind::StartStreamMetadata, targets).await
    }

    pub async fn start_query_next(&self, targets: Vec<TargetSpec>) -> Result<(), ClientError> {
        self.expect_signal_echo(SignalKind::StartQueryNext, targets).await
    }

    pub async fn start_query_metadata(&self, targets: Vec<TargetSpec>) -> Result<(), ClientError> {
        self.expect_signal_echo(SignalKind::StartQueryMetadata, targets).await
    }

    pub async fn stop_stream(&self, targets: Vec<TargetSpec>) -> Result<(), ClientError> {
        self.expect_signal_echo(SignalKind::StopStream, targets).await
    }

    pub async fn stop_stream_metadata(&self, targets: Vec<TargetSpec>) -> Result<(), ClientError> {
        self.expect_signal_echo(SignalKind::StopStreamMetadata, targets).await
    }

    pub async fn stop_query_next(&self, targets: Vec<TargetSpec>) -> Result<(), ClientError> {
        self.expect_signal_echo(SignalKind::StopQueryNext, targets).await
    }

    pub async fn stop_query_metadata(&self, targets: Vec<TargetSpec>) -> Result<(), ClientError> {
        self.expect_signal_echo(SignalKind::StopQueryMetadata, targets).await
    }

    async fn expect_signal_echo(&self, signal: SignalKind, targets: Vec<TargetSpec>) -> Result<(), ClientError> {
        match self.signal(signal, targets).await? {
            SignalReply::Signal { .. } => Ok(()),
            other => Err(ClientError::Rejected(other)),
        }
    }

    /// `NEXT <endpoint>` on the `request` PULL socket: fire-and-forget,
    /// no reply (spec.md §4.2, §6).
    pub async fn next(&self, own_endpoint: hidra_core::Endpoint) -> Result<(), ClientError> {
        self.send_pull(ExternalRequest::Next(own_endpoint)).await
    }

    pub async fn cancel(&self, own_endpoint: hidra_core::Endpoint) -> Result<(), ClientError> {
        self.send_pull(ExternalRequest::Cancel(own_endpoint)).await
    }

    async fn send_pull(&self, request: ExternalRequest) -> Result<(), ClientError> {
        let mut stream = TcpStream::connect(self.request_addr).await?;
        let frame = Bytes::from(request.encode().into_bytes());
        write_message(&mut stream, &[frame], self.timeout).await?;
        Ok(())
    }

    pub async fn status_check(&self) -> Result<StatusReply, ClientError> {
        self.status(StatusRequest::StatusCheck).await
    }

    pub async fn reset_status(&self) -> Result<StatusReply, ClientError> {
        self.status(StatusRequest::ResetStatus).await
    }

    async fn status(&self, request: StatusRequest) -> Result<StatusReply, ClientError> {
        let addr = self.status_addr.ok_or(ClientError::NoStatusSocket)?;
        Ok(call(addr, &request, self.timeout).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hidra_transport::ReqRepServer;
    use tokio_util::sync::CancellationToken;

    #[tokio::test]
    async fn get_version_round_trips_through_a_real_socket() {
        let server = ReqRepServer::bind("127.0.0.1:0".parse().unwrap(), Duration::from_secs(1))
            .await
            .unwrap();
        let addr = server.local_addr().unwrap();
        let cancel = CancellationToken::new();
        let serve_cancel = cancel.clone();
        tokio::spawn(server.serve(
            |_req: SignalRequest| async { SignalReply::Version { version: "1.2.3".into() } },
            serve_cancel,
        ));

        let client = HidraClient::new(addr, addr, Duration::from_secs(1));
        let version = client.get_version().await.unwrap();
        assert_eq!(version, "1.2.3");
        cancel.cancel();
    }

    #[tokio::test]
    async fn unexpected_reply_is_surfaced_as_rejected() {
        let server = ReqRepServer::bind("127.0.0.1:0".parse().unwrap(), Duration::from_secs(1))
            .await
            .unwrap();
        let addr = server.local_addr().unwrap();
        let cancel = CancellationToken::new();
        let serve_cancel = cancel.clone();
        tokio::spawn(server.serve(|_req: SignalRequest| async { SignalReply::NoValidHost }, serve_cancel));

        let client = HidraClient::new(addr, addr, Duration::from_secs(1));
        let err = client.start_stream(Vec::new()).await.unwrap_err();
        assert!(matches!(err, ClientError::Rejected(SignalReply::NoValidHost)));
        cancel.cancel();
    }
}
