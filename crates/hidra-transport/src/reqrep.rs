// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! External request/reply transport for the `com` (control) and `status`
//! roles (spec.md §4.1, §6): one JSON request, one JSON reply, per
//! connection. Generalizes the teacher's single-connection dual Unix/TCP
//! accept loop (`oj-daemon/src/listener/mod.rs`) to TCP-only, since HiDRA's
//! external sockets are reachable from other hosts.

use std::future::Future;
use std::net::SocketAddr;
use std::time::Duration;

use hidra_wire::{read_json, write_json, ProtocolError};
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

#[derive(Debug, Error)]
pub enum ReqRepError {
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
    #[error("bind failed: {0}")]
    Bind(#[source] std::io::Error),
}

pub struct ReqRepServer {
    listener: TcpListener,
    timeout: Duration,
}

impl ReqRepServer {
    pub async fn bind(addr: SocketAddr, timeout: Duration) -> Result<Self, ReqRepError> {
        let listener = TcpListener::bind(addr).await.map_err(ReqRepError::Bind)?;
        Ok(Self { listener, timeout })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accept connections until `cancel` fires, answering each with
    /// `handler`. One request per connection, matching the external
    /// control protocol's REQ/REP shape.
    pub async fn serve<Req, Rep, F, Fut>(self, handler: F, cancel: CancellationToken)
    where
        Req: DeserializeOwned + Send + 'static,
        Rep: Serialize + Send + Sync + 'static,
        F: Fn(Req) -> Fut + Clone + Send + 'static,
        Fut: Future<Output = Rep> + Send,
    {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("req/rep server shutting down");
                    return;
                }
                accepted = self.listener.accept() => {
                    match accepted {
                        Ok((stream, peer)) => {
                            let handler = handler.clone();
                            let timeout = self.timeout;
                            tokio::spawn(async move {
                                if let Err(e) = Self::handle_one(stream, timeout, handler).await {
                                    log_error(peer, e);
                                }
                            });
                        }
                        Err(e) => error!("accept error: {}", e),
                    }
                }
            }
        }
    }

    async fn handle_one<Req, Rep, F, Fut>(
        mut stream: TcpStream,
        timeout: Duration,
        handler: F,
    ) -> Result<(), ReqRepError>
    where
        Req: DeserializeOwned,
        Rep: Serialize,
        F: Fn(Req) -> Fut,
        Fut: Future<Output = Rep>,
    {
        let request: Req = read_json(&mut stream, timeout).await?;
        let reply = handler(request).await;
        write_json(&mut stream, &reply, timeout).await?;
        Ok(())
    }
}

fn log_error(peer: SocketAddr, e: ReqRepError) {
    match e {
        ReqRepError::Protocol(ProtocolError::ConnectionClosed) => {
            debug!(%peer, "client disconnected before replying")
        }
        ReqRepError::Protocol(ProtocolError::Timeout) => warn!(%peer, "request timed out"),
        other => error!(%peer, error = %other, "req/rep connection error"),
    }
}

pub async fn call<Req, Rep>(
    addr: SocketAddr,
    request: &Req,
    timeout: Duration,
) -> Result<Rep, ReqRepError>
where
    Req: Serialize,
    Rep: DeserializeOwned,
{
    let mut stream = TcpStream::connect(addr).await.map_err(|e| ReqRepError::Protocol(e.into()))?;
    write_json(&mut stream, request, timeout).await?;
    let reply = read_json(&mut stream, timeout).await?;
    Ok(reply)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Serialize, Deserialize)]
    struct Ping(String);
    #[derive(Serialize, Deserialize, PartialEq, Debug)]
    struct Pong(String);

    #[tokio::test]
    async fn round_trips_a_request() {
        let server = ReqRepServer::bind("127.0.0.1:0".parse().unwrap(), Duration::from_secs(1))
            .await
            .unwrap();
        let addr = server.local_addr().unwrap();
        let cancel = CancellationToken::new();
        let server_cancel = cancel.clone();
        let handle = tokio::spawn(server.serve(
            |req: Ping| async move { Pong(format!("pong:{}", req.0)) },
            server_cancel,
        ));

        let reply: Pong = call(addr, &Ping("hi".into()), Duration::from_secs(1)).await.unwrap();
        assert_eq!(reply, Pong("pong:hi".into()));

        cancel.cancel();
        handle.await.unwrap();
    }
}
