// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! External `request` PULL socket (spec.md §4.1, §6): single-frame text
//! commands, `NEXT <endpoint>` / `CANCEL <endpoint>`, fire-and-forget (no
//! reply). Unknown commands are logged and ignored at the wire layer in
//! [`hidra_wire::ExternalRequest::parse`]; this module only owns the accept
//! loop and per-connection read.

use std::net::SocketAddr;
use std::time::Duration;

use hidra_wire::{read_message, ExternalRequest, ProtocolError};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

pub struct PullListener {
    listener: TcpListener,
    timeout: Duration,
}

impl PullListener {
    pub async fn bind(addr: SocketAddr, timeout: Duration) -> std::io::Result<Self> {
        Ok(Self { listener: TcpListener::bind(addr).await?, timeout })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accept connections and forward every parsed command onto `tx` until
    /// `cancel` fires.
    pub async fn run(self, tx: mpsc::Sender<ExternalRequest>, cancel: CancellationToken) {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => return,
                accepted = self.listener.accept() => {
                    match accepted {
                        Ok((mut stream, _)) => {
                            let tx = tx.clone();
                            let timeout = self.timeout;
                            tokio::spawn(async move {
                                loop {
                                    match read_message(&mut stream, timeout).await {
                                        Ok(frames) => {
                                            let Some(frame) = frames.into_iter().next() else { continue };
                                            let text = String::from_utf8_lossy(&frame);
                                            match ExternalRequest::parse(&text) {
                                                Some(req) => {
                                                    if tx.send(req).await.is_err() {
                                                        return;
                                                    }
                                                }
                                                None => warn!(command = %text, "ignoring unrecognized external request"),
                                            }
                                        }
                                        Err(ProtocolError::ConnectionClosed) => {
                                            debug!("external request connection closed");
                                            return;
                                        }
                                        Err(e) => {
                                            warn!(error = %e, "external request read error");
                                            return;
                                        }
                                    }
                                }
                            });
                        }
                        Err(e) => warn!(error = %e, "accept error on request socket"),
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hidra_core::Endpoint;
    use hidra_wire::write_message;
    use bytes::Bytes;

    #[tokio::test]
    async fn forwards_parsed_command() {
        let listener = PullListener::bind("127.0.0.1:0".parse().unwrap(), Duration::from_secs(1))
            .await
            .unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, mut rx) = mpsc::channel(4);
        let cancel = CancellationToken::new();
        let run_cancel = cancel.clone();
        tokio::spawn(listener.run(tx, run_cancel));

        let mut client = tokio::net::TcpStream::connect(addr).await.unwrap();
        write_message(&mut client, &[Bytes::from_static(b"NEXT host:9999")], Duration::from_secs(1))
            .await
            .unwrap();

        let got = rx.recv().await.unwrap();
        assert_eq!(got, ExternalRequest::Next(Endpoint { host: "host".into(), port: 9999 }));
        cancel.cancel();
    }
}
