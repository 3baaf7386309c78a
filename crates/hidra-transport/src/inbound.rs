// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Generic inbound multi-frame listener: accepts connections and forwards
//! every decoded message onto a channel. Used for the `confirm` socket
//! (Cleaner binds and consumers connect to report confirmations, spec.md
//! §4.4, §6) and for in-process test consumers standing in for a real
//! receiver on the data-stream socket.

use std::net::SocketAddr;
use std::time::Duration;

use bytes::Bytes;
use hidra_wire::{read_message, ProtocolError};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

pub struct InboundListener {
    listener: TcpListener,
    timeout: Duration,
}

impl InboundListener {
    pub async fn bind(addr: SocketAddr, timeout: Duration) -> std::io::Result<Self> {
        Ok(Self { listener: TcpListener::bind(addr).await?, timeout })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub async fn run(self, tx: mpsc::Sender<Vec<Bytes>>, cancel: CancellationToken) {
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
                                            if tx.send(frames).await.is_err() {
                                                return;
                                            }
                                        }
                                        Err(ProtocolError::ConnectionClosed) => {
                                            debug!("inbound connection closed");
                                            return;
                                        }
                                        Err(e) => {
                                            warn!(error = %e, "inbound read error");
                                            return;
                                        }
                                    }
                                }
                            });
                        }
                        Err(e) => warn!(error = %e, "accept error on inbound socket"),
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hidra_wire::write_message;

    #[tokio::test]
    async fn forwards_every_message_on_a_connection() {
        let listener = InboundListener::bind("127.0.0.1:0".parse().unwrap(), Duration::from_secs(1))
            .await
            .unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, mut rx) = mpsc::channel(4);
        let cancel = CancellationToken::new();
        let run_cancel = cancel.clone();
        tokio::spawn(listener.run(tx, run_cancel));

        let mut client = tokio::net::TcpStream::connect(addr).await.unwrap();
        write_message(&mut client, &[Bytes::from_static(b"a")], Duration::from_secs(1)).await.unwrap();
        write_message(&mut client, &[Bytes::from_static(b"b")], Duration::from_secs(1)).await.unwrap();

        assert_eq!(rx.recv().await, Some(vec![Bytes::from_static(b"a")]));
        assert_eq!(rx.recv().await, Some(vec![Bytes::from_static(b"b")]));
        cancel.cancel();
    }
}
