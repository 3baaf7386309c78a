// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Outbound data-stream PUSH socket with a per-endpoint connection cache
//! (spec.md §4.4 step 3): "open a reusable outbound socket per endpoint,
//! lazily created and cached on this worker." One `PushCache` lives per
//! DataDispatcher; it owns exactly the connections that worker has opened,
//! matching spec.md §5's "sockets themselves are owned by exactly one
//! worker."

use std::collections::HashMap;
use std::time::Duration;

use bytes::Bytes;
use hidra_core::Endpoint;
use hidra_wire::{write_message, ProtocolError};
use tokio::net::TcpStream;

pub struct PushCache {
    connections: HashMap<Endpoint, TcpStream>,
    timeout: Duration,
}

impl PushCache {
    pub fn new(timeout: Duration) -> Self {
        Self { connections: HashMap::new(), timeout }
    }

    /// Send `frames` to `endpoint`, connecting (and caching the connection)
    /// on first use. A broken cached connection is dropped and one
    /// reconnect is attempted before giving up, since the peer may simply
    /// have recycled its listening socket between files.
    pub async fn send(&mut self, endpoint: &Endpoint, frames: &[Bytes]) -> Result<(), ProtocolError> {
        if let Some(stream) = self.connections.get_mut(endpoint) {
            if write_message(stream, frames, self.timeout).await.is_ok() {
                return Ok(());
            }
            self.connections.remove(endpoint);
        }
        let mut stream = TcpStream::connect((endpoint.host.as_str(), endpoint.port)).await?;
        write_message(&mut stream, frames, self.timeout).await?;
        self.connections.insert(endpoint.clone(), stream);
        Ok(())
    }

    /// Drop the cached connection for `endpoint`, if any. Used when
    /// handling `CLOSE_SOCKETS` (spec.md §4.4).
    pub fn close(&mut self, endpoint: &Endpoint) {
        self.connections.remove(endpoint);
    }

    pub fn close_all(&mut self, endpoints: &[Endpoint]) {
        for e in endpoints {
            self.close(e);
        }
    }

    pub fn is_open(&self, endpoint: &Endpoint) -> bool {
        self.connections.contains_key(endpoint)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hidra_wire::read_message;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn caches_connection_across_sends() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let first = read_message(&mut stream, Duration::from_secs(1)).await.unwrap();
            let second = read_message(&mut stream, Duration::from_secs(1)).await.unwrap();
            (first, second)
        });

        let endpoint = Endpoint::new("127.0.0.1", addr.port());
        let mut cache = PushCache::new(Duration::from_secs(1));
        cache.send(&endpoint, &[Bytes::from_static(b"one")]).await.unwrap();
        assert!(cache.is_open(&endpoint));
        cache.send(&endpoint, &[Bytes::from_static(b"two")]).await.unwrap();

        let (first, second) = server.await.unwrap();
        assert_eq!(first, vec![Bytes::from_static(b"one")]);
        assert_eq!(second, vec![Bytes::from_static(b"two")]);
    }

    #[tokio::test]
    async fn close_drops_cached_connection() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let _ = read_message(&mut stream, Duration::from_secs(1)).await;
        });
        let endpoint = Endpoint::new("127.0.0.1", addr.port());
        let mut cache = PushCache::new(Duration::from_secs(1));
        cache.send(&endpoint, &[Bytes::from_static(b"one")]).await.unwrap();
        cache.close(&endpoint);
        assert!(!cache.is_open(&endpoint));
    }
}
