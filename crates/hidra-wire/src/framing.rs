// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Multi-frame message framing over any `AsyncRead`/`AsyncWrite`.
//!
//! Wire format per frame: 4-byte length prefix (big-endian) + raw bytes,
//! generalized from the teacher daemon's single-JSON-frame protocol
//! (`oj-daemon/src/protocol/mod.rs`) to HiDRA's multi-frame messages (a
//! chunk is `[header-json, payload-bytes]`, spec.md §3). A message is a
//! frame count (1 byte) followed by that many length-prefixed frames.

use bytes::Bytes;
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Maximum single-frame size (256 MiB) — generous relative to any
/// configured `chunksize`, just a sanity bound against a corrupt peer.
pub const MAX_FRAME_LEN: u32 = 256 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("connection closed")]
    ConnectionClosed,

    #[error("operation timed out")]
    Timeout,

    #[error("frame too large: {0} bytes")]
    FrameTooLarge(u32),

    #[error("too many frames in one message: {0}")]
    TooManyFrames(u8),

    #[error("malformed JSON frame: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Read one multi-frame message, bounded by `timeout`.
pub async fn read_message<R>(reader: &mut R, timeout: Duration) -> Result<Vec<Bytes>, ProtocolError>
where
    R: AsyncRead + Unpin,
{
    tokio::time::timeout(timeout, read_message_inner(reader))
        .await
        .map_err(|_| ProtocolError::Timeout)?
}

async fn read_message_inner<R>(reader: &mut R) -> Result<Vec<Bytes>, ProtocolError>
where
    R: AsyncRead + Unpin,
{
    let mut count_buf = [0u8; 1];
    match reader.read_exact(&mut count_buf).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
            return Err(ProtocolError::ConnectionClosed)
        }
        Err(e) => return Err(e.into()),
    }
    let frame_count = count_buf[0];
    let mut frames = Vec::with_capacity(frame_count as usize);
    for _ in 0..frame_count {
        frames.push(read_one_frame(reader).await?);
    }
    Ok(frames)
}

async fn read_one_frame<R>(reader: &mut R) -> Result<Bytes, ProtocolError>
where
    R: AsyncRead + Unpin,
{
    let mut len_buf = [0u8; 4];
    reader.read_exact(&mut len_buf).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::UnexpectedEof {
            ProtocolError::ConnectionClosed
        } else {
            ProtocolError::Io(e)
        }
    })?;
    let len = u32::from_be_bytes(len_buf);
    if len > MAX_FRAME_LEN {
        return Err(ProtocolError::FrameTooLarge(len));
    }
    let mut buf = vec![0u8; len as usize];
    reader.read_exact(&mut buf).await?;
    Ok(Bytes::from(buf))
}

/// Write one multi-frame message, bounded by `timeout`.
pub async fn write_message<W>(
    writer: &mut W,
    frames: &[Bytes],
    timeout: Duration,
) -> Result<(), ProtocolError>
where
    W: AsyncWrite + Unpin,
{
    if frames.len() > u8::MAX as usize {
        return Err(ProtocolError::TooManyFrames(u8::MAX));
    }
    tokio::time::timeout(timeout, write_message_inner(writer, frames))
        .await
        .map_err(|_| ProtocolError::Timeout)?
}

async fn write_message_inner<W>(writer: &mut W, frames: &[Bytes]) -> Result<(), ProtocolError>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(&[frames.len() as u8]).await?;
    for frame in frames {
        writer.write_all(&(frame.len() as u32).to_be_bytes()).await?;
        writer.write_all(frame).await?;
    }
    writer.flush().await?;
    Ok(())
}

/// Convenience: serialize `value` as a single JSON frame and write it as a
/// one-frame message.
pub async fn write_json<W, T>(writer: &mut W, value: &T, timeout: Duration) -> Result<(), ProtocolError>
where
    W: AsyncWrite + Unpin,
    T: serde::Serialize,
{
    let body = serde_json::to_vec(value)?;
    write_message(writer, &[Bytes::from(body)], timeout).await
}

/// Convenience: read a one-frame message and deserialize it as JSON.
pub async fn read_json<R, T>(reader: &mut R, timeout: Duration) -> Result<T, ProtocolError>
where
    R: AsyncRead + Unpin,
    T: serde::de::DeserializeOwned,
{
    let mut frames = read_message(reader, timeout).await?;
    let frame = frames.pop().ok_or(ProtocolError::ConnectionClosed)?;
    Ok(serde_json::from_slice(&frame)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn round_trips_multi_frame_message() {
        let (mut client, mut server) = tokio::io::duplex(4096);
        let frames = vec![Bytes::from_static(b"header"), Bytes::from_static(b"payload")];
        write_message(&mut client, &frames, Duration::from_secs(1)).await.unwrap();
        let got = read_message(&mut server, Duration::from_secs(1)).await.unwrap();
        assert_eq!(got, frames);
    }

    #[tokio::test]
    async fn round_trips_json_frame() {
        #[derive(serde::Serialize, serde::Deserialize, PartialEq, Debug)]
        struct Ping {
            n: u32,
        }
        let (mut client, mut server) = tokio::io::duplex(4096);
        write_json(&mut client, &Ping { n: 7 }, Duration::from_secs(1)).await.unwrap();
        let got: Ping = read_json(&mut server, Duration::from_secs(1)).await.unwrap();
        assert_eq!(got, Ping { n: 7 });
    }

    #[tokio::test]
    async fn closed_connection_is_reported_distinctly() {
        let (client, mut server) = tokio::io::duplex(4096);
        drop(client);
        let err = read_message(&mut server, Duration::from_secs(1)).await.unwrap_err();
        assert!(matches!(err, ProtocolError::ConnectionClosed));
    }
}
