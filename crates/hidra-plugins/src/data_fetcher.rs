// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! DataFetcher plugin boundary (spec.md §2, §4.1 table, §4.4): opens a
//! source artifact, yields chunks, finalizes per the dispatcher's local
//! storage policy. One concrete implementation, reading from and finalizing
//! against the local filesystem.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use hidra_core::EventRecord;
use thiserror::Error;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt};

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("source read error: {0}")]
    SourceRead(#[source] std::io::Error),
    #[error("finalize error: {0}")]
    Finalize(#[source] std::io::Error),
}

/// Header-shaped metadata a fetcher reports before chunking starts (spec.md
/// §4.4 step 1).
#[derive(Debug, Clone, PartialEq)]
pub struct SourceMetadata {
    pub filesize: u64,
    pub file_mod_time: f64,
    pub file_create_time: f64,
}

/// What the dispatcher's local storage policy resolves to once a file has
/// finished streaming (spec.md §4.4 step 7, §3 "Storage policy").
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FinalizeAction {
    /// Leave the source file untouched (`store_data=true, remove_data=false`,
    /// or confirmation still outstanding).
    Keep,
    /// Copy into the local-target tree, keep the source.
    Copy(PathBuf),
    /// Move into the local-target tree, removing the source.
    Move(PathBuf),
    /// Remove the source file outright (`store_data=false, remove_data=true`).
    Delete,
}

#[async_trait]
pub trait DataFetcher: Send + Sync {
    async fn metadata(&self, event: &EventRecord) -> Result<SourceMetadata, FetchError>;

    /// Reads exactly the chunk at `chunk_number` (0-indexed), sized
    /// `chunksize` except possibly the last. Must support out-of-order
    /// reads relative to a fresh open since the dispatcher reopens via
    /// `event` each call rather than holding a stateful cursor.
    async fn read_chunk(
        &self,
        event: &EventRecord,
        chunk_number: u64,
        chunksize: u64,
    ) -> Result<Bytes, FetchError>;

    async fn finalize(&self, event: &EventRecord, action: FinalizeAction) -> Result<(), FetchError>;
}

/// Reads from, and finalizes against, the local filesystem (spec.md §4.4
/// "the file being streamed is opened read-only; the DataFetcher is
/// responsible for closing it in all exit paths" — each call opens and
/// drops its own handle, so there is nothing left open between calls).
pub struct LocalFileFetcher;

impl LocalFileFetcher {
    pub fn new() -> Self {
        Self
    }
}

impl Default for LocalFileFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DataFetcher for LocalFileFetcher {
    async fn metadata(&self, event: &EventRecord) -> Result<SourceMetadata, FetchError> {
        let meta =
            tokio::fs::metadata(event.absolute_path()).await.map_err(FetchError::SourceRead)?;
        Ok(SourceMetadata {
            filesize: meta.len(),
            file_mod_time: system_time_to_epoch_seconds(meta.modified().ok()),
            file_create_time: system_time_to_epoch_seconds(meta.created().ok()),
        })
    }

    async fn read_chunk(
        &self,
        event: &EventRecord,
        chunk_number: u64,
        chunksize: u64,
    ) -> Result<Bytes, FetchError> {
        let mut file = File::open(event.absolute_path()).await.map_err(FetchError::SourceRead)?;
        let offset = chunk_number * chunksize;
        file.seek(std::io::SeekFrom::Start(offset)).await.map_err(FetchError::SourceRead)?;
        let mut buf = vec![0u8; chunksize as usize];
        let mut read = 0usize;
        while read < buf.len() {
            let n = file.read(&mut buf[read..]).await.map_err(FetchError::SourceRead)?;
            if n == 0 {
                break;
            }
            read += n;
        }
        buf.truncate(read);
        Ok(Bytes::from(buf))
    }

    async fn finalize(&self, event: &EventRecord, action: FinalizeAction) -> Result<(), FetchError> {
        let source = event.absolute_path();
        match action {
            FinalizeAction::Keep => Ok(()),
            FinalizeAction::Delete => {
                tokio::fs::remove_file(&source).await.map_err(FetchError::Finalize)
            }
            FinalizeAction::Copy(target) => {
                ensure_parent(&target).await?;
                tokio::fs::copy(&source, &target).await.map_err(FetchError::Finalize)?;
                Ok(())
            }
            FinalizeAction::Move(target) => {
                ensure_parent(&target).await?;
                tokio::fs::rename(&source, &target).await.map_err(FetchError::Finalize)
            }
        }
    }
}

async fn ensure_parent(target: &Path) -> Result<(), FetchError> {
    if let Some(parent) = target.parent() {
        tokio::fs::create_dir_all(parent).await.map_err(FetchError::Finalize)?;
    }
    Ok(())
}

fn system_time_to_epoch_seconds(time: Option<std::time::SystemTime>) -> f64 {
    time.and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_file(dir: &tempfile::TempDir, name: &str, contents: &[u8]) -> EventRecord {
        let path = dir.path().join(name);
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(contents).unwrap();
        EventRecord::new(dir.path().to_string_lossy().into_owned(), "", name)
    }

    #[tokio::test]
    async fn metadata_reports_filesize() {
        let dir = tempfile::tempdir().unwrap();
        let event = write_file(&dir, "a.cbf", b"0123456789");
        let fetcher = LocalFileFetcher::new();
        let meta = fetcher.metadata(&event).await.unwrap();
        assert_eq!(meta.filesize, 10);
    }

    #[tokio::test]
    async fn reads_chunk_at_offset() {
        let dir = tempfile::tempdir().unwrap();
        let event = write_file(&dir, "a.cbf", b"0123456789");
        let fetcher = LocalFileFetcher::new();
        let chunk = fetcher.read_chunk(&event, 1, 4).await.unwrap();
        assert_eq!(&chunk[..], b"4567");
        let last = fetcher.read_chunk(&event, 2, 4).await.unwrap();
        assert_eq!(&last[..], b"89");
    }

    #[tokio::test]
    async fn finalize_delete_removes_source() {
        let dir = tempfile::tempdir().unwrap();
        let event = write_file(&dir, "a.cbf", b"data");
        let fetcher = LocalFileFetcher::new();
        fetcher.finalize(&event, FinalizeAction::Delete).await.unwrap();
        assert!(!event.absolute_path().exists());
    }

    #[tokio::test]
    async fn finalize_move_relocates_source() {
        let dir = tempfile::tempdir().unwrap();
        let event = write_file(&dir, "a.cbf", b"data");
        let target_dir = tempfile::tempdir().unwrap();
        let target = target_dir.path().join("a.cbf");
        let fetcher = LocalFileFetcher::new();
        fetcher.finalize(&event, FinalizeAction::Move(target.clone())).await.unwrap();
        assert!(!event.absolute_path().exists());
        assert!(target.exists());
    }
}
