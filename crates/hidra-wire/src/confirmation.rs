// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Confirmation channel wire frame (spec.md §6): topic is the per-file tag
//! echoed in the chunk header; payload is the UTF-8 file identifier and
//! the confirmed chunk number.

use bytes::Bytes;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmationFrame {
    pub topic: String,
    pub file_identifier: String,
    pub chunk_number: u64,
}

impl ConfirmationFrame {
    pub fn into_wire_frames(self) -> Vec<Bytes> {
        vec![
            Bytes::from(self.topic.into_bytes()),
            Bytes::from(format!("{}\n{}", self.file_identifier, self.chunk_number).into_bytes()),
        ]
    }

    pub fn from_wire_frames(frames: &[Bytes]) -> Option<Self> {
        if frames.len() != 2 {
            return None;
        }
        let topic = String::from_utf8_lossy(&frames[0]).into_owned();
        let payload = String::from_utf8_lossy(&frames[1]).into_owned();
        let (file_identifier, chunk_number) = payload.split_once('\n')?;
        Some(Self {
            topic,
            file_identifier: file_identifier.to_string(),
            chunk_number: chunk_number.parse().ok()?,
        })
    }
}
