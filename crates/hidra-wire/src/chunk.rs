// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Data-stream wire types: chunk headers and the sentinel frames shared by
//! the same PUSH/PULL socket (spec.md §3, §6).

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Header carried alongside every chunk payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkHeader {
    pub filename: String,
    pub source_path: String,
    pub relative_path: String,
    pub filesize: u64,
    pub file_mod_time: f64,
    pub file_create_time: f64,
    pub chunksize: u64,
    pub chunk_number: u64,
    /// Confirmation topic string, present only when
    /// `remove_data == with_confirmation` (spec.md §3, §4.4 step 6).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confirmation_required: Option<String>,
}

impl ChunkHeader {
    /// A final chunk is any chunk with `len(payload) < chunksize`, or the
    /// exact last chunk when `filesize % chunksize == 0` (spec.md §3).
    pub fn is_final(&self, payload_len: u64) -> bool {
        if payload_len < self.chunksize {
            return true;
        }
        if self.filesize == 0 {
            return true;
        }
        self.filesize % self.chunksize == 0
            && (self.chunk_number + 1) * self.chunksize == self.filesize
    }
}

/// Total number of chunks a file of `filesize` splits into at `chunksize`.
pub fn chunk_count(filesize: u64, chunksize: u64) -> u64 {
    if chunksize == 0 {
        return 0;
    }
    filesize.div_ceil(chunksize).max(1)
}

/// A two-frame `[header-json, payload-bytes]` message, or one of the two
/// sentinel frames multiplexed onto the same socket (spec.md §6): a
/// liveness probe, or a stream-termination marker for NEXUS-style
/// receivers.
#[derive(Debug, Clone, PartialEq)]
pub enum DataFrame {
    Chunk { header: ChunkHeader, payload: Bytes },
    Metadata { header: ChunkHeader },
    AliveTest,
    CloseFile { filename: String, dispatcher_id: String },
}

pub const ALIVE_TEST_SENTINEL: &[u8] = b"ALIVE_TEST";
pub const CLOSE_FILE_SENTINEL: &[u8] = b"CLOSE_FILE";

impl DataFrame {
    pub fn into_wire_frames(self) -> Vec<Bytes> {
        match self {
            DataFrame::Chunk { header, payload } => {
                vec![Bytes::from(serde_json::to_vec(&header).unwrap_or_default()), payload]
            }
            DataFrame::Metadata { header } => {
                vec![Bytes::from(serde_json::to_vec(&header).unwrap_or_default()), Bytes::new()]
            }
            DataFrame::AliveTest => vec![Bytes::from_static(ALIVE_TEST_SENTINEL)],
            DataFrame::CloseFile { filename, dispatcher_id } => vec![
                Bytes::from_static(CLOSE_FILE_SENTINEL),
                Bytes::from(filename.into_bytes()),
                Bytes::from(dispatcher_id.into_bytes()),
            ],
        }
    }

    pub fn from_wire_frames(frames: Vec<Bytes>) -> Option<Self> {
        if frames.is_empty() {
            return None;
        }
        if frames[0].as_ref() == ALIVE_TEST_SENTINEL && frames.len() == 1 {
            return Some(DataFrame::AliveTest);
        }
        if frames[0].as_ref() == CLOSE_FILE_SENTINEL && frames.len() == 3 {
            let filename = String::from_utf8_lossy(&frames[1]).into_owned();
            let dispatcher_id = String::from_utf8_lossy(&frames[2]).into_owned();
            return Some(DataFrame::CloseFile { filename, dispatcher_id });
        }
        if frames.len() == 2 {
            let header: ChunkHeader = serde_json::from_slice(&frames[0]).ok()?;
            return if frames[1].is_empty() {
                Some(DataFrame::Metadata { header })
            } else {
                Some(DataFrame::Chunk { header, payload: frames[1].clone() })
            };
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(chunksize: u64, filesize: u64, chunk_number: u64) -> ChunkHeader {
        ChunkHeader {
            filename: "a.cbf".into(),
            source_path: "/data".into(),
            relative_path: "".into(),
            filesize,
            file_mod_time: 0.0,
            file_create_time: 0.0,
            chunksize,
            chunk_number,
            confirmation_required: None,
        }
    }

    #[test]
    fn final_chunk_when_payload_shorter_than_chunksize() {
        let h = header(10, 25, 2);
        assert!(h.is_final(5));
        assert!(!h.is_final(10));
    }

    #[test]
    fn final_chunk_when_filesize_divides_evenly() {
        let h = header(10, 30, 2);
        assert!(h.is_final(10));
        let h = header(10, 30, 1);
        assert!(!h.is_final(10));
    }

    #[test]
    fn chunk_count_rounds_up() {
        assert_eq!(chunk_count(25, 10), 3);
        assert_eq!(chunk_count(30, 10), 3);
        assert_eq!(chunk_count(0, 10), 1);
    }

    #[test]
    fn data_frame_round_trips_through_wire_frames() {
        let frame = DataFrame::Chunk { header: header(10, 25, 0), payload: Bytes::from_static(b"0123456789") };
        let wire = frame.clone().into_wire_frames();
        let back = DataFrame::from_wire_frames(wire).unwrap();
        assert_eq!(back, frame);
    }

    #[test]
    fn alive_test_round_trips() {
        let wire = DataFrame::AliveTest.into_wire_frames();
        assert_eq!(DataFrame::from_wire_frames(wire), Some(DataFrame::AliveTest));
    }

    #[test]
    fn close_file_round_trips() {
        let frame = DataFrame::CloseFile { filename: "a.cbf".into(), dispatcher_id: "0/4".into() };
        let wire = frame.clone().into_wire_frames();
        assert_eq!(DataFrame::from_wire_frames(wire), Some(frame));
    }
}
