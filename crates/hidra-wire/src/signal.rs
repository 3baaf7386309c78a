// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! External control protocol (spec.md §4.2, §6): `[version, signal,
//! json-targets]` over the `com` REQ/REP socket.

use hidra_core::{Mode, Pattern};
use serde::{Deserialize, Serialize};

/// A target entry in `json-targets`: `[host, port, priority]` or
/// `[host, port, priority, suffix-list]` (spec.md §6). Suffix lists become
/// an anchored regex; a bare string value is taken as a raw regex.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TargetSpec {
    pub host: String,
    pub port: u16,
    pub priority: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suffixes: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_pattern: Option<String>,
}

impl TargetSpec {
    pub fn pattern(&self) -> Result<Pattern, hidra_core::CoreError> {
        if let Some(suffixes) = &self.suffixes {
            Pattern::from_suffixes(suffixes)
        } else if let Some(raw) = &self.raw_pattern {
            Pattern::from_raw(raw)
        } else {
            Pattern::from_raw(".*")
        }
    }
}

/// The signal names from spec.md §3/§4.2.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SignalKind {
    GetVersion,
    StartStream,
    StartStreamMetadata,
    StartQueryNext,
    StartQueryMetadata,
    StopStream,
    StopStreamMetadata,
    StopQueryNext,
    StopQueryMetadata,
}

impl SignalKind {
    pub fn is_start(self) -> bool {
        matches!(
            self,
            SignalKind::StartStream
                | SignalKind::StartStreamMetadata
                | SignalKind::StartQueryNext
                | SignalKind::StartQueryMetadata
        )
    }

    pub fn mode(self) -> Option<Mode> {
        match self {
            SignalKind::StartStream | SignalKind::StopStream => Some(Mode::Data),
            SignalKind::StartStreamMetadata | SignalKind::StopStreamMetadata => Some(Mode::Metadata),
            SignalKind::StartQueryNext | SignalKind::StopQueryNext => Some(Mode::Data),
            SignalKind::StartQueryMetadata | SignalKind::StopQueryMetadata => Some(Mode::Metadata),
            SignalKind::GetVersion => None,
        }
    }

    pub fn is_stream(self) -> bool {
        matches!(
            self,
            SignalKind::StartStream
                | SignalKind::StartStreamMetadata
                | SignalKind::StopStream
                | SignalKind::StopStreamMetadata
        )
    }
}

/// The full `[version, signal, json-targets]` request frame.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SignalRequest {
    pub version: String,
    pub signal: SignalKind,
    pub targets: Vec<TargetSpec>,
}

/// Replies enumerated in spec.md §4.2.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SignalReply {
    /// `IS_ALIVE` reply.
    Ok,
    /// Echoes the original signal back on success.
    Signal { signal: SignalKind },
    Version { version: String },
    VersionConflict { sender_version: String },
    NoValidHost,
    /// Metadata-only subscribe attempted while store is off.
    StoringDisabled { sender_version: String },
    NoValidSignal,
    NoOpenConnectionFound,
    /// Legacy: treated as idempotent re-open (spec.md §9 open question (a)).
    ConnectionAlreadyOpen,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suffix_target_spec_builds_anchored_pattern() {
        let spec = TargetSpec {
            host: "H".into(),
            port: 1,
            priority: 1,
            suffixes: Some(vec![".cbf".into()]),
            raw_pattern: None,
        };
        let pattern = spec.pattern().unwrap();
        assert!(pattern.is_match("a.cbf"));
        assert!(!pattern.is_match("a.cbf.part"));
    }

    #[test]
    fn bare_string_target_spec_is_raw_regex() {
        let spec = TargetSpec {
            host: "H".into(),
            port: 1,
            priority: 1,
            suffixes: None,
            raw_pattern: Some(r"^a\.cbf$".into()),
        };
        assert!(spec.pattern().unwrap().is_match("a.cbf"));
    }
}
