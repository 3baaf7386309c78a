// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Subscriptions: the `(endpoint, priority, pattern, mode)` four-tuple
//! (spec.md §3).

use crate::endpoint::Endpoint;
use crate::pattern::Pattern;
use serde::{Deserialize, Serialize};

/// Priority 0 is the reserved fixed-storage stream (guaranteed delivery
/// with tracking); higher values are best-effort.
pub const FIXED_STORAGE_PRIORITY: u32 = 0;

/// Delivery mode: `metadata` sends the header only, `data` sends header
/// plus chunks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mode {
    Data,
    Metadata,
}

impl Mode {
    pub fn sends_payload(self) -> bool {
        matches!(self, Mode::Data)
    }
}

/// One subscription: which endpoint, at what priority, matching what
/// pattern, in what delivery mode.
#[derive(Clone, Debug)]
pub struct Subscription {
    pub endpoint: Endpoint,
    pub priority: u32,
    pub pattern: Pattern,
    pub mode: Mode,
}

impl Subscription {
    pub fn new(endpoint: Endpoint, priority: u32, pattern: Pattern, mode: Mode) -> Self {
        Self { endpoint, priority, pattern, mode }
    }

    pub fn is_fixed_storage(&self) -> bool {
        self.priority == FIXED_STORAGE_PRIORITY
    }

    pub fn matches(&self, file_identifier: &str) -> bool {
        self.pattern.is_match(file_identifier)
    }
}

/// A resolved delivery target, as handed from SignalHandler to TaskProvider
/// in a `GET_REQUESTS` reply (spec.md §4.2) and onward into a
/// [`crate::work_item::WorkItem`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
    pub endpoint: Endpoint,
    pub priority: u32,
    pub mode: TargetMode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TargetMode {
    Data,
    Metadata,
}

impl From<Mode> for TargetMode {
    fn from(m: Mode) -> Self {
        match m {
            Mode::Data => TargetMode::Data,
            Mode::Metadata => TargetMode::Metadata,
        }
    }
}
