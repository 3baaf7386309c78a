// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Work items handed from the TaskProvider to a DataDispatcher over the
//! router (spec.md §3).

use crate::event::EventRecord;
use crate::subscription::Target;
use serde::{Deserialize, Serialize};

/// An event plus its resolved consumer list. Emitted even when `targets`
/// is empty so the dispatcher can still apply local storage/removal
/// policy (spec.md §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkItem {
    pub event: EventRecord,
    pub targets: Vec<Target>,
}

impl WorkItem {
    pub fn new(event: EventRecord, targets: Vec<Target>) -> Self {
        Self { event, targets }
    }

    pub fn has_targets(&self) -> bool {
        !self.targets.is_empty()
    }
}
