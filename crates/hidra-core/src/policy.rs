// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Local storage/removal policy (spec.md §4.4, §4.5, §6 `--remove-data`).

use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RemoveData {
    /// Never delete the source artifact.
    False,
    /// Delete as soon as the dispatcher finishes sending (no confirmation
    /// wait).
    True,
    /// Delete only after every chunk for the file identifier has been
    /// confirmed (I5) — the Cleaner, not the dispatcher, performs this.
    WithConfirmation,
}

impl RemoveData {
    pub fn requires_confirmation(self) -> bool {
        matches!(self, RemoveData::WithConfirmation)
    }
}

impl FromStr for RemoveData {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "false" => Ok(RemoveData::False),
            "true" => Ok(RemoveData::True),
            "with_confirmation" => Ok(RemoveData::WithConfirmation),
            other => Err(format!("invalid --remove-data value: {other}")),
        }
    }
}

/// What the DataFetcher/Cleaner does with the source artifact once a file
/// has finished successfully (spec.md §4.4 step 7, §4.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoragePolicy {
    pub store_data: bool,
    pub remove_data: RemoveData,
}

impl StoragePolicy {
    pub fn new(store_data: bool, remove_data: RemoveData) -> Self {
        Self { store_data, remove_data }
    }

    /// The dispatcher must not delete the source itself if confirmation is
    /// required — that is the Cleaner's job (spec.md §4.4 step 7).
    pub fn dispatcher_may_delete_immediately(&self) -> bool {
        matches!(self.remove_data, RemoveData::True)
    }
}
