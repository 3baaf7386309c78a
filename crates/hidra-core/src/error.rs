// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use thiserror::Error;

/// Errors raised by the pure data-model and registry logic.
///
/// None of these are fatal to a running worker — callers translate them
/// into the appropriate [`crate::signal::SignalReply`] or log-and-continue,
/// per spec.md §7 ("never crash on peer input").
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CoreError {
    #[error("invalid regex pattern: {0}")]
    InvalidPattern(String),

    #[error("nodeset overlaps an existing nodeset without nesting")]
    OverlappingNodeset,

    #[error("host '{0}' is not on the allow-list")]
    HostNotAllowed(String),

    #[error("endpoint set is empty")]
    EmptyNodeset,
}
