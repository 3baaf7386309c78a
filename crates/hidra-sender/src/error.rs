// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Top-level sender error taxonomy and its exit-code mapping (spec.md §7:
//! "0 clean shutdown, 1 configuration or bind failure, 2 runtime abort").

use std::path::PathBuf;

use hidra_plugins::WatchError;
use hidra_transport::ReqRepError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SenderError {
    #[error("failed to read config file {path}: {source}")]
    ConfigRead { path: PathBuf, #[source] source: std::io::Error },

    #[error("failed to parse config file {path}: {source}")]
    ConfigParse { path: PathBuf, #[source] source: toml::de::Error },

    #[error("failed to start filesystem watcher: {0}")]
    Watch(#[from] WatchError),

    #[error("failed to bind socket: {0}")]
    Bind(#[from] ReqRepError),

    #[error("failed to bind socket: {0}")]
    Io(#[from] std::io::Error),

    #[error("runtime error: {0}")]
    Runtime(String),
}

impl SenderError {
    /// Maps this error onto the sender's process exit code.
    pub fn exit_code(&self) -> i32 {
        match self {
            SenderError::ConfigRead { .. }
            | SenderError::ConfigParse { .. }
            | SenderError::Watch(_)
            | SenderError::Bind(_)
            | SenderError::Io(_) => 1,
            SenderError::Runtime(_) => 2,
        }
    }
}
