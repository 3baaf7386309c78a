// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use hidra_transport::ReqRepError;
use hidra_wire::{ProtocolError, SignalReply};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("transport error: {0}")]
    Transport(#[from] ReqRepError),

    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("no status socket configured for this client")]
    NoStatusSocket,

    #[error("sender rejected the request: {0:?}")]
    Rejected(SignalReply),
}
