// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Control-bus messages fanned out to every long-lived worker (spec.md
//! §4.1): `control/EXIT`, `control/SLEEP`, `control/WAKEUP`,
//! `signal/CLOSE_SOCKETS <json-endpoint-list>`.

use hidra_core::Endpoint;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ControlMessage {
    Exit,
    Sleep,
    Wakeup,
    CloseSockets { endpoints: Vec<Endpoint> },
}

impl ControlMessage {
    /// Topic string this message is published under, preserved from the
    /// original ZeroMQ pub/sub forwarder so the same wire shape could be
    /// replayed over a real socket in a multi-process deployment (see
    /// DESIGN.md Open Question OQ-1).
    pub fn topic(&self) -> &'static str {
        match self {
            ControlMessage::Exit => "control/EXIT",
            ControlMessage::Sleep => "control/SLEEP",
            ControlMessage::Wakeup => "control/WAKEUP",
            ControlMessage::CloseSockets { .. } => "signal/CLOSE_SOCKETS",
        }
    }
}
