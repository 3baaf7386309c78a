// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Endpoint naming for the transport context (spec.md §4.1): every socket
//! is named by `(process-id, role)` and resolves to a bind or connect
//! address. External roles bind TCP; internal roles are served in-process
//! (see [`crate::bus`] and [`crate::router`]) and never touch a socket.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

/// The seven socket roles named in spec.md §4.1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SocketRole {
    /// External control REP (`com`).
    Com,
    /// External PULL of NEXT/CANCEL (`request`).
    Request,
    /// Internal REP: TaskProvider <-> SignalHandler (`request_fw`).
    RequestFw,
    /// Internal push-pull fair work distribution (`router`).
    Router,
    /// Internal pub/sub forwarder, publish side (`control_pub`).
    ControlPub,
    /// Internal pub/sub forwarder, subscribe side (`control_sub`).
    ControlSub,
    /// External SUB of confirmations from consumers (`confirm`).
    Confirm,
    /// External REQ/REP: `STATUS_CHECK` / `RESET_STATUS` (`status`).
    Status,
}

impl SocketRole {
    /// True for roles that speak to other hosts over TCP. The other roles
    /// are internal and are served by [`crate::bus::ControlBus`] or
    /// [`crate::router::WorkRouter`] without ever binding a socket.
    pub fn is_external(self) -> bool {
        matches!(
            self,
            SocketRole::Com | SocketRole::Request | SocketRole::Confirm | SocketRole::Status
        )
    }
}

/// A bind address for one of the process's external sockets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BindAddress {
    pub role: SocketRole,
    pub addr: SocketAddr,
}

impl BindAddress {
    pub fn new(role: SocketRole, port: u16) -> Self {
        Self::on(role, IpAddr::V4(Ipv4Addr::UNSPECIFIED), port)
    }

    pub fn on(role: SocketRole, ip: IpAddr, port: u16) -> Self {
        Self { role, addr: SocketAddr::new(ip, port) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn internal_roles_are_not_external() {
        assert!(!SocketRole::Router.is_external());
        assert!(!SocketRole::RequestFw.is_external());
        assert!(!SocketRole::ControlPub.is_external());
        assert!(!SocketRole::ControlSub.is_external());
    }

    #[test]
    fn external_roles_are_external() {
        assert!(SocketRole::Com.is_external());
        assert!(SocketRole::Request.is_external());
        assert!(SocketRole::Confirm.is_external());
        assert!(SocketRole::Status.is_external());
    }
}
