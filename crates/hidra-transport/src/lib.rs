// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! hidra-transport: the socket layer binding the HiDRA sender workers
//! together (spec.md §4.1, §5). External roles (`com`, `request`,
//! `confirm`) bind real TCP sockets; internal roles (`request_fw`,
//! `router`, `control_pub`/`control_sub`) are served in-process since every
//! worker is a task in the same OS process (DESIGN.md Open Question OQ-1).

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod bus;
pub mod endpoint_naming;
pub mod inbound;
pub mod pull;
pub mod push;
pub mod reqrep;
pub mod request_fw;
pub mod router;

pub use bus::{BusReceiver, ControlBus};
pub use endpoint_naming::{BindAddress, SocketRole};
pub use inbound::InboundListener;
pub use pull::PullListener;
pub use push::PushCache;
pub use reqrep::{call, ReqRepError, ReqRepServer};
pub use request_fw::{request_fw_channel, PendingCall, RequestFwClient, RequestFwError, RequestFwServer};
pub use router::{work_router, RouterReceiver, RouterSender};
