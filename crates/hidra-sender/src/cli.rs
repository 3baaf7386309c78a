// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Sender CLI surface (spec.md §6), mirroring the teacher CLI's clap-derive
//! convention (`oj/src/commands/daemon.rs`).

use std::net::IpAddr;
use std::path::PathBuf;

use clap::Parser;
use hidra_core::{Endpoint, RemoveData};

#[derive(Parser, Debug, Clone)]
#[command(name = "hidra-sender", version, about = "HiDRA file-multiplexing sender")]
pub struct SenderArgs {
    /// Optional TOML config file; explicit CLI flags override its values.
    #[arg(long)]
    pub config_file: Option<PathBuf>,

    #[arg(long, default_value = ".")]
    pub log_path: PathBuf,

    #[arg(long, default_value = "hidra-sender.log")]
    pub log_name: String,

    /// Approximate size threshold in bytes before the log file is rotated.
    /// `tracing-appender`'s rolling writer only rotates on a time schedule;
    /// this value is recorded for compatibility with the original flag and
    /// drives a daily rotation regardless of the configured size.
    #[arg(long, default_value_t = 10_000_000)]
    pub log_size: u64,

    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[arg(long, default_value = "info")]
    pub onscreen: String,

    #[arg(long, default_value = "hidra-sender")]
    pub procname: String,

    #[arg(long, default_value = "0.0.0.0")]
    pub ext_ip: IpAddr,

    #[arg(long, default_value_t = 50_000)]
    pub com_port: u16,

    /// Allowed peer hosts for the external control channel. Empty means
    /// allow any host (hidra_core::HostResolver::is_allowed's default).
    #[arg(long)]
    pub whitelist: Vec<String>,

    #[arg(long, default_value_t = 50_001)]
    pub request_port: u16,

    /// Recorded for CLI compatibility; `request_fw` is served in-process
    /// (DESIGN.md Open Question OQ-1), so this never binds a socket.
    #[arg(long, default_value_t = 50_002)]
    pub request_fw_port: u16,

    #[arg(long, default_value_t = 50_003)]
    pub control_pub_port: u16,

    #[arg(long, default_value_t = 50_004)]
    pub control_sub_port: u16,

    #[arg(long, default_value = "inotify")]
    pub event_detector_type: String,

    #[arg(long, default_value = "local")]
    pub data_fetcher_type: String,

    #[arg(long)]
    pub fix_subdirs: Vec<PathBuf>,

    #[arg(long)]
    pub monitored_dir: PathBuf,

    #[arg(long, default_values_t = ["close_write".to_string()])]
    pub monitored_events: Vec<String>,

    #[arg(long)]
    pub use_data_stream: bool,

    /// Fixed priority-0 storage target, `host:port`.
    #[arg(long)]
    pub data_stream_target: Option<Endpoint>,

    /// Defaults to 1 if neither this flag nor the config file sets it.
    #[arg(long)]
    pub number_of_streams: Option<usize>,

    /// Defaults to 4 MiB if neither this flag nor the config file sets it.
    #[arg(long)]
    pub chunksize: Option<u64>,

    /// Recorded for CLI compatibility; `router` is served in-process.
    #[arg(long, default_value_t = 50_005)]
    pub router_port: u16,

    #[arg(long)]
    pub local_target: Option<PathBuf>,

    #[arg(long)]
    pub store_data: bool,

    #[arg(long, default_value = "false")]
    pub remove_data: RemoveData,
}
