// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Resolved sender configuration: CLI flags layered over an optional TOML
//! file (spec.md §6). Mirrors `oj-daemon/src/env.rs`'s centralized
//! resolution, except here the file is loaded once at startup rather than
//! read from the environment per call.

use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use hidra_core::{Endpoint, RemoveData};
use serde::Deserialize;

use crate::cli::SenderArgs;
use crate::error::SenderError;

/// The minimal on-disk subset (spec.md §6): everything else is CLI-only.
/// File values are overridden by any flag the operator passed explicitly.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FileConfig {
    pub data_stream_target: Option<Endpoint>,
    pub chunksize: Option<u64>,
    pub number_of_streams: Option<usize>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self, SenderError> {
        let text = std::fs::read_to_string(path)
            .map_err(|source| SenderError::ConfigRead { path: path.to_path_buf(), source })?;
        toml::from_str(&text)
            .map_err(|source| SenderError::ConfigParse { path: path.to_path_buf(), source })
    }
}

#[derive(Debug, Clone)]
pub struct SenderConfig {
    pub log_path: PathBuf,
    pub log_name: String,
    pub log_size: u64,
    pub verbose: u8,
    pub onscreen: String,
    pub procname: String,
    pub ext_ip: IpAddr,
    pub com_port: u16,
    pub whitelist: Vec<String>,
    pub request_port: u16,
    pub control_pub_port: u16,
    pub control_sub_port: u16,
    pub event_detector_type: String,
    pub data_fetcher_type: String,
    pub fix_subdirs: Vec<PathBuf>,
    pub monitored_dir: PathBuf,
    pub monitored_events: Vec<String>,
    pub use_data_stream: bool,
    pub data_stream_target: Option<Endpoint>,
    pub number_of_streams: usize,
    pub chunksize: u64,
    pub local_target: Option<PathBuf>,
    pub store_data: bool,
    pub remove_data: RemoveData,
    pub io_timeout: Duration,
}

impl SenderConfig {
    pub fn resolve(args: SenderArgs) -> Result<Self, SenderError> {
        let file = match &args.config_file {
            Some(path) => FileConfig::load(path)?,
            None => FileConfig::default(),
        };

        Ok(Self {
            log_path: args.log_path,
            log_name: args.log_name,
            log_size: args.log_size,
            verbose: args.verbose,
            onscreen: args.onscreen,
            procname: args.procname,
            ext_ip: args.ext_ip,
            com_port: args.com_port,
            whitelist: args.whitelist,
            request_port: args.request_port,
            control_pub_port: args.control_pub_port,
            control_sub_port: args.control_sub_port,
            event_detector_type: args.event_detector_type,
            data_fetcher_type: args.data_fetcher_type,
            fix_subdirs: args.fix_subdirs,
            monitored_dir: args.monitored_dir,
            monitored_events: args.monitored_events,
            use_data_stream: args.use_data_stream,
            data_stream_target: args.data_stream_target.or(file.data_stream_target),
            number_of_streams: args.number_of_streams.or(file.number_of_streams).unwrap_or(1),
            chunksize: args.chunksize.or(file.chunksize).unwrap_or(4 * 1024 * 1024),
            local_target: args.local_target,
            store_data: args.store_data,
            remove_data: args.remove_data,
            io_timeout: Duration::from_secs(10),
        })
    }
}
