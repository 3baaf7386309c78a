// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Logging bootstrap: a rolling file layer plus an onscreen layer, the same
//! two-sink shape the teacher's daemon sets up at startup (`oj-daemon`'s
//! `tracing_subscriber::registry()` composition).

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::SenderConfig;

/// Handle kept alive for the lifetime of the process; dropping it would
/// stop the non-blocking file writer from flushing.
pub struct LoggingGuard {
    _file_guard: tracing_appender::non_blocking::WorkerGuard,
}

pub fn init(config: &SenderConfig) -> LoggingGuard {
    let file_appender = tracing_appender::rolling::daily(&config.log_path, &config.log_name);
    let (file_writer, file_guard) = tracing_appender::non_blocking(file_appender);

    let onscreen_level = match config.verbose {
        0 => config.onscreen.clone(),
        1 => "debug".to_string(),
        _ => "trace".to_string(),
    };

    let file_layer = fmt::layer().with_writer(file_writer).with_ansi(false).json();
    let onscreen_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::new(&onscreen_level));

    tracing_subscriber::registry().with(file_layer).with(onscreen_layer).init();

    LoggingGuard { _file_guard: file_guard }
}
