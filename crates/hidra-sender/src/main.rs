// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use clap::Parser;
use hidra_sender::{SenderArgs, SenderConfig, Supervisor};
use tracing::error;

#[tokio::main]
async fn main() {
    let args = SenderArgs::parse();

    let config = match SenderConfig::resolve(args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("hidra-sender: {e}");
            std::process::exit(e.exit_code());
        }
    };

    let _logging_guard = hidra_sender::logging::init(&config);

    if let Err(e) = Supervisor::new(config).run().await {
        error!(error = %e, "hidra-sender exited with an error");
        std::process::exit(e.exit_code());
    }
}
