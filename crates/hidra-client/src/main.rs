// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `hidra-ctl`: a small command-line front end for [`hidra_client::HidraClient`],
//! grounded on `oj-cli`'s one-subcommand-per-signal shape.

use std::net::SocketAddr;
use std::time::Duration;

use clap::{Parser, Subcommand};
use hidra_client::HidraClient;
use hidra_core::Endpoint;
use hidra_wire::TargetSpec;

#[derive(Parser)]
#[command(name = "hidra-ctl", about = "control/query client for a hidra-sender instance")]
struct Cli {
    /// `host:port` of the sender's `com` (control) socket.
    #[arg(long)]
    com_addr: SocketAddr,

    /// `host:port` of the sender's `request` (NEXT/CANCEL) socket.
    #[arg(long)]
    request_addr: SocketAddr,

    /// `host:port` of the sender's status socket, if subscribing to it.
    #[arg(long)]
    status_addr: Option<SocketAddr>,

    #[arg(long, default_value_t = 5)]
    timeout_secs: u64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// `GET_VERSION`.
    GetVersion,
    StartStream {
        #[arg(value_parser = parse_target)]
        targets: Vec<TargetSpec>,
    },
    StartStreamMetadata {
        #[arg(value_parser = parse_target)]
        targets: Vec<TargetSpec>,
    },
    StartQueryNext {
        #[arg(value_parser = parse_target)]
        targets: Vec<TargetSpec>,
    },
    StartQueryMetadata {
        #[arg(value_parser = parse_target)]
        targets: Vec<TargetSpec>,
    },
    StopStream {
        #[arg(value_parser = parse_target)]
        targets: Vec<TargetSpec>,
    },
    StopStreamMetadata {
        #[arg(value_parser = parse_target)]
        targets: Vec<TargetSpec>,
    },
    StopQueryNext {
        #[arg(value_parser = parse_target)]
        targets: Vec<TargetSpec>,
    },
    StopQueryMetadata {
        #[arg(value_parser = parse_target)]
        targets: Vec<TargetSpec>,
    },
    /// `NEXT <endpoint>`: request the next matching file for `endpoint`.
    Next { endpoint: Endpoint },
    /// `CANCEL <endpoint>`: drop a pending `NEXT` grant.
    Cancel { endpoint: Endpoint },
    StatusCheck,
    ResetStatus,
}

/// Parses `host:port:priority[:suffix1,suffix2,...]` into a [`TargetSpec`].
/// A `priority` of `0` marks a fixed storage target (spec.md §3).
fn parse_target(s: &str) -> Result<TargetSpec, String> {
    let mut parts = s.splitn(4, ':');
    let host = parts.next().ok_or("missing host")?.to_string();
    let port: u16 = parts.next().ok_or("missing port")?.parse().map_err(|_| "bad port")?;
    let priority: u32 = parts.next().ok_or("missing priority")?.parse().map_err(|_| "bad priority")?;
    let suffixes = parts.next().map(|s| s.split(',').map(str::to_string).collect());
    Ok(TargetSpec { host, port, priority, suffixes, raw_pattern: None })
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    let cli = Cli::parse();
    let timeout = Duration::from_secs(cli.timeout_secs);
    let mut client = HidraClient::new(cli.com_addr, cli.request_addr, timeout);
    if let Some(status_addr) = cli.status_addr {
        client = client.with_status(status_addr);
    }

    let result = run(&client, cli.command).await;
    if let Err(e) = result {
        eprintln!("hidra-ctl: {e}");
        std::process::exit(1);
    }
}

async fn run(client: &HidraClient, command: Command) -> Result<(), hidra_client::ClientError> {
    match command {
        Command::GetVersion => {
            println!("{}", client.get_version().await?);
        }
        Command::StartStream { targets } => client.start_stream(targets).await?,
        Command::StartStreamMetadata { targets } => client.start_stream_metadata(targets).await?,
        Command::StartQueryNext { targets } => client.start_query_next(targets).await?,
        Command::StartQueryMetadata { targets } => client.start_query_metadata(targets).await?,
        Command::StopStream { targets } => client.stop_stream(targets).await?,
        Command::StopStreamMetadata { targets } => client.stop_stream_metadata(targets).await?,
        Command::StopQueryNext { targets } => client.stop_query_next(targets).await?,
        Command::StopQueryMetadata { targets } => client.stop_query_metadata(targets).await?,
        Command::Next { endpoint } => client.next(endpoint).await?,
        Command::Cancel { endpoint } => client.cancel(endpoint).await?,
        Command::StatusCheck => {
            println!("{:?}", client.status_check().await?);
        }
        Command::ResetStatus => {
            println!("{:?}", client.reset_status().await?);
        }
    }
    Ok(())
}
