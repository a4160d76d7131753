// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! intaked: the intake file-processing daemon.
//!
//! Loads a TOML configuration, starts one worker per watch configuration,
//! and runs until SIGINT/SIGTERM. The standalone binary runs without a
//! database sink (files queue until one is wired in); deployments embed
//! the `intake-daemon` crate and supply a real executor.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

use intake_daemon::{config_file::DaemonConfig, executor::DisabledSqlExecutor, lifecycle};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal::unix::{signal, SignalKind};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

const DEFAULT_CONFIG_PATH: &str = "/etc/intake/intake.toml";

#[tokio::main]
async fn main() -> std::process::ExitCode {
    let mut args = std::env::args().skip(1);
    let config_path = match args.next() {
        Some(arg) if arg == "--version" || arg == "-V" => {
            println!("intaked {}", env!("CARGO_PKG_VERSION"));
            return std::process::ExitCode::SUCCESS;
        }
        Some(arg) if arg == "--help" || arg == "-h" => {
            print_help();
            return std::process::ExitCode::SUCCESS;
        }
        Some(arg) if arg.starts_with('-') => {
            eprintln!("error: unexpected argument '{arg}'");
            eprintln!("Usage: intaked [CONFIG_PATH]");
            return std::process::ExitCode::FAILURE;
        }
        Some(path) => PathBuf::from(path),
        None => PathBuf::from(DEFAULT_CONFIG_PATH),
    };

    let config = match DaemonConfig::load(&config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {e}");
            return std::process::ExitCode::FAILURE;
        }
    };

    let _log_guard = setup_logging(&config);

    let daemon = match lifecycle::startup(config, Arc::new(DisabledSqlExecutor)).await {
        Ok(daemon) => daemon,
        Err(e) => {
            error!("startup failed: {e}");
            eprintln!("error: {e}");
            return std::process::ExitCode::FAILURE;
        }
    };
    info!("intaked ready");

    if let Err(e) = wait_for_shutdown_signal().await {
        error!("signal handling failed: {e}");
    }

    daemon.shutdown().await;
    info!("intaked stopped");
    std::process::ExitCode::SUCCESS
}

async fn wait_for_shutdown_signal() -> std::io::Result<()> {
    let mut interrupt = signal(SignalKind::interrupt())?;
    let mut terminate = signal(SignalKind::terminate())?;
    tokio::select! {
        _ = interrupt.recv() => info!("received SIGINT"),
        _ = terminate.recv() => info!("received SIGTERM"),
    }
    Ok(())
}

/// File logging under the state dir, env-filtered, non-blocking.
fn setup_logging(config: &DaemonConfig) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let _ = std::fs::create_dir_all(&config.daemon.state_dir);
    let appender = tracing_appender::rolling::never(&config.daemon.state_dir, "intaked.log");
    let (writer, guard) = tracing_appender::non_blocking(appender);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .init();
    Some(guard)
}

fn print_help() {
    println!("intaked {}", env!("CARGO_PKG_VERSION"));
    println!("Multi-tenant file-watching daemon: drops become ordered processing jobs");
    println!();
    println!("USAGE:");
    println!("    intaked [CONFIG_PATH]");
    println!();
    println!("ARGS:");
    println!("    CONFIG_PATH    TOML configuration file [default: {DEFAULT_CONFIG_PATH}]");
    println!();
    println!("OPTIONS:");
    println!("    -h, --help       Print help information");
    println!("    -V, --version    Print version information");
}
