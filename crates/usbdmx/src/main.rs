//! usbdmx - DMX512 console for USB DMX bridges
//!
//! Reconnects to a paired bridge on startup, then reads commands from stdin.

#![warn(missing_docs)]

mod commands;
mod config;
mod console;
mod logging_setup;

use anyhow::Result;
use clap::Parser;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info};
use usbdmx_control::usb::{NusbTransport, PairingStore};

use crate::commands::Command;
use crate::config::UserConfig;
use crate::console::{Backend, Console, Reply};

/// Command line options
#[derive(Parser, Debug)]
#[command(name = "usbdmx", version, about = "Drive a DMX512 universe through a USB DMX bridge")]
struct Args {
    /// Configuration file (default: <config dir>/usbdmx/config.json)
    #[arg(long)]
    config: Option<PathBuf>,
    /// Log level, overrides the configuration
    #[arg(long)]
    log_level: Option<String>,
    /// Do not reconnect to a paired device at startup
    #[arg(long)]
    no_auto_connect: bool,
    /// Simulate a bridge instead of using USB
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => UserConfig::load_from(path),
        None => {
            let config = UserConfig::load();
            // First run: leave an editable file behind
            if UserConfig::config_path().is_some_and(|p| !p.exists()) {
                if let Err(e) = config.save() {
                    eprintln!("Warning: Failed to write default config: {}", e);
                }
            }
            config
        }
    };
    if let Some(level) = &args.log_level {
        config.log_config.level = level.clone();
    }

    let _log_guard = logging_setup::init(&config.log_config)?;
    info!("=== usbdmx session started ===");

    let backend = if args.dry_run {
        info!("Dry run, no USB traffic");
        Backend::dry_run()
    } else {
        Backend::Native(Arc::new(NusbTransport::with_pairing_path(
            PairingStore::default_path(),
        )))
    };

    let mut console = Console::new(
        backend,
        config.effective_filters(),
        config.fixture_address,
    );

    if config.auto_connect && !args.no_auto_connect {
        if let Err(e) = console.startup().await {
            error!("Auto-connect failed: {:#}", e);
        }
    }

    run(&mut console).await?;
    console.shutdown().await;

    info!(
        "=== usbdmx session ended ({}) ===",
        console.controller().state()
    );
    Ok(())
}

async fn run(console: &mut Console) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    println!("Type 'help' for commands.");

    loop {
        print!("dmx> ");
        std::io::stdout().flush()?;

        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => None,
        };
        let Some(line) = line else {
            println!();
            break;
        };

        let command = match Command::parse(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(e) => {
                println!("{:#}", e);
                continue;
            }
        };

        match console.execute(command).await {
            Ok(Reply::Text(text)) => println!("{}", text),
            Ok(Reply::Done) => {}
            Ok(Reply::Quit) => break,
            Err(e) => {
                error!("{:#}", e);
                println!("Error: {:#}", e);
            }
        }
    }
    Ok(())
}
