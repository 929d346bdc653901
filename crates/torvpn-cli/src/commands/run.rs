//! Run command - foreground session
//!
//! The only lifecycle command that owns a direct daemon for its whole life:
//! start, wait for Ctrl-C, stop.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use torvpn_platform::SessionState;
use tracing::{info, warn};

use super::{handle_failure, report_state};
use crate::app::App;

/// Run command arguments
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Seconds between daemon liveness checks
    #[arg(long, value_name = "SECS", default_value = "5")]
    pub watch_interval: u64,
}

/// Execute the run command
pub fn execute(app: &App, args: RunArgs) -> Result<()> {
    app.ensure_privileged()?;

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        info!("Received interrupt signal, shutting down...");
        r.store(false, Ordering::SeqCst);
    })
    .context("Failed to set signal handler")?;

    let mut session = app.session();
    println!("Starting VPN ({} strategy)...", app.config.daemon.strategy.to_string().cyan());
    match session.start() {
        Ok(state) => report_state(app, state),
        Err(e) => return handle_failure("Start", e),
    }
    println!("{}", "Press Ctrl-C to stop".dimmed());

    let interval = Duration::from_secs(args.watch_interval.max(1));
    let mut last_check = Instant::now();
    while running.load(Ordering::SeqCst) {
        std::thread::sleep(Duration::from_millis(200));

        if app.dry_run {
            break;
        }
        if last_check.elapsed() >= interval {
            last_check = Instant::now();
            if session.status() == SessionState::Inactive {
                warn!("Daemon is no longer running");
                println!("{} Daemon exited unexpectedly", "!".yellow().bold());
                break;
            }
        }
    }

    println!("Stopping VPN...");
    match session.stop() {
        Ok(state) => {
            report_state(app, state);
            Ok(())
        }
        Err(e) => handle_failure("Stop", e),
    }
}
