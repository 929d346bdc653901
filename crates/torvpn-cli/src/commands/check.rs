//! Check command - connectivity through the daemon

use anyhow::Result;
use clap::Args;
use colored::Colorize;
use std::time::{Duration, Instant};
use torvpn_platform::{ConnectivityProbe, ProbeResult};

use crate::app::App;

/// Check command arguments
#[derive(Args, Debug)]
pub struct CheckArgs {
    /// SOCKS proxy URL (default: the daemon's SOCKS port)
    #[arg(long, value_name = "URL")]
    pub proxy: Option<String>,

    /// Page to fetch
    #[arg(long, value_name = "URL")]
    pub url: Option<String>,

    /// Timeout in seconds
    #[arg(short, long)]
    pub timeout: Option<u64>,
}

/// Execute the check command
///
/// A failed check is reported, not returned as an error.
pub fn execute(app: &App, args: CheckArgs) -> Result<()> {
    let proxy = args.proxy.unwrap_or_else(|| app.config.probe_proxy());
    let url = args.url.unwrap_or_else(|| app.config.probe.url.clone());
    let timeout = args.timeout.or(app.config.probe.timeout_secs).map(Duration::from_secs);

    println!("Checking {} via {}", url.cyan(), proxy.cyan());

    let start = Instant::now();
    let probe = ConnectivityProbe::http(app.config.probe.success_marker.clone(), timeout);
    match probe.check(&proxy, &url) {
        ProbeResult::Success => {
            println!("  {} Routed through Tor ({:?})", "✓".green(), start.elapsed());
        }
        ProbeResult::Failure(reason) => {
            println!("  {} {}", "✗".red(), reason);
            println!();
            println!("{}", "Traffic is not confirmed to go through Tor".red().bold());
        }
    }
    Ok(())
}
