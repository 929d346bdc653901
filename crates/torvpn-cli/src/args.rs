//! Command-line argument parsing

use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use torvpn_core::DaemonStrategy;

use crate::commands::Command;

/// torvpn - route all host traffic through Tor
///
/// Writes the daemon configuration, runs the daemon and redirects outbound
/// TCP and DNS into it with iptables.
#[derive(Parser, Debug)]
#[command(name = "torvpn")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,

    /// Configuration file path
    #[arg(short = 'c', long, value_name = "FILE", global = true, env = "TORVPN_CONFIG")]
    pub config: Option<PathBuf>,

    /// Daemon strategy (overrides the configuration file)
    #[arg(long, value_name = "STRATEGY", global = true)]
    pub strategy: Option<DaemonStrategy>,

    /// Print host commands instead of running them
    #[arg(long, global = true)]
    pub dry_run: bool,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Output format for logs
    #[arg(long, value_enum, global = true)]
    pub log_format: Option<LogFormat>,

    /// Log file path
    #[arg(long, value_name = "FILE", global = true)]
    pub log_file: Option<PathBuf>,

    /// Run in quiet mode (errors only)
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Human-readable text
    Text,
    /// JSON format
    Json,
    /// Compact format
    Compact,
}
