//! CLI commands

pub mod check;
pub mod completions;
pub mod config;
pub mod restart;
pub mod run;
pub mod start;
pub mod status;
pub mod stop;

use anyhow::Result;
use clap::Subcommand;
use colored::Colorize;
use torvpn_platform::{SessionError, SessionState};

use crate::app::App;

/// CLI commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Write the daemon config, start the daemon and redirect traffic
    Start,

    /// Stop the daemon and flush the redirect rules
    Stop,

    /// Stop, then start
    Restart,

    /// Report whether the daemon is running
    Status,

    /// Start, stay in the foreground until Ctrl-C, then stop
    Run(run::RunArgs),

    /// Check that traffic leaves through the daemon
    Check(check::CheckArgs),

    /// Configuration management
    Config(config::ConfigArgs),

    /// Generate shell completions
    Completions(completions::CompletionsArgs),
}

impl Command {
    /// Commands that mutate host state
    pub fn is_lifecycle(&self) -> bool {
        matches!(
            self,
            Command::Start | Command::Stop | Command::Restart | Command::Run(_)
        )
    }
}

/// Print a session outcome line
pub(crate) fn print_state(state: SessionState) {
    match state {
        SessionState::Active => println!("{} VPN is {}", "●".green(), "active".green().bold()),
        SessionState::Inactive => println!("{} VPN is {}", "○".dimmed(), "inactive".bold()),
    }
}

/// Print the state a lifecycle command left behind
///
/// A dry run changed nothing, so there is no state to report.
pub(crate) fn report_state(app: &App, state: SessionState) {
    if app.dry_run {
        println!("{} VPN state {}", "○".dimmed(), "unknown (dry run)".bold());
    } else {
        print_state(state);
    }
}

/// Report a session failure; only a config-write failure is fatal
pub(crate) fn handle_failure(action: &str, err: SessionError) -> Result<()> {
    if err.is_fatal() {
        println!("{} {} aborted", "✗".red(), action);
        return Err(anyhow::Error::new(err).context(format!("{action} aborted")));
    }

    println!("{} {} failed: {}", "✗".red(), action, err);
    if let SessionError::Filter { rollback, .. } = &err {
        if !rollback.is_clean() {
            println!(
                "  {} Manual cleanup may be required: {}",
                "!".yellow().bold(),
                rollback
            );
        }
    }
    if let SessionError::Stop { state, .. } = &err {
        print_state(*state);
    }
    Ok(())
}
