//! Status command

use anyhow::Result;
use colored::Colorize;

use super::print_state;
use crate::app::App;

/// Execute the status command
pub fn execute(app: &App) -> Result<()> {
    let mut session = app.query_session();

    match session.query_status() {
        Ok(state) => print_state(state),
        Err(e) => {
            println!("{} Status query failed: {}", "!".yellow().bold(), e);
            print_state(session.status());
        }
    }

    if !app.config.daemon.strategy.outlives_process() {
        println!(
            "  {}",
            "Direct strategy only sees a daemon started by this process; use `torvpn run`".dimmed()
        );
    }
    Ok(())
}
