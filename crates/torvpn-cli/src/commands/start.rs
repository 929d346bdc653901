//! Start command

use anyhow::Result;
use colored::Colorize;
use tracing::{info, warn};

use super::{handle_failure, report_state};
use crate::app::App;

/// Execute the start command
pub fn execute(app: &App) -> Result<()> {
    app.ensure_privileged()?;

    let strategy = app.config.daemon.strategy;
    if !strategy.outlives_process() {
        warn!("Direct strategy: the daemon outlives this command but `torvpn stop` cannot signal it; prefer `torvpn run`");
    }

    let mut session = app.session();
    println!("Starting VPN ({} strategy)...", strategy.to_string().cyan());
    info!(config = %session.config_path().display(), "Starting session");

    match session.start() {
        Ok(state) => {
            println!("{} Daemon started and traffic redirected", "✓".green());
            report_state(app, state);
            Ok(())
        }
        Err(e) => handle_failure("Start", e),
    }
}
