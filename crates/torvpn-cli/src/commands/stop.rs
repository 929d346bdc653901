//! Stop command

use anyhow::Result;
use colored::Colorize;

use super::{handle_failure, report_state};
use crate::app::App;

/// Execute the stop command
pub fn execute(app: &App) -> Result<()> {
    app.ensure_privileged()?;

    let mut session = app.session();
    if let Err(e) = session.write_config() {
        return handle_failure("Stop", e);
    }

    println!("Stopping VPN...");
    match session.stop() {
        Ok(state) => {
            println!("{} Daemon stopped and rules flushed", "✓".green());
            report_state(app, state);
            Ok(())
        }
        Err(e) => handle_failure("Stop", e),
    }
}
