//! Restart command

use anyhow::Result;
use colored::Colorize;

use super::{handle_failure, report_state};
use crate::app::App;

/// Stop, then start, over one session
pub fn execute(app: &App) -> Result<()> {
    app.ensure_privileged()?;

    let mut session = app.session();
    if let Err(e) = session.write_config() {
        return handle_failure("Restart", e);
    }

    println!("Stopping VPN...");
    if let Err(e) = session.stop() {
        // a daemon that was not running is the normal case here
        handle_failure("Stop", e)?;
    }

    println!("Starting VPN...");
    match session.start() {
        Ok(state) => {
            println!("{} VPN restarted", "✓".green());
            report_state(app, state);
            Ok(())
        }
        Err(e) => handle_failure("Start", e),
    }
}
