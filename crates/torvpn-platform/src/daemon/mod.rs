//! Daemon lifecycle strategies

mod process;
mod service;

pub use process::{ProcessController, DEFAULT_STARTUP_GRACE};
pub use service::ServiceController;

use crate::command::CommandRunner;
use crate::traits::DaemonController;
use std::sync::Arc;
use std::time::Duration;
use torvpn_core::config::{DaemonSettings, PrivilegeConfig};
use torvpn_core::DaemonStrategy;
use tracing::debug;

/// Build the controller for the configured strategy
///
/// `runner` drives the managed strategy; the direct strategy spawns the
/// daemon itself. Under `dry_run` neither needs the binary to exist.
pub fn build_controller(
    settings: &DaemonSettings,
    privilege: &PrivilegeConfig,
    runner: Arc<dyn CommandRunner>,
    dry_run: bool,
) -> Box<dyn DaemonController> {
    debug!(strategy = %settings.strategy, "Building daemon controller");
    match settings.strategy {
        DaemonStrategy::Managed => Box::new(
            ServiceController::new(runner, settings.service_name.clone(), settings.binary.clone())
                .with_dry_run(dry_run),
        ),
        DaemonStrategy::Direct => Box::new(
            ProcessController::new(settings.binary.clone())
                .with_privilege(privilege)
                .with_startup_grace(Duration::from_millis(settings.startup_grace_ms))
                .with_dry_run(dry_run),
        ),
    }
}
