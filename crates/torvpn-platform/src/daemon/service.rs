//! Managed-service strategy: the daemon runs as a transient systemd unit

use crate::command::{run_checked, CommandRunner, CommandSpec};
use crate::error::{PlatformError, Result};
use crate::traits::{DaemonController, DaemonStatus, StartOutcome};
use std::path::Path;
use std::sync::Arc;
use torvpn_core::DaemonStrategy;
use tracing::{debug, info, warn};

/// Launches and queries the daemon through `systemd-run` / `systemctl`
pub struct ServiceController {
    runner: Arc<dyn CommandRunner>,
    unit: String,
    binary: String,
    dry_run: bool,
}

impl ServiceController {
    /// Controller for `unit` running `binary`
    pub fn new(runner: Arc<dyn CommandRunner>, unit: impl Into<String>, binary: impl Into<String>) -> Self {
        Self {
            runner,
            unit: unit.into(),
            binary: binary.into(),
            dry_run: false,
        }
    }

    /// Keep an unresolvable binary name instead of failing
    #[must_use]
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Unit name
    pub fn unit(&self) -> &str {
        &self.unit
    }

    /// systemd wants an absolute executable path
    fn resolve_binary(&self) -> Result<String> {
        if Path::new(&self.binary).is_absolute() {
            return Ok(self.binary.clone());
        }
        match which::which(&self.binary) {
            Ok(path) => Ok(path.display().to_string()),
            Err(_) if self.dry_run => {
                warn!(binary = %self.binary, "Daemon binary not on PATH; showing it unresolved");
                Ok(self.binary.clone())
            }
            Err(_) => Err(PlatformError::NotFound(format!("daemon binary '{}'", self.binary))),
        }
    }
}

impl DaemonController for ServiceController {
    fn strategy(&self) -> DaemonStrategy {
        DaemonStrategy::Managed
    }

    fn start(&mut self, config_path: &Path) -> Result<StartOutcome> {
        let binary = self.resolve_binary()?;
        // --collect so a failed run does not block the unit name
        let spec = CommandSpec::new("systemd-run")
            .args(["--collect", "--unit", self.unit.as_str(), binary.as_str(), "-f"])
            .arg(config_path.display().to_string())
            .privileged();
        debug!(argv = %spec, "Starting daemon unit");
        run_checked(self.runner.as_ref(), &spec)?;

        match self.status()? {
            DaemonStatus::Active => {
                info!(unit = %self.unit, "Daemon unit started");
                Ok(StartOutcome::Launched)
            }
            DaemonStatus::Inactive => Err(PlatformError::StartupFailed {
                code: None,
                diagnostics: format!("unit {} is not active after start", self.unit),
            }),
        }
    }

    fn stop(&mut self) -> Result<()> {
        let spec = CommandSpec::new("systemctl")
            .args(["stop", self.unit.as_str()])
            .privileged();
        debug!(argv = %spec, "Stopping daemon unit");
        run_checked(self.runner.as_ref(), &spec)?;
        info!(unit = %self.unit, "Daemon unit stopped");
        Ok(())
    }

    fn status(&mut self) -> Result<DaemonStatus> {
        let spec = CommandSpec::new("systemctl").args(["is-active", "--quiet", self.unit.as_str()]);
        let output = self.runner.run(&spec)?;
        let status = if output.success() {
            DaemonStatus::Active
        } else {
            DaemonStatus::Inactive
        };
        if output.code.is_none() {
            warn!(unit = %self.unit, "Status query was killed by a signal");
        }
        debug!(unit = %self.unit, %status, "Queried daemon unit");
        Ok(status)
    }
}
