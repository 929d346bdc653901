//! Direct-process strategy: the daemon is our child

use crate::command::{classify_failure, escalation_program, spawn_error};
use crate::error::{PlatformError, Result};
use crate::traits::{DaemonController, DaemonStatus, StartOutcome};
use std::ffi::OsString;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::time::Duration;
use torvpn_core::config::PrivilegeConfig;
use torvpn_core::DaemonStrategy;
use tracing::{debug, info, warn};

/// Default time a fresh child must survive to count as started
pub const DEFAULT_STARTUP_GRACE: Duration = Duration::from_millis(500);

/// Spawns the daemon and owns its handle
///
/// The handle is not shared. Dropping the controller leaves the child
/// running; call [`DaemonController::stop`] to end it.
#[derive(Debug)]
pub struct ProcessController {
    binary: String,
    escalation: Option<String>,
    grace: Duration,
    dry_run: bool,
    child: Option<Child>,
}

impl ProcessController {
    /// Controller for `binary` with the default startup grace
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
            escalation: None,
            grace: DEFAULT_STARTUP_GRACE,
            dry_run: false,
            child: None,
        }
    }

    /// Launch through the escalation helper when configured
    #[must_use]
    pub fn with_privilege(mut self, privilege: &PrivilegeConfig) -> Self {
        self.escalation = escalation_program(privilege);
        self
    }

    /// How long to wait before declaring the daemon live
    #[must_use]
    pub fn with_startup_grace(mut self, grace: Duration) -> Self {
        self.grace = grace;
        self
    }

    /// Print the launch command instead of spawning
    #[must_use]
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// PID of the owned child, if any
    pub fn pid(&self) -> Option<u32> {
        self.child.as_ref().map(Child::id)
    }

    /// File the daemon's stderr is sent to, next to its config
    ///
    /// A file rather than a pipe, so the daemon can keep writing after the
    /// launching process exits.
    pub fn stderr_log_path(config_path: &Path) -> PathBuf {
        let mut name = config_path
            .file_name()
            .map_or_else(|| OsString::from("daemon"), OsString::from);
        name.push(".stderr");
        config_path.with_file_name(name)
    }

    fn command(&self, config_path: &Path) -> Command {
        let mut cmd = match &self.escalation {
            Some(helper) => {
                let mut cmd = Command::new(helper);
                cmd.arg(&self.binary);
                cmd
            }
            None => Command::new(&self.binary),
        };
        cmd.arg("-f").arg(config_path);
        cmd
    }

    fn launch_line(&self, config_path: &Path) -> String {
        let prefix = self
            .escalation
            .as_ref()
            .map(|helper| format!("{helper} "))
            .unwrap_or_default();
        format!("{prefix}{} -f {}", self.binary, config_path.display())
    }

    fn is_alive(child: &mut Child) -> Result<bool> {
        Ok(child.try_wait()?.is_none())
    }
}

impl DaemonController for ProcessController {
    fn strategy(&self) -> DaemonStrategy {
        DaemonStrategy::Direct
    }

    fn start(&mut self, config_path: &Path) -> Result<StartOutcome> {
        if let Some(child) = self.child.as_mut() {
            if Self::is_alive(child)? {
                warn!(pid = child.id(), "Daemon already running under this controller");
                return Ok(StartOutcome::AlreadyRunning);
            }
            self.child = None;
        }

        let line = self.launch_line(config_path);
        if self.dry_run {
            println!("[dry-run] {line}");
            return Ok(StartOutcome::Launched);
        }

        let log_path = Self::stderr_log_path(config_path);
        let stderr = match File::create(&log_path) {
            Ok(file) => Stdio::from(file),
            Err(e) => {
                warn!(path = %log_path.display(), error = %e, "Cannot create daemon stderr log; discarding stderr");
                Stdio::null()
            }
        };

        debug!(argv = %line, stderr = %log_path.display(), "Spawning daemon");
        let mut child = self
            .command(config_path)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(stderr)
            .spawn()
            .map_err(|e| spawn_error(&self.binary, e))?;

        std::thread::sleep(self.grace);

        if let Some(status) = child.try_wait()? {
            // empty when the log could not be created; the exit status still counts
            let diagnostics = fs::read_to_string(&log_path)
                .map(|text| text.trim().to_string())
                .unwrap_or_default();
            warn!(code = ?status.code(), stderr = %diagnostics, "Daemon exited during startup");

            return Err(match classify_failure(&line, status.code(), &diagnostics) {
                PlatformError::CommandFailed { code, stderr, .. } => PlatformError::StartupFailed {
                    code,
                    diagnostics: stderr,
                },
                other => other,
            });
        }

        info!(pid = child.id(), "Daemon process started");
        self.child = Some(child);
        Ok(StartOutcome::Launched)
    }

    fn stop(&mut self) -> Result<()> {
        let Some(mut child) = self.child.take() else {
            return Err(PlatformError::NoProcess);
        };

        if !Self::is_alive(&mut child)? {
            info!(pid = child.id(), "Daemon process had already exited");
            return Ok(());
        }

        let pid = libc::pid_t::try_from(child.id())
            .map_err(|_| PlatformError::Io(io::Error::new(io::ErrorKind::InvalidData, "pid out of range")))?;
        // SAFETY: kill(2) takes plain integers; pid names a child we have not reaped.
        let rc = unsafe { libc::kill(pid, libc::SIGTERM) };
        if rc != 0 {
            let err = io::Error::last_os_error();
            self.child = Some(child);
            return Err(if err.kind() == io::ErrorKind::PermissionDenied {
                PlatformError::PermissionDenied(format!("cannot signal daemon pid {pid}"))
            } else {
                PlatformError::Io(err)
            });
        }

        let status = child.wait()?;
        info!(pid, code = ?status.code(), "Daemon process stopped");
        Ok(())
    }

    fn status(&mut self) -> Result<DaemonStatus> {
        let Some(child) = self.child.as_mut() else {
            return Ok(DaemonStatus::Inactive);
        };
        if Self::is_alive(child)? {
            Ok(DaemonStatus::Active)
        } else {
            Ok(DaemonStatus::Inactive)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_launch_line() {
        let ctl = ProcessController::new("tor").with_privilege(&PrivilegeConfig::default());
        assert_eq!(ctl.launch_line(Path::new("/etc/tor/torrc")), "sudo tor -f /etc/tor/torrc");

        let privilege = PrivilegeConfig {
            escalate: false,
            ..Default::default()
        };
        let ctl = ProcessController::new("tor").with_privilege(&privilege);
        assert_eq!(ctl.launch_line(Path::new("/tmp/t")), "tor -f /tmp/t");
    }

    #[test]
    fn test_stop_without_child() {
        let mut ctl = ProcessController::new("tor");
        assert!(matches!(ctl.stop(), Err(PlatformError::NoProcess)));
        assert_eq!(ctl.status().unwrap(), DaemonStatus::Inactive);
    }

    #[test]
    fn test_dry_run_spawns_nothing() {
        let mut ctl = ProcessController::new("/nonexistent/tor").with_dry_run(true);
        ctl.start(Path::new("/tmp/torrc")).unwrap();
        assert!(ctl.pid().is_none());
        assert_eq!(ctl.status().unwrap(), DaemonStatus::Inactive);
    }

    #[test]
    fn test_stderr_log_path() {
        assert_eq!(
            ProcessController::stderr_log_path(Path::new("/etc/tor/torrc.dynamic")),
            Path::new("/etc/tor/torrc.dynamic.stderr")
        );
    }

    #[test]
    fn test_strategy() {
        assert_eq!(ProcessController::new("tor").strategy(), DaemonStrategy::Direct);
    }
}
