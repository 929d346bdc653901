//! Routing session orchestration
//!
//! Composes the config writer, daemon controller and traffic filter into
//! start / stop / status. A session is Active only when every start step
//! succeeded; any later failure unwinds what was already done.

use crate::error::PlatformError;
use crate::traits::{DaemonController, DaemonStatus, StartOutcome, TrafficFilter};
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;
use torvpn_core::{Config, ConfigWriter, DaemonConfig, ExemptNetworks, RedirectPorts, RollbackReport, Transaction};
use tracing::{error, info, warn};

/// Whether traffic is currently routed through the daemon
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Daemon down
    Inactive,
    /// Daemon up
    Active,
}

impl From<DaemonStatus> for SessionState {
    fn from(status: DaemonStatus) -> Self {
        match status {
            DaemonStatus::Active => SessionState::Active,
            DaemonStatus::Inactive => SessionState::Inactive,
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Active => f.write_str("active"),
            SessionState::Inactive => f.write_str("inactive"),
        }
    }
}

/// Session-level failures
#[derive(Error, Debug)]
pub enum SessionError {
    /// The daemon config could not be written; nothing else was attempted
    #[error(transparent)]
    ConfigWrite(torvpn_core::Error),

    /// The daemon did not start
    #[error("Daemon failed to start: {0}")]
    Daemon(#[source] PlatformError),

    /// Rule installation failed after the daemon started
    #[error("Rule installation failed: {source} ({rollback})")]
    Filter {
        /// Failing step
        #[source]
        source: PlatformError,
        /// What was undone
        rollback: RollbackReport,
    },

    /// One or both stop steps failed
    #[error("Stop incomplete: {}", describe_failures(.failures))]
    Stop {
        /// Failed steps with their errors
        failures: Vec<(&'static str, PlatformError)>,
        /// Daemon state after the attempt
        state: SessionState,
    },
}

impl SessionError {
    /// Whether the process should exit non-zero
    pub fn is_fatal(&self) -> bool {
        matches!(self, SessionError::ConfigWrite(_))
    }
}

fn describe_failures(failures: &[(&'static str, PlatformError)]) -> String {
    failures
        .iter()
        .map(|(step, err)| format!("{step}: {err}"))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Host handles the session mutates; the rollback context
pub struct Host {
    /// Daemon lifecycle
    pub daemon: Box<dyn DaemonController>,
    /// Packet filter
    pub filter: Box<dyn TrafficFilter>,
}

/// Start / stop / status over one daemon and one filter
pub struct VpnSession {
    daemon_config: DaemonConfig,
    config_path: PathBuf,
    ports: RedirectPorts,
    exempt: ExemptNetworks,
    host: Host,
    state: SessionState,
    dry_run: bool,
}

impl VpnSession {
    /// Session for `config` driving the given host handles
    pub fn new(config: &Config, daemon: Box<dyn DaemonController>, filter: Box<dyn TrafficFilter>) -> Self {
        Self {
            daemon_config: config.daemon.torrc.clone(),
            config_path: config.daemon.config_path.clone(),
            ports: config.redirect_ports(),
            exempt: config.filter.exempt_networks.clone(),
            host: Host { daemon, filter },
            state: SessionState::Inactive,
            dry_run: false,
        }
    }

    /// Print the daemon config instead of writing it
    #[must_use]
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Where the daemon config is written
    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Last state this session observed
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Write the daemon config file
    pub fn write_config(&self) -> Result<(), SessionError> {
        if self.dry_run {
            println!("[dry-run] write {}:", self.config_path.display());
            for line in self.daemon_config.render().lines() {
                println!("[dry-run]   {line}");
            }
            return Ok(());
        }
        ConfigWriter::write(&self.daemon_config, &self.config_path).map_err(|e| {
            error!(path = %self.config_path.display(), error = %e, "Cannot write daemon configuration");
            SessionError::ConfigWrite(e)
        })
    }

    /// Write config, start the daemon, then install rules
    pub fn start(&mut self) -> Result<SessionState, SessionError> {
        self.write_config()?;

        let mut tx: Transaction<Host> = Transaction::new();

        match self.host.daemon.start(&self.config_path) {
            Ok(StartOutcome::Launched) => {
                tx.record("stop daemon", |host: &mut Host| {
                    host.daemon.stop().map_err(anyhow::Error::from)
                });
            }
            // not ours to stop if the rules fail
            Ok(StartOutcome::AlreadyRunning) => info!("Daemon already running"),
            Err(e) => {
                warn!(error = %e, "Daemon did not start; leaving rules untouched");
                self.state = SessionState::Inactive;
                return Err(SessionError::Daemon(e));
            }
        }

        // a failing install may have applied some steps
        tx.record("flush rules", |host: &mut Host| {
            host.filter.remove().map_err(anyhow::Error::from)
        });
        if let Err(e) = self.host.filter.install(self.ports, &self.exempt) {
            warn!(error = %e, "Rule installation failed; rolling back");
            let rollback = tx.rollback(&mut self.host);
            self.state = self.status();
            return Err(SessionError::Filter { source: e, rollback });
        }

        tx.commit();
        self.state = SessionState::Active;
        info!(strategy = %self.host.daemon.strategy(), "Session active");
        Ok(self.state)
    }

    /// Stop the daemon, then remove rules
    ///
    /// Both steps always run. The daemon goes first so traffic black-holes
    /// rather than leaks for the moment in between.
    pub fn stop(&mut self) -> Result<SessionState, SessionError> {
        let mut failures = Vec::new();

        if let Err(e) = self.host.daemon.stop() {
            warn!(error = %e, "Daemon stop failed");
            failures.push(("stop daemon", e));
        }
        if let Err(e) = self.host.filter.remove() {
            warn!(error = %e, "Rule removal failed");
            failures.push(("flush rules", e));
        }

        self.state = self.status();
        if failures.is_empty() {
            info!("Session stopped");
            Ok(self.state)
        } else {
            Err(SessionError::Stop {
                failures,
                state: self.state,
            })
        }
    }

    /// Daemon status without degrading errors
    pub fn query_status(&mut self) -> Result<SessionState, PlatformError> {
        self.host.daemon.status().map(SessionState::from)
    }

    /// Daemon status; a failed query reads as Inactive
    ///
    /// Filter rules are not inspected.
    pub fn status(&mut self) -> SessionState {
        match self.query_status() {
            Ok(state) => state,
            Err(e) => {
                warn!(error = %e, "Status query failed; reporting inactive");
                SessionState::Inactive
            }
        }
    }
}
