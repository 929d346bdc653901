//! Wiring from configuration to host handles

use anyhow::Result;
use std::sync::Arc;
use torvpn_core::{Config, DaemonStrategy};
use torvpn_platform::privilege;
use torvpn_platform::{
    build_controller, CommandRunner, DryRunRunner, IptablesFilter, SystemRunner, VpnSession,
};
use tracing::debug;

use crate::settings::Loaded;

/// Effective settings for one invocation
pub struct App {
    /// Configuration with CLI overrides applied
    pub config: Config,
    /// Print commands instead of running them
    pub dry_run: bool,
}

impl App {
    /// Apply global flags on top of the loaded configuration
    pub fn new(loaded: Loaded, strategy: Option<DaemonStrategy>, dry_run: bool) -> Self {
        let mut config = loaded.config;
        if let Some(strategy) = strategy {
            debug!(%strategy, "Strategy overridden on the command line");
            config.daemon.strategy = strategy;
        }
        Self { config, dry_run }
    }

    fn runner(&self) -> Arc<dyn CommandRunner> {
        if self.dry_run {
            Arc::new(DryRunRunner::from_privilege(&self.config.privilege))
        } else {
            Arc::new(SystemRunner::from_privilege(&self.config.privilege))
        }
    }

    /// Refuse host mutation without root or escalation
    pub fn ensure_privileged(&self) -> Result<()> {
        if self.dry_run {
            return Ok(());
        }
        privilege::ensure_privileged(&self.config.privilege)?;
        Ok(())
    }

    /// Build a session over the configured daemon strategy and iptables
    pub fn session(&self) -> VpnSession {
        self.build_session(self.runner(), self.dry_run)
    }

    /// Session for read-only queries; asks the host even under `--dry-run`
    pub fn query_session(&self) -> VpnSession {
        self.build_session(Arc::new(SystemRunner::from_privilege(&self.config.privilege)), false)
    }

    fn build_session(&self, runner: Arc<dyn CommandRunner>, dry_run: bool) -> VpnSession {
        let daemon = build_controller(&self.config.daemon, &self.config.privilege, runner.clone(), dry_run);
        let filter = IptablesFilter::new(runner, self.config.filter.program.clone())
            .with_daemon_user(self.config.filter.daemon_user.clone());
        VpnSession::new(&self.config, daemon, Box::new(filter)).with_dry_run(dry_run)
    }
}
