//! iptables-backed [`TrafficFilter`]

use crate::command::{run_checked, CommandRunner, CommandSpec};
use crate::error::{PlatformError, Result};
use crate::traits::TrafficFilter;
use std::sync::Arc;
use torvpn_core::{ExemptNetworks, RedirectPorts, RulePlan};
use tracing::{debug, info};

/// Applies [`RulePlan`]s with the iptables CLI
pub struct IptablesFilter {
    runner: Arc<dyn CommandRunner>,
    program: String,
    daemon_user: Option<String>,
}

impl IptablesFilter {
    /// Filter driving `program` through `runner`
    pub fn new(runner: Arc<dyn CommandRunner>, program: impl Into<String>) -> Self {
        Self {
            runner,
            program: program.into(),
            daemon_user: None,
        }
    }

    /// Let traffic owned by `user` bypass the redirect
    #[must_use]
    pub fn with_daemon_user(mut self, user: Option<String>) -> Self {
        self.daemon_user = user;
        self
    }

    fn apply(&self, plan: &RulePlan) -> Result<()> {
        for step in plan {
            let spec = CommandSpec::new(&self.program).args(step.args()).privileged();
            debug!(argv = %spec, "Applying filter step");

            run_checked(self.runner.as_ref(), &spec).map_err(|e| PlatformError::FilterStep {
                step: step.to_string(),
                source: Box::new(e),
            })?;
            info!(step = %step, "Filter step applied");
        }
        Ok(())
    }
}

impl TrafficFilter for IptablesFilter {
    fn install(&self, ports: RedirectPorts, exempt: &ExemptNetworks) -> Result<()> {
        let plan = RulePlan::install(ports, exempt, self.daemon_user.as_deref());
        info!(
            steps = plan.len(),
            exempt = exempt.len(),
            tcp_port = ports.tcp,
            dns_port = ports.dns,
            "Installing redirect rules"
        );
        self.apply(&plan)
    }

    fn remove(&self) -> Result<()> {
        info!("Flushing redirect rules");
        self.apply(&RulePlan::flush())
    }
}
