//! Platform-agnostic traits for host integration
//!
//! The session drives the host only through these two seams.

use crate::Result;
use std::fmt;
use std::path::Path;
use torvpn_core::{DaemonStrategy, ExemptNetworks, RedirectPorts};

/// Packet-filter rule installer
pub trait TrafficFilter {
    /// Flush, then install exemptions, redirects and loopback accepts
    ///
    /// Stops at the first failing step. Earlier steps remain applied.
    fn install(&self, ports: RedirectPorts, exempt: &ExemptNetworks) -> Result<()>;

    /// Flush the tables `install` touches; idempotent
    fn remove(&self) -> Result<()>;
}

/// Daemon liveness as reported by a controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DaemonStatus {
    /// Running
    Active,
    /// Not running, or never started
    Inactive,
}

impl fmt::Display for DaemonStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DaemonStatus::Active => f.write_str("active"),
            DaemonStatus::Inactive => f.write_str("inactive"),
        }
    }
}

/// What a successful [`DaemonController::start`] did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    /// A daemon was launched by this call
    Launched,
    /// The controller already owned a live daemon; nothing was launched
    AlreadyRunning,
}

/// Daemon lifecycle management
///
/// Implemented once per [`DaemonStrategy`].
pub trait DaemonController {
    /// Strategy this controller implements
    fn strategy(&self) -> DaemonStrategy;

    /// Start the daemon with the config at `config_path`
    ///
    /// Returns only once the daemon is confirmed live.
    fn start(&mut self, config_path: &Path) -> Result<StartOutcome>;

    /// Stop the daemon
    fn stop(&mut self) -> Result<()>;

    /// Query liveness
    fn status(&mut self) -> Result<DaemonStatus>;
}
