//! Daemon management strategies
//!
//! Selected once at construction; a controller never switches at runtime.

use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How the daemon's lifecycle is managed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DaemonStrategy {
    /// Delegate to the host service manager (systemd)
    #[default]
    Managed,
    /// Spawn and own the daemon as a child process
    Direct,
}

impl DaemonStrategy {
    /// Get strategy name
    pub fn name(&self) -> &'static str {
        match self {
            DaemonStrategy::Managed => "managed",
            DaemonStrategy::Direct => "direct",
        }
    }

    /// Whether daemon state survives the end of this process
    pub fn outlives_process(&self) -> bool {
        matches!(self, DaemonStrategy::Managed)
    }
}

impl FromStr for DaemonStrategy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "managed" | "service" | "systemd" => Ok(DaemonStrategy::Managed),
            "direct" | "process" | "child" => Ok(DaemonStrategy::Direct),
            _ => Err(Error::UnknownStrategy(s.to_string())),
        }
    }
}

impl fmt::Display for DaemonStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
