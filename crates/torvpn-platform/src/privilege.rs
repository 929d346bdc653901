//! Privilege checks for host-mutating commands

use crate::error::{PlatformError, Result};
use torvpn_core::config::PrivilegeConfig;
use tracing::warn;

/// Effective uid is 0
pub fn is_root() -> bool {
    // SAFETY: geteuid has no preconditions and cannot fail.
    unsafe { libc::geteuid() == 0 }
}

/// Refuse to continue unprivileged unless escalation is configured
pub fn ensure_privileged(privilege: &PrivilegeConfig) -> Result<()> {
    check(is_root(), privilege)
}

fn check(root: bool, privilege: &PrivilegeConfig) -> Result<()> {
    if root {
        return Ok(());
    }
    if privilege.escalate {
        warn!(helper = %privilege.program, "Not running as root; host commands will be escalated");
        return Ok(());
    }
    Err(PlatformError::PermissionDenied(
        "must run as root (or enable [privilege] escalate)".to_string(),
    ))
}
