//! Platform-specific errors

use thiserror::Error;

/// Errors raised while driving host tools
#[derive(Error, Debug)]
pub enum PlatformError {
    /// Binary, service or unit is absent
    #[error("Not found: {0}")]
    NotFound(String),

    /// Privilege escalation was refused
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// A host command exited unsuccessfully
    #[error("`{command}` failed ({}): {stderr}", exit_label(.code, "killed by signal"))]
    CommandFailed {
        /// Command line as issued
        command: String,
        /// Exit code, if the process exited normally
        code: Option<i32>,
        /// Captured standard error
        stderr: String,
    },

    /// The daemon exited during its startup grace period
    #[error("Daemon exited during startup ({}): {diagnostics}", exit_label(.code, "no exit code"))]
    StartupFailed {
        /// Exit code, if any
        code: Option<i32>,
        /// Whatever the daemon wrote to stderr
        diagnostics: String,
    },

    /// Stop was requested without an owned daemon process
    #[error("no process to stop")]
    NoProcess,

    /// A packet-filter step failed; earlier steps stay applied
    #[error("Filter step '{step}' failed: {source}")]
    FilterStep {
        /// Label of the failing step
        step: String,
        /// Why it failed
        #[source]
        source: Box<PlatformError>,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl PlatformError {
    /// True for errors that mean "missing", as opposed to "broken"
    pub fn is_not_found(&self) -> bool {
        match self {
            PlatformError::NotFound(_) => true,
            PlatformError::FilterStep { source, .. } => source.is_not_found(),
            _ => false,
        }
    }
}

fn exit_label(code: &Option<i32>, missing: &str) -> String {
    match code {
        Some(c) => format!("exit code {c}"),
        None => missing.to_string(),
    }
}

/// Platform result type
pub type Result<T> = std::result::Result<T, PlatformError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_failed_display() {
        let err = PlatformError::CommandFailed {
            command: "iptables -F".to_string(),
            code: Some(4),
            stderr: "resource busy".to_string(),
        };
        assert_eq!(err.to_string(), "`iptables -F` failed (exit code 4): resource busy");

        let err = PlatformError::CommandFailed {
            command: "iptables -F".to_string(),
            code: None,
            stderr: String::new(),
        };
        assert!(err.to_string().contains("killed by signal"));
    }

    #[test]
    fn test_filter_step_wraps_source() {
        let err = PlatformError::FilterStep {
            step: "flush nat table".to_string(),
            source: Box::new(PlatformError::NotFound("iptables".to_string())),
        };
        assert!(err.is_not_found());
        assert!(err.to_string().starts_with("Filter step 'flush nat table' failed"));
    }

    #[test]
    fn test_no_process_message() {
        assert_eq!(PlatformError::NoProcess.to_string(), "no process to stop");
    }
}
