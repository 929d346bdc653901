//! External command execution
//!
//! Every host mutation goes through a [`CommandRunner`], so the filter
//! installer and the managed-service controller can be driven by fakes in
//! tests and by [`DryRunRunner`] from the CLI.

use crate::error::{PlatformError, Result};
use std::fmt;
use std::io;
use std::process::{Command, Stdio};
use torvpn_core::config::PrivilegeConfig;
use tracing::{debug, trace};

/// Phrases escalation helpers and service managers print when refusing
const PERMISSION_MARKERS: &[&str] = &[
    "not in the sudoers",
    "a password is required",
    "Permission denied",
    "Access denied",
    "Interactive authentication required",
];

/// Phrases meaning the binary, unit or chain does not exist
const NOT_FOUND_MARKERS: &[&str] = &["not found", "not loaded"];

/// Shell convention for "command not found"
const EXIT_NOT_FOUND: i32 = 127;

/// A command to issue on the host
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    /// Executable
    pub program: String,
    /// Arguments
    pub args: Vec<String>,
    /// Run through the escalation helper, if one is configured
    pub privileged: bool,
}

impl CommandSpec {
    /// Command with no arguments
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            privileged: false,
        }
    }

    /// Append one argument
    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append arguments
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Mark as needing elevated privileges
    #[must_use]
    pub fn privileged(mut self) -> Self {
        self.privileged = true;
        self
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Captured result of a finished command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code; `None` when killed by a signal
    pub code: Option<i32>,
    /// Captured standard output
    pub stdout: String,
    /// Captured standard error
    pub stderr: String,
}

impl CommandOutput {
    /// Successful, silent output
    pub fn ok() -> Self {
        Self {
            code: Some(0),
            ..Default::default()
        }
    }

    /// Failed output with the given code and stderr
    pub fn failed(code: i32, stderr: impl Into<String>) -> Self {
        Self {
            code: Some(code),
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    /// Exit code zero
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Executes host commands
#[cfg_attr(test, mockall::automock)]
pub trait CommandRunner: Send + Sync {
    /// Run to completion and capture output
    ///
    /// A non-zero exit is *not* an error here; see [`run_checked`].
    fn run(&self, spec: &CommandSpec) -> Result<CommandOutput>;
}

/// Run `spec` and turn a non-zero exit into a classified error
pub fn run_checked<R>(runner: &R, spec: &CommandSpec) -> Result<CommandOutput>
where
    R: CommandRunner + ?Sized,
{
    let output = runner.run(spec)?;
    if output.success() {
        Ok(output)
    } else {
        Err(classify_failure(&spec.to_string(), output.code, &output.stderr))
    }
}

/// Map a failed command onto the error taxonomy
pub fn classify_failure(command: &str, code: Option<i32>, stderr: &str) -> PlatformError {
    let stderr = stderr.trim();
    if PERMISSION_MARKERS.iter().any(|m| stderr.contains(m)) {
        return PlatformError::PermissionDenied(format!("{command}: {stderr}"));
    }
    if code == Some(EXIT_NOT_FOUND) || NOT_FOUND_MARKERS.iter().any(|m| stderr.contains(m)) {
        return PlatformError::NotFound(format!("{command}: {stderr}"));
    }
    PlatformError::CommandFailed {
        command: command.to_string(),
        code,
        stderr: stderr.to_string(),
    }
}

/// Map a spawn failure onto the error taxonomy
pub(crate) fn spawn_error(program: &str, err: io::Error) -> PlatformError {
    match err.kind() {
        io::ErrorKind::NotFound => PlatformError::NotFound(program.to_string()),
        io::ErrorKind::PermissionDenied => PlatformError::PermissionDenied(program.to_string()),
        _ => PlatformError::Io(err),
    }
}

/// Runs commands on the real host
#[derive(Debug, Clone, Default)]
pub struct SystemRunner {
    escalation: Option<String>,
}

impl SystemRunner {
    /// Runner that never escalates
    pub fn new() -> Self {
        Self::default()
    }

    /// Runner that prefixes privileged commands per `privilege`
    pub fn from_privilege(privilege: &PrivilegeConfig) -> Self {
        Self {
            escalation: escalation_program(privilege),
        }
    }

    fn command(&self, spec: &CommandSpec) -> Command {
        match (&self.escalation, spec.privileged) {
            (Some(helper), true) => {
                let mut cmd = Command::new(helper);
                cmd.arg(&spec.program);
                cmd
            }
            _ => Command::new(&spec.program),
        }
    }
}

impl CommandRunner for SystemRunner {
    fn run(&self, spec: &CommandSpec) -> Result<CommandOutput> {
        let mut cmd = self.command(spec);
        cmd.args(&spec.args).stdin(Stdio::null());
        debug!(command = %spec, privileged = spec.privileged, "Running host command");

        let output = cmd.output().map_err(|e| spawn_error(&spec.program, e))?;
        let result = CommandOutput {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };
        trace!(code = ?result.code, stderr = %result.stderr.trim(), "Host command finished");
        Ok(result)
    }
}

/// Prints commands instead of running them; every command "succeeds"
#[derive(Debug, Clone, Default)]
pub struct DryRunRunner {
    escalation: Option<String>,
}

impl DryRunRunner {
    /// Dry runner showing the same escalation prefix the real runner would use
    pub fn from_privilege(privilege: &PrivilegeConfig) -> Self {
        Self {
            escalation: escalation_program(privilege),
        }
    }

    /// Command line as it would be issued
    pub fn render(&self, spec: &CommandSpec) -> String {
        match (&self.escalation, spec.privileged) {
            (Some(helper), true) => format!("{helper} {spec}"),
            _ => spec.to_string(),
        }
    }
}

impl CommandRunner for DryRunRunner {
    fn run(&self, spec: &CommandSpec) -> Result<CommandOutput> {
        println!("[dry-run] {}", self.render(spec));
        Ok(CommandOutput::ok())
    }
}

pub(crate) fn escalation_program(privilege: &PrivilegeConfig) -> Option<String> {
    privilege.escalate.then(|| privilege.program.clone())
}
