//! Direct-process controller against real child processes
//!
//! `sh -f <file>` runs `<file>` as a script, so a shell stands in for the
//! daemon and the "config" file decides how it behaves.

use std::path::PathBuf;
use std::time::Duration;
use tempfile::TempDir;
use torvpn_core::config::PrivilegeConfig;
use torvpn_platform::{DaemonController, DaemonStatus, PlatformError, ProcessController, StartOutcome};

fn no_escalation() -> PrivilegeConfig {
    PrivilegeConfig {
        escalate: false,
        ..Default::default()
    }
}

fn controller(binary: &str) -> ProcessController {
    ProcessController::new(binary)
        .with_privilege(&no_escalation())
        .with_startup_grace(Duration::from_millis(300))
}

fn script(dir: &TempDir, body: &str) -> PathBuf {
    let path = dir.path().join("torrc");
    std::fs::write(&path, body).unwrap();
    path
}

#[test]
fn test_start_status_stop_cycle() {
    let dir = tempfile::tempdir().unwrap();
    let config = script(&dir, "exec sleep 30\n");
    let mut ctl = controller("sh");

    ctl.start(&config).unwrap();
    assert!(ctl.pid().is_some());
    assert_eq!(ctl.status().unwrap(), DaemonStatus::Active);

    ctl.stop().unwrap();
    assert_eq!(ctl.status().unwrap(), DaemonStatus::Inactive);

    let err = ctl.stop().unwrap_err();
    assert!(matches!(err, PlatformError::NoProcess));
    assert_eq!(err.to_string(), "no process to stop");
}

#[test]
fn test_immediate_exit_surfaces_stderr() {
    let dir = tempfile::tempdir().unwrap();
    let config = script(&dir, "echo 'boom: could not parse config' >&2\nexit 3\n");
    let mut ctl = controller("sh");

    match ctl.start(&config).unwrap_err() {
        PlatformError::StartupFailed { code, diagnostics } => {
            assert_eq!(code, Some(3));
            assert_eq!(diagnostics, "boom: could not parse config");
        }
        other => panic!("unexpected {other:?}"),
    }
    assert_eq!(ctl.status().unwrap(), DaemonStatus::Inactive);
    assert!(matches!(ctl.stop(), Err(PlatformError::NoProcess)));
}

#[test]
fn test_refused_escalation_is_permission_denied() {
    let dir = tempfile::tempdir().unwrap();
    let config = script(&dir, "echo 'sudo: a password is required' >&2\nexit 1\n");
    let mut ctl = controller("sh");

    assert!(matches!(
        ctl.start(&config),
        Err(PlatformError::PermissionDenied(_))
    ));
}

#[test]
fn test_missing_binary_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let config = script(&dir, "exec sleep 30\n");
    let mut ctl = controller("/nonexistent/tor");

    let err = ctl.start(&config).unwrap_err();
    assert!(err.is_not_found());
}

#[test]
fn test_stop_after_daemon_died() {
    let dir = tempfile::tempdir().unwrap();
    let config = script(&dir, "sleep 1\n");
    let mut ctl = controller("sh");

    ctl.start(&config).unwrap();
    std::thread::sleep(Duration::from_millis(1500));
    assert_eq!(ctl.status().unwrap(), DaemonStatus::Inactive);

    // the handle is reaped without signalling
    ctl.stop().unwrap();
    assert!(matches!(ctl.stop(), Err(PlatformError::NoProcess)));
}

#[test]
fn test_second_start_keeps_running_child() {
    let dir = tempfile::tempdir().unwrap();
    let config = script(&dir, "exec sleep 30\n");
    let mut ctl = controller("sh");

    assert_eq!(ctl.start(&config).unwrap(), StartOutcome::Launched);
    let pid = ctl.pid();
    assert_eq!(ctl.start(&config).unwrap(), StartOutcome::AlreadyRunning);
    assert_eq!(ctl.pid(), pid);

    ctl.stop().unwrap();
}

#[test]
fn test_live_daemon_stderr_goes_to_log_file() {
    let dir = tempfile::tempdir().unwrap();
    let config = script(&dir, "echo 'bootstrapped 5%' >&2\nsleep 0.5\necho 'late warning' >&2\nexec sleep 30\n");
    let mut ctl = controller("sh");

    ctl.start(&config).unwrap();
    // the second line is written after the startup grace
    std::thread::sleep(Duration::from_millis(600));
    assert_eq!(ctl.status().unwrap(), DaemonStatus::Active);

    let log = std::fs::read_to_string(ProcessController::stderr_log_path(&config)).unwrap();
    assert!(log.contains("bootstrapped 5%"));
    assert!(log.contains("late warning"));

    ctl.stop().unwrap();
}
