//! Logging initialization

use anyhow::{Context, Result};
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use torvpn_core::config::LoggingConfig;
use tracing::Level;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::args::{Args, LogFormat};

/// Initialize logging from CLI arguments, falling back to the `[logging]` section
///
/// Logs go to stderr so stdout stays clean for command output.
pub fn init(args: &Args, config: Option<&LoggingConfig>) -> Result<()> {
    let level = resolve_level(args, config);

    let env_filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();

    let format = args.log_format.unwrap_or(match config {
        Some(c) if c.json_format => LogFormat::Json,
        _ => LogFormat::Text,
    });

    let log_file: Option<PathBuf> = args
        .log_file
        .clone()
        .or_else(|| config.and_then(|c| c.file.as_ref().map(PathBuf::from)));
    let file_writer = log_file.as_deref().map(file_appender).transpose()?;

    let registry = tracing_subscriber::registry().with(env_filter);

    let installed = match format {
        LogFormat::Text => {
            let file_layer = file_writer.map(|w| fmt::layer().with_ansi(false).with_writer(w));
            registry
                .with(
                    fmt::layer()
                        .with_writer(io::stderr)
                        .with_target(args.verbose >= 2)
                        .with_thread_ids(args.verbose >= 3)
                        .with_file(args.verbose >= 3)
                        .with_line_number(args.verbose >= 3),
                )
                .with(file_layer)
                .try_init()
        }
        LogFormat::Json => {
            let file_layer = file_writer.map(|w| fmt::layer().json().with_writer(w));
            registry
                .with(fmt::layer().json().with_writer(io::stderr))
                .with(file_layer)
                .try_init()
        }
        LogFormat::Compact => {
            let file_layer = file_writer.map(|w| fmt::layer().compact().with_ansi(false).with_writer(w));
            registry
                .with(fmt::layer().compact().with_writer(io::stderr))
                .with(file_layer)
                .try_init()
        }
    };
    installed.context("Failed to install log subscriber")?;

    Ok(())
}

fn resolve_level(args: &Args, config: Option<&LoggingConfig>) -> Level {
    if args.quiet {
        return Level::ERROR;
    }
    match args.verbose {
        0 => config
            .and_then(|c| Level::from_str(&c.level).ok())
            .unwrap_or(Level::INFO),
        1 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

fn file_appender(path: &Path) -> Result<RollingFileAppender> {
    let name = path
        .file_name()
        .with_context(|| format!("Log file path has no file name: {}", path.display()))?;
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(name.to_string_lossy())
        .build(dir)
        .with_context(|| format!("Failed to create log file: {}", path.display()))
}
