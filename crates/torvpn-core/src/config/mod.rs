//! Configuration management for torvpn
//!
//! Provides a strongly-typed configuration system with TOML support.
//! Every section falls back to the stock values, so an empty file is a
//! valid configuration.

mod strategy;

pub use strategy::DaemonStrategy;

use crate::error::{Error, Result};
use crate::network::ExemptNetworks;
use crate::rules::RedirectPorts;
use crate::torrc::DaemonConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default location of the generated daemon configuration
pub const DEFAULT_TORRC_PATH: &str = "/etc/tor/torrc.dynamic";

/// Page that greets clients arriving through the anonymizing network
pub const DEFAULT_CHECK_URL: &str = "http://check.torproject.org";

/// Phrase the check page shows only to anonymized clients
pub const DEFAULT_SUCCESS_MARKER: &str = "Congratulations";

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Daemon settings
    pub daemon: DaemonSettings,

    /// Packet-filter settings
    pub filter: FilterConfig,

    /// Privilege escalation for host commands
    pub privilege: PrivilegeConfig,

    /// Connectivity check
    pub probe: ProbeConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|_| Error::ConfigNotFound {
            path: path.display().to_string(),
        })?;
        Self::from_toml(&content)
    }

    /// Parse configuration from TOML string
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(Error::from)
    }

    /// Serialize to TOML string
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| Error::Config(e.to_string()))
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        self.daemon.torrc.validate()?;

        if self.daemon.config_path.as_os_str().is_empty() {
            return Err(Error::config_value("daemon.config_path", "Must not be empty"));
        }
        if self.daemon.binary.trim().is_empty() {
            return Err(Error::config_value("daemon.binary", "Must not be empty"));
        }
        if self.daemon.service_name.trim().is_empty()
            || self.daemon.service_name.contains(char::is_whitespace)
        {
            return Err(Error::config_value(
                "daemon.service_name",
                "Must be a non-empty unit name without whitespace",
            ));
        }
        if self.daemon.startup_grace_ms == 0 {
            return Err(Error::config_value(
                "daemon.startup_grace_ms",
                "Must be greater than zero",
            ));
        }

        if self.filter.program.trim().is_empty() {
            return Err(Error::config_value("filter.program", "Must not be empty"));
        }

        if self.privilege.escalate && self.privilege.program.trim().is_empty() {
            return Err(Error::config_value(
                "privilege.program",
                "Must not be empty when escalation is enabled",
            ));
        }

        if self.probe.success_marker.is_empty() {
            return Err(Error::config_value("probe.success_marker", "Must not be empty"));
        }
        if !(self.probe.url.starts_with("http://") || self.probe.url.starts_with("https://")) {
            return Err(Error::config_value("probe.url", "Must be an http(s) URL"));
        }
        if self.probe.timeout_secs == Some(0) {
            return Err(Error::config_value("probe.timeout_secs", "Must be greater than zero"));
        }

        Ok(())
    }

    /// Ports the redirect rules point at
    pub fn redirect_ports(&self) -> RedirectPorts {
        RedirectPorts {
            tcp: self.daemon.torrc.trans_port,
            dns: self.daemon.torrc.dns_port,
        }
    }

    /// SOCKS endpoint used by the connectivity check
    ///
    /// Falls back to the daemon's own SOCKS listener. `socks5h` makes the
    /// proxy resolve hostnames, so lookups do not leak.
    pub fn probe_proxy(&self) -> String {
        self.probe
            .proxy
            .clone()
            .unwrap_or_else(|| format!("socks5h://127.0.0.1:{}", self.daemon.torrc.socks_port))
    }
}

/// Daemon settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DaemonSettings {
    /// Where the generated daemon configuration is written
    pub config_path: PathBuf,
    /// Daemon executable
    pub binary: String,
    /// Lifecycle strategy
    pub strategy: DaemonStrategy,
    /// Unit name used with the managed strategy
    pub service_name: String,
    /// How long a direct child must survive to count as started
    pub startup_grace_ms: u64,
    /// Directives written to the daemon configuration
    pub torrc: DaemonConfig,
}

impl Default for DaemonSettings {
    fn default() -> Self {
        Self {
            config_path: PathBuf::from(DEFAULT_TORRC_PATH),
            binary: "tor".to_string(),
            strategy: DaemonStrategy::default(),
            service_name: "torvpn-tor".to_string(),
            startup_grace_ms: 500,
            torrc: DaemonConfig::default(),
        }
    }
}

/// Packet-filter settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Packet-filter executable
    pub program: String,
    /// Destinations that never go through the daemon
    pub exempt_networks: ExemptNetworks,
    /// System user the daemon runs as; its own traffic is not redirected
    #[serde(skip_serializing_if = "Option::is_none")]
    pub daemon_user: Option<String>,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            program: "iptables".to_string(),
            exempt_networks: ExemptNetworks::local_defaults(),
            daemon_user: None,
        }
    }
}

/// Privilege escalation for host commands
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PrivilegeConfig {
    /// Prefix privileged commands with `program`
    pub escalate: bool,
    /// Escalation helper
    pub program: String,
}

impl Default for PrivilegeConfig {
    fn default() -> Self {
        Self {
            escalate: true,
            program: "sudo".to_string(),
        }
    }
}

/// Connectivity check settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    /// Page to fetch through the proxy
    pub url: String,
    /// Literal that must appear in the body
    pub success_marker: String,
    /// Proxy override (defaults to the daemon's SOCKS port)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proxy: Option<String>,
    /// Request timeout; the HTTP client default applies when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_CHECK_URL.to_string(),
            success_marker: DEFAULT_SUCCESS_MARKER.to_string(),
            proxy: None,
            timeout_secs: None,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level
    pub level: String,
    /// Log file path (None = stdout only)
    pub file: Option<String>,
    /// Enable JSON format logging
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
            json_format: false,
        }
    }
}
