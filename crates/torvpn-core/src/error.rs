//! Error types for torvpn-core
//!
//! Centralized error handling using `thiserror` for ergonomic error definitions.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for torvpn-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// Writing the daemon configuration file failed
    #[error("Failed to write daemon configuration to {path}: {source}")]
    ConfigWrite {
        /// Destination that could not be written
        path: PathBuf,
        /// Underlying I/O failure
        #[source]
        source: std::io::Error,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound {
        /// Path to the missing config file
        path: String,
    },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    ConfigValue {
        /// Configuration key
        key: String,
        /// Error message
        message: String,
    },

    /// Invalid port number
    #[error("Invalid port number: {port} (must be 1-65535)")]
    InvalidPort {
        /// The invalid port
        port: u32,
    },

    /// A network range could not be parsed
    #[error("Invalid CIDR '{input}': {reason}")]
    InvalidCidr {
        /// Text that failed to parse
        input: String,
        /// Why it was rejected
        reason: String,
    },

    /// Unknown daemon strategy name
    #[error("Unknown daemon strategy: {0} (expected 'managed' or 'direct')")]
    UnknownStrategy(String),

    /// I/O error wrapper
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parsing error
    #[error("TOML parsing error: {0}")]
    TomlParse(#[from] toml::de::Error),
}

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create a config value error
    pub fn config_value(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValue {
            key: key.into(),
            message: message.into(),
        }
    }

    /// Create a CIDR parse error
    pub fn invalid_cidr(input: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidCidr {
            input: input.into(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::config_value("daemon.torrc.socks_port", "collides with dns_port");
        assert!(err.to_string().contains("daemon.torrc.socks_port"));
        assert!(err.to_string().contains("collides"));

        let err = Error::invalid_cidr("10.0.0.0/33", "prefix out of range");
        assert!(err.to_string().contains("10.0.0.0/33"));
    }

    #[test]
    fn test_config_write_keeps_source() {
        use std::error::Error as _;

        let err = Error::ConfigWrite {
            path: PathBuf::from("/nonexistent/torrc"),
            source: std::io::Error::from(std::io::ErrorKind::PermissionDenied),
        };
        assert!(err.to_string().contains("/nonexistent/torrc"));
        assert!(err.source().is_some());
    }
}
