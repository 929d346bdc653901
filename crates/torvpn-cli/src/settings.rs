//! Configuration file discovery

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use torvpn_core::Config;
use tracing::debug;

/// File names probed in the working directory, in order
pub const LOCAL_CANDIDATES: [&str; 2] = ["torvpn.toml", "config.toml"];

/// Configuration plus where it came from
#[derive(Debug, Clone)]
pub struct Loaded {
    /// Parsed configuration
    pub config: Config,
    /// Source file; `None` for built-in defaults
    pub source: Option<PathBuf>,
}

/// Per-user configuration file
pub fn user_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "torvpn").map(|dirs| dirs.config_dir().join("config.toml"))
}

/// Search order: explicit path, local candidates, user config dir
pub fn find_config_file(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    LOCAL_CANDIDATES
        .iter()
        .map(PathBuf::from)
        .chain(user_config_path())
        .find(|path| path.exists())
}

/// Load and validate the configuration, or fall back to defaults
pub fn load(explicit: Option<&Path>) -> Result<Loaded> {
    let Some(path) = find_config_file(explicit) else {
        debug!("No configuration file found, using defaults");
        return Ok(Loaded {
            config: Config::default(),
            source: None,
        });
    };

    let config = Config::load(&path).with_context(|| format!("Failed to load config from {}", path.display()))?;
    config
        .validate()
        .with_context(|| format!("Invalid configuration in {}", path.display()))?;
    debug!(path = %path.display(), "Loaded configuration");

    Ok(Loaded {
        config,
        source: Some(path),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_path_wins() {
        let path = Path::new("/nonexistent/torvpn.toml");
        assert_eq!(find_config_file(Some(path)), Some(path.to_path_buf()));
    }

    #[test]
    fn test_explicit_missing_file_errors() {
        assert!(load(Some(Path::new("/nonexistent/torvpn.toml"))).is_err());
    }

    #[test]
    fn test_load_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("torvpn.toml");
        std::fs::write(&path, "[daemon]\nstrategy = \"direct\"\n").unwrap();

        let loaded = load(Some(&path)).unwrap();
        assert_eq!(loaded.source.as_deref(), Some(path.as_path()));
        assert_eq!(loaded.config.daemon.strategy, torvpn_core::DaemonStrategy::Direct);
    }

    #[test]
    fn test_invalid_file_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("torvpn.toml");
        std::fs::write(&path, "[daemon.torrc]\nsocks_port = 0\n").unwrap();
        assert!(load(Some(&path)).is_err());
    }
}
