//! Config command - configuration management

use anyhow::{bail, Context, Result};
use clap::{Args, Subcommand};
use colored::Colorize;
use std::path::{Path, PathBuf};
use torvpn_core::Config;
use tracing::info;

use crate::settings::{self, LOCAL_CANDIDATES};

/// Config command arguments
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show the effective configuration
    Show {
        /// Config file to show (default: detect)
        #[arg(short, long)]
        file: Option<PathBuf>,
    },

    /// Generate a configuration file with default values
    Generate {
        /// Output file path
        #[arg(short, long, default_value = "torvpn.toml")]
        output: PathBuf,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Validate a configuration file
    Validate {
        /// Config file to validate
        file: PathBuf,
    },

    /// Show config file locations
    Paths,
}

/// Execute config command
pub fn execute(args: ConfigArgs, global_config: Option<&Path>) -> Result<()> {
    match args.action {
        ConfigAction::Show { file } => show_config(file.as_deref().or(global_config)),
        ConfigAction::Generate { output, force } => generate_config(&output, force),
        ConfigAction::Validate { file } => validate_config(&file),
        ConfigAction::Paths => show_paths(),
    }
}

fn show_config(file: Option<&Path>) -> Result<()> {
    let loaded = settings::load(file)?;
    match &loaded.source {
        Some(path) => println!("# Loaded from {}", path.display()),
        None => println!("# Built-in defaults"),
    }
    println!("{}", loaded.config.to_toml().context("Failed to serialize config")?);
    Ok(())
}

fn generate_config(output: &Path, force: bool) -> Result<()> {
    if output.exists() && !force {
        bail!("{} already exists (use --force to overwrite)", output.display());
    }

    let toml_str = Config::default()
        .to_toml()
        .context("Failed to serialize config")?;

    let content = format!(
        "# torvpn configuration\n\
         # Every key is optional; omitted keys keep the values shown here.\n\n\
         {toml_str}"
    );

    std::fs::write(output, content).with_context(|| format!("Failed to write config to {}", output.display()))?;

    info!(path = %output.display(), "Generated config file");
    println!("Configuration file generated: {}", output.display());
    Ok(())
}

fn validate_config(file: &Path) -> Result<()> {
    let config = Config::load(file).with_context(|| format!("Failed to load config from {}", file.display()))?;

    config.validate().context("Configuration validation failed")?;

    let torrc = &config.daemon.torrc;
    println!("{} Configuration is valid", "✓".green());
    println!("  Strategy: {}", config.daemon.strategy);
    println!("  Daemon config: {}", config.daemon.config_path.display());
    println!(
        "  Ports: socks {} / trans {} / dns {}",
        torrc.socks_port, torrc.trans_port, torrc.dns_port
    );
    println!("  Exempt networks: {}", config.filter.exempt_networks.len());
    println!("  Check proxy: {}", config.probe_proxy());

    Ok(())
}

fn show_paths() -> Result<()> {
    println!("Configuration file search paths:");
    println!();
    println!("  0. --config <FILE> / $TORVPN_CONFIG");

    let mut index = 1;
    for name in LOCAL_CANDIDATES {
        println!("  {index}. ./{name}");
        index += 1;
    }
    if let Some(path) = settings::user_config_path() {
        println!("  {index}. {}", path.display());
    }

    println!();
    println!("Daemon configuration is written to the path in [daemon] config_path.");
    Ok(())
}
