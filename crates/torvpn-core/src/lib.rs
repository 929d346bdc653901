//! # torvpn Core
//!
//! Platform-independent core library for transparent Tor routing.
//!
//! ## Architecture
//!
//! This crate provides:
//! - **Configuration** - TOML settings for the daemon, filter, probe and logging
//! - **Daemon config rendering** - the directive file the daemon is started with
//! - **Rule planning** - the ordered iptables mutations, exemptions first
//! - **Transactions** - compensating actions for multi-step host changes
//!
//! Nothing here touches the host; `torvpn-platform` executes the plans.
//!
//! ## Example
//!
//! ```rust
//! use torvpn_core::{Config, RulePlan};
//!
//! let config = Config::default();
//! let plan = RulePlan::install(
//!     config.redirect_ports(),
//!     &config.filter.exempt_networks,
//!     config.filter.daemon_user.as_deref(),
//! );
//! for step in &plan {
//!     println!("iptables {}", step.args().join(" "));
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod error;
pub mod network;
pub mod rules;
pub mod torrc;
pub mod transaction;

// Re-exports for convenience
pub use config::{Config, DaemonStrategy};
pub use error::{Error, Result};
pub use network::{Cidr, ExemptNetworks};
pub use rules::{RedirectPorts, RulePlan, RuleStep};
pub use torrc::{ConfigWriter, DaemonConfig};
pub use transaction::{RollbackReport, Transaction};
