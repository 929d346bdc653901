//! torvpn Platform Layer
//!
//! Host integration for transparent routing on Linux.
//!
//! ## Components
//!
//! - [`IptablesFilter`]: applies rule plans through the iptables CLI
//! - [`ServiceController`] / [`ProcessController`]: the two daemon strategies
//! - [`ConnectivityProbe`]: one proxied request to a check page
//! - [`VpnSession`]: start / stop / status over the above
//!
//! All host commands go through a [`CommandRunner`], so every component
//! can be exercised without touching the machine.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod error;
pub use error::{PlatformError, Result};

pub mod command;
pub use command::{CommandOutput, CommandRunner, CommandSpec, DryRunRunner, SystemRunner};

mod traits;
pub use traits::{DaemonController, DaemonStatus, StartOutcome, TrafficFilter};

pub mod daemon;
pub use daemon::{build_controller, ProcessController, ServiceController};

pub mod iptables;
pub use iptables::IptablesFilter;

pub mod privilege;

pub mod probe;
pub use probe::{BodyFetcher, ConnectivityProbe, ProbeResult, ProxiedHttpFetcher};

pub mod session;
pub use session::{SessionError, SessionState, VpnSession};
