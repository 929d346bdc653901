//! Daemon configuration rendering
//!
//! The daemon reads a plain-text file of `Keyword value` directives. We only
//! ever emit the five directives transparent routing depends on, and the file
//! is rewritten from scratch on every lifecycle command.

use crate::error::{Error, Result};
use crate::network::Cidr;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::net::Ipv4Addr;
use std::path::Path;
use tracing::{debug, info};

/// Listening ports and address mapping handed to the daemon
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DaemonConfig {
    /// SOCKS listener port
    pub socks_port: u16,
    /// Transparent proxy port redirected TCP lands on
    pub trans_port: u16,
    /// DNS listener port redirected UDP/53 lands on
    pub dns_port: u16,
    /// Range used for virtual addresses of mapped hostnames
    pub virtual_address_range: Cidr,
    /// Map resolved hostnames into the virtual range
    pub automap_hosts: bool,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            socks_port: 10000,
            trans_port: 9070,
            dns_port: 5353,
            virtual_address_range: Cidr::from_parts(Ipv4Addr::new(10, 192, 0, 0), 10),
            automap_hosts: true,
        }
    }
}

impl DaemonConfig {
    /// Render the directive block, one directive per line
    pub fn render(&self) -> String {
        format!(
            "VirtualAddrNetworkIPv4 {}\n\
             AutomapHostsOnResolve {}\n\
             SocksPort {}\n\
             TransPort {}\n\
             DNSPort {}\n",
            self.virtual_address_range,
            u8::from(self.automap_hosts),
            self.socks_port,
            self.trans_port,
            self.dns_port,
        )
    }

    /// Reject zero or colliding ports
    pub fn validate(&self) -> Result<()> {
        let ports = [
            ("daemon.torrc.socks_port", self.socks_port),
            ("daemon.torrc.trans_port", self.trans_port),
            ("daemon.torrc.dns_port", self.dns_port),
        ];

        for (i, (key, port)) in ports.iter().enumerate() {
            if *port == 0 {
                return Err(Error::InvalidPort { port: 0 });
            }
            if let Some((other, _)) = ports[..i].iter().find(|(_, p)| p == port) {
                return Err(Error::config_value(
                    *key,
                    format!("port {port} is already used by {other}"),
                ));
            }
        }

        Ok(())
    }
}

/// Persists a [`DaemonConfig`] to disk
#[derive(Debug, Clone, Copy, Default)]
pub struct ConfigWriter;

impl ConfigWriter {
    /// Write the rendered config to `path`, truncating existing content
    ///
    /// A single attempt is made. The error is fatal to the session: nothing
    /// downstream is meaningful without the file.
    pub fn write(config: &DaemonConfig, path: &Path) -> Result<()> {
        let rendered = config.render();
        debug!(path = %path.display(), bytes = rendered.len(), "Writing daemon configuration");

        let wrap = |source| Error::ConfigWrite {
            path: path.to_path_buf(),
            source,
        };
        let mut file = fs::File::create(path).map_err(wrap)?;
        file.write_all(rendered.as_bytes()).map_err(wrap)?;

        info!(path = %path.display(), "Daemon configuration written");
        Ok(())
    }
}
